use byteorder::{BigEndian, LittleEndian, ReadBytesExt};

use crate::error::Error;
use crate::wire::signature::{Signature, MAX_NESTING_DEPTH};
use crate::wire::types::Type;
use crate::wire::value::{Array, Dict, ObjectPath, UnixFdIndex, Value};
use crate::wire::variant::Variant;
use crate::wire::{padding, ByteOrder};
use crate::Result;


/// ワイヤフォーマットのバイト列から期待される型の値を読み込むデコーダ。
///
/// 長さプレフィクスはすべて残りのバイト数と照合してから読み込みます。エラーが発生した時点で読み込みを中断し、
/// 読み込み途中の値は返しません。
pub struct Decoder<'a> {
  buffer: &'a [u8],
  position: usize,
  order: ByteOrder,
  depth: usize,
}

macro_rules! read_fixed {
  ($name:ident, $t:ty, $size:expr) => {
    fn $name(&mut self) -> Result<$t> {
      let mut bytes = self.take($size)?;
      let value = match self.order {
        ByteOrder::BigEndian => bytes.$name::<BigEndian>()?,
        ByteOrder::LittleEndian => bytes.$name::<LittleEndian>()?,
      };
      Ok(value)
    }
  };
}

impl<'a> Decoder<'a> {
  pub fn new(buffer: &'a [u8], order: ByteOrder) -> Decoder<'a> {
    Decoder::at(buffer, order, 0)
  }

  /// メッセージ全体のバイト列 `buffer` の `position` の位置から読み込みを開始するデコーダを構築します。アラインメ
  /// ントは `buffer` の先頭からの位置で計算されます。
  pub fn at(buffer: &'a [u8], order: ByteOrder, position: usize) -> Decoder<'a> {
    Decoder { buffer, position, order, depth: 0 }
  }

  pub fn order(&self) -> ByteOrder {
    self.order
  }

  /// 次に読み込むバイトの位置。
  pub fn position(&self) -> usize {
    self.position
  }

  /// 読み込まれていない残りのバイト数。
  pub fn remaining(&self) -> usize {
    self.buffer.len().saturating_sub(self.position)
  }

  /// 指定されたシグネチャを構成する完全型の値を先頭から順にすべて読み込みます。
  pub fn read_signature_values(&mut self, signature: &Signature) -> Result<Vec<Value>> {
    signature.types().iter().map(|value_type| self.read(value_type)).collect()
  }

  /// 指定された型の値を 1 つ読み込みます。
  pub fn read(&mut self, value_type: &Type) -> Result<Value> {
    self.align(value_type.alignment())?;
    let value = match value_type {
      Type::Byte => Value::Byte(self.read_u8()?),
      Type::Boolean => match self.read_u32()? {
        0 => Value::Boolean(false),
        1 => Value::Boolean(true),
        value => return Err(Error::IllegalBooleanRepresentation { value }),
      },
      Type::Int16 => Value::Int16(self.read_i16()?),
      Type::UInt16 => Value::UInt16(self.read_u16()?),
      Type::Int32 => Value::Int32(self.read_i32()?),
      Type::UInt32 => Value::UInt32(self.read_u32()?),
      Type::Int64 => Value::Int64(self.read_i64()?),
      Type::UInt64 => Value::UInt64(self.read_u64()?),
      Type::Double => Value::Double(self.read_f64()?),
      Type::UnixFd => Value::UnixFd(UnixFdIndex(self.read_u32()?)),
      Type::String => Value::String(self.read_string()?),
      Type::ObjectPath => Value::ObjectPath(ObjectPath::new(self.read_string()?)?),
      Type::Signature => Value::Signature(self.read_signature()?),
      Type::Variant => self.within_container(Decoder::read_variant)?,
      Type::Array(element) => self.within_container(|dec| dec.read_array(element))?,
      Type::Struct(fields) => self.within_container(|dec| {
        fields.iter().map(|field| dec.read(field)).collect::<Result<Vec<Value>>>().map(Value::Struct)
      })?,
      Type::Dict(key, value) => self.within_container(|dec| dec.read_dict(key, value))?,
    };
    Ok(value)
  }

  fn within_container<T, F: FnOnce(&mut Self) -> Result<T>>(&mut self, f: F) -> Result<T> {
    if self.depth >= MAX_NESTING_DEPTH {
      return Err(Error::invalid_type(format!("container nesting too deep: max={}", MAX_NESTING_DEPTH)));
    }
    self.depth += 1;
    let result = f(self);
    self.depth -= 1;
    result
  }

  /// 指定されたバイト数を読み込みます。残りのバイト数が足りない場合は何も読み込まずにエラーとなります。
  fn take(&mut self, length: usize) -> Result<&'a [u8]> {
    if self.position > self.buffer.len() || length > self.remaining() {
      return Err(Error::BufferUnsatisfied);
    }
    let buffer: &'a [u8] = self.buffer;
    let bytes = &buffer[self.position..self.position + length];
    self.position += length;
    Ok(bytes)
  }

  /// 次の `alignment` 境界までのパディングを読み飛ばします。パディングはゼロでなければなりません。
  fn align(&mut self, alignment: usize) -> Result<()> {
    let start = self.position;
    let bytes = self.take(padding(start, alignment))?;
    match bytes.iter().position(|b| *b != 0) {
      Some(i) => Err(Error::IllegalPadding { offset: start + i, value: bytes[i] }),
      None => Ok(()),
    }
  }

  /// 長さプレフィクスが残りのバイト数を超えていないことを確認します。
  fn check_length(&self, length: usize) -> Result<()> {
    let remaining = self.remaining();
    if length > remaining {
      Err(Error::LengthExceedsBuffer { offset: self.position, length, remaining })
    } else {
      Ok(())
    }
  }

  fn read_u8(&mut self) -> Result<u8> {
    Ok(self.take(1)?[0])
  }

  read_fixed!(read_i16, i16, 2);
  read_fixed!(read_u16, u16, 2);
  read_fixed!(read_i32, i32, 4);
  read_fixed!(read_u32, u32, 4);
  read_fixed!(read_i64, i64, 8);
  read_fixed!(read_u64, u64, 8);
  read_fixed!(read_f64, f64, 8);

  /// 本体と終端の NUL を読み込み、NUL を除いた本体を返す。
  fn read_terminated(&mut self, length: usize) -> Result<&'a [u8]> {
    self.check_length(length + 1)?;
    let bytes = self.take(length)?;
    if self.read_u8()? != 0 {
      return Err(Error::IllegalString { message: "missing NUL terminator".to_string() });
    }
    if bytes.contains(&0u8) {
      return Err(Error::IllegalString { message: "string must not contain NUL".to_string() });
    }
    Ok(bytes)
  }

  fn read_string(&mut self) -> Result<String> {
    let length = self.read_u32()? as usize;
    let bytes = self.read_terminated(length)?;
    String::from_utf8(bytes.to_vec()).map_err(|err| Error::IllegalString { message: err.to_string() })
  }

  fn read_signature(&mut self) -> Result<Signature> {
    let length = self.read_u8()? as usize;
    let bytes = self.read_terminated(length)?;
    let text = std::str::from_utf8(bytes).map_err(|err| Error::IllegalString { message: err.to_string() })?;
    Ok(Signature::parse(text)?)
  }

  fn read_variant(&mut self) -> Result<Value> {
    let signature = self.read_signature()?;
    let value_type = match signature.single_type() {
      Some(value_type) => value_type.clone(),
      None => return Err(Error::IllegalVariantSignature { signature: signature.as_str().to_string() }),
    };
    let value = self.read(&value_type)?;
    Ok(Value::Variant(Box::new(Variant::from_parts(signature, value))))
  }

  /// 配列の長さを読み込み、最初の要素のパディングを読み飛ばして、配列の内容が終了する位置を返す。
  fn read_blob_end(&mut self, alignment: usize) -> Result<usize> {
    let length = self.read_u32()? as usize;
    self.align(alignment)?;
    self.check_length(length)?;
    Ok(self.position + length)
  }

  /// 要素の読み込みで位置が進まない、または宣言された長さを超えた場合はエラー。
  fn check_progress(&self, before: usize, end: usize) -> Result<()> {
    if self.position == before || self.position > end {
      Err(Error::ContainerLengthMismatch { expected: end, actual: self.position })
    } else {
      Ok(())
    }
  }

  fn read_array(&mut self, element: &Type) -> Result<Value> {
    let end = self.read_blob_end(element.alignment())?;
    let mut items = Vec::new();
    while self.position < end {
      let before = self.position;
      items.push(self.read(element)?);
      self.check_progress(before, end)?;
    }
    Ok(Value::Array(Array::from_parts(element.clone(), items)))
  }

  fn read_dict(&mut self, key: &Type, value: &Type) -> Result<Value> {
    let end = self.read_blob_end(8)?;
    let mut entries = Vec::new();
    while self.position < end {
      let before = self.position;
      self.align(8)?;
      let k = self.read(key)?;
      let v = self.read(value)?;
      self.check_progress(before, end)?;
      entries.push((k, v));
    }
    Ok(Value::Dict(Dict::from_parts(key.clone(), value.clone(), entries)))
  }
}
