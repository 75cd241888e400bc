use std::convert::TryFrom;
use std::io::Write;

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::error::Error;
use crate::wire::signature::{Signature, MAX_NESTING_DEPTH};
use crate::wire::types::Marshal;
use crate::wire::value::{Array, Dict, UnixFdIndex, Value};
use crate::wire::{align_to, padding, pool, ByteOrder};
use crate::Result;


/// 値をワイヤフォーマットへ書き込むエンコーダ。
///
/// 最初に発生したエラーを保持し、それ以降の書き込みはすべて何も行いません。エラーは `finish()` で報告されます。
/// 作業用バッファは共有プールから借りており、エンコーダの破棄時に返却されます。
pub struct Encoder {
  order: ByteOrder,
  /// バッファ先頭のメッセージ内での絶対オフセット。アラインメントはこの値を加えた位置で計算する。
  offset: usize,
  buffer: Vec<u8>,
  depth: usize,
  error: Option<Error>,
}

macro_rules! write_fixed {
  ($name:ident, $t:ty) => {
    fn $name(&mut self, value: $t) {
      if self.error.is_some() {
        return;
      }
      let result = match self.order {
        ByteOrder::BigEndian => self.buffer.$name::<BigEndian>(value),
        ByteOrder::LittleEndian => self.buffer.$name::<LittleEndian>(value),
      };
      self.check(result);
    }
  };
}

impl Encoder {
  pub fn new(order: ByteOrder) -> Encoder {
    Encoder::at_offset(order, 0)
  }

  /// メッセージ内の `offset` の位置から書き込みを開始するエンコーダを構築します。
  pub fn at_offset(order: ByteOrder, offset: usize) -> Encoder {
    Encoder { order, offset, buffer: pool::shared().checkout(), depth: 0, error: None }
  }

  pub fn order(&self) -> ByteOrder {
    self.order
  }

  /// 次に書き込まれるバイトのメッセージ内での絶対位置。
  pub fn position(&self) -> usize {
    self.offset + self.buffer.len()
  }

  /// これまでに発生した最初のエラーを参照します。
  pub fn error(&self) -> Option<&Error> {
    self.error.as_ref()
  }

  /// 指定された値をアラインメントに従って書き込みます。
  pub fn push(&mut self, value: &Value) -> &mut Self {
    self.encode(value);
    self
  }

  /// `Marshal` を実装した値を書き込みます。
  pub fn push_marshal<T: Marshal + ?Sized>(&mut self, value: &T) -> &mut Self {
    if self.error.is_none() {
      match value.marshal() {
        Ok(value) => self.encode(&value),
        Err(err) => self.fail(err),
      }
    }
    self
  }

  /// エンコードを終了し、書き込まれたバイト列のコピーを返します。途中でエラーが発生していた場合は最初のエラー
  /// のみを返します。
  pub fn finish(mut self) -> Result<Vec<u8>> {
    match self.error.take() {
      Some(err) => Err(err),
      None => Ok(self.buffer.to_vec()),
    }
  }

  fn nested(&self, offset: usize) -> Encoder {
    let mut encoder = Encoder::at_offset(self.order, offset);
    encoder.depth = self.depth;
    encoder
  }

  fn fail(&mut self, err: Error) {
    if self.error.is_none() {
      self.error = Some(err);
    }
  }

  fn check(&mut self, result: std::io::Result<()>) {
    if let Err(err) = result {
      self.fail(Error::from(err));
    }
  }

  fn align(&mut self, alignment: usize) {
    if self.error.is_some() {
      return;
    }
    let padding = padding(self.position(), alignment);
    let length = self.buffer.len() + padding;
    self.buffer.resize(length, 0u8);
  }

  fn write_u8(&mut self, value: u8) {
    if self.error.is_some() {
      return;
    }
    let result = self.buffer.write_u8(value);
    self.check(result);
  }

  fn write_bytes(&mut self, bytes: &[u8]) {
    if self.error.is_some() {
      return;
    }
    let result = self.buffer.write_all(bytes);
    self.check(result);
  }

  write_fixed!(write_i16, i16);
  write_fixed!(write_u16, u16);
  write_fixed!(write_i32, i32);
  write_fixed!(write_u32, u32);
  write_fixed!(write_i64, i64);
  write_fixed!(write_u64, u64);
  write_fixed!(write_f64, f64);

  fn encode(&mut self, value: &Value) {
    if self.error.is_some() {
      return;
    }
    self.align(value.alignment());
    match value {
      Value::Byte(v) => self.write_u8(*v),
      Value::Boolean(v) => self.write_u32(if *v { 1 } else { 0 }),
      Value::Int16(v) => self.write_i16(*v),
      Value::UInt16(v) => self.write_u16(*v),
      Value::Int32(v) => self.write_i32(*v),
      Value::UInt32(v) => self.write_u32(*v),
      Value::Int64(v) => self.write_i64(*v),
      Value::UInt64(v) => self.write_u64(*v),
      Value::Double(v) => self.write_f64(*v),
      Value::UnixFd(UnixFdIndex(v)) => self.write_u32(*v),
      Value::String(v) => self.encode_string(v),
      Value::ObjectPath(v) => self.encode_string(v.as_str()),
      Value::Signature(v) => self.encode_signature(v),
      Value::Variant(v) => self.within_container(|enc| {
        enc.encode_signature(v.signature());
        enc.encode(v.value());
      }),
      Value::Array(v) => self.encode_array(v),
      Value::Struct(fields) => self.within_container(|enc| {
        for field in fields {
          enc.encode(field);
        }
      }),
      Value::Dict(v) => self.encode_dict(v),
    }
  }

  fn within_container<F: FnOnce(&mut Encoder)>(&mut self, f: F) {
    if self.depth >= MAX_NESTING_DEPTH {
      self.fail(Error::invalid_type(format!("container nesting too deep: max={}", MAX_NESTING_DEPTH)));
      return;
    }
    self.depth += 1;
    f(self);
    self.depth -= 1;
  }

  fn encode_string(&mut self, value: &str) {
    if value.as_bytes().contains(&0u8) {
      self.fail(Error::IllegalString { message: "string must not contain NUL".to_string() });
      return;
    }
    match u32::try_from(value.len()) {
      Ok(length) => {
        self.write_u32(length);
        self.write_bytes(value.as_bytes());
        self.write_u8(0u8);
      }
      Err(_) => self.fail(Error::IllegalString { message: format!("too long string: {} bytes", value.len()) }),
    }
  }

  /// シグネチャは 1 バイトの長さ、本体、終端の NUL の順に書き込む。`Signature` の長さは 255 以下が保証されている。
  fn encode_signature(&mut self, value: &Signature) {
    self.write_u8(value.len() as u8);
    self.write_bytes(value.as_str().as_bytes());
    self.write_u8(0u8);
  }

  fn encode_array(&mut self, array: &Array) {
    let alignment = array.element_type().alignment();
    self.within_container(|enc| {
      let start = align_to(enc.position() + 4, alignment);
      let mut body = enc.nested(start);
      for item in array.items() {
        body.encode(item);
      }
      // 要素が 0 バイトの配列は長さから要素数を復元できない
      if !array.is_empty() && body.buffer.is_empty() && body.error.is_none() {
        enc.fail(Error::invalid_type(format!("array elements occupy no bytes: {}", array.element_type())));
        return;
      }
      enc.emit_blob(body, alignment);
    });
  }

  fn encode_dict(&mut self, dict: &Dict) {
    self.within_container(|enc| {
      let start = align_to(enc.position() + 4, 8);
      let mut body = enc.nested(start);
      for (key, value) in dict.entries() {
        body.align(8);
        body.encode(key);
        body.encode(value);
      }
      enc.emit_blob(body, 8);
    });
  }

  /// 配列の長さ、最初の要素のためのパディング、配列の内容の順に書き込む。長さにパディングは含まない。
  fn emit_blob(&mut self, mut body: Encoder, alignment: usize) {
    if let Some(err) = body.error.take() {
      self.fail(err);
      return;
    }
    match u32::try_from(body.buffer.len()) {
      Ok(length) => {
        self.write_u32(length);
        self.align(alignment);
        debug_assert!(self.error.is_some() || self.position() == body.offset);
        self.write_bytes(&body.buffer);
      }
      Err(_) => self.fail(Error::invalid_type(format!("too large array: {} bytes", body.buffer.len()))),
    }
  }
}

impl Drop for Encoder {
  fn drop(&mut self) {
    pool::shared().give_back(std::mem::take(&mut self.buffer));
  }
}
