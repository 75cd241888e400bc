use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::wire::signature::Signature;
use crate::wire::types::Type;
use crate::wire::variant::Variant;
use crate::Result;


/// 帯域外で受け渡されるファイルディスクリプタの、メッセージに添付された配列内でのインデックス (`h`)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnixFdIndex(pub u32);

/// 検証済みのオブジェクトパス (`o`)。`/` または `/` で区切られた 1 文字以上の `[A-Za-z0-9_]` 要素の並びで、
/// 末尾に `/` を持ちません。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectPath(String);

impl ObjectPath {
  pub fn new<S: Into<String>>(path: S) -> Result<ObjectPath> {
    let path = path.into();
    if ObjectPath::is_valid(&path) {
      Ok(ObjectPath(path))
    } else {
      Err(Error::IllegalObjectPath { path })
    }
  }

  /// 指定された文字列がオブジェクトパスとして有効な場合 `true`。
  pub fn is_valid(path: &str) -> bool {
    if path == "/" {
      return true;
    }
    match path.strip_prefix('/') {
      Some(elements) => elements
        .split('/')
        .all(|e| !e.is_empty() && e.bytes().all(|c| c.is_ascii_alphanumeric() || c == b'_')),
      None => false,
    }
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ObjectPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for ObjectPath {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    ObjectPath::new(s)
  }
}

/// ワイヤ上で表現可能な値。表現可能なワイヤ上の型ごとに 1 つのバリアントを持つ閉じた集合です。
#[derive(Debug, Clone)]
pub enum Value {
  Byte(u8),
  Boolean(bool),
  Int16(i16),
  UInt16(u16),
  Int32(i32),
  UInt32(u32),
  Int64(i64),
  UInt64(u64),
  Double(f64),
  UnixFd(UnixFdIndex),
  String(String),
  ObjectPath(ObjectPath),
  Signature(Signature),
  Variant(Box<Variant>),
  Array(Array),
  Struct(Vec<Value>),
  Dict(Dict),
}

impl Value {
  /// この値の型シェイプを参照します。
  pub fn value_type(&self) -> Type {
    match self {
      Value::Byte(_) => Type::Byte,
      Value::Boolean(_) => Type::Boolean,
      Value::Int16(_) => Type::Int16,
      Value::UInt16(_) => Type::UInt16,
      Value::Int32(_) => Type::Int32,
      Value::UInt32(_) => Type::UInt32,
      Value::Int64(_) => Type::Int64,
      Value::UInt64(_) => Type::UInt64,
      Value::Double(_) => Type::Double,
      Value::UnixFd(_) => Type::UnixFd,
      Value::String(_) => Type::String,
      Value::ObjectPath(_) => Type::ObjectPath,
      Value::Signature(_) => Type::Signature,
      Value::Variant(_) => Type::Variant,
      Value::Array(array) => Type::array(array.element.clone()),
      Value::Struct(fields) => Type::Struct(fields.iter().map(Value::value_type).collect()),
      Value::Dict(dict) => Type::Dict(Box::new(dict.key.clone()), Box::new(dict.value.clone())),
    }
  }

  /// この値の型のシグネチャ文字列を参照します。
  pub fn signature(&self) -> String {
    self.value_type().signature()
  }

  /// エンコード時に数えられるコンテナの段数。型のシグネチャと異なり、variant とその中身も数える。
  pub fn nesting_depth(&self) -> usize {
    match self {
      Value::Variant(variant) => 1 + variant.value().nesting_depth(),
      Value::Array(array) => {
        1 + array.items.iter().map(Value::nesting_depth).fold(array.element.nesting_depth(), usize::max)
      }
      Value::Struct(fields) => 1 + fields.iter().map(Value::nesting_depth).max().unwrap_or(0),
      Value::Dict(dict) => {
        1 + dict.entries.iter().map(|(_, v)| v.nesting_depth()).fold(dict.value.nesting_depth(), usize::max)
      }
      _ => 0,
    }
  }

  /// この値が開始しなければならないバイト境界。
  pub fn alignment(&self) -> usize {
    match self {
      Value::Byte(_) | Value::Signature(_) | Value::Variant(_) => 1,
      Value::Int16(_) | Value::UInt16(_) => 2,
      Value::Boolean(_)
      | Value::Int32(_)
      | Value::UInt32(_)
      | Value::UnixFd(_)
      | Value::String(_)
      | Value::ObjectPath(_)
      | Value::Array(_)
      | Value::Dict(_) => 4,
      Value::Int64(_) | Value::UInt64(_) | Value::Double(_) | Value::Struct(_) => 8,
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Byte(a), Value::Byte(b)) => a == b,
      (Value::Boolean(a), Value::Boolean(b)) => a == b,
      (Value::Int16(a), Value::Int16(b)) => a == b,
      (Value::UInt16(a), Value::UInt16(b)) => a == b,
      (Value::Int32(a), Value::Int32(b)) => a == b,
      (Value::UInt32(a), Value::UInt32(b)) => a == b,
      (Value::Int64(a), Value::Int64(b)) => a == b,
      (Value::UInt64(a), Value::UInt64(b)) => a == b,
      // NaN や符号付きゼロもビットパターンで比較する
      (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
      (Value::UnixFd(a), Value::UnixFd(b)) => a == b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::ObjectPath(a), Value::ObjectPath(b)) => a == b,
      (Value::Signature(a), Value::Signature(b)) => a == b,
      (Value::Variant(a), Value::Variant(b)) => a == b,
      (Value::Array(a), Value::Array(b)) => a == b,
      (Value::Struct(a), Value::Struct(b)) => a == b,
      (Value::Dict(a), Value::Dict(b)) => a == b,
      _ => false,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Byte(v) => write!(f, "{:#04x}", v),
      Value::Boolean(v) => write!(f, "{}", v),
      Value::Int16(v) => write!(f, "{}", v),
      Value::UInt16(v) => write!(f, "{}", v),
      Value::Int32(v) => write!(f, "{}", v),
      Value::UInt32(v) => write!(f, "{}", v),
      Value::Int64(v) => write!(f, "{}", v),
      Value::UInt64(v) => write!(f, "{}", v),
      Value::Double(v) => write!(f, "{:?}", v),
      Value::UnixFd(UnixFdIndex(v)) => write!(f, "handle {}", v),
      Value::String(v) => write!(f, "{:?}", v),
      Value::ObjectPath(v) => write!(f, "objectpath {:?}", v.as_str()),
      Value::Signature(v) => write!(f, "signature {:?}", v.as_str()),
      Value::Variant(v) => write!(f, "<{}>", v),
      Value::Array(array) => {
        f.write_str("[")?;
        for (i, item) in array.items.iter().enumerate() {
          if i != 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}", item)?;
        }
        f.write_str("]")
      }
      Value::Struct(fields) => {
        f.write_str("(")?;
        for (i, field) in fields.iter().enumerate() {
          if i != 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}", field)?;
        }
        f.write_str(")")
      }
      Value::Dict(dict) => {
        f.write_str("{")?;
        for (i, (key, value)) in dict.entries.iter().enumerate() {
          if i != 0 {
            f.write_str(", ")?;
          }
          write!(f, "{}: {}", key, value)?;
        }
        f.write_str("}")
      }
    }
  }
}

/// 要素型が一様な配列 (`a`)。要素型を明示的に保持しているため、空の配列もシグネチャを持ちます。
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
  element: Type,
  items: Vec<Value>,
}

impl Array {
  /// 指定された要素型の配列を構築します。要素型と異なる型の要素が含まれている場合はエラーとなります。
  pub fn new(element: Type, items: Vec<Value>) -> Result<Array> {
    if let Some(item) = items.iter().find(|item| item.value_type() != element) {
      return Err(Error::invalid_type(format!("array of {} cannot contain {}", element, item.signature())));
    }
    Ok(Array { element, items })
  }

  pub fn empty(element: Type) -> Array {
    Array { element, items: Vec::new() }
  }

  /// 型が検証済みの要素から配列を構築します。
  pub(crate) fn from_parts(element: Type, items: Vec<Value>) -> Array {
    Array { element, items }
  }

  pub fn element_type(&self) -> &Type {
    &self.element
  }

  pub fn items(&self) -> &[Value] {
    &self.items
  }

  pub fn into_items(self) -> Vec<Value> {
    self.items
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

/// 辞書エントリの配列 (`a{kv}`)。エントリは挿入順に保持されます。
#[derive(Debug, Clone, PartialEq)]
pub struct Dict {
  key: Type,
  value: Type,
  entries: Vec<(Value, Value)>,
}

impl Dict {
  /// 指定されたキーと値の型を持つ辞書を構築します。キーが基本型でない場合、または型の異なるエントリが含まれて
  /// いる場合はエラーとなります。
  pub fn new(key: Type, value: Type, entries: Vec<(Value, Value)>) -> Result<Dict> {
    if !key.is_basic() {
      return Err(Error::invalid_type(format!("dict key must be a basic type: {}", key)));
    }
    for (k, v) in entries.iter() {
      if k.value_type() != key || v.value_type() != value {
        return Err(Error::invalid_type(format!(
          "dict of {{{}{}}} cannot contain {{{}{}}}",
          key,
          value,
          k.signature(),
          v.signature()
        )));
      }
    }
    Ok(Dict { key, value, entries })
  }

  pub fn empty(key: Type, value: Type) -> Result<Dict> {
    Dict::new(key, value, Vec::new())
  }

  pub(crate) fn from_parts(key: Type, value: Type, entries: Vec<(Value, Value)>) -> Dict {
    Dict { key, value, entries }
  }

  pub fn key_type(&self) -> &Type {
    &self.key
  }

  pub fn value_type(&self) -> &Type {
    &self.value
  }

  pub fn entries(&self) -> &[(Value, Value)] {
    &self.entries
  }

  pub fn into_entries(self) -> Vec<(Value, Value)> {
    self.entries
  }

  /// 指定されたキーに対応する最初の値を参照します。
  pub fn get(&self, key: &Value) -> Option<&Value> {
    self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
