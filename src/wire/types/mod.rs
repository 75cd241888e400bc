use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::hash::Hash;

use crate::error::Error;
use crate::wire::signature::Signature;
use crate::wire::value::{Array, Dict, ObjectPath, UnixFdIndex, Value};
use crate::wire::variant::Variant;
use crate::Result;

#[cfg(test)]
mod test;

/// ワイヤ上で表現可能な値の型シェイプ。シグネチャの 1 つの完全型に対応します。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
  Byte,
  Boolean,
  Int16,
  UInt16,
  Int32,
  UInt32,
  Int64,
  UInt64,
  Double,
  /// 帯域外で受け渡されるファイルディスクリプタを参照するインデックス。
  UnixFd,
  String,
  ObjectPath,
  Signature,
  Variant,
  Array(Box<Type>),
  Struct(Vec<Type>),
  /// 辞書エントリの配列 `a{kv}`。キーは基本型でなければならない。
  Dict(Box<Type>, Box<Type>),
}

impl Type {
  /// 指定された要素型の配列型を構築します。
  pub fn array(element: Type) -> Type {
    Type::Array(Box::new(element))
  }

  /// 指定されたキーと値の辞書型を構築します。キーが基本型でない場合はエラーとなります。
  pub fn dict(key: Type, value: Type) -> Result<Type> {
    if !key.is_basic() {
      return Err(Error::invalid_type(format!("dict key must be a basic type: {}", key)));
    }
    Ok(Type::Dict(Box::new(key), Box::new(value)))
  }

  /// 1 文字で完結する型コードに対応する型を参照します。コンテナ型の開始文字や未知の文字の場合は `None`。
  pub fn from_code(code: u8) -> Option<Type> {
    Some(match code {
      b'y' => Type::Byte,
      b'b' => Type::Boolean,
      b'n' => Type::Int16,
      b'q' => Type::UInt16,
      b'i' => Type::Int32,
      b'u' => Type::UInt32,
      b'x' => Type::Int64,
      b't' => Type::UInt64,
      b'd' => Type::Double,
      b'h' => Type::UnixFd,
      b's' => Type::String,
      b'o' => Type::ObjectPath,
      b'g' => Type::Signature,
      b'v' => Type::Variant,
      _ => return None,
    })
  }

  /// この型のシグネチャの先頭文字。
  pub fn code(&self) -> u8 {
    match self {
      Type::Byte => b'y',
      Type::Boolean => b'b',
      Type::Int16 => b'n',
      Type::UInt16 => b'q',
      Type::Int32 => b'i',
      Type::UInt32 => b'u',
      Type::Int64 => b'x',
      Type::UInt64 => b't',
      Type::Double => b'd',
      Type::UnixFd => b'h',
      Type::String => b's',
      Type::ObjectPath => b'o',
      Type::Signature => b'g',
      Type::Variant => b'v',
      Type::Array(_) | Type::Dict(_, _) => b'a',
      Type::Struct(_) => b'(',
    }
  }

  /// 辞書のキーとして使用できるコンテナでも variant でもない型の場合 `true`。
  pub fn is_basic(&self) -> bool {
    !matches!(self, Type::Variant | Type::Array(_) | Type::Struct(_) | Type::Dict(_, _))
  }

  /// この型の値が開始しなければならないバイト境界。
  pub fn alignment(&self) -> usize {
    match self {
      Type::Byte | Type::Signature | Type::Variant => 1,
      Type::Int16 | Type::UInt16 => 2,
      Type::Boolean
      | Type::Int32
      | Type::UInt32
      | Type::UnixFd
      | Type::String
      | Type::ObjectPath
      | Type::Array(_)
      | Type::Dict(_, _) => 4,
      Type::Int64 | Type::UInt64 | Type::Double | Type::Struct(_) => 8,
    }
  }

  /// この型が入れ子にしているコンテナの段数。基本型と variant は 0。
  pub fn nesting_depth(&self) -> usize {
    match self {
      Type::Array(element) => 1 + element.nesting_depth(),
      Type::Struct(fields) => 1 + fields.iter().map(Type::nesting_depth).max().unwrap_or(0),
      Type::Dict(key, value) => 1 + key.nesting_depth().max(value.nesting_depth()),
      _ => 0,
    }
  }

  /// この型の正規のシグネチャ文字列を参照します。
  pub fn signature(&self) -> String {
    let mut buffer = String::new();
    self.write_signature(&mut buffer);
    buffer
  }

  fn write_signature(&self, buffer: &mut String) {
    match self {
      Type::Array(element) => {
        buffer.push('a');
        element.write_signature(buffer);
      }
      Type::Struct(fields) => {
        buffer.push('(');
        for field in fields {
          field.write_signature(buffer);
        }
        buffer.push(')');
      }
      Type::Dict(key, value) => {
        buffer.push_str("a{");
        key.write_signature(buffer);
        value.write_signature(buffer);
        buffer.push('}');
      }
      single => buffer.push(single.code() as char),
    }
  }
}

impl fmt::Display for Type {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.signature())
  }
}

/// ワイヤ上の値へ変換することのできる型。
///
/// レコード型はこのトレイトを実装し、ワイヤに載せるフィールドだけを宣言順に `Value::Struct` として返します。
/// 宣言されなかったフィールドはシグネチャにもエンコード結果にも現れません。
pub trait Marshal {
  /// この型の型シェイプ。表現できない型 (基本型でないキーを持つ辞書など) の場合はエラーとなります。
  fn wire_type() -> Result<Type>;

  fn marshal(&self) -> Result<Value>;
}

/// ワイヤ上の値から復元することのできる型。
pub trait Unmarshal: Sized {
  fn unmarshal(value: Value) -> Result<Self>;
}

fn mismatch(expected: &str, actual: &Value) -> Error {
  Error::UnexpectedType { expected: expected.to_string(), actual: actual.signature() }
}

macro_rules! basic_marshal {
  ($t:ty, $variant:ident, $code:expr) => {
    impl Marshal for $t {
      fn wire_type() -> Result<Type> {
        Ok(Type::$variant)
      }

      fn marshal(&self) -> Result<Value> {
        Ok(Value::$variant(*self))
      }
    }

    impl Unmarshal for $t {
      fn unmarshal(value: Value) -> Result<Self> {
        match value {
          Value::$variant(x) => Ok(x),
          other => Err(mismatch($code, &other)),
        }
      }
    }
  };
}

basic_marshal!(u8, Byte, "y");
basic_marshal!(bool, Boolean, "b");
basic_marshal!(i16, Int16, "n");
basic_marshal!(u16, UInt16, "q");
basic_marshal!(i32, Int32, "i");
basic_marshal!(u32, UInt32, "u");
basic_marshal!(i64, Int64, "x");
basic_marshal!(u64, UInt64, "t");
basic_marshal!(f64, Double, "d");
basic_marshal!(UnixFdIndex, UnixFd, "h");

impl Marshal for str {
  fn wire_type() -> Result<Type> {
    Ok(Type::String)
  }

  fn marshal(&self) -> Result<Value> {
    Ok(Value::String(self.to_string()))
  }
}

impl Marshal for String {
  fn wire_type() -> Result<Type> {
    Ok(Type::String)
  }

  fn marshal(&self) -> Result<Value> {
    Ok(Value::String(self.clone()))
  }
}

impl Unmarshal for String {
  fn unmarshal(value: Value) -> Result<Self> {
    match value {
      Value::String(x) => Ok(x),
      other => Err(mismatch("s", &other)),
    }
  }
}

impl Marshal for ObjectPath {
  fn wire_type() -> Result<Type> {
    Ok(Type::ObjectPath)
  }

  fn marshal(&self) -> Result<Value> {
    Ok(Value::ObjectPath(self.clone()))
  }
}

impl Unmarshal for ObjectPath {
  fn unmarshal(value: Value) -> Result<Self> {
    match value {
      Value::ObjectPath(x) => Ok(x),
      other => Err(mismatch("o", &other)),
    }
  }
}

impl Marshal for Signature {
  fn wire_type() -> Result<Type> {
    Ok(Type::Signature)
  }

  fn marshal(&self) -> Result<Value> {
    Ok(Value::Signature(self.clone()))
  }
}

impl Unmarshal for Signature {
  fn unmarshal(value: Value) -> Result<Self> {
    match value {
      Value::Signature(x) => Ok(x),
      other => Err(mismatch("g", &other)),
    }
  }
}

impl Marshal for Variant {
  fn wire_type() -> Result<Type> {
    Ok(Type::Variant)
  }

  fn marshal(&self) -> Result<Value> {
    Ok(Value::Variant(Box::new(self.clone())))
  }
}

impl Unmarshal for Variant {
  fn unmarshal(value: Value) -> Result<Self> {
    match value {
      Value::Variant(x) => Ok(*x),
      other => Err(mismatch("v", &other)),
    }
  }
}

impl<T: Marshal + ?Sized> Marshal for &T {
  fn wire_type() -> Result<Type> {
    T::wire_type()
  }

  fn marshal(&self) -> Result<Value> {
    (**self).marshal()
  }
}

impl<T: Marshal> Marshal for Vec<T> {
  fn wire_type() -> Result<Type> {
    Ok(Type::array(T::wire_type()?))
  }

  fn marshal(&self) -> Result<Value> {
    let items = self.iter().map(Marshal::marshal).collect::<Result<Vec<Value>>>()?;
    Ok(Value::Array(Array::new(T::wire_type()?, items)?))
  }
}

impl<T: Unmarshal> Unmarshal for Vec<T> {
  fn unmarshal(value: Value) -> Result<Self> {
    match value {
      Value::Array(array) => array.into_items().into_iter().map(T::unmarshal).collect(),
      other => Err(mismatch("a", &other)),
    }
  }
}

fn marshal_entries<'a, K, V, I>(entries: I) -> Result<Value>
where
  K: Marshal + 'a,
  V: Marshal + 'a,
  I: Iterator<Item = (&'a K, &'a V)>,
{
  let key = K::wire_type()?;
  let value = V::wire_type()?;
  if !key.is_basic() {
    return Err(Error::invalid_type(format!("dict key must be a basic type: {}", key)));
  }
  let entries = entries.map(|(k, v)| Ok((k.marshal()?, v.marshal()?))).collect::<Result<Vec<(Value, Value)>>>()?;
  Ok(Value::Dict(Dict::new(key, value, entries)?))
}

fn unmarshal_entries<K: Unmarshal, V: Unmarshal, C: std::iter::FromIterator<(K, V)>>(value: Value) -> Result<C> {
  match value {
    Value::Dict(dict) => dict.into_entries().into_iter().map(|(k, v)| Ok((K::unmarshal(k)?, V::unmarshal(v)?))).collect(),
    other => Err(mismatch("a{}", &other)),
  }
}

impl<K: Marshal + Eq + Hash, V: Marshal, S> Marshal for HashMap<K, V, S> {
  fn wire_type() -> Result<Type> {
    Type::dict(K::wire_type()?, V::wire_type()?)
  }

  fn marshal(&self) -> Result<Value> {
    marshal_entries(self.iter())
  }
}

impl<K: Unmarshal + Eq + Hash, V: Unmarshal> Unmarshal for HashMap<K, V> {
  fn unmarshal(value: Value) -> Result<Self> {
    unmarshal_entries(value)
  }
}

impl<K: Marshal + Ord, V: Marshal> Marshal for BTreeMap<K, V> {
  fn wire_type() -> Result<Type> {
    Type::dict(K::wire_type()?, V::wire_type()?)
  }

  fn marshal(&self) -> Result<Value> {
    marshal_entries(self.iter())
  }
}

impl<K: Unmarshal + Ord, V: Unmarshal> Unmarshal for BTreeMap<K, V> {
  fn unmarshal(value: Value) -> Result<Self> {
    unmarshal_entries(value)
  }
}

macro_rules! tuple_marshal {
  ($count:expr; $($name:ident : $index:tt),+) => {
    impl<$($name: Marshal),+> Marshal for ($($name,)+) {
      fn wire_type() -> Result<Type> {
        Ok(Type::Struct(vec![$($name::wire_type()?),+]))
      }

      fn marshal(&self) -> Result<Value> {
        Ok(Value::Struct(vec![$(self.$index.marshal()?),+]))
      }
    }

    impl<$($name: Unmarshal),+> Unmarshal for ($($name,)+) {
      fn unmarshal(value: Value) -> Result<Self> {
        match value {
          Value::Struct(fields) if fields.len() == $count => {
            let mut fields = fields.into_iter();
            Ok(($($name::unmarshal(fields.next().ok_or_else(|| Error::invalid_type("missing struct field"))?)?,)+))
          }
          other => Err(mismatch(concat!("struct of ", stringify!($count), " fields"), &other)),
        }
      }
    }
  };
}

tuple_marshal!(1; A: 0);
tuple_marshal!(2; A: 0, B: 1);
tuple_marshal!(3; A: 0, B: 1, C: 2);
tuple_marshal!(4; A: 0, B: 1, C: 2, D: 3);
tuple_marshal!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
tuple_marshal!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
