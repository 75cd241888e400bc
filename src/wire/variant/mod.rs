use std::fmt;

use crate::error::Error;
use crate::wire::signature::{Signature, MAX_NESTING_DEPTH};
use crate::wire::types::Marshal;
use crate::wire::value::Value;
use crate::Result;


/// 自身の型シグネチャを伴って受け渡される動的型付けの値 (`v`)。
///
/// シグネチャは構築時に値から算出されて固定されます。ワイヤ上ではシグネチャ文字列の直後にその型でエンコードされた
/// 値が続きます。型の異なる値の集まりは `Variant` の配列として表現します。
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
  signature: Signature,
  value: Value,
}

impl Variant {
  /// 指定された値を格納する variant を構築します。値のシグネチャが長すぎる、または入れ子が深すぎる場合はエラー
  /// となります。入れ子の深さは variant 自身を 1 段として数え、単独でエンコードできる値だけを受け付けます。
  pub fn new(value: Value) -> Result<Variant> {
    let signature = Signature::parse(&value.signature())?;
    let depth = 1 + value.nesting_depth();
    if depth > MAX_NESTING_DEPTH {
      return Err(Error::invalid_type(format!(
        "container nesting too deep: depth={}, max={}",
        depth, MAX_NESTING_DEPTH
      )));
    }
    Ok(Variant { signature, value })
  }

  /// `Marshal` を実装した値を格納する variant を構築します。
  pub fn of<T: Marshal + ?Sized>(value: &T) -> Result<Variant> {
    Variant::new(value.marshal()?)
  }

  /// デコード済みのシグネチャと値から構築します。
  pub(crate) fn from_parts(signature: Signature, value: Value) -> Variant {
    debug_assert_eq!(signature.as_str(), value.signature());
    Variant { signature, value }
  }

  pub fn signature(&self) -> &Signature {
    &self.signature
  }

  pub fn value(&self) -> &Value {
    &self.value
  }

  pub fn into_value(self) -> Value {
    self.value
  }
}

impl fmt::Display for Variant {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "@{} {}", self.signature, self.value)
  }
}
