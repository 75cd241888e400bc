//! メッセージバスのボディ部で使用されるバイナリワイヤフォーマットのエンコードとデコードを行います。
//!
//! 値は型シグネチャ (`Signature`) とアラインメント規則に従ってバイト列へ変換されます。各値はその型のアラインメント
//! 境界 (1, 2, 4, 8 バイト) までゼロでパディングされた位置から書き込まれ、アラインメントは常にメッセージ先頭からの
//! 絶対オフセットで計算されます。
use crate::error::Error;
use crate::Result;

pub mod decoder;
pub mod encoder;
pub mod pool;
pub mod signature;
pub mod types;
pub mod value;
pub mod variant;

#[cfg(test)]
mod test;

pub use decoder::Decoder;
pub use encoder::Encoder;
pub use signature::{is_single_complete_type, Signature, SignatureError};
pub use types::{Marshal, Type, Unmarshal};
pub use value::{Array, Dict, ObjectPath, UnixFdIndex, Value};
pub use variant::Variant;

/// メッセージごとに宣言されるバイトオーダー。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
  LittleEndian,
  BigEndian,
}

/// リトルエンディアンを示すメッセージヘッダのフラグバイト。
pub const FLAG_LITTLE_ENDIAN: u8 = b'l';

/// ビッグエンディアンを示すメッセージヘッダのフラグバイト。
pub const FLAG_BIG_ENDIAN: u8 = b'B';

impl ByteOrder {
  /// 実行環境のネイティブなバイトオーダーを参照します。
  pub fn native() -> ByteOrder {
    if cfg!(target_endian = "big") {
      ByteOrder::BigEndian
    } else {
      ByteOrder::LittleEndian
    }
  }

  /// このバイトオーダーを示すメッセージヘッダのフラグバイトを参照します。
  pub fn flag(self) -> u8 {
    match self {
      ByteOrder::LittleEndian => FLAG_LITTLE_ENDIAN,
      ByteOrder::BigEndian => FLAG_BIG_ENDIAN,
    }
  }

  /// メッセージヘッダのフラグバイトからバイトオーダーを判定します。未知のフラグの場合は `None` を返します。
  pub fn from_flag(flag: u8) -> Option<ByteOrder> {
    match flag {
      FLAG_LITTLE_ENDIAN => Some(ByteOrder::LittleEndian),
      FLAG_BIG_ENDIAN => Some(ByteOrder::BigEndian),
      _ => None,
    }
  }
}

/// 指定された位置を `alignment` の境界まで進めるために必要なパディングのバイト数を算出します。
#[inline]
pub(crate) fn padding(position: usize, alignment: usize) -> usize {
  debug_assert!(alignment.is_power_of_two());
  (alignment - position % alignment) % alignment
}

#[inline]
pub(crate) fn align_to(position: usize, alignment: usize) -> usize {
  position + padding(position, alignment)
}

/// 指定された値を順にエンコードしたバイト列を返します。返値は共有バッファプールから独立したコピーです。
pub fn encode(values: &[Value], order: ByteOrder) -> Result<Vec<u8>> {
  let mut encoder = Encoder::new(order);
  for value in values {
    encoder.push(value);
  }
  encoder.finish().map_err(|err| {
    log::debug!("failed to encode {} values: {}", values.len(), err);
    err
  })
}

/// 指定されたシグネチャに従ってバイト列から値を復元します。途中でエラーが発生した場合は復元途中の値を破棄して
/// エラーのみを返します。
pub fn decode(bytes: &[u8], order: ByteOrder, signature: &Signature) -> Result<Vec<Value>> {
  let mut decoder = Decoder::new(bytes, order);
  decoder.read_signature_values(signature).map_err(|err| {
    log::debug!("failed to decode {:?} from {} bytes at offset {}: {}", signature.as_str(), bytes.len(), decoder.position(), err);
    err
  })
}

/// 指定された値すべての型シグネチャを連結したシグネチャを返します。連結結果がシグネチャの制約を満たさない場合は
/// エラーとなります。
pub fn signature_of(values: &[Value]) -> Result<Signature> {
  let text = values.iter().map(|value| value.signature()).collect::<String>();
  Signature::parse(&text).map_err(Error::from)
}
