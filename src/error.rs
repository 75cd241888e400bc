use thiserror::Error as ThisError;

use crate::wire::signature::SignatureError;

#[derive(ThisError, Debug, PartialEq, Eq)]
pub enum Error {
  #[error("should receive more data to restore the entire value")]
  BufferUnsatisfied,
  #[error("length prefix claims {length} bytes at offset {offset}, but only {remaining} bytes remain")]
  LengthExceedsBuffer { offset: usize, length: usize, remaining: usize },
  #[error("container contents overran the declared length: expected end {expected}, actual {actual}")]
  ContainerLengthMismatch { expected: usize, actual: usize },

  #[error(transparent)]
  Signature(#[from] SignatureError),
  #[error("unrepresentable type: {reason}")]
  InvalidType { reason: String },
  #[error("unexpected type: expected {expected:?}, actual {actual:?}")]
  UnexpectedType { expected: String, actual: String },

  #[error("illegal boolean representation: {value:#010X}")]
  IllegalBooleanRepresentation { value: u32 },
  #[error("non-zero padding byte {value:#04X} at offset {offset}")]
  IllegalPadding { offset: usize, value: u8 },
  #[error("illegal string: {message}")]
  IllegalString { message: String },
  #[error("illegal object path: {path:?}")]
  IllegalObjectPath { path: String },
  #[error("variant signature must be a single complete type: {signature:?}")]
  IllegalVariantSignature { signature: String },

  #[error("underlying I/O layer error: {message}")]
  Io { kind: std::io::ErrorKind, message: String },
}

impl Error {
  /// 入力バイト列が不足している、または長さプレフィクスが残りのバイト数を超えていることを示すエラーの場合 `true`。
  pub fn is_truncation(&self) -> bool {
    matches!(self, Error::BufferUnsatisfied | Error::LengthExceedsBuffer { .. })
  }

  pub(crate) fn invalid_type<S: Into<String>>(reason: S) -> Error {
    Error::InvalidType { reason: reason.into() }
  }
}

impl From<std::io::Error> for Error {
  fn from(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
      Error::BufferUnsatisfied
    } else {
      Error::Io { kind: err.kind(), message: err.to_string() }
    }
  }
}
