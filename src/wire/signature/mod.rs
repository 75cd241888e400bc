use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use thiserror::Error as ThisError;

use crate::wire::types::Type;


/// シグネチャ文字列として許される最大のバイト長です。
pub const MAX_SIGNATURE_LENGTH: usize = 255;

/// コンテナ型 (配列、構造体、辞書) を入れ子にできる最大の深さです。
pub const MAX_NESTING_DEPTH: usize = 64;

/// シグネチャが不正と判断された理由。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reason {
  TooLong,
  Empty,
  UnmatchedParenthesis,
  UnmatchedBrace,
  DictArity,
  NonBasicDictKey,
  InvalidCharacter,
  NestingTooDeep,
}

impl fmt::Display for Reason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Reason::TooLong => "too long",
      Reason::Empty => "empty signature",
      Reason::UnmatchedParenthesis => "unmatched '('",
      Reason::UnmatchedBrace => "unmatched '{'",
      Reason::DictArity => "too many types in dict",
      Reason::NonBasicDictKey => "dict key must be a basic type",
      Reason::InvalidCharacter => "invalid type character",
      Reason::NestingTooDeep => "container nesting too deep",
    })
  }
}

/// 不正なシグネチャ文字列を示すエラー。`signature` には問題の検出された部分文字列が格納されています。
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
#[error("invalid signature: {signature:?} ({reason})")]
pub struct SignatureError {
  pub signature: String,
  pub reason: Reason,
}

impl SignatureError {
  fn new(signature: &str, reason: Reason) -> SignatureError {
    SignatureError { signature: signature.to_string(), reason }
  }
}

/// 検証済みの型シグネチャ。0 個以上の完全型 (complete type) の並びを表し、空のシグネチャも有効です。
///
/// 構築時に文字列を解析し、それぞれの完全型の `Type` を保持しています。
#[derive(Debug, Clone, Default)]
pub struct Signature {
  text: String,
  types: Vec<Type>,
}

impl Signature {
  /// 指定された文字列をシグネチャとして解析します。
  pub fn parse(signature: &str) -> Result<Signature, SignatureError> {
    if signature.len() > MAX_SIGNATURE_LENGTH {
      return Err(SignatureError::new(signature, Reason::TooLong));
    }
    let mut types = Vec::new();
    let mut rest = signature;
    while !rest.is_empty() {
      let (single, remaining) = parse_single(rest, 0)?;
      types.push(single);
      rest = remaining;
    }
    Ok(Signature { text: signature.to_string(), types })
  }

  /// 空のシグネチャを参照します。
  pub fn empty() -> Signature {
    Signature::default()
  }

  /// 指定された型の並びからシグネチャを構築します。
  pub fn from_types(types: &[Type]) -> Result<Signature, SignatureError> {
    let text = types.iter().map(Type::signature).collect::<String>();
    Signature::parse(&text)
  }

  pub fn as_str(&self) -> &str {
    &self.text
  }

  pub fn len(&self) -> usize {
    self.text.len()
  }

  pub fn is_empty(&self) -> bool {
    self.text.is_empty()
  }

  /// このシグネチャを構成する完全型を先頭から順に参照します。
  pub fn types(&self) -> &[Type] {
    &self.types
  }

  /// このシグネチャがちょうど 1 つの完全型から構成されている場合 `true`。
  pub fn is_single(&self) -> bool {
    self.types.len() == 1
  }

  /// このシグネチャがちょうど 1 つの完全型から構成されている場合にその型を返します。
  pub fn single_type(&self) -> Option<&Type> {
    if self.is_single() {
      self.types.first()
    } else {
      None
    }
  }
}

impl PartialEq for Signature {
  fn eq(&self, other: &Self) -> bool {
    self.text == other.text
  }
}

impl Eq for Signature {}

impl Hash for Signature {
  fn hash<H: Hasher>(&self, state: &mut H) {
    self.text.hash(state)
  }
}

impl PartialOrd for Signature {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Signature {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering {
    self.text.cmp(&other.text)
  }
}

impl fmt::Display for Signature {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.text)
  }
}

impl FromStr for Signature {
  type Err = SignatureError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Signature::parse(s)
  }
}

/// 指定された文字列がちょうど 1 つの完全型を表している場合 `true` を返します。
pub fn is_single_complete_type(signature: &str) -> bool {
  if signature.len() > MAX_SIGNATURE_LENGTH {
    return false;
  }
  match parse_single(signature, 0) {
    Ok((_, rest)) => rest.is_empty(),
    Err(_) => false,
  }
}

/// 文字列の先頭から 1 つの完全型を読み込み、その型と残りの文字列を返します。`depth` は現在の位置を囲んでいる
/// コンテナの数です。
fn parse_single(s: &str, depth: usize) -> Result<(Type, &str), SignatureError> {
  let code = match s.as_bytes().first() {
    Some(code) => *code,
    None => return Err(SignatureError::new(s, Reason::Empty)),
  };
  if let Some(single) = Type::from_code(code) {
    return Ok((single, &s[1..]));
  }
  match code {
    b'a' if s.as_bytes().get(1) == Some(&b'{') => {
      let depth = enter(s, depth)?;
      let close = match find_matching(&s[1..], b'{', b'}') {
        Some(i) => i + 1,
        None => return Err(SignatureError::new(s, Reason::UnmatchedBrace)),
      };
      let inner = &s[2..close];
      let key = match inner.as_bytes().first().map(|c| (*c, Type::from_code(*c))) {
        None => return Err(SignatureError::new(inner, Reason::DictArity)),
        Some((_, Some(key))) if key.is_basic() => key,
        Some((_, Some(_))) | Some((b'a', None)) | Some((b'(', None)) => {
          return Err(SignatureError::new(inner, Reason::NonBasicDictKey))
        }
        Some(_) => return Err(SignatureError::new(inner, Reason::InvalidCharacter)),
      };
      if inner.len() == 1 {
        return Err(SignatureError::new(inner, Reason::DictArity));
      }
      let (value, left) = parse_single(&inner[1..], depth)?;
      if !left.is_empty() {
        return Err(SignatureError::new(inner, Reason::DictArity));
      }
      Ok((Type::Dict(Box::new(key), Box::new(value)), &s[close + 1..]))
    }
    b'a' => {
      let depth = enter(s, depth)?;
      let (element, rest) = parse_single(&s[1..], depth)?;
      Ok((Type::Array(Box::new(element)), rest))
    }
    b'(' => {
      let depth = enter(s, depth)?;
      let close = match find_matching(s, b'(', b')') {
        Some(i) => i,
        None => return Err(SignatureError::new(s, Reason::UnmatchedParenthesis)),
      };
      let mut fields = Vec::new();
      let mut inner = &s[1..close];
      while !inner.is_empty() {
        let (field, rest) = parse_single(inner, depth)?;
        fields.push(field);
        inner = rest;
      }
      Ok((Type::Struct(fields), &s[close + 1..]))
    }
    _ => Err(SignatureError::new(s, Reason::InvalidCharacter)),
  }
}

/// コンテナに入るときの深さを算出します。
fn enter(s: &str, depth: usize) -> Result<usize, SignatureError> {
  if depth >= MAX_NESTING_DEPTH {
    Err(SignatureError::new(s, Reason::NestingTooDeep))
  } else {
    Ok(depth + 1)
  }
}

/// 先頭の `left` に対応する `right` の位置を返します。対応する文字が見つからない場合は `None`。
fn find_matching(s: &str, left: u8, right: u8) -> Option<usize> {
  let mut n = 0usize;
  for (i, c) in s.bytes().enumerate() {
    if c == left {
      n += 1;
    } else if c == right {
      n = n.saturating_sub(1);
    }
    if n == 0 {
      return Some(i);
    }
  }
  None
}
