use std::collections::{BTreeMap, HashMap};

use crate::error::Error;
use crate::wire::types::{Marshal, Type, Unmarshal};
use crate::wire::value::{ObjectPath, UnixFdIndex, Value};
use crate::wire::variant::Variant;
use crate::wire::Signature;
use crate::Result;

/// ワイヤ上に載せるのは幅・高さ・画素のみで、キャッシュは載せないレコード。
#[derive(Debug, PartialEq)]
struct Pixmap {
  width: i32,
  height: i32,
  pixels: Vec<u8>,
  cached_name: Option<String>,
}

impl Marshal for Pixmap {
  fn wire_type() -> Result<Type> {
    <(i32, i32, Vec<u8>)>::wire_type()
  }

  fn marshal(&self) -> Result<Value> {
    (self.width, self.height, &self.pixels).marshal()
  }
}

impl Unmarshal for Pixmap {
  fn unmarshal(value: Value) -> Result<Self> {
    let (width, height, pixels) = <(i32, i32, Vec<u8>)>::unmarshal(value)?;
    Ok(Pixmap { width, height, pixels, cached_name: None })
  }
}

fn signature<T: Marshal + ?Sized>() -> String {
  T::wire_type().unwrap().signature()
}

#[test]
fn test_type_table() {
  let table = vec![
    (Type::Byte, "y", 1),
    (Type::Boolean, "b", 4),
    (Type::Int16, "n", 2),
    (Type::UInt16, "q", 2),
    (Type::Int32, "i", 4),
    (Type::UInt32, "u", 4),
    (Type::UnixFd, "h", 4),
    (Type::Int64, "x", 8),
    (Type::UInt64, "t", 8),
    (Type::Double, "d", 8),
    (Type::String, "s", 4),
    (Type::ObjectPath, "o", 4),
    (Type::Signature, "g", 1),
    (Type::Variant, "v", 1),
    (Type::array(Type::Double), "ad", 4),
    (Type::Struct(vec![Type::Byte]), "(y)", 8),
    (Type::dict(Type::String, Type::Variant).unwrap(), "a{sv}", 4),
  ];
  for (t, code, alignment) in table {
    assert_eq!(code, t.signature());
    assert_eq!(alignment, t.alignment(), "{}", code);
    assert_eq!(code.as_bytes()[0], t.code());
    if code.len() == 1 {
      assert_eq!(Some(t.clone()), Type::from_code(t.code()));
    }
  }
  assert_eq!(None, Type::from_code(b'a'));
  assert_eq!(None, Type::from_code(b'('));
  assert!(Type::String.is_basic());
  assert!(!Type::Variant.is_basic());
  assert!(!Type::array(Type::Byte).is_basic());
}

#[test]
fn test_dict_requires_basic_key() {
  match Type::dict(Type::Variant, Type::String) {
    Err(Error::InvalidType { .. }) => (),
    unexpected => panic!("{:?}", unexpected),
  }
}

#[test]
fn test_host_type_signatures() {
  assert_eq!("y", signature::<u8>());
  assert_eq!("b", signature::<bool>());
  assert_eq!("n", signature::<i16>());
  assert_eq!("q", signature::<u16>());
  assert_eq!("i", signature::<i32>());
  assert_eq!("u", signature::<u32>());
  assert_eq!("x", signature::<i64>());
  assert_eq!("t", signature::<u64>());
  assert_eq!("d", signature::<f64>());
  assert_eq!("h", signature::<UnixFdIndex>());
  assert_eq!("s", signature::<String>());
  assert_eq!("s", signature::<str>());
  assert_eq!("s", signature::<&str>());
  assert_eq!("o", signature::<ObjectPath>());
  assert_eq!("g", signature::<Signature>());
  assert_eq!("v", signature::<Variant>());
  assert_eq!("ai", signature::<Vec<i32>>());
  assert_eq!("aa(dd)", signature::<Vec<Vec<(f64, f64)>>>());
  assert_eq!("a{sv}", signature::<HashMap<String, Variant>>());
  assert_eq!("a{uas}", signature::<BTreeMap<u32, Vec<String>>>());
  assert_eq!("(is)", signature::<(i32, String)>());
  assert_eq!("(ybnqiu)", signature::<(u8, bool, i16, u16, i32, u32)>());

  // ワイヤに載せないフィールドはシグネチャに現れない
  assert_eq!("(iiay)", signature::<Pixmap>());
  assert_eq!("a(iiay)", signature::<Vec<Pixmap>>());
}

#[test]
fn test_non_basic_map_key_is_rejected() {
  assert!(<HashMap<Vec<u8>, u8>>::wire_type().is_err());

  let mut map = HashMap::new();
  map.insert(vec![1u8], 1u8);
  match map.marshal() {
    Err(Error::InvalidType { reason }) => assert!(reason.contains("basic"), "{}", reason),
    unexpected => panic!("{:?}", unexpected),
  }
}

#[test]
fn test_marshal_and_unmarshal() {
  let pixmap = Pixmap { width: 2, height: 1, pixels: vec![0xFF, 0x00], cached_name: Some("icon".to_string()) };
  let value = pixmap.marshal().unwrap();
  assert_eq!(
    Value::Struct(vec![
      Value::Int32(2),
      Value::Int32(1),
      Value::Array(crate::wire::Array::new(Type::Byte, vec![Value::Byte(0xFF), Value::Byte(0x00)]).unwrap()),
    ]),
    value
  );
  let restored = Pixmap::unmarshal(value).unwrap();
  assert_eq!(Pixmap { cached_name: None, ..pixmap }, restored);

  let mut map = BTreeMap::new();
  map.insert("one".to_string(), 1u64);
  map.insert("two".to_string(), 2u64);
  let value = map.marshal().unwrap();
  assert_eq!("a{st}", value.signature());
  assert_eq!(map, BTreeMap::<String, u64>::unmarshal(value).unwrap());

  let mut map = HashMap::new();
  map.insert(7u8, Variant::of("seven").unwrap());
  let value = map.marshal().unwrap();
  assert_eq!(map, HashMap::<u8, Variant>::unmarshal(value).unwrap());

  let tuple = (1u8, -2i64, "three".to_string(), vec![true, false]);
  assert_eq!(tuple, <(u8, i64, String, Vec<bool>)>::unmarshal(tuple.marshal().unwrap()).unwrap());
}

#[test]
fn test_unmarshal_type_mismatch() {
  assert_eq!(
    Err(Error::UnexpectedType { expected: "u".to_string(), actual: "i".to_string() }),
    u32::unmarshal(Value::Int32(1))
  );
  assert!(<(i32, i32)>::unmarshal(Value::Struct(vec![Value::Int32(1)])).is_err());
  assert!(Vec::<u8>::unmarshal(Value::Byte(1)).is_err());
  assert!(String::unmarshal(Value::ObjectPath(ObjectPath::new("/").unwrap())).is_err());
}
