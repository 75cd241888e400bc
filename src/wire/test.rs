use std::sync::Arc;
use std::thread;

use crate::error::Error;
use crate::test::{init_logging, SampleValues};
use crate::wire::signature::Reason;
use crate::wire::{
  decode, encode, signature_of, Array, ByteOrder, Dict, Marshal, ObjectPath, Signature, Type, UnixFdIndex,
  Unmarshal, Value, Variant, FLAG_BIG_ENDIAN, FLAG_LITTLE_ENDIAN,
};

/// すべての型を含むランダムな値の並びを生成する。
fn sample_values(sample: &mut SampleValues) -> Vec<Value> {
  let mut values = vec![
    Value::Byte(sample.next_u8()),
    Value::Boolean(sample.next_bool()),
    Value::Int16(sample.next_i16()),
    Value::UInt16(sample.next_u16()),
    Value::Int32(sample.next_i32()),
    Value::UInt32(sample.next_u32()),
    Value::Int64(sample.next_i64()),
    Value::UInt64(sample.next_u64()),
    Value::Double(sample.next_f64()),
    Value::UnixFd(UnixFdIndex(sample.next_u32())),
  ];
  let length = (sample.next_u8() % 64) as usize;
  values.push(Value::String(sample.next_string(length)));

  let elements = (sample.next_u8() % 4) as usize;
  let path = (0..elements)
    .map(|_| {
      let length = 1 + (sample.next_u8() % 8) as usize;
      format!("/{}", sample.next_string(length))
    })
    .collect::<String>();
  let path = if path.is_empty() { "/".to_string() } else { path };
  values.push(Value::ObjectPath(ObjectPath::new(path).unwrap()));
  values.push(Value::Signature(Signature::parse("a{sv}(ybnqiuxtdhsogv)").unwrap()));

  let length = (sample.next_u8() % 16) as usize;
  let bytes = sample.next_bytes(length).into_iter().map(Value::Byte).collect();
  values.push(Value::Array(Array::new(Type::Byte, bytes).unwrap()));
  let doubles = (0..(sample.next_u8() % 4)).map(|_| Value::Double(sample.next_f64())).collect();
  values.push(Value::Array(Array::new(Type::Double, doubles).unwrap()));

  let entries = (0..(sample.next_u8() % 4))
    .map(|i| {
      let key = Value::String(format!("key{}", i));
      let value = if sample.next_bool() {
        Value::Variant(Box::new(Variant::new(Value::UInt64(sample.next_u64())).unwrap()))
      } else {
        Value::Variant(Box::new(Variant::new(Value::String(sample.next_string(3))).unwrap()))
      };
      (key, value)
    })
    .collect();
  values.push(Value::Dict(Dict::new(Type::String, Type::Variant, entries).unwrap()));

  values.push(Value::Struct(vec![
    Value::Byte(sample.next_u8()),
    Value::Struct(vec![Value::Int64(sample.next_i64()), Value::Boolean(sample.next_bool())]),
    Value::Array(Array::empty(Type::Struct(vec![Type::Double]))),
  ]));
  values
}

#[test]
fn test_round_trip_random_values() {
  init_logging();

  for seed in 0..64u64 {
    let mut sample = SampleValues::new(seed);
    let values = sample_values(&mut sample);
    let signature = signature_of(&values).unwrap();
    for order in &[ByteOrder::BigEndian, ByteOrder::LittleEndian] {
      let bytes = encode(&values, *order).unwrap();
      assert_eq!(values, decode(&bytes, *order, &signature).unwrap(), "seed={}, order={:?}", seed, order);
    }
  }
}

#[test]
fn test_byte_order_changes_representation() {
  let values = vec![Value::UInt32(1), Value::String("x".to_string())];
  let big = encode(&values, ByteOrder::BigEndian).unwrap();
  let little = encode(&values, ByteOrder::LittleEndian).unwrap();
  assert_ne!(big, little);
  assert_eq!(big.len(), little.len());

  // 異なるバイトオーダーで読み込むと別の値になる
  let signature = Signature::parse("u").unwrap();
  assert_eq!(vec![Value::UInt32(0x01000000)], decode(&big[0..4], ByteOrder::LittleEndian, &signature).unwrap());
}

#[test]
fn test_byte_order_flag() {
  assert_eq!(b'l', ByteOrder::LittleEndian.flag());
  assert_eq!(b'B', ByteOrder::BigEndian.flag());
  assert_eq!(Some(ByteOrder::LittleEndian), ByteOrder::from_flag(FLAG_LITTLE_ENDIAN));
  assert_eq!(Some(ByteOrder::BigEndian), ByteOrder::from_flag(FLAG_BIG_ENDIAN));
  assert_eq!(None, ByteOrder::from_flag(b'b'));
  assert_eq!(Some(ByteOrder::native()), ByteOrder::from_flag(ByteOrder::native().flag()));
}

/// アイコンのピクセルマップ。
type Pixmap = (i32, i32, Vec<u8>);

/// ツールチップ: アイコン名、ピクセルマップの配列、タイトル、説明文。
type ToolTip = (String, Vec<Pixmap>, String, String);

#[test]
fn test_round_trip_variant_of_records() {
  let tooltip: ToolTip = ("icon".to_string(), Vec::new(), "title".to_string(), "description".to_string());
  let variant = Variant::of(&tooltip).unwrap();
  assert_eq!("(sa(iiay)ss)", variant.signature().as_str());

  let values = vec![Value::Variant(Box::new(variant))];
  let bytes = encode(&values, ByteOrder::LittleEndian).unwrap();
  let decoded = decode(&bytes, ByteOrder::LittleEndian, &Signature::parse("v").unwrap()).unwrap();
  assert_eq!(values, decoded);

  let restored = match decoded.into_iter().next() {
    Some(Value::Variant(variant)) => <ToolTip>::unmarshal(variant.into_value()).unwrap(),
    unexpected => panic!("{:?}", unexpected),
  };
  assert_eq!(tooltip, restored);

  // ピクセルを持つ場合も同様に復元できる
  let tooltip: ToolTip =
    ("".to_string(), vec![(2, 1, vec![0xFF, 0x00]), (0, 0, vec![])], "t".to_string(), "d".to_string());
  let value = tooltip.marshal().unwrap();
  let bytes = encode(&[value.clone()], ByteOrder::BigEndian).unwrap();
  let signature = Signature::from_types(&[<ToolTip>::wire_type().unwrap()]).unwrap();
  assert_eq!(vec![value], decode(&bytes, ByteOrder::BigEndian, &signature).unwrap());
}

#[test]
fn test_deep_nesting_round_trip() {
  // 63 段の配列に囲まれた構造体は 64 段のコンテナ
  let mut value = Value::Struct(vec![Value::Byte(7), Value::UInt64(u64::MAX)]);
  for _ in 0..63 {
    value = Value::Array(Array::new(value.value_type(), vec![value]).unwrap());
  }
  let values = vec![value];
  let signature = signature_of(&values).unwrap();
  assert_eq!(format!("{}(yt)", "a".repeat(63)), signature.as_str());
  for order in &[ByteOrder::BigEndian, ByteOrder::LittleEndian] {
    let bytes = encode(&values, *order).unwrap();
    assert_eq!(values, decode(&bytes, *order, &signature).unwrap());
  }
}

#[test]
fn test_signature_of() {
  let values = vec![Value::Byte(1), Value::Struct(vec![Value::Int32(1)]), Value::Array(Array::empty(Type::String))];
  assert_eq!("y(i)as", signature_of(&values).unwrap().as_str());
  assert!(signature_of(&[]).unwrap().is_empty());

  // 連結したシグネチャが長すぎる
  let values = vec![Value::Byte(0); 256];
  match signature_of(&values) {
    Err(Error::Signature(err)) => assert_eq!(Reason::TooLong, err.reason),
    unexpected => panic!("{:?}", unexpected),
  }
}

#[test]
fn test_concurrent_encode_and_decode() {
  let signature = Arc::new(Signature::parse("sat").unwrap());
  let handles = (0..8u64)
    .map(|seed| {
      let signature = signature.clone();
      thread::spawn(move || {
        let mut sample = SampleValues::new(seed);
        for _ in 0..50 {
          let text = sample.next_string(16);
          let numbers = (0..8).map(|_| Value::UInt64(sample.next_u64())).collect();
          let values = vec![Value::String(text), Value::Array(Array::new(Type::UInt64, numbers).unwrap())];
          let bytes = encode(&values, ByteOrder::LittleEndian).unwrap();
          assert_eq!(values, decode(&bytes, ByteOrder::LittleEndian, &signature).unwrap());
        }
      })
    })
    .collect::<Vec<_>>();
  for handle in handles {
    handle.join().unwrap();
  }
}
