use std::collections::BTreeMap;

use bytes::Bytes;

use super::*;

#[test]
fn test_decode_integer() {
    assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
    assert_eq!(decode(b"i-1e").unwrap(), Value::Integer(-1));
    assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
}

#[test]
fn test_decode_integer_invalid() {
    assert!(decode(b"i-0e").is_err());
    assert!(decode(b"i03e").is_err());
    assert!(decode(b"ie").is_err());
    assert!(decode(b"i42").is_err());
}

#[test]
fn test_decode_bytes() {
    assert_eq!(
        decode(b"5:hello").unwrap(),
        Value::Bytes(Bytes::from_static(b"hello"))
    );
    assert_eq!(decode(b"0:").unwrap(), Value::Bytes(Bytes::from_static(b"")));
}

#[test]
fn test_decode_bytes_invalid() {
    // Declared length past the end of input.
    assert!(matches!(decode(b"10:short"), Err(BencodeError::UnexpectedEof)));
    // Length prefix with a leading zero.
    assert!(matches!(decode(b"05:hello"), Err(BencodeError::InvalidLength)));
}

#[test]
fn test_decode_preserves_non_utf8_bytes() {
    let input = b"4:\xd6\x9f\x91\xe6";
    match decode(input).unwrap() {
        Value::Bytes(b) => assert_eq!(b.as_ref(), &input[2..]),
        _ => panic!("expected bytes"),
    }
}

#[test]
fn test_decode_list() {
    let result = decode(b"l5:helloi42ee").unwrap();
    match result {
        Value::List(l) => {
            assert_eq!(l.len(), 2);
            assert_eq!(l[0], Value::Bytes(Bytes::from_static(b"hello")));
            assert_eq!(l[1], Value::Integer(42));
        }
        _ => panic!("expected list"),
    }
}

#[test]
fn test_decode_dict() {
    let result = decode(b"d3:cow3:moo4:spam4:eggse").unwrap();
    match result {
        Value::Dict(d) => {
            assert_eq!(d.len(), 2);
            assert_eq!(
                d.get(&Bytes::from_static(b"cow")),
                Some(&Value::Bytes(Bytes::from_static(b"moo")))
            );
            assert_eq!(
                d.get(&Bytes::from_static(b"spam")),
                Some(&Value::Bytes(Bytes::from_static(b"eggs")))
            );
        }
        _ => panic!("expected dict"),
    }
}

#[test]
fn test_decode_unknown_token() {
    assert!(matches!(decode(b"x"), Err(BencodeError::UnexpectedChar('x'))));
}

#[test]
fn test_decode_depth_cap() {
    let mut deep = Vec::new();
    deep.extend(std::iter::repeat(b'l').take(600));
    deep.extend(std::iter::repeat(b'e').take(600));
    assert!(matches!(decode(&deep), Err(BencodeError::NestingTooDeep)));
}

#[test]
fn test_encode_integer() {
    assert_eq!(encode(&Value::Integer(42)), b"i42e");
    assert_eq!(encode(&Value::Integer(-42)), b"i-42e");
    assert_eq!(encode(&Value::Integer(0)), b"i0e");
}

#[test]
fn test_encode_bytes() {
    assert_eq!(encode(&Value::Bytes(Bytes::from_static(b"spam"))), b"4:spam");
    assert_eq!(encode(&Value::Bytes(Bytes::from_static(b""))), b"0:");
}

#[test]
fn test_encode_list() {
    let list = Value::List(vec![
        Value::Bytes(Bytes::from_static(b"hello")),
        Value::Integer(42),
    ]);
    assert_eq!(encode(&list), b"l5:helloi42ee");
}

#[test]
fn test_encode_dict_keys_sorted() {
    let mut dict = BTreeMap::new();
    dict.insert(Bytes::from_static(b"spam"), Value::string("eggs"));
    dict.insert(Bytes::from_static(b"cow"), Value::string("moo"));
    // Insertion order does not matter; byte order of keys does.
    assert_eq!(encode(&Value::Dict(dict)), b"d3:cow3:moo4:spam4:eggse");
}

#[test]
fn test_encode_deeply_nested() {
    let mut value = Value::Integer(1);
    for _ in 0..10_000 {
        value = Value::List(vec![value]);
    }
    let encoded = encode(&value);
    assert_eq!(encoded.len(), 10_000 * 2 + 3);
}

#[test]
fn test_encode_deterministic() {
    let value = decode(b"d8:announce15:http://test.com4:infod4:name4:test12:piece lengthi16384eee")
        .unwrap();
    assert_eq!(encode(&value), encode(&value));
}

#[test]
fn test_roundtrip_canonical_input() {
    let original = b"d8:announce15:http://test.com4:infod4:name4:test12:piece lengthi16384eee";
    let decoded = decode(original).unwrap();
    assert_eq!(encode(&decoded), original);
}

#[test]
fn test_roundtrip_value() {
    let mut dict = BTreeMap::new();
    dict.insert(Bytes::from_static(b"raw"), Value::Bytes(Bytes::from_static(b"\x00\xff\xfe")));
    dict.insert(
        Bytes::from_static(b"list"),
        Value::List(vec![Value::Integer(-7), Value::string("x")]),
    );
    let value = Value::Dict(dict);
    assert_eq!(decode(&encode(&value)).unwrap(), value);
}

#[test]
fn test_trailing_data_error() {
    assert!(matches!(decode(b"i42eextra"), Err(BencodeError::TrailingData)));
}

#[test]
fn test_decode_prefix_reports_cursor() {
    let data = b"d8:msg_typei1e5:piecei0eeRAWDATA";
    let (value, end) = decode_prefix(data).unwrap();
    assert_eq!(value.get(b"msg_type").and_then(|v| v.as_integer()), Some(1));
    assert_eq!(&data[end..], b"RAWDATA");
}

#[test]
fn test_skip_value() {
    let data = b"i42e5:hello";
    assert_eq!(skip_value(data, 0).unwrap(), 4);
    assert_eq!(skip_value(data, 4).unwrap(), data.len());

    let nested = b"d4:listl4:spami42eee3:end";
    assert_eq!(skip_value(nested, 0).unwrap(), nested.len() - 5);

    assert!(skip_value(b"l4:spam", 0).is_err());
}

#[test]
fn test_value_accessors() {
    let value = Value::Integer(42);
    assert_eq!(value.as_integer(), Some(42));
    assert!(value.as_bytes().is_none());

    let value = Value::Bytes(Bytes::from_static(b"test"));
    assert_eq!(value.as_str(), Some("test"));
    assert!(value.as_integer().is_none());

    let value = Value::List(vec![]);
    assert!(value.as_list().is_some());
    assert!(value.as_dict().is_none());
}
