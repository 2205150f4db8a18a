#![allow(unused_crate_dependencies)]
use bser::{Error, PduLength, Value, decode, encode, from_slice, peek_total_length};
use serde::Deserialize;

/// `["watch", "/tmp"]` as the watch daemon itself frames it.
const WATCH_TMP: &[u8] = &[
    0x00, 0x01, 0x03, 0x12, // header, int8 length 18
    0x00, 0x03, 0x02, // array, 2 items
    0x02, 0x03, 0x05, b'w', b'a', b't', b'c', b'h', // "watch"
    0x02, 0x03, 0x04, b'/', b't', b'm', b'p', // "/tmp"
];

/// `[{"name": "fred", "age": 20}, {"name": "pete", "age": 30}, {"age": 25}]`
/// sent as a template.
const PEOPLE: &[u8] = &[
    0x00, 0x01, 0x03, 0x28, // header, int8 length 40
    0x0b, // template
    0x00, 0x03, 0x02, // keys, 2 items
    0x02, 0x03, 0x04, b'n', b'a', b'm', b'e', // "name"
    0x02, 0x03, 0x03, b'a', b'g', b'e', // "age"
    0x03, 0x03, // 3 rows
    0x02, 0x03, 0x04, b'f', b'r', b'e', b'd', 0x03, 0x14, // "fred", 20
    0x02, 0x03, 0x04, b'p', b'e', b't', b'e', 0x03, 0x1e, // "pete", 30
    0x0c, 0x03, 0x19, // skipped, 25
];

fn watch_tmp() -> Value {
    Value::from_iter(["watch", "/tmp"])
}

#[test]
fn decodes_int8_header() {
    let value = decode(WATCH_TMP).expect("valid frame");
    assert_eq!(value, watch_tmp(), "must decode to the watch command");
}

#[test]
fn encodes_int32_header() {
    let buf = encode(&watch_tmp()).expect("encoding must work");
    assert_eq!(&buf[..7], &[0x00, 0x01, 0x05, 0x12, 0x00, 0x00, 0x00], "int32 header");
    assert_eq!(&buf[7..], &WATCH_TMP[4..], "body must match byte for byte");
}

#[test]
fn decodes_template() {
    let value = decode(PEOPLE).expect("valid template");
    let expected = Value::Array(vec![
        Value::object([("name", Value::from("fred")), ("age", Value::Int(20))]),
        Value::object([("name", Value::from("pete")), ("age", Value::Int(30))]),
        Value::object([("age", Value::Int(25))]),
    ]);
    assert_eq!(value, expected, "template must expand row by row");

    // once expanded, it can't be told apart from a plain array of objects
    let plain = encode(&expected).expect("encoding must work");
    assert_eq!(
        decode(&plain).expect("valid frame"),
        value,
        "templates decode like plain arrays"
    );
}

#[test]
fn template_into_structs() {
    #[derive(Debug, PartialEq, Deserialize)]
    struct Person {
        name: Option<String>,
        age: u8,
    }

    let people: Vec<Person> = from_slice(PEOPLE).expect("valid template");
    let names: Vec<Option<&str>> = people.iter().map(|p| p.name.as_deref()).collect();
    let ages: Vec<u8> = people.iter().map(|p| p.age).collect();
    assert_eq!(names, [Some("fred"), Some("pete"), None], "names");
    assert_eq!(ages, [20, 30, 25], "ages");
}

#[test]
fn peek_never_overshoots() {
    let buf = encode(&watch_tmp()).expect("encoding must work");

    for len in 0..buf.len() {
        match peek_total_length(&buf[..len]).expect("valid prefix") {
            PduLength::Complete(total) => {
                assert_eq!(total, buf.len(), "prefix of {len} bytes must see the full length");
            }
            PduLength::NeedMoreBytes(n) => {
                assert!(n > 0, "must ask for at least one byte");
                assert!(len + n <= buf.len(), "asked past the frame end at {len}");
            }
        }
    }
}

#[test]
fn header_is_exact() {
    let mut longer = WATCH_TMP.to_vec();
    longer.push(0x0a);
    let res = decode(&longer);
    assert!(
        matches!(
            res,
            Err(Error::LengthMismatch {
                declared: 22,
                actual: 23
            })
        ),
        "one extra byte: {res:?}"
    );

    let res = decode(&WATCH_TMP[..WATCH_TMP.len() - 1]);
    assert!(
        matches!(res, Err(Error::TruncatedInput)),
        "one byte short: {res:?}"
    );
}

#[test]
fn rejects_garbage() {
    let cases: [(&[u8], fn(&Error) -> bool); 4] = [
        (&[0x01, 0x00, 0x03, 0x00], |e| matches!(e, Error::BadMagic(_))),
        (&[0x00, 0x01, 0x02, 0x00], |e| matches!(e, Error::BadTag(0x02))),
        (&[0x00, 0x01, 0x03, 0x01, 0xff], |e| matches!(e, Error::UnknownTag(0xff))),
        (&[0x00, 0x01, 0x03, 0xff], |e| matches!(e, Error::NegativeLength(-1))),
    ];

    for (buf, check) in cases {
        let res = decode(buf);
        match &res {
            Err(e) => assert!(check(e), "{buf:02x?} gave the wrong error: {e:?}"),
            Ok(v) => panic!("{buf:02x?} must be rejected, got {v:?}"),
        }
    }
}
