// Copyright 2026 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! RFC 8949 compliance tests
//! Tests encoding/decoding against the byte sequences of RFC 8949 Appendix A.
//!
//! Half-precision floats and indefinite-length items are decode-only: the
//! encoder writes single or double precision floats and definite lengths, so
//! those vectors are checked against their re-encoded form.

use cbor_codec::{CborError, Value, from_slice, to_vec};
use num_bigint::BigInt;

#[test]
fn test_rfc8949_integers() {
    assert_encode_decode(Value::from(0), "00");
    assert_encode_decode(Value::from(1), "01");
    assert_encode_decode(Value::from(10), "0a");
    assert_encode_decode(Value::from(23), "17");
    assert_encode_decode(Value::from(24), "1818");
    assert_encode_decode(Value::from(25), "1819");
    assert_encode_decode(Value::from(100), "1864");
    assert_encode_decode(Value::from(1000), "1903e8");
    assert_encode_decode(Value::from(1000000), "1a000f4240");
    assert_encode_decode(Value::from(1000000000000i64), "1b000000e8d4a51000");
    assert_encode_decode(Value::from(u64::MAX), "1bffffffffffffffff");

    assert_encode_decode(Value::from(-1), "20");
    assert_encode_decode(Value::from(-10), "29");
    assert_encode_decode(Value::from(-100), "3863");
    assert_encode_decode(Value::from(-1000), "3903e7");
    assert_encode_decode(
        Value::from(-(BigInt::from(1u8) << 64usize)),
        "3bffffffffffffffff",
    );
}

#[test]
fn test_rfc8949_bignums() {
    let two_to_64 = BigInt::from(1u8) << 64usize;
    assert_encode_decode(Value::from(two_to_64.clone()), "c249010000000000000000");
    assert_encode_decode(Value::from(-two_to_64 - 1), "c349010000000000000000");

    // a bignum with a plain encoding is written without its tag
    assert_decodes_to("c24101", "01");
    assert_eq!(from_slice(&hex_to_bytes("c24101")).unwrap(), Value::Integer(1));
}

#[test]
fn test_rfc8949_simple_values() {
    assert_encode_decode(Value::Bool(false), "f4");
    assert_encode_decode(Value::Bool(true), "f5");
    assert_encode_decode(Value::Null, "f6");
    assert_encode_decode(Value::Undefined, "f7");
    assert_encode_decode(Value::simple(16).unwrap(), "f0");
    assert_encode_decode(Value::simple(255).unwrap(), "f8ff");

    // two-byte form of a value below 32 is not well-formed
    assert!(matches!(
        from_slice(&hex_to_bytes("f818")),
        Err(CborError::Format(_))
    ));
}

#[test]
fn test_rfc8949_floats() {
    assert_encode_decode(Value::Double(1.1), "fb3ff199999999999a");
    assert_encode_decode(Value::Single(100000.0), "fa47c35000");
    assert_encode_decode(Value::Single(3.4028234663852886e+38), "fa7f7fffff");
    assert_encode_decode(Value::Double(1.0e+300), "fb7e37e43c8800759c");
    assert_encode_decode(Value::Double(-4.1), "fbc010666666666666");
    assert_encode_decode(Value::Single(f32::INFINITY), "fa7f800000");
    assert_encode_decode(Value::Double(f64::NEG_INFINITY), "fbfff0000000000000");

    let halves = [
        ("f90000", 0.0f32),
        ("f98000", -0.0),
        ("f93c00", 1.0),
        ("f93e00", 1.5),
        ("f97bff", 65504.0),
        ("f90001", 5.960464477539063e-8),
        ("f90400", 6.103515625e-5),
        ("f9c400", -4.0),
        ("f97c00", f32::INFINITY),
        ("f9fc00", f32::NEG_INFINITY),
    ];
    for (hex, expected) in halves {
        let value = from_slice(&hex_to_bytes(hex)).unwrap();
        assert_eq!(value, Value::Single(expected), "Decoding mismatch for {}", hex);
    }

    let nan = from_slice(&hex_to_bytes("f97e00")).unwrap();
    assert!(matches!(nan, Value::Single(f) if f.is_nan()));
    let nan = from_slice(&hex_to_bytes("fb7ff8000000000000")).unwrap();
    assert!(matches!(nan, Value::Double(f) if f.is_nan()));
}

#[test]
fn test_rfc8949_strings() {
    assert_encode_decode(Value::from(""), "60");
    assert_encode_decode(Value::from("a"), "6161");
    assert_encode_decode(Value::from("IETF"), "6449455446");
    assert_encode_decode(Value::from("\"\\"), "62225c");
    assert_encode_decode(Value::from("\u{00fc}"), "62c3bc");
    assert_encode_decode(Value::from("\u{6c34}"), "63e6b0b4");
    assert_encode_decode(Value::from("\u{10151}"), "64f0908591");

    assert_encode_decode(Value::from(Vec::<u8>::new()), "40");
    assert_encode_decode(Value::from(vec![1u8, 2, 3, 4]), "4401020304");
}

#[test]
fn test_rfc8949_arrays() {
    assert_encode_decode(Value::new_array(), "80");
    assert_encode_decode(
        Value::array(vec![1.into(), 2.into(), 3.into()]),
        "83010203",
    );

    let nested = Value::array(vec![
        1.into(),
        Value::array(vec![2.into(), 3.into()]),
        Value::array(vec![4.into(), 5.into()]),
    ]);
    assert_encode_decode(nested, "8301820203820405");

    let long = Value::array((1..=25).map(Value::from).collect());
    assert_encode_decode(
        long,
        "98190102030405060708090a0b0c0d0e0f101112131415161718181819",
    );
}

#[test]
fn test_rfc8949_maps() {
    assert_encode_decode(Value::new_map(), "a0");

    let map = Value::new_map();
    map.add(1, 2).unwrap();
    map.add(3, 4).unwrap();
    assert_encode_decode(map, "a201020304");

    let map = Value::new_map();
    map.add("a", 1).unwrap();
    map.add("b", Value::array(vec![2.into(), 3.into()])).unwrap();
    assert_encode_decode(map, "a26161016162820203");

    let inner = Value::new_map();
    inner.add("b", "c").unwrap();
    assert_encode_decode(
        Value::array(vec!["a".into(), inner]),
        "826161a161626163",
    );

    let letters = Value::new_map();
    for (key, value) in [("a", "A"), ("b", "B"), ("c", "C"), ("d", "D"), ("e", "E")] {
        letters.add(key, value).unwrap();
    }
    assert_encode_decode(letters, "a56161614161626142616361436164614461656145");
}

#[test]
fn test_rfc8949_indefinite_lengths() {
    assert_decodes_to("5f42010243030405ff", "450102030405");
    assert_decodes_to("7f657374726561646d696e67ff", "6973747265616d696e67");
    assert_decodes_to("9fff", "80");
    assert_decodes_to("9f018202039f0405ffff", "8301820203820405");
    assert_decodes_to("9f01820203820405ff", "8301820203820405");
    assert_decodes_to("83018202039f0405ff", "8301820203820405");
    assert_decodes_to("83019f0203ff820405", "8301820203820405");
    assert_decodes_to(
        "9f0102030405060708090a0b0c0d0e0f101112131415161718181819ff",
        "98190102030405060708090a0b0c0d0e0f101112131415161718181819",
    );
    assert_decodes_to("bf61610161629f0203ffff", "a26161016162820203");
    assert_decodes_to("826161bf61626163ff", "826161a161626163");
    assert_decodes_to("bf6346756ef563416d7421ff", "a26346756ef563416d7421");
}

#[test]
fn test_rfc8949_tags() {
    // Tag 0: Standard date/time string
    let date = Value::tagged(0, "2013-03-21T20:04:00Z");
    assert_encode_decode(date, "c074323031332d30332d32315432303a30343a30305a");

    // Tags without a handler pass through
    assert_encode_decode(Value::tagged(1, 1363896240), "c11a514b67b0");
    assert_encode_decode(Value::tagged(1, Value::Double(1363896240.5)), "c1fb41d452d9ec200000");
    assert_encode_decode(Value::tagged(23, vec![1u8, 2, 3, 4]), "d74401020304");
    assert_encode_decode(
        Value::tagged(24, vec![0x64u8, 0x49, 0x45, 0x54, 0x46]),
        "d818456449455446",
    );

    // Tag 32: URI
    let uri = Value::uri("http://www.example.com").unwrap();
    assert_encode_decode(uri, "d82076687474703a2f2f7777772e6578616d706c652e636f6d");

    // Tag 4: decimal fraction 273.15
    let decimal = from_slice(&hex_to_bytes("c48221196ab3")).unwrap();
    assert!(matches!(decimal, Value::Decimal(_)));
    assert_eq!(decimal.to_f64().unwrap(), 273.15);
    assert_eq!(hex_from_bytes(&to_vec(&decimal).unwrap()), "c48221196ab3");

    // Tag 5: bigfloat 1.5
    let bigfloat = from_slice(&hex_to_bytes("c5822003")).unwrap();
    assert!(matches!(bigfloat, Value::BigFloat(_)));
    assert_eq!(bigfloat.to_f64().unwrap(), 1.5);
    assert_eq!(hex_from_bytes(&to_vec(&bigfloat).unwrap()), "c5822003");
}

#[test]
fn test_value_roundtrip() {
    let test_cases = vec![
        "00",   // 0
        "01",   // 1
        "20",   // -1
        "f4",   // false
        "f5",   // true
        "f6",   // null
        "f7",   // undefined
        "6161", // "a"
        "80",   // []
        "a0",   // {}
        "d82550000102030405060708090a0b0c0d0e0f", // UUID
        "d903e86161",                             // unknown tag 1000
    ];

    for hex in test_cases {
        let bytes = hex_to_bytes(hex);
        let value = from_slice(&bytes).unwrap();
        let encoded = to_vec(&value).unwrap();
        assert_eq!(
            hex_from_bytes(&encoded),
            hex,
            "Failed roundtrip for {}",
            hex
        );
    }
}

// Helper functions

fn assert_encode_decode(value: Value, expected_hex: &str) {
    let expected_bytes = hex_to_bytes(expected_hex);

    let encoded = to_vec(&value).unwrap();
    assert_eq!(
        hex_from_bytes(&encoded),
        expected_hex,
        "Encoding mismatch for {}",
        value
    );

    let decoded = from_slice(&expected_bytes).unwrap();
    assert_eq!(decoded, value, "Decoding mismatch for {}", expected_hex);
}

/// Decodes `input_hex` and checks that it re-encodes as `encoded_hex`.
fn assert_decodes_to(input_hex: &str, encoded_hex: &str) {
    let decoded = from_slice(&hex_to_bytes(input_hex)).unwrap();
    assert_eq!(
        hex_from_bytes(&to_vec(&decoded).unwrap()),
        encoded_hex,
        "Re-encoding mismatch for {}",
        input_hex
    );
    assert_eq!(decoded, from_slice(&hex_to_bytes(encoded_hex)).unwrap());
}

fn hex_to_bytes(hex: &str) -> Vec<u8> {
    hex::decode(hex).unwrap()
}

fn hex_from_bytes(bytes: &[u8]) -> String {
    hex::encode(bytes)
}
