//! SQL literal encoding
//!
//! Values are written as bytes: raw byte columns may hold anything, and the
//! escaped literal must reproduce them exactly in the target dialect.

use crate::decode::{DecodeSlot, OpaqueValue};
use crate::dialect::Dialect;

pub const NULL_LITERAL: &[u8] = b"NULL";

const BINARY_PREFIX: &[u8] = b"_binary ";

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Quote an identifier, doubling any embedded quote character
///
/// Backticks for MySQL, double quotes for SQLite.
pub fn quote_identifier(dialect: Dialect, name: &str) -> String {
    match dialect {
        Dialect::MySql => format!("`{}`", name.replace('`', "``")),
        Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
    }
}

/// `` `a`,`b` `` for an INSERT column list
pub fn column_list(dialect: Dialect, columns: &[String]) -> String {
    columns
        .iter()
        .map(|c| quote_identifier(dialect, c))
        .collect::<Vec<_>>()
        .join(",")
}

/// Append `value` escaped for a single-quoted MySQL string literal
///
/// Quotes are not added.
pub fn escape_into(out: &mut Vec<u8>, value: &[u8]) {
    out.reserve(value.len());
    for &b in value {
        match b {
            0 => out.extend_from_slice(b"\\0"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'"' => out.extend_from_slice(b"\\\""),
            0x1a => out.extend_from_slice(b"\\Z"),
            _ => out.push(b),
        }
    }
}

/// Append `value` escaped for a single-quoted SQLite string literal
///
/// Only the quote itself is special; backslashes and newlines are literal.
pub fn escape_sqlite_into(out: &mut Vec<u8>, value: &[u8]) {
    out.reserve(value.len());
    for &b in value {
        if b == b'\'' {
            out.extend_from_slice(b"''");
        } else {
            out.push(b);
        }
    }
}

fn push_quoted(out: &mut Vec<u8>, value: &[u8]) {
    out.push(b'\'');
    escape_into(out, value);
    out.push(b'\'');
}

fn push_float(out: &mut Vec<u8>, value: f64) {
    if value.is_finite() {
        out.extend_from_slice(value.to_string().as_bytes());
    } else {
        out.extend_from_slice(NULL_LITERAL);
    }
}

fn push_sqlite_blob(out: &mut Vec<u8>, value: &[u8]) {
    out.reserve(value.len() * 2 + 3);
    out.extend_from_slice(b"X'");
    for &b in value {
        out.push(HEX_DIGITS[usize::from(b >> 4)]);
        out.push(HEX_DIGITS[usize::from(b & 0x0f)]);
    }
    out.push(b'\'');
}

/// Text that is not plain UTF-8, or holds a NUL, goes through a blob cast so
/// the dump stays valid UTF-8 and the stored bytes survive unchanged
fn push_sqlite_text(out: &mut Vec<u8>, value: &[u8]) {
    match std::str::from_utf8(value) {
        Ok(text) if !text.contains('\0') => {
            out.push(b'\'');
            escape_sqlite_into(out, value);
            out.push(b'\'');
        }
        _ => {
            out.extend_from_slice(b"CAST(");
            push_sqlite_blob(out, value);
            out.extend_from_slice(b" AS TEXT)");
        }
    }
}

/// Float literal that SQLite reads back as REAL, never as INTEGER
fn push_sqlite_float(out: &mut Vec<u8>, value: f64) {
    if value.is_nan() {
        out.extend_from_slice(NULL_LITERAL);
        return;
    }
    if value.is_infinite() {
        let literal: &[u8] = if value > 0.0 { b"1e999" } else { b"-1e999" };
        out.extend_from_slice(literal);
        return;
    }
    let mut text = value.to_string();
    if !text.contains('.') {
        if value.abs() < 1e16 {
            text.push_str(".0");
        } else {
            text = format!("{:e}", value);
        }
    }
    out.extend_from_slice(text.as_bytes());
}

fn encode_mysql(slot: &DecodeSlot, out: &mut Vec<u8>) {
    match slot {
        DecodeSlot::Integer(Some(v)) => out.extend_from_slice(v.to_string().as_bytes()),
        DecodeSlot::Float(Some(v)) => push_float(out, *v),
        DecodeSlot::Text(Some(v)) => push_quoted(out, v.as_bytes()),
        DecodeSlot::RawBytes(Some(v)) => {
            out.extend_from_slice(BINARY_PREFIX);
            push_quoted(out, v);
        }
        DecodeSlot::Opaque(Some(v)) => match v {
            OpaqueValue::Integer(i) => push_quoted(out, i.to_string().as_bytes()),
            OpaqueValue::Float(f) if f.is_finite() => push_quoted(out, f.to_string().as_bytes()),
            OpaqueValue::Float(_) => out.extend_from_slice(NULL_LITERAL),
            OpaqueValue::Text(b) | OpaqueValue::Bytes(b) => push_quoted(out, b),
        },
        _ => out.extend_from_slice(NULL_LITERAL),
    }
}

// SQLite keeps a storage class per value, so opaque values are written in
// their native form rather than quoted.
fn encode_sqlite(slot: &DecodeSlot, out: &mut Vec<u8>) {
    match slot {
        DecodeSlot::Integer(Some(v)) | DecodeSlot::Opaque(Some(OpaqueValue::Integer(v))) => {
            out.extend_from_slice(v.to_string().as_bytes())
        }
        DecodeSlot::Float(Some(v)) | DecodeSlot::Opaque(Some(OpaqueValue::Float(v))) => {
            push_sqlite_float(out, *v)
        }
        DecodeSlot::Text(Some(v)) => push_sqlite_text(out, v.as_bytes()),
        DecodeSlot::Opaque(Some(OpaqueValue::Text(v))) => push_sqlite_text(out, v),
        DecodeSlot::RawBytes(Some(v)) | DecodeSlot::Opaque(Some(OpaqueValue::Bytes(v))) => {
            push_sqlite_blob(out, v)
        }
        _ => out.extend_from_slice(NULL_LITERAL),
    }
}

/// Append one decoded value as a SQL literal
pub fn encode_value(dialect: Dialect, slot: &DecodeSlot, out: &mut Vec<u8>) {
    match dialect {
        Dialect::MySql => encode_mysql(slot, out),
        Dialect::Sqlite => encode_sqlite(slot, out),
    }
}

/// Render the current row as `(v1,v2,...)`, replacing `out`'s contents
pub fn encode_row(dialect: Dialect, slots: &[DecodeSlot], out: &mut Vec<u8>) {
    out.clear();
    out.push(b'(');
    for (i, slot) in slots.iter().enumerate() {
        if i > 0 {
            out.push(b',');
        }
        encode_value(dialect, slot, out);
    }
    out.push(b')');
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Reverse of `escape_into` plus quotes, per the MySQL literal grammar
    fn parse_quoted(literal: &[u8]) -> Vec<u8> {
        assert_eq!(literal.first(), Some(&b'\''));
        assert_eq!(literal.last(), Some(&b'\''));
        let body = &literal[1..literal.len() - 1];
        let mut out = Vec::with_capacity(body.len());
        let mut iter = body.iter();
        while let Some(&b) = iter.next() {
            if b == b'\'' {
                panic!("unescaped quote inside literal");
            }
            if b != b'\\' {
                out.push(b);
                continue;
            }
            let next = *iter.next().expect("dangling backslash");
            out.push(match next {
                b'0' => 0,
                b'n' => b'\n',
                b'r' => b'\r',
                b'Z' => 0x1a,
                other => other,
            });
        }
        out
    }

    fn parse_hex(body: &[u8]) -> Vec<u8> {
        assert_eq!(body.len() % 2, 0);
        body.chunks(2)
            .map(|pair| u8::from_str_radix(std::str::from_utf8(pair).unwrap(), 16).unwrap())
            .collect()
    }

    /// Reverse of the SQLite text and blob literal forms
    fn parse_sqlite(literal: &[u8]) -> Vec<u8> {
        if let Some(rest) = literal.strip_prefix(b"CAST(X'") {
            let hex = rest.strip_suffix(b"' AS TEXT)").expect("unterminated cast");
            return parse_hex(hex);
        }
        if let Some(rest) = literal.strip_prefix(b"X'") {
            return parse_hex(rest.strip_suffix(b"'").expect("unterminated blob"));
        }
        let body = literal
            .strip_prefix(b"'")
            .and_then(|l| l.strip_suffix(b"'"))
            .expect("not a quoted literal");
        let mut out = Vec::with_capacity(body.len());
        let mut iter = body.iter();
        while let Some(&b) = iter.next() {
            if b == b'\'' {
                assert_eq!(iter.next(), Some(&b'\''), "lone quote inside literal");
            }
            out.push(b);
        }
        out
    }

    fn row(dialect: Dialect, slots: Vec<DecodeSlot>) -> String {
        let mut out = Vec::new();
        encode_row(dialect, &slots, &mut out);
        String::from_utf8(out).unwrap()
    }

    fn mysql(slots: Vec<DecodeSlot>) -> String {
        row(Dialect::MySql, slots)
    }

    fn sqlite(slots: Vec<DecodeSlot>) -> String {
        row(Dialect::Sqlite, slots)
    }

    #[test]
    fn test_users_rows() {
        assert_eq!(
            mysql(vec![DecodeSlot::Integer(Some(1)), DecodeSlot::Text(Some("a".into()))]),
            "(1,'a')"
        );
        assert_eq!(
            mysql(vec![DecodeSlot::Integer(Some(2)), DecodeSlot::Text(None)]),
            "(2,NULL)"
        );
    }

    #[test]
    fn test_every_null_container_is_null() {
        let slots = vec![
            DecodeSlot::Integer(None),
            DecodeSlot::Float(None),
            DecodeSlot::Text(None),
            DecodeSlot::RawBytes(None),
            DecodeSlot::Opaque(None),
        ];
        assert_eq!(mysql(slots.clone()), "(NULL,NULL,NULL,NULL,NULL)");
        assert_eq!(sqlite(slots), "(NULL,NULL,NULL,NULL,NULL)");
    }

    #[test]
    fn test_raw_bytes_have_binary_prefix() {
        assert_eq!(
            mysql(vec![DecodeSlot::RawBytes(Some(vec![b'a', 0, b'\'']))]),
            "(_binary 'a\\0\\'')"
        );
        assert_eq!(mysql(vec![DecodeSlot::RawBytes(Some(Vec::new()))]), "(_binary '')");
    }

    #[test]
    fn test_floats() {
        assert_eq!(
            mysql(vec![
                DecodeSlot::Float(Some(1.5)),
                DecodeSlot::Float(Some(0.1)),
                DecodeSlot::Float(Some(3.0)),
                DecodeSlot::Float(Some(f64::NAN)),
            ]),
            "(1.5,0.1,3,NULL)"
        );
    }

    #[test]
    fn test_opaque_values_are_quoted() {
        assert_eq!(
            mysql(vec![
                DecodeSlot::Opaque(Some(OpaqueValue::Integer(5))),
                DecodeSlot::Opaque(Some(OpaqueValue::Text(b"it's".to_vec()))),
            ]),
            "('5','it\\'s')"
        );
    }

    #[test]
    fn test_escape_special_bytes() {
        let mut out = Vec::new();
        escape_into(&mut out, b"a\\b\n\r\"\x1a");
        assert_eq!(out, b"a\\\\b\\n\\r\\\"\\Z".to_vec());
    }

    #[test]
    fn test_quote_identifier_doubles_quote_char() {
        assert_eq!(quote_identifier(Dialect::MySql, "we`ird"), "`we``ird`");
        assert_eq!(
            column_list(Dialect::MySql, &["id".into(), "name".into()]),
            "`id`,`name`"
        );
        assert_eq!(quote_identifier(Dialect::Sqlite, "say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(
            column_list(Dialect::Sqlite, &["id".into(), "name".into()]),
            "\"id\",\"name\""
        );
    }

    #[test]
    fn test_sqlite_opaque_values_keep_storage_class() {
        assert_eq!(
            sqlite(vec![
                DecodeSlot::Opaque(Some(OpaqueValue::Integer(-7))),
                DecodeSlot::Opaque(Some(OpaqueValue::Float(1.5))),
                DecodeSlot::Opaque(Some(OpaqueValue::Text(b"it's \\ here".to_vec()))),
                DecodeSlot::Opaque(Some(OpaqueValue::Bytes(vec![0x00, 0xff, 0x27]))),
            ]),
            "(-7,1.5,'it''s \\ here',X'00ff27')"
        );
    }

    #[test]
    fn test_sqlite_floats_stay_real() {
        assert_eq!(
            sqlite(vec![
                DecodeSlot::Float(Some(2.0)),
                DecodeSlot::Float(Some(-0.0)),
                DecodeSlot::Float(Some(1e300)),
                DecodeSlot::Float(Some(f64::INFINITY)),
                DecodeSlot::Float(Some(f64::NEG_INFINITY)),
                DecodeSlot::Float(Some(f64::NAN)),
            ]),
            "(2.0,-0.0,1e300,1e999,-1e999,NULL)"
        );
    }

    #[test]
    fn test_sqlite_text_without_plain_form_is_cast() {
        assert_eq!(
            sqlite(vec![
                DecodeSlot::Opaque(Some(OpaqueValue::Text(vec![0xff, 0x00]))),
                DecodeSlot::Text(Some("a\0b".into())),
                DecodeSlot::RawBytes(Some(Vec::new())),
            ]),
            "(CAST(X'ff00' AS TEXT),CAST(X'610062' AS TEXT),X'')"
        );
    }

    proptest! {
        #[test]
        fn prop_escaped_bytes_round_trip(value in proptest::collection::vec(any::<u8>(), 0..64)) {
            let mut literal = Vec::new();
            push_quoted(&mut literal, &value);
            prop_assert_eq!(parse_quoted(&literal), value);
        }

        #[test]
        fn prop_escaped_text_round_trip(value in "\\PC*") {
            let mut literal = Vec::new();
            encode_value(Dialect::MySql, &DecodeSlot::Text(Some(value.clone())), &mut literal);
            prop_assert_eq!(parse_quoted(&literal), value.into_bytes());
        }

        #[test]
        fn prop_sqlite_text_and_blob_round_trip(value in proptest::collection::vec(any::<u8>(), 0..64)) {
            for slot in [
                DecodeSlot::Opaque(Some(OpaqueValue::Text(value.clone()))),
                DecodeSlot::Opaque(Some(OpaqueValue::Bytes(value.clone()))),
            ] {
                let mut literal = Vec::new();
                encode_value(Dialect::Sqlite, &slot, &mut literal);
                prop_assert!(std::str::from_utf8(&literal).is_ok());
                prop_assert_eq!(parse_sqlite(&literal), value.clone());
            }
        }

        #[test]
        fn prop_sqlite_floats_round_trip(value in any::<f64>().prop_filter("finite", |v| v.is_finite())) {
            let mut literal = Vec::new();
            encode_value(Dialect::Sqlite, &DecodeSlot::Float(Some(value)), &mut literal);
            let text = String::from_utf8(literal).unwrap();
            prop_assert!(text.contains('.') || text.contains('e'));
            prop_assert_eq!(text.parse::<f64>().unwrap(), value);
        }
    }
}
