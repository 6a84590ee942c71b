//! Column type resolution and per-column decode slots
//!
//! A decode container is chosen once per column when the cursor opens. The
//! driver's generic scan kind is consulted first; when it is `Dynamic` the
//! dialect type name decides, and anything still unknown is kept as the
//! driver's native value.

use crate::errors::{DecodeError, DumpError, Result};
use crate::source::{ColumnType, RawValue, ScanKind};

/// Container a column's values are decoded into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeKind {
    Integer,
    Float,
    Text,
    RawBytes,
    Opaque,
}

/// Pick the decode container for a cursor column
pub fn resolve(column: &ColumnType) -> DecodeKind {
    match column.scan_kind {
        ScanKind::Integer => DecodeKind::Integer,
        ScanKind::Float => DecodeKind::Float,
        ScanKind::String => DecodeKind::Text,
        ScanKind::Dynamic => resolve_type_name(&column.database_type_name),
    }
}

/// Name-based fallback for columns without a generic scan kind
pub fn resolve_type_name(type_name: &str) -> DecodeKind {
    match base_type_name(type_name).as_str() {
        "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BINARY" | "VARBINARY" => {
            DecodeKind::RawBytes
        }
        "VARCHAR" | "CHAR" | "TEXT" | "TINYTEXT" | "MEDIUMTEXT" | "LONGTEXT" | "DECIMAL"
        | "NUMERIC" | "JSON" | "ENUM" | "SET" | "DATE" | "DATETIME" | "TIMESTAMP" | "TIME"
        | "YEAR" => DecodeKind::Text,
        "BIGINT" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "INTEGER" => DecodeKind::Integer,
        "DOUBLE" | "REAL" | "FLOAT" => DecodeKind::Float,
        _ => DecodeKind::Opaque,
    }
}

/// `decimal(10,2) unsigned` -> `DECIMAL`
fn base_type_name(type_name: &str) -> String {
    let head = type_name.split('(').next().unwrap_or_default();
    head.split_whitespace()
        .next()
        .unwrap_or_default()
        .to_ascii_uppercase()
}

/// A value kept in the driver's native representation
#[derive(Debug, Clone, PartialEq)]
pub enum OpaqueValue {
    Integer(i64),
    Float(f64),
    /// Text storage, kept byte for byte even when it is not valid UTF-8
    Text(Vec<u8>),
    Bytes(Vec<u8>),
}

/// Decoded value of the current row for one column
///
/// `None` is SQL NULL.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeSlot {
    Integer(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    RawBytes(Option<Vec<u8>>),
    Opaque(Option<OpaqueValue>),
}

impl DecodeSlot {
    /// An empty (NULL) slot of the given container kind
    pub fn empty(kind: DecodeKind) -> Self {
        match kind {
            DecodeKind::Integer => DecodeSlot::Integer(None),
            DecodeKind::Float => DecodeSlot::Float(None),
            DecodeKind::Text => DecodeSlot::Text(None),
            DecodeKind::RawBytes => DecodeSlot::RawBytes(None),
            DecodeKind::Opaque => DecodeSlot::Opaque(None),
        }
    }

    pub fn kind(&self) -> DecodeKind {
        match self {
            DecodeSlot::Integer(_) => DecodeKind::Integer,
            DecodeSlot::Float(_) => DecodeKind::Float,
            DecodeSlot::Text(_) => DecodeKind::Text,
            DecodeSlot::RawBytes(_) => DecodeKind::RawBytes,
            DecodeSlot::Opaque(_) => DecodeKind::Opaque,
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            DecodeSlot::Integer(v) => v.is_none(),
            DecodeSlot::Float(v) => v.is_none(),
            DecodeSlot::Text(v) => v.is_none(),
            DecodeSlot::RawBytes(v) => v.is_none(),
            DecodeSlot::Opaque(v) => v.is_none(),
        }
    }

    /// Overwrite the slot with `value`
    ///
    /// On error the slot keeps its previous contents.
    pub fn decode(&mut self, value: RawValue<'_>) -> std::result::Result<(), DecodeError> {
        match self {
            DecodeSlot::Integer(slot) => *slot = decode_integer(value)?,
            DecodeSlot::Float(slot) => *slot = decode_float(value)?,
            DecodeSlot::Text(slot) => *slot = decode_text(value)?,
            DecodeSlot::RawBytes(slot) => *slot = decode_bytes(value),
            DecodeSlot::Opaque(slot) => *slot = decode_opaque(value),
        }
        Ok(())
    }
}

/// One empty slot per cursor column
pub fn allocate_slots(columns: &[ColumnType]) -> Vec<DecodeSlot> {
    columns
        .iter()
        .map(|column| DecodeSlot::empty(resolve(column)))
        .collect()
}

/// Decode a full row into `slots`, tagging errors with the column name
pub fn decode_row<'v>(
    slots: &mut [DecodeSlot],
    columns: &[ColumnType],
    mut value_at: impl FnMut(usize) -> Result<RawValue<'v>>,
) -> Result<()> {
    for (index, slot) in slots.iter_mut().enumerate() {
        let value = value_at(index)?;
        if let Err(err) = slot.decode(value) {
            let mut err = DumpError::from(err).with_op("decode_row");
            if let Some(column) = columns.get(index) {
                err = err.with_column(column.name.clone());
            }
            return Err(err);
        }
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> std::result::Result<&str, DecodeError> {
    std::str::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

fn decode_integer(value: RawValue<'_>) -> std::result::Result<Option<i64>, DecodeError> {
    match value {
        RawValue::Null => Ok(None),
        RawValue::Integer(i) => Ok(Some(i)),
        RawValue::Float(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(Some(f as i64))
        }
        RawValue::Text(bytes) | RawValue::Blob(bytes) => {
            let text = utf8(bytes)?;
            text.trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| DecodeError::NotNumeric {
                    value: text.to_string(),
                    target: "integer",
                })
        }
        other => Err(DecodeError::Incompatible {
            found: other.type_name(),
            target: "integer",
        }),
    }
}

fn decode_float(value: RawValue<'_>) -> std::result::Result<Option<f64>, DecodeError> {
    match value {
        RawValue::Null => Ok(None),
        RawValue::Float(f) => Ok(Some(f)),
        RawValue::Integer(i) => Ok(Some(i as f64)),
        RawValue::Text(bytes) => {
            let text = utf8(bytes)?;
            text.trim()
                .parse::<f64>()
                .map(Some)
                .map_err(|_| DecodeError::NotNumeric {
                    value: text.to_string(),
                    target: "float",
                })
        }
        other => Err(DecodeError::Incompatible {
            found: other.type_name(),
            target: "float",
        }),
    }
}

fn decode_text(value: RawValue<'_>) -> std::result::Result<Option<String>, DecodeError> {
    match value {
        RawValue::Null => Ok(None),
        RawValue::Text(bytes) | RawValue::Blob(bytes) => Ok(Some(utf8(bytes)?.to_string())),
        RawValue::Integer(i) => Ok(Some(i.to_string())),
        RawValue::Float(f) => Ok(Some(f.to_string())),
    }
}

fn decode_bytes(value: RawValue<'_>) -> Option<Vec<u8>> {
    match value {
        RawValue::Null => None,
        RawValue::Text(bytes) | RawValue::Blob(bytes) => Some(bytes.to_vec()),
        RawValue::Integer(i) => Some(i.to_string().into_bytes()),
        RawValue::Float(f) => Some(f.to_string().into_bytes()),
    }
}

fn decode_opaque(value: RawValue<'_>) -> Option<OpaqueValue> {
    match value {
        RawValue::Null => None,
        RawValue::Integer(i) => Some(OpaqueValue::Integer(i)),
        RawValue::Float(f) => Some(OpaqueValue::Float(f)),
        RawValue::Text(bytes) => Some(OpaqueValue::Text(bytes.to_vec())),
        RawValue::Blob(bytes) => Some(OpaqueValue::Bytes(bytes.to_vec())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DumpErrorKind;

    fn dynamic(type_name: &str) -> ColumnType {
        ColumnType::new("c", ScanKind::Dynamic, type_name)
    }

    #[test]
    fn test_scan_kind_takes_precedence_over_name() {
        let col = ColumnType::new("c", ScanKind::String, "BLOB");
        assert_eq!(resolve(&col), DecodeKind::Text);
        let col = ColumnType::new("c", ScanKind::Integer, "VARCHAR");
        assert_eq!(resolve(&col), DecodeKind::Integer);
    }

    #[test]
    fn test_name_table() {
        let cases = [
            ("BLOB", DecodeKind::RawBytes),
            ("varbinary(16)", DecodeKind::RawBytes),
            ("LONGTEXT", DecodeKind::Text),
            ("decimal(10,2)", DecodeKind::Text),
            ("JSON", DecodeKind::Text),
            ("DATETIME", DecodeKind::Text),
            ("int unsigned", DecodeKind::Integer),
            ("BIGINT(20)", DecodeKind::Integer),
            ("DOUBLE", DecodeKind::Float),
            ("GEOMETRY", DecodeKind::Opaque),
            ("", DecodeKind::Opaque),
        ];
        for (name, expected) in cases {
            assert_eq!(resolve(&dynamic(name)), expected, "type {}", name);
        }
    }

    #[test]
    fn test_integer_slot_accepts_integral_text() {
        let mut slot = DecodeSlot::empty(DecodeKind::Integer);
        slot.decode(RawValue::Text(b"42")).unwrap();
        assert_eq!(slot, DecodeSlot::Integer(Some(42)));
        slot.decode(RawValue::Null).unwrap();
        assert!(slot.is_null());
    }

    #[test]
    fn test_integer_slot_rejects_non_numeric_text() {
        let mut slot = DecodeSlot::Integer(Some(7));
        let err = slot.decode(RawValue::Text(b"abc")).unwrap_err();
        assert!(matches!(err, DecodeError::NotNumeric { .. }));
        assert_eq!(slot, DecodeSlot::Integer(Some(7)));
    }

    #[test]
    fn test_integer_slot_rejects_fractional_float() {
        let mut slot = DecodeSlot::empty(DecodeKind::Integer);
        assert!(slot.decode(RawValue::Float(1.5)).is_err());
        slot.decode(RawValue::Float(3.0)).unwrap();
        assert_eq!(slot, DecodeSlot::Integer(Some(3)));
    }

    #[test]
    fn test_float_slot_widens_integers() {
        let mut slot = DecodeSlot::empty(DecodeKind::Float);
        slot.decode(RawValue::Integer(2)).unwrap();
        assert_eq!(slot, DecodeSlot::Float(Some(2.0)));
        assert!(slot.decode(RawValue::Blob(b"\x00")).is_err());
    }

    #[test]
    fn test_text_slot_rejects_invalid_utf8() {
        let mut slot = DecodeSlot::empty(DecodeKind::Text);
        let err = slot.decode(RawValue::Blob(&[0xff, 0xfe])).unwrap_err();
        assert_eq!(err, DecodeError::InvalidUtf8);
    }

    #[test]
    fn test_opaque_keeps_native_value() {
        let mut slot = DecodeSlot::empty(DecodeKind::Opaque);
        slot.decode(RawValue::Blob(&[1, 2])).unwrap();
        assert_eq!(slot, DecodeSlot::Opaque(Some(OpaqueValue::Bytes(vec![1, 2]))));
        slot.decode(RawValue::Integer(9)).unwrap();
        assert_eq!(slot, DecodeSlot::Opaque(Some(OpaqueValue::Integer(9))));
        slot.decode(RawValue::Float(1.5)).unwrap();
        assert_eq!(slot, DecodeSlot::Opaque(Some(OpaqueValue::Float(1.5))));
    }

    #[test]
    fn test_opaque_text_keeps_invalid_utf8_as_text() {
        let mut slot = DecodeSlot::empty(DecodeKind::Opaque);
        slot.decode(RawValue::Text(&[0xff, 0x00])).unwrap();
        assert_eq!(
            slot,
            DecodeSlot::Opaque(Some(OpaqueValue::Text(vec![0xff, 0x00])))
        );
    }

    #[test]
    fn test_decode_row_names_failing_column() {
        let columns = vec![
            ColumnType::new("id", ScanKind::Integer, "INT"),
            ColumnType::new("age", ScanKind::Integer, "INT"),
        ];
        let mut slots = allocate_slots(&columns);
        let values = [RawValue::Integer(1), RawValue::Text(b"old")];
        let err = decode_row(&mut slots, &columns, |i| Ok(values[i])).unwrap_err();
        assert_eq!(err.kind(), DumpErrorKind::Scan);
        assert_eq!(err.column(), Some("age"));
    }
}
