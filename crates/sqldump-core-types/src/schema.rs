//! Canonical schema constants for structured logging and events
//!
//! These constants ensure consistency across all logging and error reporting.

/// Value of the `component` field on every canonical event
pub const COMPONENT: &str = "sqldump";

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_DUMP_ID: &str = "dump_id";

// Dump entities
pub const FIELD_OBJECT: &str = "object";
pub const FIELD_OBJECT_KIND: &str = "object_kind";
pub const FIELD_DATABASE: &str = "database";

// Counters
pub const FIELD_OBJECT_COUNT: &str = "object_count";
pub const FIELD_ROW_COUNT: &str = "row_count";
pub const FIELD_STATEMENT_COUNT: &str = "statement_count";

// Error fields
pub const FIELD_ERR_KIND: &str = "err_kind";
pub const FIELD_ERR_CODE: &str = "err_code";
pub const FIELD_ERR_OBJECT: &str = "err_object";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
