//! Canonical logging macros
//!
//! Every operation logs one start event and exactly one end event: `end`
//! with its duration, or `end_error` with the error's kind and code. All of
//! them carry `component = "sqldump"` and the operation name in `op`; extra
//! `key = value` fields go after the fixed ones.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use sqldump_core::log_op_start;
/// log_op_start!("dump");
/// log_op_start!("dump", database = "main");
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = sqldump_core_types::schema::COMPONENT,
            op = $op,
            event = sqldump_core_types::schema::EVENT_START,
            $($($field)*)?
        )
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use sqldump_core::log_op_end;
/// log_op_end!("dump", duration_ms = 42);
/// log_op_end!("dump", duration_ms = 42, row_count = 7);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = sqldump_core_types::schema::COMPONENT,
            op = $op,
            event = sqldump_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($($field)*)?
        )
    };
}

/// Log the failed end of an operation
///
/// Takes a reference to a [`DumpError`](crate::errors::DumpError). The
/// object the error names, if any, goes into `err_object`.
///
/// # Example
///
/// ```
/// # use sqldump_core::log_op_error;
/// # use sqldump_core::errors::{DumpError, DumpErrorKind};
/// let err = DumpError::new(DumpErrorKind::Scan).with_object("users");
/// log_op_error!("dump", &err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr $(, $($field:tt)*)?) => {{
        let dump_err: &$crate::errors::DumpError = $err;
        tracing::error!(
            component = sqldump_core_types::schema::COMPONENT,
            op = $op,
            event = sqldump_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err_kind = ?dump_err.kind(),
            err_code = dump_err.code(),
            err_object = dump_err.object().unwrap_or_default(),
            $($($field)*)?
        );
    }};
}
