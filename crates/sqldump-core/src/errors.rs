use thiserror::Error;

/// Result type alias using DumpError
pub type Result<T> = std::result::Result<T, DumpError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every failure a dump can surface maps onto one of these kinds. Each kind
/// has a stable error code used by the CLI, the logging macros and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpErrorKind {
    /// The snapshot transaction could not be opened, or the database could not be selected
    Connection,
    /// A catalog, metadata or row query failed inside an open snapshot
    Query,
    /// Introspection returned a different object than the one requested
    SchemaMismatch,
    /// Column/type introspection is missing required fields
    MalformedMetadata,
    /// A row value could not be decoded into its column's container
    Scan,
    /// Writing a template section or statement to the output failed
    Render,
    /// An operation was called in the wrong lifecycle state
    InvalidState,
    /// Caller supplied configuration is unusable
    InvalidInput,
    /// The statement consumer stopped before the row producer finished
    Cancelled,
    /// The row producer thread panicked or ended without reporting a result
    Internal,
}

impl DumpErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            DumpErrorKind::Connection => "ERR_CONNECTION",
            DumpErrorKind::Query => "ERR_QUERY",
            DumpErrorKind::SchemaMismatch => "ERR_SCHEMA_MISMATCH",
            DumpErrorKind::MalformedMetadata => "ERR_MALFORMED_METADATA",
            DumpErrorKind::Scan => "ERR_SCAN",
            DumpErrorKind::Render => "ERR_RENDER",
            DumpErrorKind::InvalidState => "ERR_INVALID_STATE",
            DumpErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            DumpErrorKind::Cancelled => "ERR_CANCELLED",
            DumpErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context
/// (operation, schema object, column) needed to debug a failed dump.
#[derive(Debug, Clone)]
pub struct DumpError {
    kind: DumpErrorKind,
    op: Option<String>,
    object: Option<String>,
    column: Option<String>,
    message: String,
}

impl DumpError {
    /// Create a new error with the specified kind
    pub fn new(kind: DumpErrorKind) -> Self {
        Self {
            kind,
            op: None,
            object: None,
            column: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add schema object context
    pub fn with_object(mut self, object: impl Into<String>) -> Self {
        self.object = Some(object.into());
        self
    }

    /// Add column context
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> DumpErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the schema object context, if any
    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// Get the column context, if any
    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for DumpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(object) = &self.object {
            write!(f, " (object: {})", object)?;
        }
        if let Some(column) = &self.column {
            write!(f, " (column: {})", column)?;
        }
        Ok(())
    }
}

impl std::error::Error for DumpError {}

// ========== End Error Facility ==========

/// Low-level failures while decoding one raw value into a decode container
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    #[error("cannot convert {found} value to {target}")]
    Incompatible {
        found: &'static str,
        target: &'static str,
    },

    #[error("text value {value:?} is not a valid {target}")]
    NotNumeric { value: String, target: &'static str },

    #[error("value is not valid UTF-8")]
    InvalidUtf8,
}

impl From<DecodeError> for DumpError {
    fn from(err: DecodeError) -> Self {
        DumpError::new(DumpErrorKind::Scan).with_message(err.to_string())
    }
}

/// Create a write/render error from an IO failure
pub fn render_error(op: &str, err: std::io::Error) -> DumpError {
    DumpError::new(DumpErrorKind::Render)
        .with_op(op.to_string())
        .with_message(err.to_string())
}

/// Create a malformed metadata error
pub fn malformed_metadata(op: &str, object: &str, reason: &str) -> DumpError {
    DumpError::new(DumpErrorKind::MalformedMetadata)
        .with_op(op.to_string())
        .with_object(object.to_string())
        .with_message(reason.to_string())
}

/// Create an invalid lifecycle state error
pub fn invalid_state(op: &str, reason: &str) -> DumpError {
    DumpError::new(DumpErrorKind::InvalidState)
        .with_op(op.to_string())
        .with_message(reason.to_string())
}
