//! Error codes crossing the C ABI and the Rust-side error type behind them.

/// Category of a failure reported through `ExternError.code`.
///
/// Discriminants are part of the C contract (`ErrorCode` in `ffi_toolkit.h`)
/// and must never be reordered or reused.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// Any failure that is not an authentication failure.
    Other = 0,
    /// Authentication or authorization was rejected.
    AuthenticationError = 1,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Other => "other",
            ErrorCode::AuthenticationError => "authentication_error",
        }
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = ToolkitError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(ErrorCode::Other),
            1 => Ok(ErrorCode::AuthenticationError),
            other => Err(ToolkitError::ContractViolation(format!(
                "unknown error code {other}"
            ))),
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status codes returned by the `ffi_toolkit_*` entry points that return `i32`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiStatus {
    /// Success.
    Ok = 0,
    /// A required argument was not valid UTF-8 or not valid JSON.
    InvalidArgument = 2,
}

/// Errors produced and consumed on the Rust side of the boundary.
#[derive(Debug, thiserror::Error)]
pub enum ToolkitError {
    #[error("authentication failed: {0}")]
    Authentication(String),
    #[error("{0}")]
    Other(String),
    #[error("unexpected null pointer: {0}")]
    NullPointer(&'static str),
    #[error("string is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
    #[error("boundary contract violated: {0}")]
    ContractViolation(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ToolkitError {
    /// The code this error is reported under once it crosses the boundary.
    pub fn code(&self) -> ErrorCode {
        match self {
            ToolkitError::Authentication(_) => ErrorCode::AuthenticationError,
            _ => ErrorCode::Other,
        }
    }

    /// Rebuild an error from a descriptor read on the consumer side.
    pub fn from_code(code: ErrorCode, message: impl Into<String>) -> Self {
        match code {
            ErrorCode::AuthenticationError => ToolkitError::Authentication(message.into()),
            ErrorCode::Other => ToolkitError::Other(message.into()),
        }
    }

    /// Message placed in `ExternError.message`. Authentication errors carry
    /// only their detail so the consumer can show it as-is.
    pub fn boundary_message(&self) -> String {
        match self {
            ToolkitError::Authentication(msg) | ToolkitError::Other(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl From<anyhow::Error> for ToolkitError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ToolkitError>() {
            Ok(inner) => inner,
            Err(err) => ToolkitError::Other(format!("{err:#}")),
        }
    }
}
