//! Error bodies and the client-side error taxonomy.
//!
//! Every non-2xx response carries an [`ErrorMessage`], or an
//! [`IndexedErrorMessage`] when a batch submission partially failed.
//! [`ApiError`] is what a caller sees after a decode: the body (when one was
//! readable) plus the class derived from the HTTP status code.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Wire bodies
// ---------------------------------------------------------------------------

/// The body of an error response.
///
/// ```json
/// { "code": 400, "message": "invalid block id", "stacktraces": [] }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Either a specific error code or the HTTP status code. Not bounded by
    /// the HTTP status range.
    pub code: u64,

    pub message: String,

    /// Optional stacktraces, sent when the node is in debug mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stacktraces: Option<Vec<String>>,
}

impl ErrorMessage {
    pub fn new(code: u64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            stacktraces: None,
        }
    }
}

impl fmt::Display for ErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error({}): {}", self.code, self.message)?;
        for line in self.stacktraces.iter().flatten() {
            write!(f, "\n  {line}")?;
        }
        Ok(())
    }
}

/// One failed element of a batch submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedErrorItem {
    /// Position of the failed element in the submitted list.
    pub index: usize,
    pub message: String,
}

/// An [`ErrorMessage`] with per-element failures.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedErrorMessage {
    #[serde(flatten)]
    pub error: ErrorMessage,
    pub failures: Vec<IndexedErrorItem>,
}

impl fmt::Display for IndexedErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        for item in &self.failures {
            write!(f, "\n  [{}] {}", item.index, item.message)?;
        }
        Ok(())
    }
}

/// Either shape of error body. Indexed bodies are tried first since a plain
/// message is a prefix of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ErrorBody {
    Indexed(IndexedErrorMessage),
    Plain(ErrorMessage),
}

impl ErrorBody {
    pub fn message(&self) -> &ErrorMessage {
        match self {
            ErrorBody::Indexed(indexed) => &indexed.error,
            ErrorBody::Plain(plain) => plain,
        }
    }

    pub fn indexed_errors(&self) -> Option<&[IndexedErrorItem]> {
        match self {
            ErrorBody::Indexed(indexed) => Some(&indexed.failures),
            ErrorBody::Plain(_) => None,
        }
    }
}

impl fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorBody::Indexed(indexed) => fmt::Display::fmt(indexed, f),
            ErrorBody::Plain(plain) => fmt::Display::fmt(plain, f),
        }
    }
}

impl From<ErrorMessage> for ErrorBody {
    fn from(msg: ErrorMessage) -> Self {
        ErrorBody::Plain(msg)
    }
}

impl From<IndexedErrorMessage> for ErrorBody {
    fn from(msg: IndexedErrorMessage) -> Self {
        ErrorBody::Indexed(msg)
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The class of an HTTP status code. Every `u16` maps to exactly one class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusClass {
    Unexpected,
    Success,
    InvalidRequest,
    CurrentlySyncing,
    Internal,
    Unclassified,
}

impl StatusClass {
    pub fn of(code: u16) -> Self {
        match code {
            0..=199 => StatusClass::Unexpected,
            200..=299 => StatusClass::Success,
            300..=499 => StatusClass::InvalidRequest,
            503 => StatusClass::CurrentlySyncing,
            500..=599 => StatusClass::Internal,
            _ => StatusClass::Unclassified,
        }
    }
}

// ---------------------------------------------------------------------------
// ApiError
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request could not be built or sent. No status code was observed.
    #[error("client usage error: {0}")]
    ClientUsage(String),

    #[error("failed to encode body: {0}")]
    Encoding(String),

    #[error("failed to decode body: {0}")]
    Decode(String),

    #[error("no contents were available to decode")]
    NoContent,

    #[error("unexpected response status code: {0}")]
    UnexpectedStatus(u16),

    /// A non-2xx response whose body was not a valid error body.
    #[error("failed to decode error response with status code {code}: {reason}")]
    MalformedErrorBody { code: u16, reason: String },

    #[error("invalid request ({status}): {body}")]
    InvalidRequest { status: u16, body: ErrorBody },

    #[error("beacon node is syncing ({status}): {body}")]
    CurrentlySyncing { status: u16, body: ErrorBody },

    #[error("beacon node internal error ({status}): {body}")]
    Internal { status: u16, body: ErrorBody },

    #[error("unclassified error response ({status}): {body}")]
    Unclassified { status: u16, body: ErrorBody },

    #[error("request body was already consumed")]
    BodyConsumed,

    #[error("missing required param: {0}")]
    MissingParam(String),
}

impl ApiError {
    /// Classify a decoded error body by the status code it arrived with.
    pub fn from_error_body(status: u16, body: ErrorBody) -> Self {
        match StatusClass::of(status) {
            StatusClass::InvalidRequest => ApiError::InvalidRequest { status, body },
            StatusClass::CurrentlySyncing => ApiError::CurrentlySyncing { status, body },
            StatusClass::Internal => ApiError::Internal { status, body },
            StatusClass::Unexpected | StatusClass::Success | StatusClass::Unclassified => {
                ApiError::Unclassified { status, body }
            }
        }
    }

    /// The HTTP status code observed on the wire, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::UnexpectedStatus(code) | ApiError::MalformedErrorBody { code, .. } => {
                Some(*code)
            }
            ApiError::InvalidRequest { status, .. }
            | ApiError::CurrentlySyncing { status, .. }
            | ApiError::Internal { status, .. }
            | ApiError::Unclassified { status, .. } => Some(*status),
            ApiError::ClientUsage(_)
            | ApiError::Encoding(_)
            | ApiError::Decode(_)
            | ApiError::NoContent
            | ApiError::BodyConsumed
            | ApiError::MissingParam(_) => None,
        }
    }

    pub fn is_syncing(&self) -> bool {
        matches!(self, ApiError::CurrentlySyncing { .. })
    }

    pub fn error_body(&self) -> Option<&ErrorBody> {
        match self {
            ApiError::InvalidRequest { body, .. }
            | ApiError::CurrentlySyncing { body, .. }
            | ApiError::Internal { body, .. }
            | ApiError::Unclassified { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Per-element failures of a rejected batch submission.
    pub fn indexed_errors(&self) -> Option<&[IndexedErrorItem]> {
        self.error_body().and_then(ErrorBody::indexed_errors)
    }
}
