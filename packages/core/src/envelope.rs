//! The `{"data": ...}` wrapper used by success responses.

use serde::{Deserialize, Serialize};

/// Wraps a payload as `{"data": payload}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Envelope<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn wrap(data: T) -> Self {
        Self { data }
    }

    pub fn into_data(self) -> T {
        self.data
    }
}

impl<T> From<T> for Envelope<T> {
    fn from(data: T) -> Self {
        Self::wrap(data)
    }
}
