//! The uniform operation-result envelope (§3, §4.3, §4.4).

use serde::{Deserialize, Serialize};

/// Controls what a write operation echoes back on success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReturnBehavior {
    /// Do not return item data (the default).
    #[default]
    DoNotReturn,
    /// Return the item as it was before the write.
    ReturnOldValues,
    /// Return the item as it is after the write.
    ReturnNewValues,
}

/// Uniform return envelope for every `DatabaseService` operation.
///
/// `success = false` with `status_code = 412` always denotes a condition
/// failure; `404` always denotes a missing item or table; `409` always
/// denotes a precondition violation on an overwrite guard or a CAS
/// write-conflict. A failed conditional operation never carries `data`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationResult<T> {
    pub success: bool,
    pub status_code: u16,
    pub error_message: String,
    pub data: Option<T>,
}

impl<T> OperationResult<T> {
    #[must_use]
    pub fn ok(data: Option<T>) -> Self {
        Self {
            success: true,
            status_code: 200,
            error_message: String::new(),
            data,
        }
    }

    #[must_use]
    pub fn failure(status_code: u16, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            status_code,
            error_message: error_message.into(),
            data: None,
        }
    }

    #[must_use]
    pub fn condition_failed(error_message: impl Into<String>) -> Self {
        Self::failure(412, error_message)
    }

    #[must_use]
    pub fn not_found(error_message: impl Into<String>) -> Self {
        Self::failure(404, error_message)
    }

    #[must_use]
    pub fn conflict(error_message: impl Into<String>) -> Self {
        Self::failure(409, error_message)
    }

    #[must_use]
    pub fn internal(error_message: impl Into<String>) -> Self {
        Self::failure(500, error_message)
    }

    /// Remaps the payload, preserving success/status/error fields.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> OperationResult<U> {
        OperationResult {
            success: self.success,
            status_code: self.status_code,
            error_message: self.error_message,
            data: self.data.map(f),
        }
    }
}
