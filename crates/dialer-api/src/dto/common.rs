//! Response envelope shared by the queue, campaign and account endpoints

use serde::Serialize;

/// Envelope for single-resource responses
///
/// The allocation endpoint answers with its own shape and is not wrapped.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub data: T,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            data,
            message: None,
        }
    }

    /// Success with a human-readable note, used for writes
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            data,
            message: Some(message.into()),
        }
    }
}
