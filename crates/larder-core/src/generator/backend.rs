//! The `GenerativeBackend` trait: one text completion per call.
//!
//! Backends know nothing about meal plans. They send a system prompt and a
//! user prompt and hand back raw text; the gateway normalizes, validates,
//! and retries.

use async_trait::async_trait;
use thiserror::Error;

/// HTTP statuses worth retrying: rate limited and temporarily unavailable.
pub const TRANSIENT_STATUSES: [u16; 2] = [429, 503];

/// A failed completion call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{backend}: {message}")]
pub struct BackendError {
    pub backend: String,
    /// Upstream HTTP status, when the failure came with one.
    pub status: Option<u16>,
    pub message: String,
}

impl BackendError {
    pub fn http(backend: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            status: Some(status),
            message: format!("upstream error {status}: {}", body.into()),
        }
    }

    pub fn other(backend: &str, message: impl Into<String>) -> Self {
        Self {
            backend: backend.to_string(),
            status: None,
            message: message.into(),
        }
    }

    /// Whether a later attempt might succeed.
    pub fn is_transient(&self) -> bool {
        self.status.is_some_and(|s| TRANSIENT_STATUSES.contains(&s))
    }
}

/// Adapter interface for a text-generation service.
///
/// Object-safe so the gateway can hold `Arc<dyn GenerativeBackend>`.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Short identifier used in logs and errors (e.g. "gemini").
    fn name(&self) -> &str;

    /// Model identifier the backend sends upstream.
    fn model(&self) -> &str;

    /// Request one completion and return its raw text.
    async fn complete(&self, system_prompt: &str, user_prompt: &str)
    -> Result<String, BackendError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn GenerativeBackend) {}
};

/// Map a reqwest failure to a [`BackendError`], keeping its status if any.
pub(crate) fn transport_error(backend: &str, err: reqwest::Error) -> BackendError {
    BackendError {
        backend: backend.to_string(),
        status: err.status().map(|s| s.as_u16()),
        message: format!("request failed: {err}"),
    }
}

/// Turn a non-success response into a [`BackendError`] carrying its body.
pub(crate) async fn error_from_response(backend: &str, response: reqwest::Response) -> BackendError {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "failed to read error body".to_string());
    BackendError::http(backend, status, body)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoBackend;

    #[async_trait]
    impl GenerativeBackend for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        fn model(&self) -> &str {
            "echo-1"
        }

        async fn complete(&self, _system: &str, user: &str) -> Result<String, BackendError> {
            Ok(user.to_string())
        }
    }

    #[tokio::test]
    async fn trait_is_usable_as_dyn() {
        let backend: Box<dyn GenerativeBackend> = Box::new(EchoBackend);
        assert_eq!(backend.name(), "echo");
        assert_eq!(backend.complete("sys", "hi").await.unwrap(), "hi");
    }

    #[test]
    fn transient_classification() {
        assert!(BackendError::http("gemini", 429, "slow down").is_transient());
        assert!(BackendError::http("gemini", 503, "overloaded").is_transient());
        assert!(!BackendError::http("gemini", 500, "boom").is_transient());
        assert!(!BackendError::http("openai", 401, "bad key").is_transient());
        assert!(!BackendError::other("openai", "timeout").is_transient());
    }

    #[test]
    fn http_error_message_includes_status_and_body() {
        let err = BackendError::http("openai", 400, "bad request");
        assert_eq!(err.to_string(), "openai: upstream error 400: bad request");
    }
}
