// File: src/error.rs
// Purpose: Closed error taxonomy for navigation failures

use thiserror::Error;

use crate::request::RawResponse;

/// Everything that can go wrong between deciding to visit and applying the
/// response. All four kinds are caught inside the response handler and mapped
/// to hook invocations; they never surface as a rejected visit future.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// A `before` hook vetoed the visit; the request was never sent.
    #[error("navigation cancelled by a before hook")]
    Cancelled,

    /// The request was aborted, either by a newer visit superseding it or by
    /// explicit caller cancellation.
    #[error("request aborted")]
    Aborted,

    /// The response lacked the protocol marker header. Carries the raw
    /// response for diagnostics (the server may have returned stock HTML).
    #[error("response from {} is not a hybrid response", .0.url)]
    NotHybrid(Box<RawResponse>),

    /// Network failure, JSON parse failure, adapter failure, anything else.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Discriminant-only view of [`NavigationError`], used by hook payloads and
/// by callers inspecting a failed visit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Cancelled,
    Aborted,
    NotHybrid,
    Other,
}

impl NavigationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            NavigationError::Cancelled => ErrorKind::Cancelled,
            NavigationError::Aborted => ErrorKind::Aborted,
            NavigationError::NotHybrid(_) => ErrorKind::NotHybrid,
            NavigationError::Other(_) => ErrorKind::Other,
        }
    }

    /// The raw response attached to a protocol-invalid failure, if any.
    pub fn response(&self) -> Option<&RawResponse> {
        match self {
            NavigationError::NotHybrid(response) => Some(response),
            _ => None,
        }
    }
}
