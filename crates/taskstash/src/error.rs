//! Error types for the record catalog.
//!
//! This module defines the central `Error` enum returned by every public
//! operation of the crate. Store failures are wrapped rather than flattened so
//! callers can always tell a failed backend round-trip apart from a successful
//! round-trip that found nothing.
//!
//! ## Error Cases
//! - `StoreUnavailable`: The backend call failed (I/O, throttling, fault).
//! - `NotFound`: The store was reached but holds no record for the id.
//! - `Validation`: A create payload was rejected.
//! - `Parse`: A caller-supplied identifier could not be decoded.
//! - `Timeout`: A caller gave up waiting for its fetch reply.
//! - `ChannelError`: Internal communication between callers and workers broke.
//! - `ServiceShutdown`: A fetch arrived after shutdown started.

use crate::{record::RecordId, store::StoreError};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the record catalog.
#[derive(Clone, thiserror::Error, Debug)]
pub enum Error {
    /// The persistent store could not complete the call.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    /// The store answered, and no record exists for `id`.
    #[error("Record {id} not found")]
    NotFound { id: RecordId },

    /// The create payload was malformed.
    #[error("Invalid request: {reason}")]
    Validation { reason: String },

    /// `input` could not be interpreted as the expected form.
    #[error("Cannot parse `{input}`: {reason}")]
    Parse { input: String, reason: String },

    /// The caller's wait for a fetch reply exceeded the configured limit.
    #[error("Timed out waiting for record {id}")]
    Timeout { id: RecordId },

    /// Internal channel send/receive failure (e.g., closed queue or dropped
    /// reply slot).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// The worker pool no longer accepts fetch requests.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    /// Returns `true` when the failure was caused by the caller's input rather
    /// than by the backend or the service itself.
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::Validation { .. } | Self::Parse { .. }
        )
    }
}
