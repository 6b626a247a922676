//! Why and how a snapshot stops being served
//!
//! A snapshot is never partially refreshed. It is dropped as a whole when:
//! - the process that owns it writes to the table (write notification),
//! - a scheduled signature check sees a different signature,
//! - a scheduled signature check fails and the policy says to fail closed.

use crate::source::Signature;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason for cache invalidation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationReason {
    /// The owning process reported a write to the table
    WriteNotification,

    /// Another process changed the table since the snapshot was built
    SignatureChanged,

    /// The signature could not be fetched under `SignatureFailurePolicy::Discard`
    SignatureUnavailable,
}

impl fmt::Display for InvalidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidationReason::WriteNotification => write!(f, "write notification"),
            InvalidationReason::SignatureChanged => write!(f, "signature changed"),
            InvalidationReason::SignatureUnavailable => write!(f, "signature unavailable"),
        }
    }
}

/// Behaviour when the signature source fails during a scheduled re-check
///
/// The error reaches the caller either way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureFailurePolicy {
    /// Keep serving the current snapshot; the next access retries the check
    #[default]
    Retain,

    /// Drop the snapshot; the next access reloads from scratch
    Discard,
}

/// Record of one invalidation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidationEvent {
    /// Reason for invalidation
    pub reason: InvalidationReason,

    /// When the invalidation occurred
    pub timestamp: DateTime<Utc>,

    /// Signature of the snapshot that was dropped, if one was loaded
    pub signature: Option<Signature>,

    /// Additional context
    pub context: Option<String>,
}

impl InvalidationEvent {
    pub fn new(reason: InvalidationReason, signature: Option<Signature>) -> Self {
        Self {
            reason,
            timestamp: Utc::now(),
            signature,
            context: None,
        }
    }

    /// Add context to the event
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}
