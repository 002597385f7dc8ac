//! Error taxonomy for catalog operations.
//!
//! Local pure operations (filter, sort, reorder) never fail. Everything that
//! touches the backend returns a [`CatalogError`] carrying the attempted
//! operation and entity id so callers can decide whether to retry.

use std::fmt;

/// Failure reported by a [`crate::api::Transport`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("cannot reach backend at {0}")]
    Connect(String),
    #[error("request to {0} timed out")]
    Timeout(String),
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("invalid response body: {0}")]
    Body(String),
    #[error("request failed: {0}")]
    Request(String),
}

impl TransportError {
    /// Whether the failure happened before the backend answered.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Connect(_) | Self::Timeout(_))
    }
}

/// The write being attempted when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Load,
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Category,
    Subcategory,
    MenuItem,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Category => "category",
            Self::Subcategory => "subcategory",
            Self::MenuItem => "menu item",
        })
    }
}

fn id_suffix(id: &Option<String>) -> String {
    id.as_deref().map(|id| format!(" {id}")).unwrap_or_default()
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Rejected before anything was sent.
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    #[error("failed to {operation} {entity}{}: {source}", id_suffix(.id))]
    Transport {
        operation: Operation,
        entity: EntityKind,
        id: Option<String>,
        #[source]
        source: TransportError,
    },

    /// The backend answered but the response lacks a field needed to build
    /// a canonical entity.
    #[error("{operation} {entity}{} response is missing `{field}`", id_suffix(.id))]
    Reconciliation {
        operation: Operation,
        entity: EntityKind,
        id: Option<String>,
        field: &'static str,
    },

    #[error("unknown {entity} {id}")]
    UnknownEntity { entity: EntityKind, id: String },
}

impl CatalogError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// True for transport failures and for unusable server responses.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Reconciliation { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// The underlying transport failure, if any.
    pub fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;
