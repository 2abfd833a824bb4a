// ── Core error types ──
//
// User-facing errors from galleria-core. Consumers never see reqwest
// errors or raw response bodies; the `From<galleria_api::Error>` impl
// translates transport-layer failures into domain variants, and
// `CoreError::detail()` yields the single string the UI surfaces.

use thiserror::Error;

use crate::model::EntityKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Server / transport ───────────────────────────────────────────
    /// Any HTTP failure, normalized to the server's `detail` message.
    #[error("{message}")]
    Api {
        message: String,
        status: Option<u16>,
    },

    // ── Conversion ───────────────────────────────────────────────────
    /// A wire or client value didn't fit the field's conversion contract.
    #[error("Cannot convert value for field `{field}`: {message}")]
    Conversion { field: String, message: String },

    /// Attempted to write a linked-object list back to the server.
    /// These relationships are always owned by the "many" side.
    #[error("Field `{field}` cannot be written back to the server")]
    UnwritableField { field: &'static str },

    // ── Operations ───────────────────────────────────────────────────
    #[error("Operation not supported: {operation} on {entity}")]
    Unsupported {
        operation: &'static str,
        entity: EntityKind,
    },

    /// The model was created outside a service and can't reach one.
    #[error("Model has no owning service")]
    Detached,

    #[error("{entity} instance has no primary key")]
    MissingPrimaryKey { entity: EntityKind },

    #[error("No service registered for entity kind {kind}")]
    UnknownEntity { kind: EntityKind },

    // ── Internal ─────────────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// The single user-facing message for this failure, suitable for a
    /// notification toast.
    pub fn detail(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<galleria_api::Error> for CoreError {
    fn from(err: galleria_api::Error) -> Self {
        match err {
            galleria_api::Error::Api { message, status } => CoreError::Api {
                message,
                status: Some(status),
            },
            galleria_api::Error::Transport(ref e) => CoreError::Api {
                message: e.to_string(),
                status: e.status().map(|s| s.as_u16()),
            },
            galleria_api::Error::InvalidUrl(e) => {
                CoreError::Internal(format!("Invalid URL: {e}"))
            }
            galleria_api::Error::Tls(msg) => CoreError::Internal(format!("TLS error: {msg}")),
            galleria_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
