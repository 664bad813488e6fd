//! Error types for hx-dispatch.

use http::StatusCode;
use thiserror::Error;

use crate::codec::ObjectRef;

/// Main error type for all dispatch operations.
///
/// Variants fall into three classes with different surfacing rules:
/// configuration errors (a deployment mistake, surfaced as a server
/// error), the not-found class (surfaced uniformly as 404, see
/// [`HxError::is_not_found`]), and pass-through failures from handler
/// logic or the host's renderer.
#[derive(Debug, Error)]
pub enum HxError {
    /// Two handler declarations share the same name.
    #[error("duplicate handler name: {0}")]
    DuplicateHandler(String),

    /// Malformed or missing configuration (allow-spec shape, template
    /// settings, message tags).
    #[error("configuration error: {0}")]
    Config(String),

    /// Fragment request without the required handler-name parameter.
    #[error("missing required query param `hx_request_name`")]
    MissingHandlerParam,

    /// No handler registered under the requested name.
    #[error("no handler named `{0}`")]
    UnknownHandler(String),

    /// The policy engine denied the handler for this view.
    #[error("handler `{0}` is not allowed here")]
    NotAllowed(String),

    /// An encoded object reference points at a record that no longer
    /// exists.
    #[error("referenced object not found: {0}")]
    ObjectNotFound(ObjectRef),

    /// A query parameter produced by the codec could not be decoded.
    #[error("malformed parameter `{key}`: {reason}")]
    MalformedParam {
        /// Query key that failed to decode.
        key: String,
        /// What was wrong with it.
        reason: String,
    },

    /// JSON serialization error while encoding parameters.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template rendering failed in the host's renderer.
    #[error("render error: {0}")]
    Render(String),

    /// I/O error (registry scanning only; the dispatch path does no I/O).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Handler-logic failure, propagated unmodified through dispatch.
    #[error(transparent)]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl HxError {
    /// True for the not-found class: missing name parameter, unknown
    /// handler, authorization denial, dangling object reference,
    /// malformed fragment parameter.
    ///
    /// These are deliberately indistinguishable to the caller so that
    /// an unauthorized handler cannot be told apart from one that does
    /// not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::MissingHandlerParam
                | Self::UnknownHandler(_)
                | Self::NotAllowed(_)
                | Self::ObjectNotFound(_)
                | Self::MalformedParam { .. }
        )
    }

    /// HTTP status for this error: 404 for the not-found class, 500
    /// for everything else.
    pub fn status(&self) -> StatusCode {
        if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }

    /// Wrap a handler-logic error for propagation through dispatch.
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(Box::new(err))
    }
}

/// Result type alias using HxError.
pub type Result<T> = std::result::Result<T, HxError>;
