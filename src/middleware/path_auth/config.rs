/*
 * Responsibility
 * - Gate configuration: which path param to read, how to validate it,
 *   when to skip, how to render a rejection
 * - Construction-time checks live in PathAuth::with_config (core.rs)
 */
use std::fmt;
use std::sync::Arc;

use axum::{http::request::Parts, response::Response};
use thiserror::Error;
use tower::BoxError;

use super::types::PathAuthRejection;

/// Decides whether the value of the configured path param is an authorized
/// credential.
///
/// `Ok(false)` and `Err(_)` both reject the request with 401; the error is only
/// kept as the rejection's internal cause.
pub trait PathAuthValidator: Send + Sync + 'static {
    fn validate(&self, value: &str, parts: &Parts) -> Result<bool, BoxError>;
}

impl<F, E> PathAuthValidator for F
where
    F: Fn(&str, &Parts) -> Result<bool, E> + Send + Sync + 'static,
    E: Into<BoxError>,
{
    fn validate(&self, value: &str, parts: &Parts) -> Result<bool, BoxError> {
        self(value, parts).map_err(Into::into)
    }
}

pub type Skipper = Arc<dyn Fn(&Parts) -> bool + Send + Sync>;

pub type ErrorHandler = Arc<dyn Fn(PathAuthRejection, &Parts) -> Response + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathAuthConfigError {
    #[error("path auth: requires a validator function")]
    MissingValidator,
    #[error("path auth: requires a param")]
    EmptyParam,
}

/// Settings for [`PathAuth`](super::PathAuth).
///
/// `Default` yields an empty config every time; fill it with the builder
/// methods or the public fields.
#[derive(Clone, Default)]
pub struct PathAuthConfig {
    /// Name of the path param holding the credential. Required.
    pub param: String,
    /// Required.
    pub validator: Option<Arc<dyn PathAuthValidator>>,
    /// Returns `true` for requests that bypass the gate.
    pub skipper: Option<Skipper>,
    /// Renders rejections. Falls back to the JSON error body.
    pub error_handler: Option<ErrorHandler>,
}

impl PathAuthConfig {
    pub fn new(param: impl Into<String>) -> Self {
        Self {
            param: param.into(),
            ..Self::default()
        }
    }

    pub fn param(mut self, param: impl Into<String>) -> Self {
        self.param = param.into();
        self
    }

    pub fn validator<V: PathAuthValidator>(mut self, validator: V) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn skipper<F>(mut self, skipper: F) -> Self
    where
        F: Fn(&Parts) -> bool + Send + Sync + 'static,
    {
        self.skipper = Some(Arc::new(skipper));
        self
    }

    pub fn error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(PathAuthRejection, &Parts) -> Response + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

impl fmt::Debug for PathAuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathAuthConfig")
            .field("param", &self.param)
            .field("validator", &self.validator.is_some())
            .field("skipper", &self.skipper.is_some())
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}
