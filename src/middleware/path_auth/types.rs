/*
 * Responsibility
 * - Types shared by the gate and its callers: matched path params,
 *   per-request outcome, and the structured HTTP rejection
 * - No decision logic here (see core.rs)
 */
use std::error::Error;
use std::fmt;
use std::sync::Arc;

use axum::{
    Json,
    extract::{FromRequestParts, MatchedPath, OriginalUri, RawPathParams},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};

use percent_encoding::percent_decode_str;

use crate::error::{ErrorBody, ErrorResponse};

/// Internal cause attached to a rejection. Shared so rejections stay `Clone`.
pub type Cause = Arc<dyn Error + Send + Sync>;

/// Path parameters the router matched for the current request, in route order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchedParams(Vec<(String, String)>);

impl MatchedParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    /// Reads the params axum stored on the request while routing.
    ///
    /// axum refuses the whole set when any value is not valid UTF-8; the names
    /// are then recovered from the matched route and undecodable values become
    /// empty strings. A request that never went through a router yields an
    /// empty set.
    pub async fn extract(parts: &mut Parts) -> Self {
        match RawPathParams::from_request_parts(parts, &()).await {
            Ok(raw) => raw.iter().collect(),
            Err(_) => Self::from_matched_path(parts),
        }
    }

    fn from_matched_path(parts: &Parts) -> Self {
        let Some(matched) = parts.extensions.get::<MatchedPath>() else {
            return Self::default();
        };
        // MatchedPath is the full template even inside nested routers.
        let path = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(parts.uri.path(), |uri| uri.0.path());

        let mut params = Self::default();
        let mut segments = path.split('/');
        for template in matched.as_str().split('/') {
            let segment = segments.next();
            if let Some(name) = template.strip_prefix("{*").and_then(|t| t.strip_suffix('}')) {
                let rest = segment
                    .into_iter()
                    .chain(segments.by_ref())
                    .collect::<Vec<_>>()
                    .join("/");
                params.0.push((name.to_string(), decode_segment(&rest)));
                break;
            }
            if let Some(name) = template.strip_prefix('{').and_then(|t| t.strip_suffix('}')) {
                params
                    .0
                    .push((name.to_string(), decode_segment(segment.unwrap_or_default())));
            }
        }
        params
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names().any(|n| n == name)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn decode_segment(raw: &str) -> String {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|value| value.into_owned())
        .unwrap_or_default()
}

impl<K, V> FromIterator<(K, V)> for MatchedParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Result of one gate evaluation. Never cached.
#[derive(Debug, Clone)]
pub enum AuthorizationOutcome {
    Proceed,
    MissingParameter,
    Rejected,
    ValidatorError(Cause),
}

impl AuthorizationOutcome {
    pub fn is_proceed(&self) -> bool {
        matches!(self, Self::Proceed)
    }

    /// `None` when the request may continue down the chain.
    pub fn into_rejection(self) -> Option<PathAuthRejection> {
        match self {
            Self::Proceed => None,
            Self::MissingParameter => Some(PathAuthRejection::MissingParameter(MissingKeyError)),
            Self::Rejected => Some(PathAuthRejection::Unauthorized { cause: None }),
            Self::ValidatorError(cause) => Some(PathAuthRejection::Unauthorized {
                cause: Some(cause),
            }),
        }
    }
}

/// Sentinel cause for a route that matched without the configured param.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("missing key in request")]
pub struct MissingKeyError;

/// HTTP error produced by the gate.
///
/// The client only ever sees the status and message; `internal()` is for
/// diagnostics and is carried in the response extensions.
#[derive(Debug, Clone)]
pub enum PathAuthRejection {
    MissingParameter(MissingKeyError),
    Unauthorized { cause: Option<Cause> },
}

impl PathAuthRejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameter(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "Bad Request",
            Self::Unauthorized { .. } => "Unauthorized",
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "BAD_REQUEST",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
        }
    }

    pub fn internal(&self) -> Option<&(dyn Error + Send + Sync + 'static)> {
        match self {
            Self::MissingParameter(missing) => Some(missing as &(dyn Error + Send + Sync)),
            Self::Unauthorized { cause } => cause.as_deref(),
        }
    }
}

impl fmt::Display for PathAuthRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "code={}, message={}",
            self.status().as_u16(),
            self.message()
        )?;
        if let Some(internal) = self.internal() {
            write!(f, ", internal={}", internal)?;
        }
        Ok(())
    }
}

impl Error for PathAuthRejection {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.internal().map(|e| e as &(dyn Error + 'static))
    }
}

impl IntoResponse for PathAuthRejection {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.message().to_string(),
            },
        };

        let mut response = (self.status(), Json(body)).into_response();
        response.extensions_mut().insert(self);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matched_params_lookup() {
        let params = MatchedParams::new()
            .with("tenant", "acme")
            .with("apikey", "");

        assert!(params.contains("apikey"));
        assert_eq!(params.get("apikey"), Some(""));
        assert_eq!(params.get("tenant"), Some("acme"));
        assert_eq!(params.get("missing"), None);
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["tenant", "apikey"]);
    }

    #[tokio::test]
    async fn extract_without_router_is_empty() {
        let (mut parts, _) = axum::http::Request::builder()
            .uri("/valid-key")
            .body(())
            .unwrap()
            .into_parts();

        assert!(MatchedParams::extract(&mut parts).await.is_empty());
    }

    #[test]
    fn rejection_display_matches_wire_contract() {
        let missing = AuthorizationOutcome::MissingParameter
            .into_rejection()
            .unwrap();
        assert_eq!(
            missing.to_string(),
            "code=400, message=Bad Request, internal=missing key in request"
        );

        let rejected = AuthorizationOutcome::Rejected.into_rejection().unwrap();
        assert_eq!(rejected.to_string(), "code=401, message=Unauthorized");
        assert!(rejected.internal().is_none());

        let cause: Cause = Arc::from(Box::<dyn Error + Send + Sync>::from("boom"));
        let faulted = AuthorizationOutcome::ValidatorError(cause)
            .into_rejection()
            .unwrap();
        assert_eq!(
            faulted.to_string(),
            "code=401, message=Unauthorized, internal=boom"
        );
        assert_eq!(faulted.source().unwrap().to_string(), "boom");
    }

    #[test]
    fn proceed_has_no_rejection() {
        assert!(AuthorizationOutcome::Proceed.into_rejection().is_none());
    }

    #[tokio::test]
    async fn into_response_keeps_cause_out_of_body() {
        let cause: Cause = Arc::from(Box::<dyn Error + Send + Sync>::from("secret detail"));
        let response = PathAuthRejection::Unauthorized { cause: Some(cause) }.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let stored = response
            .extensions()
            .get::<PathAuthRejection>()
            .cloned()
            .unwrap();
        assert_eq!(stored.internal().unwrap().to_string(), "secret detail");

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"error": {"code": "UNAUTHORIZED", "message": "Unauthorized"}})
        );
    }
}
