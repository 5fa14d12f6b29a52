//! Credential-in-path gate.
//!
//! Reads one named path param, hands it to the configured validator and either
//! lets the request through untouched or answers with 400 / 401.
//!
//! Two ways to mount it:
//! - `router.route_layer(gate.layer())` (plain tower `Layer`)
//! - `path_auth::apply(router, gate)` (axum `from_fn_with_state`)
//!
//! Either way the gate must sit inside the router (`route_layer` or
//! `Router::layer`), since path params only exist after a route matched.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    Router,
    extract::{Request, State},
    http::request::Parts,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use super::config::{
    ErrorHandler, PathAuthConfig, PathAuthConfigError, PathAuthValidator, Skipper,
};
use super::types::{AuthorizationOutcome, MatchedParams, PathAuthRejection};

struct Inner {
    param: String,
    validator: Arc<dyn PathAuthValidator>,
    skipper: Option<Skipper>,
    error_handler: Option<ErrorHandler>,
}

/// A configured gate. Cheap to clone; immutable after construction.
#[derive(Clone)]
pub struct PathAuth {
    inner: Arc<Inner>,
}

impl PathAuth {
    /// Gate on `param` with `validator` and no skipper.
    pub fn new<V>(param: impl Into<String>, validator: V) -> Result<Self, PathAuthConfigError>
    where
        V: PathAuthValidator,
    {
        Self::with_config(PathAuthConfig::new(param).validator(validator))
    }

    pub fn with_config(config: PathAuthConfig) -> Result<Self, PathAuthConfigError> {
        let validator = config
            .validator
            .ok_or(PathAuthConfigError::MissingValidator)?;

        if config.param.is_empty() {
            return Err(PathAuthConfigError::EmptyParam);
        }

        Ok(Self {
            inner: Arc::new(Inner {
                param: config.param,
                validator,
                skipper: config.skipper,
                error_handler: config.error_handler,
            }),
        })
    }

    pub fn param(&self) -> &str {
        &self.inner.param
    }

    pub fn layer(&self) -> PathAuthLayer {
        PathAuthLayer { gate: self.clone() }
    }

    fn skips(&self, parts: &Parts) -> bool {
        self.inner.skipper.as_ref().is_some_and(|skip| skip(parts))
    }

    /// Runs the decision against already-extracted params.
    pub fn evaluate(&self, params: &MatchedParams, parts: &Parts) -> AuthorizationOutcome {
        if self.skips(parts) {
            return AuthorizationOutcome::Proceed;
        }
        self.check(params, parts)
    }

    /// Same decision as [`evaluate`](Self::evaluate), reading the params from
    /// the request only when the skipper did not fire.
    pub async fn authorize(&self, parts: &mut Parts) -> AuthorizationOutcome {
        if self.skips(parts) {
            return AuthorizationOutcome::Proceed;
        }
        let params = MatchedParams::extract(parts).await;
        self.check(&params, parts)
    }

    fn check(&self, params: &MatchedParams, parts: &Parts) -> AuthorizationOutcome {
        let param = self.param();
        if !params.contains(param) {
            return AuthorizationOutcome::MissingParameter;
        }

        let value = params.get(param).unwrap_or_default();
        match self.inner.validator.validate(value, parts) {
            Ok(true) => AuthorizationOutcome::Proceed,
            Ok(false) => AuthorizationOutcome::Rejected,
            Err(err) => AuthorizationOutcome::ValidatorError(Arc::from(err)),
        }
    }

    fn reject(&self, rejection: PathAuthRejection, parts: &Parts) -> Response {
        match rejection.internal() {
            Some(cause) if matches!(rejection, PathAuthRejection::Unauthorized { .. }) => {
                tracing::warn!(param = %self.param(), error = %cause, "path auth validator failed");
            }
            _ => {
                tracing::debug!(
                    param = %self.param(),
                    status = %rejection.status(),
                    path = %parts.uri.path(),
                    "path auth rejected request"
                );
            }
        }

        match &self.inner.error_handler {
            Some(handler) => handler(rejection, parts),
            None => rejection.into_response(),
        }
    }

    /// Hands the request back when it may proceed, otherwise the rejection
    /// response.
    async fn guard(&self, request: Request) -> Result<Request, Response> {
        let (mut parts, body) = request.into_parts();
        match self.authorize(&mut parts).await.into_rejection() {
            None => Ok(Request::from_parts(parts, body)),
            Some(rejection) => Err(self.reject(rejection, &parts)),
        }
    }
}

impl fmt::Debug for PathAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathAuth")
            .field("param", &self.inner.param)
            .field("skipper", &self.inner.skipper.is_some())
            .field("error_handler", &self.inner.error_handler.is_some())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct PathAuthLayer {
    gate: PathAuth,
}

impl<S> Layer<S> for PathAuthLayer {
    type Service = PathAuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PathAuthService {
            inner,
            gate: self.gate.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct PathAuthService<S> {
    inner: S,
    gate: PathAuth,
}

impl<S> Service<Request> for PathAuthService<S>
where
    S: Service<Request, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response, S::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        // Take the service that was polled ready, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let gate = self.gate.clone();

        Box::pin(async move {
            match gate.guard(request).await {
                Ok(request) => inner.call(request).await,
                Err(response) => Ok(response),
            }
        })
    }
}

/// `from_fn_with_state` form of the gate.
pub async fn path_auth_middleware(
    State(gate): State<PathAuth>,
    request: Request,
    next: Next,
) -> Response {
    match gate.guard(request).await {
        Ok(request) => next.run(request).await,
        Err(response) => response,
    }
}

/// Puts the gate in front of every route of `router`.
///
/// ```ignore
/// let keys = Router::new().route("/keys/{apikey}/whoami", get(whoami));
/// let keys = middleware::path_auth::apply(keys, gate);
/// ```
pub fn apply<S>(router: Router<S>, gate: PathAuth) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.route_layer(middleware::from_fn_with_state(gate, path_auth_middleware))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::body::Body;
    use axum::http::{Method, StatusCode};
    use tower::{BoxError, ServiceExt, service_fn};

    use super::*;

    fn test_key_validator(key: &str, _parts: &Parts) -> Result<bool, BoxError> {
        match key {
            "valid-key" => Ok(true),
            "error-key" => Err("some user defined error".into()),
            _ => Ok(false),
        }
    }

    fn head(uri: &str) -> Parts {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .unwrap()
            .into_parts()
            .0
    }

    fn apikey(value: &str) -> MatchedParams {
        MatchedParams::new().with("apikey", value)
    }

    #[test]
    fn valid_key_proceeds() {
        let gate = PathAuth::new("apikey", test_key_validator).unwrap();
        let outcome = gate.evaluate(&apikey("valid-key"), &head("/valid-key"));
        assert!(outcome.is_proceed());
    }

    #[test]
    fn validator_error_becomes_unauthorized_with_cause() {
        let gate = PathAuth::new("apikey", test_key_validator).unwrap();
        let rejection = gate
            .evaluate(&apikey("error-key"), &head("/error-key"))
            .into_rejection()
            .unwrap();

        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            rejection.to_string(),
            "code=401, message=Unauthorized, internal=some user defined error"
        );
    }

    #[test]
    fn rejected_key_is_unauthorized_without_cause() {
        let gate = PathAuth::new("apikey", test_key_validator).unwrap();
        let rejection = gate
            .evaluate(&apikey("bad"), &head("/bad"))
            .into_rejection()
            .unwrap();

        assert_eq!(rejection.status(), StatusCode::UNAUTHORIZED);
        assert!(rejection.internal().is_none());
    }

    #[test]
    fn missing_param_is_bad_request_and_skips_validator() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let gate = PathAuth::new("apikey", move |_key: &str, _parts: &Parts| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok::<_, BoxError>(true)
        })
        .unwrap();

        let params = MatchedParams::new().with("user_id", "42");
        let rejection = gate
            .evaluate(&params, &head("/users/42"))
            .into_rejection()
            .unwrap();

        assert_eq!(rejection.status(), StatusCode::BAD_REQUEST);
        assert_eq!(rejection.internal().unwrap().to_string(), "missing key in request");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_value_is_passed_to_validator() {
        let gate = PathAuth::new("apikey", |key: &str, _parts: &Parts| {
            Ok::<_, BoxError>(key.is_empty())
        })
        .unwrap();

        assert!(gate.evaluate(&apikey(""), &head("/")).is_proceed());
    }

    #[test]
    fn skipper_runs_before_lookup() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let config = PathAuthConfig::new("apikey")
            .validator(move |_key: &str, _parts: &Parts| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<_, BoxError>(false)
            })
            .skipper(|parts: &Parts| parts.method == Method::OPTIONS);
        let gate = PathAuth::with_config(config).unwrap();

        let mut preflight = head("/anything");
        preflight.method = Method::OPTIONS;

        assert!(gate.evaluate(&MatchedParams::new(), &preflight).is_proceed());
        assert!(gate.evaluate(&apikey("bad"), &preflight).is_proceed());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(!gate.evaluate(&apikey("bad"), &head("/bad")).is_proceed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn evaluation_is_repeatable() {
        let gate = PathAuth::new("apikey", test_key_validator).unwrap();
        let parts = head("/error-key");
        let params = apikey("error-key");

        let first = gate.evaluate(&params, &parts).into_rejection().unwrap();
        let second = gate.evaluate(&params, &parts).into_rejection().unwrap();
        assert_eq!(first.to_string(), second.to_string());
    }

    #[test]
    fn construction_requires_validator() {
        let err = PathAuth::with_config(PathAuthConfig::new("apikey")).unwrap_err();
        assert_eq!(err, PathAuthConfigError::MissingValidator);
        assert_eq!(err.to_string(), "path auth: requires a validator function");

        let err = PathAuth::with_config(PathAuthConfig::default()).unwrap_err();
        assert_eq!(err, PathAuthConfigError::MissingValidator);
    }

    #[test]
    fn construction_requires_param() {
        let err = PathAuth::new("", test_key_validator).unwrap_err();
        assert_eq!(err, PathAuthConfigError::EmptyParam);
        assert_eq!(err.to_string(), "path auth: requires a param");

        let config = PathAuthConfig::default().validator(test_key_validator);
        assert_eq!(
            PathAuth::with_config(config).unwrap_err(),
            PathAuthConfigError::EmptyParam
        );
    }

    #[tokio::test]
    async fn service_without_router_reports_missing_param() {
        let gate = PathAuth::new("apikey", test_key_validator).unwrap();
        let svc = gate.layer().layer(service_fn(|_req: Request| async {
            Ok::<_, std::convert::Infallible>(StatusCode::OK.into_response())
        }));

        let response = svc
            .oneshot(Request::builder().uri("/valid-key").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn service_forwards_downstream_error() {
        let config = PathAuthConfig::new("apikey")
            .validator(test_key_validator)
            .skipper(|_parts: &Parts| true);
        let gate = PathAuth::with_config(config).unwrap();
        let svc = gate.layer().layer(service_fn(|_req: Request| async {
            Err::<Response, _>(std::io::Error::other("downstream broke"))
        }));

        let err = svc
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "downstream broke");
    }

    #[tokio::test]
    async fn error_handler_renders_rejection() {
        let config = PathAuthConfig::new("apikey")
            .validator(test_key_validator)
            .error_handler(|rejection: PathAuthRejection, _parts: &Parts| {
                (rejection.status(), rejection.to_string()).into_response()
            });
        let gate = PathAuth::with_config(config).unwrap();
        let svc = gate.layer().layer(service_fn(|_req: Request| async {
            Ok::<_, std::convert::Infallible>(StatusCode::OK.into_response())
        }));

        let response = svc
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            &bytes[..],
            b"code=400, message=Bad Request, internal=missing key in request"
        );
    }
}
