/*!
 * Path-parameter credential gate
 *
 * Public API:
 * - PathAuth, PathAuthConfig, PathAuthValidator
 * - PathAuthLayer / PathAuthService (tower)
 * - path_auth_middleware / apply (axum from_fn)
 * - AuthorizationOutcome, PathAuthRejection, MissingKeyError, MatchedParams
 */

mod config;
mod core;
mod types;

pub use config::{ErrorHandler, PathAuthConfig, PathAuthConfigError, PathAuthValidator, Skipper};
pub use self::core::{PathAuth, PathAuthLayer, PathAuthService, apply, path_auth_middleware};
pub use types::{AuthorizationOutcome, Cause, MatchedParams, MissingKeyError, PathAuthRejection};
