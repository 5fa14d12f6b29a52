/*
 * Responsibility
 * - v1 URL layout
 * - Decides which routes sit behind the path auth gate
 */
use axum::{Router, routing::get};

use crate::api::v1::handlers::{
    health::health,
    keys::{preflight, whoami},
};
use crate::middleware::path_auth::{self, PathAuth};
use crate::state::AppState;

pub fn routes(gate: PathAuth) -> Router<AppState> {
    let keys = Router::new().route(
        &format!("/keys/{{{}}}/whoami", gate.param()),
        get(whoami).options(preflight),
    );

    Router::new()
        .route("/health", get(health))
        .merge(path_auth::apply(keys, gate))
}
