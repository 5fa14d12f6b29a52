/*
 * Responsibility
 * - Shared context attached to the Router (AppState)
 * - Cheap to clone (Arc inside)
 */
use crate::services::api_keys::ApiKeyStore;

#[derive(Clone, Debug)]
pub struct AppState {
    pub api_keys: ApiKeyStore,
}

impl AppState {
    pub fn new(api_keys: ApiKeyStore) -> Self {
        Self { api_keys }
    }
}
