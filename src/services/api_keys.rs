/*
 * Responsibility
 * - Known API keys, stored as SHA-256 digests (raw keys are not kept)
 * - Validator for the path auth gate
 */
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::http::request::Parts;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tower::BoxError;

use crate::config::ApiKeyEntry;
use crate::middleware::path_auth::PathAuthValidator;

type KeyDigest = [u8; 32];

#[derive(Debug, Error)]
#[error("no api keys configured")]
pub struct NoApiKeys;

#[derive(Clone, Default)]
pub struct ApiKeyStore {
    clients: Arc<HashMap<KeyDigest, String>>,
}

impl ApiKeyStore {
    pub fn new(entries: impl IntoIterator<Item = ApiKeyEntry>) -> Self {
        let clients = entries
            .into_iter()
            .map(|entry| (digest(&entry.key), entry.client))
            .collect();
        Self {
            clients: Arc::new(clients),
        }
    }

    /// Client name owning `key`, if any.
    pub fn client_for(&self, key: &str) -> Option<&str> {
        self.clients.get(&digest(key)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

fn digest(key: &str) -> KeyDigest {
    Sha256::digest(key.as_bytes()).into()
}

impl PathAuthValidator for ApiKeyStore {
    fn validate(&self, value: &str, _parts: &Parts) -> Result<bool, BoxError> {
        if self.is_empty() {
            return Err(NoApiKeys.into());
        }
        Ok(self.client_for(value).is_some())
    }
}

impl fmt::Debug for ApiKeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKeyStore")
            .field("clients", &self.clients.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn store() -> ApiKeyStore {
        ApiKeyStore::new([
            ApiKeyEntry {
                client: "billing".into(),
                key: "k-billing".into(),
            },
            ApiKeyEntry {
                client: "reports".into(),
                key: "k-reports".into(),
            },
        ])
    }

    fn parts() -> Parts {
        Request::builder().body(()).unwrap().into_parts().0
    }

    #[test]
    fn looks_up_client_by_key() {
        let store = store();
        assert_eq!(store.len(), 2);
        assert_eq!(store.client_for("k-billing"), Some("billing"));
        assert_eq!(store.client_for("k-reports"), Some("reports"));
        assert_eq!(store.client_for("k-unknown"), None);
    }

    #[test]
    fn validates_known_keys_only() {
        let store = store();
        assert!(store.validate("k-billing", &parts()).unwrap());
        assert!(!store.validate("K-BILLING", &parts()).unwrap());
        assert!(!store.validate("", &parts()).unwrap());
    }

    #[test]
    fn empty_store_is_a_validator_fault() {
        let err = ApiKeyStore::default()
            .validate("anything", &parts())
            .unwrap_err();
        assert_eq!(err.to_string(), "no api keys configured");
    }
}
