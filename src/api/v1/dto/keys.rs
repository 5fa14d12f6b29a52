use serde::Serialize;

/// Body of `GET /keys/{key}/whoami`.
#[derive(Debug, Serialize)]
pub struct WhoAmIResponse {
    pub client: String,
}
