use serde::{Deserialize, Serialize};

/// Payload of the answering service's health endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceHealth {
    #[serde(default)]
    pub ok: bool,
    /// Whether the retrieval index finished building.
    #[serde(default)]
    pub index_built: bool,
    /// Number of indexed records.
    #[serde(default)]
    pub docs_count: u64,
    /// Whether the service has credentials for its answering model.
    #[serde(default)]
    pub openai_key_set: bool,
}

impl ServiceHealth {
    /// Whether the service can answer questions with matches.
    pub fn is_ready(&self) -> bool {
        self.ok && self.index_built
    }
}
