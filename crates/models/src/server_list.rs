use serde::{Deserialize, Serialize};

/// One known connection manager endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServerRecord {
    pub endpoint: String,
    #[serde(default)]
    pub protocol: u8,
}

impl ServerRecord {
    pub fn new(endpoint: impl Into<String>, protocol: u8) -> Self {
        Self { endpoint: endpoint.into(), protocol }
    }
}

/// Serialized state of the server-list provider. The index stores it
/// verbatim and never interprets it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerListState {
    #[serde(rename = "Servers", default)]
    pub servers: Vec<ServerRecord>,
}
