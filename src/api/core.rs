//! Core lifecycle: info, configuration, and development reset

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::Client;
use crate::{Error, Result};

/// Status snapshot of a core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreInfo {
    pub is_configured: bool,
    #[serde(default)]
    pub is_generator: bool,
    pub blockchain_id: Option<String>,
    pub core_id: Option<String>,
    #[serde(default)]
    pub block_height: u64,
    /// Height reported by the network's generator; lags local height
    /// while catching up.
    #[serde(default)]
    pub generator_block_height: u64,
    #[serde(default)]
    pub network_rpc_version: u32,
    pub build_commit: Option<String>,
    pub build_date: Option<String>,
}

/// How to configure an unconfigured core
#[derive(Debug, Clone, Serialize)]
pub struct ConfigureRequest {
    is_generator: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    generator_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generator_access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blockchain_id: Option<String>,
}

impl ConfigureRequest {
    /// Configure this core as a new network's block generator.
    pub fn generator() -> Self {
        Self {
            is_generator: true,
            generator_url: None,
            generator_access_token: None,
            blockchain_id: None,
        }
    }

    /// Join an existing network by its generator and blockchain id.
    pub fn join(generator_url: impl Into<String>, blockchain_id: impl Into<String>) -> Self {
        Self {
            is_generator: false,
            generator_url: Some(generator_url.into()),
            generator_access_token: None,
            blockchain_id: Some(blockchain_id.into()),
        }
    }

    /// Network token for the generator, when it requires one.
    pub fn generator_access_token(mut self, token: impl Into<String>) -> Self {
        self.generator_access_token = Some(token.into());
        self
    }
}

impl Client {
    /// Status of the core this client points at.
    pub async fn info(&self) -> Result<CoreInfo> {
        self.post("info", &json!({})).await
    }

    /// Configure an unconfigured core.
    pub async fn configure(&self, request: ConfigureRequest) -> Result<()> {
        if !request.is_generator && request.generator_url.is_none() {
            return Err(Error::InvalidArgument(
                "joining a network requires a generator URL".to_string(),
            ));
        }
        self.post_ok("configure", &request).await
    }

    /// Wipe all data on a development core.
    pub async fn reset(&self) -> Result<()> {
        self.post_ok("reset", &json!({})).await
    }
}
