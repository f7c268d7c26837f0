//! Asset definitions: named, issuable units of value

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::Client;
use crate::query::QueryBuilder;
use crate::{Error, Result};

/// A key controlling an asset's issuance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetKey {
    pub root_xpub: String,
    pub asset_pubkey: Option<String>,
    #[serde(default)]
    pub asset_derivation_path: Vec<String>,
}

/// An asset definition on the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub alias: Option<String>,
    pub issuance_program: Option<String>,
    #[serde(default)]
    pub keys: Vec<AssetKey>,
    pub quorum: u32,
    /// Immutable definition fields, committed at creation
    #[serde(default)]
    pub definition: Map<String, Value>,
    /// Mutable, core-local annotations
    #[serde(default)]
    pub tags: Map<String, Value>,
    /// Whether this core controls issuance
    #[serde(default)]
    pub is_local: bool,
}

#[derive(Serialize)]
struct CreateAssetRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    root_xpubs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quorum: Option<u32>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    definition: Map<String, Value>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    tags: Map<String, Value>,
    /// Idempotency token, generated per builder
    client_token: String,
}

/// Entry point for asset operations, obtained via [`Client::assets`]
pub struct Assets<'a> {
    client: &'a Client,
}

impl Client {
    pub fn assets(&self) -> Assets<'_> {
        Assets { client: self }
    }
}

impl<'a> Assets<'a> {
    /// Start building a new asset definition.
    pub fn create(&self) -> CreateAsset<'a> {
        CreateAsset {
            client: self.client,
            request: CreateAssetRequest {
                alias: None,
                root_xpubs: Vec::new(),
                quorum: None,
                definition: Map::new(),
                tags: Map::new(),
                client_token: uuid::Uuid::new_v4().to_string(),
            },
        }
    }

    /// Query asset definitions.
    pub fn list(&self) -> QueryBuilder<'a, Asset> {
        QueryBuilder::new(self.client, "list-assets")
    }
}

/// Builder for new asset definitions
pub struct CreateAsset<'a> {
    client: &'a Client,
    request: CreateAssetRequest,
}

impl CreateAsset<'_> {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.request.alias = Some(alias.into());
        self
    }

    /// Add a root xpub to the asset's issuance keys.
    pub fn root_xpub(mut self, xpub: impl Into<String>) -> Self {
        self.request.root_xpubs.push(xpub.into());
        self
    }

    /// How many of the keys must sign an issuance.
    pub fn quorum(mut self, quorum: u32) -> Self {
        self.request.quorum = Some(quorum);
        self
    }

    /// Add one field to the immutable asset definition.
    pub fn definition_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.definition.insert(key.into(), value.into());
        self
    }

    pub fn add_definition(mut self, definition: Map<String, Value>) -> Self {
        self.request.definition.extend(definition);
        self
    }

    pub fn tag(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.request.tags.insert(key.into(), value.into());
        self
    }

    pub fn add_tags(mut self, tags: Map<String, Value>) -> Self {
        self.request.tags.extend(tags);
        self
    }

    pub async fn execute(self) -> Result<Asset> {
        if self.request.root_xpubs.is_empty() {
            return Err(Error::InvalidArgument(
                "an asset needs at least one root xpub".to_string(),
            ));
        }
        if let Some(quorum) = self.request.quorum {
            if quorum == 0 || quorum as usize > self.request.root_xpubs.len() {
                return Err(Error::InvalidArgument(format!(
                    "quorum {} out of range for {} keys",
                    quorum,
                    self.request.root_xpubs.len()
                )));
            }
        }
        self.client.post("create-asset", &self.request).await
    }
}
