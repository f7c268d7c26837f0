//! Key management against the core-hosted mock HSM
//!
//! Key material never enters this process. The mock HSM holds private
//! keys server-side; the client only ever sees extended public keys and
//! sends transaction templates out for signing.

mod signer;

pub use signer::{HsmSigner, TemplateSigner};

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::query::QueryBuilder;
use crate::Result;

/// A key held by the mock HSM. Only the extended public key is exposed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Key {
    pub alias: Option<String>,
    pub xpub: String,
}

#[derive(Serialize)]
struct CreateKeyRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<&'a str>,
}

/// Entry point for mock HSM operations, obtained via [`Client::mock_hsm`]
pub struct MockHsm<'a> {
    client: &'a Client,
}

impl Client {
    pub fn mock_hsm(&self) -> MockHsm<'_> {
        MockHsm { client: self }
    }
}

impl<'a> MockHsm<'a> {
    /// Generate a new key pair inside the HSM.
    pub async fn create_key(&self, alias: Option<&str>) -> Result<Key> {
        self.client
            .post("mockhsm/create-key", &CreateKeyRequest { alias })
            .await
    }

    /// List keys held by the HSM.
    pub fn list_keys(&self) -> QueryBuilder<'a, Key> {
        QueryBuilder::new(self.client, "mockhsm/list-keys")
    }

    /// A client scoped to the HSM's signing endpoints, for registering
    /// with an [`HsmSigner`].
    pub fn signer_connection(&self) -> Result<Client> {
        self.client.with_base_path("mockhsm/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_key_request_omits_missing_alias() {
        let value = serde_json::to_value(CreateKeyRequest { alias: None }).unwrap();
        assert_eq!(value, serde_json::json!({}));

        let value = serde_json::to_value(CreateKeyRequest {
            alias: Some("issuer"),
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "alias": "issuer" }));
    }

    #[test]
    fn key_deserializes() {
        let key: Key =
            serde_json::from_str(r#"{"alias":"issuer","xpub":"xpub1abc"}"#).unwrap();
        assert_eq!(key.alias.as_deref(), Some("issuer"));
        assert_eq!(key.xpub, "xpub1abc");
    }
}
