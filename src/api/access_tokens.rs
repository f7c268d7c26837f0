//! Access tokens for authenticating clients and network peers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::query::QueryBuilder;
use crate::{Error, Result};

/// What a token is allowed to reach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Client API access
    Client,
    /// Cross-core network RPC access
    Network,
}

/// An access token
///
/// The full `id:secret` credential is only present in the create
/// response; it cannot be recovered later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub id: String,
    pub token: Option<String>,
    #[serde(rename = "type")]
    pub token_type: Option<TokenType>,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CreateTokenRequest<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    token_type: TokenType,
}

#[derive(Serialize)]
struct DeleteTokenRequest<'a> {
    id: &'a str,
}

/// Entry point for token operations, obtained via
/// [`Client::access_tokens`]
pub struct AccessTokens<'a> {
    client: &'a Client,
}

impl Client {
    pub fn access_tokens(&self) -> AccessTokens<'_> {
        AccessTokens { client: self }
    }
}

impl<'a> AccessTokens<'a> {
    /// Create a token named `id`. The returned credential must be saved;
    /// it is shown exactly once.
    pub async fn create(&self, id: &str, token_type: TokenType) -> Result<AccessToken> {
        if id.is_empty() {
            return Err(Error::InvalidArgument(
                "token id must be non-empty".to_string(),
            ));
        }
        self.client
            .post("create-access-token", &CreateTokenRequest { id, token_type })
            .await
    }

    pub fn list(&self) -> QueryBuilder<'a, AccessToken> {
        QueryBuilder::new(self.client, "list-access-tokens")
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .post_ok("delete-access-token", &DeleteTokenRequest { id })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_request_serializes_type() {
        let value = serde_json::to_value(CreateTokenRequest {
            id: "dashboard",
            token_type: TokenType::Client,
        })
        .unwrap();
        assert_eq!(value, json!({ "id": "dashboard", "type": "client" }));
    }

    #[tokio::test]
    async fn empty_id_rejected() {
        let client = Client::new("http://localhost:1999").unwrap();
        let result = client
            .access_tokens()
            .create("", TokenType::Client)
            .await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn list_items_omit_the_credential() {
        let token: AccessToken = serde_json::from_value(json!({
            "id": "dashboard",
            "type": "client",
            "created_at": "2026-08-01T12:00:00Z"
        }))
        .unwrap();

        assert_eq!(token.id, "dashboard");
        assert_eq!(token.token, None);
        assert_eq!(token.token_type, Some(TokenType::Client));
    }
}
