//! Accounts: named destinations controlled by a quorum of keys

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::Client;
use crate::query::QueryBuilder;
use crate::{Error, Result};

/// A key controlling an account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountKey {
    pub root_xpub: String,
    pub account_xpub: Option<String>,
    #[serde(default)]
    pub account_derivation_path: Vec<String>,
}

/// An account on the ledger
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub alias: Option<String>,
    #[serde(default)]
    pub keys: Vec<AccountKey>,
    pub quorum: u32,
    #[serde(default)]
    pub tags: Map<String, Value>,
}

/// A payment target derived from an account
///
/// Receivers are safe to hand to other cores; they carry a control
/// program and an expiry, never key material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Receiver {
    pub control_program: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct CreateAccountRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    root_xpubs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    quorum: Option<u32>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    tags: Map<String, Value>,
    /// Idempotency token, generated per builder
    client_token: String,
}

#[derive(Serialize)]
struct CreateReceiverRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    account_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<DateTime<Utc>>,
}

/// Entry point for account operations, obtained via [`Client::accounts`]
pub struct Accounts<'a> {
    client: &'a Client,
}

impl Client {
    pub fn accounts(&self) -> Accounts<'_> {
        Accounts { client: self }
    }
}

impl<'a> Accounts<'a> {
    /// Start building a new account.
    pub fn create(&self) -> CreateAccount<'a> {
        CreateAccount {
            client: self.client,
            request: CreateAccountRequest {
                alias: None,
                root_xpubs: Vec::new(),
                quorum: None,
                tags: Map::new(),
                client_token: uuid::Uuid::new_v4().to_string(),
            },
        }
    }

    /// Start building a receiver under an existing account.
    pub fn create_receiver(&self) -> CreateReceiver<'a> {
        CreateReceiver {
            client: self.client,
            request: CreateReceiverRequest {
                account_id: None,
                account_alias: None,
                expires_at: None,
            },
        }
    }

    /// Query accounts.
    pub fn list(&self) -> QueryBuilder<'a, Account> {
        QueryBuilder::new(self.client, "list-accounts")
    }
}

/// Builder for new accounts
///
/// Carries an idempotency token generated at construction, so retrying
/// `execute` after a network failure cannot create a duplicate.
pub struct CreateAccount<'a> {
    client: &'a Client,
    request: CreateAccountRequest,
}

impl CreateAccount<'_> {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.request.alias = Some(alias.into());
        self
    }

    /// Add a root xpub to the account's controlling keys.
    pub fn root_xpub(mut self, xpub: impl Into<String>) -> Self {
        self.request.root_xpubs.push(xpub.into());
        self
    }

    /// How many of the keys must sign to spend.
    pub fn quorum(mut self, quorum: u32) -> Self {
        self.request.quorum = Some(quorum);
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

    pub async fn execute(self) -> Result<Account> {
        if self.request.root_xpubs.is_empty() {
            return Err(Error::InvalidArgument(
                "an account needs at least one root xpub".to_string(),
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
        self.client.post("create-account", &self.request).await
    }
}

/// Builder for receivers
pub struct CreateReceiver<'a> {
    client: &'a Client,
    request: CreateReceiverRequest,
}

impl CreateReceiver<'_> {
    pub fn account_alias(mut self, alias: impl Into<String>) -> Self {
        self.request.account_alias = Some(alias.into());
        self
    }

    pub fn account_id(mut self, id: impl Into<String>) -> Self {
        self.request.account_id = Some(id.into());
        self
    }

    pub fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.request.expires_at = Some(at);
        self
    }

    pub async fn execute(self) -> Result<Receiver> {
        match (&self.request.account_id, &self.request.account_alias) {
            (None, None) => {
                return Err(Error::InvalidArgument(
                    "a receiver needs an account id or alias".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(Error::InvalidArgument(
                    "give either an account id or an alias, not both".to_string(),
                ))
            }
            _ => {}
        }
        self.client
            .post("create-account-receiver", &self.request)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_requires_a_key() {
        let client = Client::new("http://localhost:1999").unwrap();
        let result = client.accounts().create().alias("treasury").execute().await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn create_rejects_quorum_above_key_count() {
        let client = Client::new("http://localhost:1999").unwrap();
        let result = client
            .accounts()
            .create()
            .alias("treasury")
            .root_xpub("xpub1abc")
            .quorum(2)
            .execute()
            .await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn create_request_serializes_with_client_token() {
        let client = Client::new("http://localhost:1999").unwrap();
        let builder = client
            .accounts()
            .create()
            .alias("acme_treasury")
            .root_xpub("xpub1abc")
            .quorum(1)
            .tag("team", "finance");

        let value = serde_json::to_value(&builder.request).unwrap();
        assert_eq!(value["alias"], "acme_treasury");
        assert_eq!(value["root_xpubs"], json!(["xpub1abc"]));
        assert_eq!(value["quorum"], 1);
        assert_eq!(value["tags"]["team"], "finance");
        assert!(value["client_token"].as_str().is_some_and(|t| !t.is_empty()));
    }

    #[test]
    fn distinct_builders_get_distinct_client_tokens() {
        let client = Client::new("http://localhost:1999").unwrap();
        let a = client.accounts().create().request.client_token.clone();
        let b = client.accounts().create().request.client_token.clone();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn receiver_requires_exactly_one_account_ref() {
        let client = Client::new("http://localhost:1999").unwrap();

        let neither = client.accounts().create_receiver().execute().await;
        assert!(matches!(neither, Err(Error::InvalidArgument(_))));

        let both = client
            .accounts()
            .create_receiver()
            .account_id("acc1")
            .account_alias("treasury")
            .execute()
            .await;
        assert!(matches!(both, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn account_deserializes() {
        let account: Account = serde_json::from_value(json!({
            "id": "acc1",
            "alias": "acme_treasury",
            "keys": [{ "root_xpub": "xpub1abc", "account_xpub": "xpub1def" }],
            "quorum": 1,
            "tags": { "team": "finance" }
        }))
        .unwrap();

        assert_eq!(account.alias.as_deref(), Some("acme_treasury"));
        assert_eq!(account.keys[0].root_xpub, "xpub1abc");
        assert_eq!(account.tags["team"], "finance");
    }
}
