//! Transaction building, signing hand-off, submission, and queries
//!
//! Transactions are proposed client-side as a list of actions, built into
//! an unsigned template by the core, completed by a
//! [`TemplateSigner`](crate::hsm::TemplateSigner), and submitted. The raw
//! transaction inside a template stays opaque hex; only the signing
//! instructions have enough structure to route keys.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::client::Client;
use crate::hsm::TemplateSigner;
use crate::query::QueryBuilder;
use crate::{Error, Result};

use super::accounts::Receiver;

/// Issue new units of an asset
#[derive(Debug, Clone, Default, Serialize)]
pub struct Issue {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_alias: Option<String>,
    pub amount: u64,
    /// Replay-protection nonce, filled at build time when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) nonce: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_data: Option<Value>,
}

impl Issue {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    pub fn asset_alias(mut self, alias: impl Into<String>) -> Self {
        self.asset_alias = Some(alias.into());
        self
    }

    pub fn asset_id(mut self, id: impl Into<String>) -> Self {
        self.asset_id = Some(id.into());
        self
    }

    pub fn reference_data(mut self, data: Value) -> Self {
        self.reference_data = Some(data);
        self
    }
}

/// Spend asset units held by an account
#[derive(Debug, Clone, Default, Serialize)]
pub struct SpendFromAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_alias: Option<String>,
    pub amount: u64,
}

impl SpendFromAccount {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    pub fn account_alias(mut self, alias: impl Into<String>) -> Self {
        self.account_alias = Some(alias.into());
        self
    }

    pub fn account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = Some(id.into());
        self
    }

    pub fn asset_alias(mut self, alias: impl Into<String>) -> Self {
        self.asset_alias = Some(alias.into());
        self
    }

    pub fn asset_id(mut self, id: impl Into<String>) -> Self {
        self.asset_id = Some(id.into());
        self
    }
}

/// Spend a specific unspent output in full
#[derive(Debug, Clone, Serialize)]
pub struct SpendAccountUnspentOutput {
    pub transaction_id: String,
    pub position: u32,
}

impl SpendAccountUnspentOutput {
    pub fn new(transaction_id: impl Into<String>, position: u32) -> Self {
        Self {
            transaction_id: transaction_id.into(),
            position,
        }
    }
}

/// Send asset units to an account on this core
#[derive(Debug, Clone, Default, Serialize)]
pub struct ControlWithAccount {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_alias: Option<String>,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_data: Option<Value>,
}

impl ControlWithAccount {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    pub fn account_alias(mut self, alias: impl Into<String>) -> Self {
        self.account_alias = Some(alias.into());
        self
    }

    pub fn account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = Some(id.into());
        self
    }

    pub fn asset_alias(mut self, alias: impl Into<String>) -> Self {
        self.asset_alias = Some(alias.into());
        self
    }

    pub fn asset_id(mut self, id: impl Into<String>) -> Self {
        self.asset_id = Some(id.into());
        self
    }

    pub fn reference_data(mut self, data: Value) -> Self {
        self.reference_data = Some(data);
        self
    }
}

/// Send asset units to a receiver, typically created by another core
#[derive(Debug, Clone, Serialize)]
pub struct ControlWithReceiver {
    pub receiver: Receiver,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_alias: Option<String>,
    pub amount: u64,
}

impl ControlWithReceiver {
    pub fn new(receiver: Receiver, amount: u64) -> Self {
        Self {
            receiver,
            asset_id: None,
            asset_alias: None,
            amount,
        }
    }

    pub fn asset_alias(mut self, alias: impl Into<String>) -> Self {
        self.asset_alias = Some(alias.into());
        self
    }

    pub fn asset_id(mut self, id: impl Into<String>) -> Self {
        self.asset_id = Some(id.into());
        self
    }
}

/// Remove asset units from circulation
#[derive(Debug, Clone, Default, Serialize)]
pub struct Retire {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_alias: Option<String>,
    pub amount: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_data: Option<Value>,
}

impl Retire {
    pub fn new(amount: u64) -> Self {
        Self {
            amount,
            ..Self::default()
        }
    }

    pub fn asset_alias(mut self, alias: impl Into<String>) -> Self {
        self.asset_alias = Some(alias.into());
        self
    }

    pub fn asset_id(mut self, id: impl Into<String>) -> Self {
        self.asset_id = Some(id.into());
        self
    }

    pub fn reference_data(mut self, data: Value) -> Self {
        self.reference_data = Some(data);
        self
    }
}

/// Attach reference data to the transaction as a whole
#[derive(Debug, Clone, Serialize)]
pub struct SetTransactionReferenceData {
    pub reference_data: Value,
}

impl SetTransactionReferenceData {
    pub fn new(data: Value) -> Self {
        Self {
            reference_data: data,
        }
    }
}

/// One step of a proposed transaction
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Issue(Issue),
    SpendFromAccount(SpendFromAccount),
    SpendAccountUnspentOutput(SpendAccountUnspentOutput),
    ControlWithAccount(ControlWithAccount),
    ControlWithReceiver(ControlWithReceiver),
    Retire(Retire),
    SetTransactionReferenceData(SetTransactionReferenceData),
}

impl From<Issue> for Action {
    fn from(a: Issue) -> Self {
        Action::Issue(a)
    }
}
impl From<SpendFromAccount> for Action {
    fn from(a: SpendFromAccount) -> Self {
        Action::SpendFromAccount(a)
    }
}
impl From<SpendAccountUnspentOutput> for Action {
    fn from(a: SpendAccountUnspentOutput) -> Self {
        Action::SpendAccountUnspentOutput(a)
    }
}
impl From<ControlWithAccount> for Action {
    fn from(a: ControlWithAccount) -> Self {
        Action::ControlWithAccount(a)
    }
}
impl From<ControlWithReceiver> for Action {
    fn from(a: ControlWithReceiver) -> Self {
        Action::ControlWithReceiver(a)
    }
}
impl From<Retire> for Action {
    fn from(a: Retire) -> Self {
        Action::Retire(a)
    }
}
impl From<SetTransactionReferenceData> for Action {
    fn from(a: SetTransactionReferenceData) -> Self {
        Action::SetTransactionReferenceData(a)
    }
}

/// A key slot inside a signature witness component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyId {
    pub xpub: String,
    #[serde(default)]
    pub derivation_path: Vec<String>,
}

/// One component of an input's witness
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WitnessComponent {
    Signature {
        quorum: u32,
        keys: Vec<KeyId>,
        #[serde(default)]
        signatures: Vec<String>,
    },
    Data {
        value: String,
    },
}

/// Signing requirements for one transaction input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigningInstruction {
    pub position: u32,
    pub witness_components: Vec<WitnessComponent>,
}

/// An unsigned or partially-signed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    /// Opaque hex encoding of the proposed transaction
    pub raw_transaction: String,
    pub signing_instructions: Vec<SigningInstruction>,
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub allow_additional_actions: bool,
}

/// An input of a confirmed transaction, as returned by queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxInput {
    /// "issue" or "spend"
    pub action: String,
    pub asset_id: String,
    pub asset_alias: Option<String>,
    pub amount: u64,
    pub account_id: Option<String>,
    pub account_alias: Option<String>,
    pub spent_output: Option<OutputPointer>,
    pub reference_data: Option<Value>,
}

/// An output of a confirmed transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TxOutput {
    /// "control" or "retire"
    pub action: String,
    pub position: u32,
    pub asset_id: String,
    pub asset_alias: Option<String>,
    pub amount: u64,
    pub account_id: Option<String>,
    pub account_alias: Option<String>,
    pub control_program: Option<String>,
    pub reference_data: Option<Value>,
}

/// Points at the output an input spends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputPointer {
    pub transaction_id: String,
    pub position: u32,
}

/// A confirmed transaction, as returned by queries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub block_id: Option<String>,
    pub block_height: Option<u64>,
    pub position: Option<u32>,
    #[serde(default)]
    pub inputs: Vec<TxInput>,
    #[serde(default)]
    pub outputs: Vec<TxOutput>,
    pub reference_data: Option<Value>,
}

#[derive(Serialize)]
struct BuildRequest {
    actions: Vec<Action>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reference_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl_ms: Option<u64>,
    /// Template to extend, for multi-party builds
    #[serde(skip_serializing_if = "Option::is_none")]
    base_transaction: Option<String>,
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    transaction: &'a Template,
}

/// Result of submitting a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Id of the confirmed transaction
    pub id: String,
}

/// Entry point for transaction operations, obtained via
/// [`Client::transactions`]
pub struct Transactions<'a> {
    client: &'a Client,
}

impl Client {
    pub fn transactions(&self) -> Transactions<'_> {
        Transactions { client: self }
    }
}

impl<'a> Transactions<'a> {
    /// Start building a transaction from actions.
    pub fn build(&self) -> BuildTransaction<'a> {
        BuildTransaction {
            client: self.client,
            request: BuildRequest {
                actions: Vec::new(),
                reference_data: None,
                ttl_ms: None,
                base_transaction: None,
            },
        }
    }

    /// Submit a fully-signed template.
    pub async fn submit(&self, template: &Template) -> Result<SubmitResponse> {
        self.client
            .post("submit-transaction", &SubmitRequest { transaction: template })
            .await
    }

    /// Sign a template with the given signer, then submit it.
    pub async fn sign_and_submit<S>(&self, template: Template, signer: &S) -> Result<SubmitResponse>
    where
        S: TemplateSigner + ?Sized,
    {
        let signed = signer.sign(template).await?;
        self.submit(&signed).await
    }

    /// Query confirmed transactions.
    pub fn list(&self) -> QueryBuilder<'a, Transaction> {
        QueryBuilder::new(self.client, "list-transactions")
    }
}

/// Builder for transaction templates
pub struct BuildTransaction<'a> {
    client: &'a Client,
    request: BuildRequest,
}

impl BuildTransaction<'_> {
    pub fn add_action(mut self, action: impl Into<Action>) -> Self {
        self.request.actions.push(action.into());
        self
    }

    /// How long the template's reservations are held.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.request.ttl_ms = Some(ttl.as_millis() as u64);
        self
    }

    pub fn reference_data(mut self, data: Value) -> Self {
        self.request.reference_data = Some(data);
        self
    }

    /// Extend a template built elsewhere instead of starting fresh.
    pub fn base_transaction(mut self, raw: impl Into<String>) -> Self {
        self.request.base_transaction = Some(raw.into());
        self
    }

    /// Build the template on the core.
    pub async fn execute(mut self) -> Result<Template> {
        if self.request.actions.is_empty() {
            return Err(Error::InvalidArgument(
                "a transaction needs at least one action".to_string(),
            ));
        }
        for action in &mut self.request.actions {
            if let Action::Issue(issue) = action {
                if issue.nonce.is_none() {
                    issue.nonce = Some(uuid::Uuid::new_v4().to_string());
                }
            }
        }
        self.client.post("build-transaction", &self.request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn actions_serialize_with_type_tags() {
        let issue = Action::from(Issue::new(1000).asset_alias("acme_common"));
        let value = serde_json::to_value(&issue).unwrap();
        assert_eq!(value["type"], "issue");
        assert_eq!(value["asset_alias"], "acme_common");
        assert_eq!(value["amount"], 1000);
        assert!(value.get("asset_id").is_none());

        let control = Action::from(
            ControlWithAccount::new(1000)
                .account_alias("acme_treasury")
                .asset_alias("acme_common"),
        );
        let value = serde_json::to_value(&control).unwrap();
        assert_eq!(value["type"], "control_with_account");
        assert_eq!(value["account_alias"], "acme_treasury");

        let retire = Action::from(Retire::new(50).asset_alias("acme_common"));
        let value = serde_json::to_value(&retire).unwrap();
        assert_eq!(value["type"], "retire");
        assert_eq!(value["amount"], 50);
    }

    #[test]
    fn spend_unspent_output_serializes_pointer() {
        let action = Action::from(SpendAccountUnspentOutput::new("tx123", 1));
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "spend_account_unspent_output",
                "transaction_id": "tx123",
                "position": 1
            })
        );
    }

    #[test]
    fn receiver_action_embeds_control_program() {
        let receiver = Receiver {
            control_program: "766baa20".to_string(),
            expires_at: "2026-09-01T00:00:00Z".parse().unwrap(),
        };
        let action = Action::from(
            ControlWithReceiver::new(receiver, 2000).asset_alias("acme_preferred"),
        );
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["type"], "control_with_receiver");
        assert_eq!(value["receiver"]["control_program"], "766baa20");
        assert_eq!(value["amount"], 2000);
    }

    #[tokio::test]
    async fn build_rejects_empty_action_list() {
        let client = Client::new("http://localhost:1999").unwrap();
        let result = client.transactions().build().execute().await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn issue_nonce_survives_serialization_once_set() {
        let mut issue = Issue::new(10).asset_alias("acme_common");
        issue.nonce = Some("nonce-1".to_string());
        let value = serde_json::to_value(Action::from(issue)).unwrap();
        assert_eq!(value["nonce"], "nonce-1");
    }

    #[test]
    fn template_round_trips() {
        let body = json!({
            "raw_transaction": "0a0b0c",
            "signing_instructions": [{
                "position": 0,
                "witness_components": [{
                    "type": "signature",
                    "quorum": 1,
                    "keys": [{ "xpub": "xpub1abc", "derivation_path": ["010203"] }],
                    "signatures": []
                }]
            }],
            "local": true
        });

        let template: Template = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(template.signing_instructions.len(), 1);
        match &template.signing_instructions[0].witness_components[0] {
            WitnessComponent::Signature { quorum, keys, .. } => {
                assert_eq!(*quorum, 1);
                assert_eq!(keys[0].xpub, "xpub1abc");
            }
            other => panic!("unexpected component: {:?}", other),
        }

        let back = serde_json::to_value(&template).unwrap();
        assert_eq!(back["raw_transaction"], body["raw_transaction"]);
        assert_eq!(
            back["signing_instructions"][0]["witness_components"][0]["type"],
            "signature"
        );
    }

    #[test]
    fn transaction_query_results_deserialize() {
        let body = json!({
            "id": "tx7",
            "timestamp": "2026-08-01T12:00:00Z",
            "block_id": "b1",
            "block_height": 40,
            "position": 2,
            "inputs": [{
                "action": "issue",
                "asset_id": "a1",
                "asset_alias": "acme_common",
                "amount": 1000
            }],
            "outputs": [{
                "action": "control",
                "position": 0,
                "asset_id": "a1",
                "asset_alias": "acme_common",
                "amount": 1000,
                "account_alias": "acme_treasury",
                "control_program": "766baa20"
            }]
        });

        let tx: Transaction = serde_json::from_value(body).unwrap();
        assert_eq!(tx.id, "tx7");
        assert_eq!(tx.inputs[0].action, "issue");
        assert_eq!(tx.outputs[0].account_alias.as_deref(), Some("acme_treasury"));
    }
}
