//! Unspent output queries

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::Client;
use crate::query::QueryBuilder;

/// An unspent transaction output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnspentOutput {
    pub transaction_id: String,
    pub position: u32,
    pub asset_id: String,
    pub asset_alias: Option<String>,
    pub amount: u64,
    pub account_id: Option<String>,
    pub account_alias: Option<String>,
    pub control_program: Option<String>,
    pub reference_data: Option<Value>,
}

/// Entry point for unspent output queries, obtained via
/// [`Client::unspent_outputs`]
pub struct UnspentOutputs<'a> {
    client: &'a Client,
}

impl Client {
    pub fn unspent_outputs(&self) -> UnspentOutputs<'_> {
        UnspentOutputs { client: self }
    }
}

impl<'a> UnspentOutputs<'a> {
    /// Query unspent outputs; `timestamp` on the builder queries a point
    /// in time instead of now.
    pub fn list(&self) -> QueryBuilder<'a, UnspentOutput> {
        QueryBuilder::new(self.client, "list-unspent-outputs")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unspent_output_deserializes() {
        let utxo: UnspentOutput = serde_json::from_value(json!({
            "transaction_id": "tx7",
            "position": 0,
            "asset_id": "a1",
            "asset_alias": "acme_common",
            "amount": 950,
            "account_alias": "acme_treasury",
            "control_program": "766baa20"
        }))
        .unwrap();

        assert_eq!(utxo.transaction_id, "tx7");
        assert_eq!(utxo.position, 0);
        assert_eq!(utxo.amount, 950);
        assert_eq!(utxo.account_id, None);
    }
}
