//! Balance queries: asset amounts aggregated under grouping keys

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::Client;
use crate::query::{Page, QueryParams};
use crate::Result;

/// An aggregated balance
///
/// `sum_by` names the group this amount was summed under, for example
/// `{"asset_alias": "acme_common"}` when summing by asset alias.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Balance {
    pub amount: u64,
    #[serde(default)]
    pub sum_by: Map<String, Value>,
}

/// Entry point for balance queries, obtained via [`Client::balances`]
pub struct Balances<'a> {
    client: &'a Client,
}

impl Client {
    pub fn balances(&self) -> Balances<'_> {
        Balances { client: self }
    }
}

impl<'a> Balances<'a> {
    pub fn list(&self) -> BalanceQuery<'a> {
        BalanceQuery {
            client: self.client,
            params: QueryParams::default(),
        }
    }
}

/// Builder for balance queries
///
/// Unlike the other list queries, balances take grouping keys: without
/// `sum_by`, everything matching the filter collapses into one amount.
pub struct BalanceQuery<'a> {
    client: &'a Client,
    params: QueryParams,
}

impl BalanceQuery<'_> {
    /// Filter expression with positional placeholders (`$1`, `$2`, ...).
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.params.filter = Some(filter.into());
        self
    }

    /// Append the next positional filter parameter.
    pub fn param(mut self, value: impl Into<Value>) -> Self {
        self.params.filter_params.push(value.into());
        self
    }

    /// Group sums under this field; repeatable.
    pub fn sum_by(mut self, field: impl Into<String>) -> Self {
        self.params.sum_by.push(field.into());
        self
    }

    /// Balances as of this point in time instead of now.
    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.params.timestamp = Some(at);
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.params.page_size = Some(size);
        self
    }

    pub async fn execute(self) -> Result<Page<Balance>> {
        self.client.fetch_page("list-balances", &self.params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn query_serializes_sum_by() {
        let client = Client::new("http://localhost:1999").unwrap();
        let query = client
            .balances()
            .list()
            .filter("asset_definition.issuer=$1")
            .param("Acme Inc.")
            .sum_by("asset_alias");

        let value = serde_json::to_value(&query.params).unwrap();
        assert_eq!(
            value,
            json!({
                "filter": "asset_definition.issuer=$1",
                "filter_params": ["Acme Inc."],
                "sum_by": ["asset_alias"]
            })
        );
    }

    #[test]
    fn balance_items_deserialize_with_groups() {
        let page: Page<Balance> = serde_json::from_value(json!({
            "items": [
                { "amount": 800, "sum_by": { "asset_alias": "acme_common" } },
                { "amount": 2000, "sum_by": { "asset_alias": "acme_preferred" } }
            ],
            "last_page": true,
            "next": {}
        }))
        .unwrap();

        assert_eq!(page.items[0].amount, 800);
        assert_eq!(page.items[1].sum_by["asset_alias"], "acme_preferred");
        assert!(page.last_page);
    }

    #[test]
    fn ungrouped_balance_deserializes() {
        let balance: Balance = serde_json::from_value(json!({ "amount": 1000 })).unwrap();
        assert_eq!(balance.amount, 1000);
        assert!(balance.sum_by.is_empty());
    }
}
