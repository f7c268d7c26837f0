//! Shared query plumbing for list endpoints
//!
//! Every list endpoint takes the same request shape: an opaque filter
//! expression with positional parameters (`$1`, `$2`, ...) and a cursor.
//! The filter grammar is owned by the service; the client passes it
//! through verbatim.

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::marker::PhantomData;

use crate::client::Client;
use crate::{Error, Result};

/// Request body shared by all list endpoints
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filter_params: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Grouping keys for balance queries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sum_by: Vec<String>,
    /// Point-in-time for balance and unspent-output queries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Long-poll in ascending order; used by transaction feeds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ascending_with_long_poll: Option<bool>,
}

impl QueryParams {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.filter.is_none() && !self.filter_params.is_empty() {
            return Err(Error::InvalidArgument(
                "filter parameters given without a filter".to_string(),
            ));
        }
        if self.page_size == Some(0) {
            return Err(Error::InvalidArgument(
                "page size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// One page of query results
///
/// `next` holds the cursor-bearing parameters for the following page, as
/// returned by the service.
#[derive(Debug, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub last_page: bool,
    #[serde(default)]
    pub next: QueryParams,
    #[serde(skip)]
    pub(crate) endpoint: &'static str,
}

impl<T: DeserializeOwned> Page<T> {
    /// Fetch the page after this one.
    pub async fn next_page(&self, client: &Client) -> Result<Page<T>> {
        if self.last_page {
            return Err(Error::InvalidArgument(
                "no page after the last page".to_string(),
            ));
        }
        client.fetch_page(self.endpoint, &self.next).await
    }
}

/// Builder for parameterized list queries
///
/// ```no_run
/// # async fn demo(client: &ledger_core_client::Client) -> ledger_core_client::Result<()> {
/// let page = client
///     .assets()
///     .list()
///     .filter("definition.issuer=$1")
///     .param("Acme Inc.")
///     .execute()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct QueryBuilder<'a, T> {
    client: &'a Client,
    endpoint: &'static str,
    params: QueryParams,
    _marker: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> QueryBuilder<'a, T> {
    pub(crate) fn new(client: &'a Client, endpoint: &'static str) -> Self {
        Self {
            client,
            endpoint,
            params: QueryParams::default(),
            _marker: PhantomData,
        }
    }

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

    /// Resume from a cursor returned in an earlier page.
    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.params.after = Some(cursor.into());
        self
    }

    pub fn page_size(mut self, size: u32) -> Self {
        self.params.page_size = Some(size);
        self
    }

    /// Point-in-time for balance and unspent-output queries.
    pub fn timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.params.timestamp = Some(at);
        self
    }

    /// Fetch the first page.
    pub async fn execute(self) -> Result<Page<T>> {
        self.client.fetch_page(self.endpoint, &self.params).await
    }

    /// Stream items across page boundaries until the last page.
    pub fn stream(self) -> impl Stream<Item = Result<T>> + 'a
    where
        T: 'a,
    {
        struct State<'a, T> {
            client: &'a Client,
            endpoint: &'static str,
            params: QueryParams,
            buffer: VecDeque<T>,
            done: bool,
        }

        let state = State {
            client: self.client,
            endpoint: self.endpoint,
            params: self.params,
            buffer: VecDeque::new(),
            done: false,
        };

        futures::stream::try_unfold(state, |mut state| async move {
            loop {
                if let Some(item) = state.buffer.pop_front() {
                    return Ok(Some((item, state)));
                }
                if state.done {
                    return Ok(None);
                }
                let page: Page<T> = state
                    .client
                    .fetch_page(state.endpoint, &state.params)
                    .await?;
                state.done = page.last_page;
                state.params = page.next;
                state.buffer = page.items.into();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Item {
        id: String,
    }

    #[test]
    fn params_serialize_sparsely() {
        let params = QueryParams {
            filter: Some("alias=$1".to_string()),
            filter_params: vec![json!("treasury")],
            ..QueryParams::default()
        };

        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            json!({ "filter": "alias=$1", "filter_params": ["treasury"] })
        );
    }

    #[test]
    fn positional_params_keep_insertion_order() {
        let client = Client::new("http://localhost:1999").unwrap();
        let builder = QueryBuilder::<Item>::new(&client, "list-assets")
            .filter("definition.type=$1 AND definition.subtype=$2 AND definition.class=$3")
            .param("security")
            .param("private")
            .param("preferred");

        let value = serde_json::to_value(&builder.params).unwrap();
        assert_eq!(
            value["filter_params"],
            json!(["security", "private", "preferred"])
        );
    }

    #[test]
    fn params_without_filter_rejected() {
        let params = QueryParams {
            filter_params: vec![json!("oops")],
            ..QueryParams::default()
        };
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn zero_page_size_rejected() {
        let params = QueryParams {
            page_size: Some(0),
            ..QueryParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn page_envelope_deserializes() {
        let body = json!({
            "items": [{ "id": "a1" }, { "id": "a2" }],
            "last_page": false,
            "next": { "filter": "alias=$1", "filter_params": ["treasury"], "after": "cur2" }
        });

        let page: Page<Item> = serde_json::from_value(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[1].id, "a2");
        assert!(!page.last_page);
        assert_eq!(page.next.after.as_deref(), Some("cur2"));
    }

    #[tokio::test]
    async fn next_page_past_last_is_an_error() {
        let client = Client::new("http://localhost:1999").unwrap();
        let page = Page::<Item> {
            items: vec![],
            last_page: true,
            next: QueryParams::default(),
            endpoint: "list-assets",
        };

        assert!(matches!(
            page.next_page(&client).await,
            Err(Error::InvalidArgument(_))
        ));
    }
}
