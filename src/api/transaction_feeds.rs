//! Transaction feeds: durable, filtered cursors over new transactions
//!
//! A feed stores a filter and a cursor on the core. Consumers long-poll
//! for transactions past the cursor and acknowledge what they have
//! processed, so a restarted consumer resumes where it left off.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::client::Client;
use crate::query::{Page, QueryParams};
use crate::Result;

use super::transactions::Transaction;

/// A transaction feed registered on the core
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionFeed {
    pub id: String,
    pub alias: Option<String>,
    pub filter: Option<String>,
    /// Cursor of the last acknowledged position
    pub after: Option<String>,
}

#[derive(Serialize)]
struct CreateFeedRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    alias: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    /// Idempotency token, generated per builder
    client_token: String,
}

#[derive(Serialize)]
struct GetFeedRequest<'a> {
    alias: &'a str,
}

#[derive(Serialize)]
struct DeleteFeedRequest<'a> {
    id: &'a str,
}

#[derive(Serialize)]
struct AckRequest<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_after: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    after: Option<&'a str>,
}

/// Entry point for feed operations, obtained via
/// [`Client::transaction_feeds`]
pub struct TransactionFeeds<'a> {
    client: &'a Client,
}

impl Client {
    pub fn transaction_feeds(&self) -> TransactionFeeds<'_> {
        TransactionFeeds { client: self }
    }
}

impl<'a> TransactionFeeds<'a> {
    /// Start building a new feed.
    pub fn create(&self) -> CreateFeed<'a> {
        CreateFeed {
            client: self.client,
            request: CreateFeedRequest {
                alias: None,
                filter: None,
                client_token: uuid::Uuid::new_v4().to_string(),
            },
        }
    }

    /// Fetch an existing feed by alias.
    pub async fn get(&self, alias: &str) -> Result<TransactionFeed> {
        self.client
            .post("get-transaction-feed", &GetFeedRequest { alias })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.client
            .post_ok("delete-transaction-feed", &DeleteFeedRequest { id })
            .await
    }

    /// Start consuming a feed from its stored cursor.
    pub fn consume(&self, feed: TransactionFeed) -> FeedConsumer<'a> {
        FeedConsumer {
            client: self.client,
            after: feed.after.clone(),
            acked_after: feed.after.clone(),
            feed,
            buffer: VecDeque::new(),
        }
    }
}

/// Builder for new feeds
pub struct CreateFeed<'a> {
    client: &'a Client,
    request: CreateFeedRequest,
}

impl CreateFeed<'_> {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.request.alias = Some(alias.into());
        self
    }

    /// Only transactions matching this filter enter the feed.
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.request.filter = Some(filter.into());
        self
    }

    pub async fn execute(self) -> Result<TransactionFeed> {
        self.client
            .post("create-transaction-feed", &self.request)
            .await
    }
}

/// Long-polling consumer over one feed
///
/// `next` yields transactions in order; `ack` persists the consumer's
/// position to the core. Work between the two is redelivered after a
/// crash, so processing must tolerate replays.
pub struct FeedConsumer<'a> {
    client: &'a Client,
    feed: TransactionFeed,
    after: Option<String>,
    acked_after: Option<String>,
    buffer: VecDeque<Transaction>,
}

impl FeedConsumer<'_> {
    /// The next matching transaction, long-polling until one arrives.
    pub async fn next(&mut self) -> Result<Transaction> {
        loop {
            if let Some(tx) = self.buffer.pop_front() {
                return Ok(tx);
            }
            let params = QueryParams {
                filter: self.feed.filter.clone(),
                after: self.after.clone(),
                ascending_with_long_poll: Some(true),
                ..QueryParams::default()
            };
            let page: Page<Transaction> =
                self.client.fetch_page("list-transactions", &params).await?;
            self.after = page.next.after;
            self.buffer.extend(page.items);
            // An empty page means the long poll timed out; ask again.
        }
    }

    /// Persist the position of everything returned so far.
    pub async fn ack(&mut self) -> Result<()> {
        self.client
            .post_ok(
                "update-transaction-feed",
                &AckRequest {
                    id: &self.feed.id,
                    previous_after: self.acked_after.as_deref(),
                    after: self.after.as_deref(),
                },
            )
            .await?;
        self.acked_after = self.after.clone();
        Ok(())
    }
}
