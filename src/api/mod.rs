//! Typed wrappers for the Ledger Core API
//!
//! Each resource gets an entry point on [`Client`](crate::Client)
//! (`client.accounts()`, `client.transactions()`, ...) returning a handle
//! with create builders and list queries.

pub mod access_tokens;
pub mod accounts;
pub mod assets;
pub mod balances;
pub mod core;
pub mod transaction_feeds;
pub mod transactions;
pub mod unspent_outputs;

pub use access_tokens::{AccessToken, TokenType};
pub use accounts::{Account, Receiver};
pub use assets::Asset;
pub use balances::Balance;
pub use core::{ConfigureRequest, CoreInfo};
pub use transaction_feeds::{FeedConsumer, TransactionFeed};
pub use transactions::{
    Action, ControlWithAccount, ControlWithReceiver, Issue, Retire, SetTransactionReferenceData,
    SpendAccountUnspentOutput, SpendFromAccount, SubmitResponse, Template, Transaction,
};
pub use unspent_outputs::UnspentOutput;
