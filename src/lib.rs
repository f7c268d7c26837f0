//! Ledger Core client SDK
//!
//! A typed async client for the Ledger Core API:
//! - Create signing keys in the core-hosted mock HSM
//! - Create accounts and asset definitions
//! - Build transaction templates (issue, transfer, retire), sign them
//!   through the HSM signer, and submit them
//! - Run parameterized queries over assets, accounts, transactions,
//!   balances, and unspent outputs, with cursor pagination
//!
//! # Security Model
//!
//! - Private keys live in the HSM; this crate only ever handles xpubs and
//!   signing instructions
//! - Access tokens are held as [`secrecy::SecretString`] and are never
//!   serialized or logged

pub mod api;
pub mod client;
pub mod config;
pub mod hsm;
pub mod query;

mod error;

// Re-export commonly used types
pub use client::{Client, ClientBuilder};
pub use config::{Config, LEDGER_ACCESS_TOKEN_ENV, LEDGER_HSM_URL_ENV, LEDGER_URL_ENV};
pub use error::{Error, Result};
pub use hsm::{HsmSigner, MockHsm, TemplateSigner};
pub use query::Page;
