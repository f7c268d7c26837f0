//! Template signing through remote HSM connections
//!
//! Mirrors the shape of the service's signing protocol: a template's
//! signing instructions name the xpubs whose signatures are required; the
//! signer routes the template to whichever HSM holds each key and
//! accumulates signatures across connections.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::Key;
use crate::api::transactions::{Template, WitnessComponent};
use crate::client::Client;
use crate::{Error, Result};

/// Anything that can complete a transaction template's signatures.
#[async_trait]
pub trait TemplateSigner {
    async fn sign(&self, template: Template) -> Result<Template>;
}

#[derive(Serialize)]
struct SignRequest<'a> {
    transaction: &'a Template,
    xpubs: &'a [String],
}

/// Routes templates to the HSM connections that hold their keys
///
/// Register each key with the connection that can sign for it, then hand
/// built templates to [`HsmSigner::sign`]. A template needing an
/// unregistered xpub fails without any network traffic.
#[derive(Default)]
pub struct HsmSigner {
    /// Signing connections, unique by URL
    connections: Vec<Client>,
    /// xpub -> index into `connections`
    key_index: HashMap<String, usize>,
}

impl HsmSigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a key with the connection that can sign for it.
    pub fn add_key(&mut self, key: &Key, connection: Client) {
        self.add_xpub(key.xpub.clone(), connection);
    }

    /// Register a bare xpub with a signing connection.
    pub fn add_xpub(&mut self, xpub: impl Into<String>, connection: Client) {
        let index = self
            .connections
            .iter()
            .position(|c| c.url() == connection.url())
            .unwrap_or_else(|| {
                self.connections.push(connection);
                self.connections.len() - 1
            });
        self.key_index.insert(xpub.into(), index);
    }

    /// The number of registered xpubs.
    pub fn key_count(&self) -> usize {
        self.key_index.len()
    }

    /// Group the template's required xpubs by signing connection.
    fn route(&self, template: &Template) -> Result<BTreeMap<usize, Vec<String>>> {
        let mut by_connection: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for instruction in &template.signing_instructions {
            for component in &instruction.witness_components {
                let WitnessComponent::Signature { keys, .. } = component else {
                    continue;
                };
                for key in keys {
                    let index = self.key_index.get(&key.xpub).ok_or_else(|| {
                        Error::Hsm(format!("no signing connection for xpub {}", key.xpub))
                    })?;
                    let xpubs = by_connection.entry(*index).or_default();
                    if !xpubs.contains(&key.xpub) {
                        xpubs.push(key.xpub.clone());
                    }
                }
            }
        }
        Ok(by_connection)
    }
}

#[async_trait]
impl TemplateSigner for HsmSigner {
    /// Send the template to each involved HSM in turn, accumulating
    /// signatures.
    async fn sign(&self, template: Template) -> Result<Template> {
        let routes = self.route(&template)?;

        let mut template = template;
        for (index, xpubs) in routes {
            tracing::debug!(
                connection = self.connections[index].url(),
                keys = xpubs.len(),
                "Requesting signatures"
            );
            template = self.connections[index]
                .post(
                    "sign-transaction",
                    &SignRequest {
                        transaction: &template,
                        xpubs: &xpubs,
                    },
                )
                .await?;
        }
        Ok(template)
    }
}
