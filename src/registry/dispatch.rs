//! Write-intent dispatcher: turns a user action on a policy into a chain
//! submission, or rejects it locally before anything leaves the process.
//!
//! Fire-and-forget: the dispatcher never mutates the mirror and never
//! retries. The next poll cycle is the sole source of truth for whether a
//! submission actually changed anything.

use std::sync::Arc;
use tracing::{info, warn};

use super::client::{RegistryCall, RegistryTransport};
use super::status;
use crate::models::PolicyRecord;

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Rejected locally; nothing was submitted.
    #[error("policy {id} is not purchasable: {reason}")]
    NotPurchasable { id: u64, reason: &'static str },
    #[error("policy {id} is not claimable: {reason}")]
    NotClaimable { id: u64, reason: &'static str },
    /// The node or signer rejected the submission. No automatic retry.
    #[error("submission failed for policy {id}: {cause}")]
    Submission { id: u64, cause: anyhow::Error },
}

pub struct PolicyDispatcher {
    transport: Arc<dyn RegistryTransport>,
}

impl PolicyDispatcher {
    pub fn new(transport: Arc<dyn RegistryTransport>) -> Self {
        Self { transport }
    }

    /// Buy an open policy, paying its premium as the attached value.
    /// Uses the same deadline predicate as the listing's "Buy" flag.
    pub async fn purchase(&self, record: &PolicyRecord, now: i64) -> Result<String, DispatchError> {
        if !status::purchase_enabled(record, now) {
            let reason = if record.is_finalized {
                "already finalized"
            } else {
                "purchase deadline passed"
            };
            return Err(DispatchError::NotPurchasable {
                id: record.id,
                reason,
            });
        }

        let call = RegistryCall::purchase(record.id, record.premium);
        self.submit(record.id, call).await
    }

    /// Trigger settlement of a matured policy. No value attached.
    pub async fn claim(&self, record: &PolicyRecord, now: i64) -> Result<String, DispatchError> {
        if !status::claim_enabled(record, now) {
            let reason = if !record.is_finalized {
                "never finalized"
            } else if record.is_paid_out {
                "already paid out"
            } else {
                "not yet matured"
            };
            return Err(DispatchError::NotClaimable {
                id: record.id,
                reason,
            });
        }

        self.submit(record.id, RegistryCall::settle(record.id)).await
    }

    async fn submit(&self, id: u64, call: RegistryCall) -> Result<String, DispatchError> {
        let method = call.method;
        match self.transport.submit(call).await {
            Ok(tx_hash) => {
                info!(policy_id = id, method, tx_hash = %tx_hash, "write-intent submitted");
                Ok(tx_hash)
            }
            Err(cause) => {
                warn!(policy_id = id, method, error = %cause, "write-intent rejected");
                Err(DispatchError::Submission { id, cause })
            }
        }
    }
}
