//! Testing utilities for the registry mirror and dispatcher.
//!
//! Provides a scripted mock transport: each id maps to a record, the
//! sentinel, malformed bytes, or a hard failure, and every query and
//! submission is recorded for assertions.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

use super::client::{RegistryCall, RegistryTransport};
use super::codec;
use crate::models::{PolicyRecord, ZERO_ADDRESS};

/// Scripted outcome for one registry id. Ids with no entry behave as the
/// sentinel, matching a registry that simply ends there.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Record(PolicyRecord),
    Sentinel,
    Malformed(Vec<u8>),
    Fail,
}

pub struct MockRegistry {
    responses: Mutex<HashMap<u64, MockResponse>>,
    queried: Mutex<Vec<u64>>,
    submitted: Mutex<Vec<RegistryCall>>,
    submissions_fail: Mutex<bool>,
}

impl MockRegistry {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            queried: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
            submissions_fail: Mutex::new(false),
        }
    }

    pub fn set(&self, id: u64, response: MockResponse) {
        self.responses.lock().insert(id, response);
    }

    pub fn fail_submissions(&self) {
        *self.submissions_fail.lock() = true;
    }

    /// Ids queried so far, in order.
    pub fn queried(&self) -> Vec<u64> {
        self.queried.lock().clone()
    }

    /// Calls that reached the transport.
    pub fn submitted(&self) -> Vec<RegistryCall> {
        self.submitted.lock().clone()
    }

    fn sentinel_bytes() -> Vec<u8> {
        codec::encode_policy(&PolicyRecord {
            id: 0,
            insurer: ZERO_ADDRESS.to_string(),
            policyholder: ZERO_ADDRESS.to_string(),
            is_finalized: false,
            is_paid_out: false,
            coverage: 0,
            premium: 0,
            maturity_second: 0,
            purchase_deadline: 0,
            deposit: 0,
        })
    }
}

#[async_trait]
impl RegistryTransport for MockRegistry {
    async fn get_policy_raw(&self, id: u64) -> Result<Vec<u8>> {
        self.queried.lock().push(id);
        match self.responses.lock().get(&id) {
            Some(MockResponse::Record(record)) => Ok(codec::encode_policy(record)),
            Some(MockResponse::Malformed(bytes)) => Ok(bytes.clone()),
            Some(MockResponse::Fail) => Err(anyhow::anyhow!("connection refused")),
            Some(MockResponse::Sentinel) | None => Ok(Self::sentinel_bytes()),
        }
    }

    async fn submit(&self, call: RegistryCall) -> Result<String> {
        self.submitted.lock().push(call);
        if *self.submissions_fail.lock() {
            return Err(anyhow::anyhow!("signer rejected transaction"));
        }
        Ok("0xdeadbeef".to_string())
    }
}
