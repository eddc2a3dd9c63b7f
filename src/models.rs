use serde::{Deserialize, Serialize};

/// The all-zero address. A policy whose insurer equals this marks the end of
/// the populated registry range.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// A policy mirrored from the on-chain registry. The contract is
/// authoritative; this struct is rebuilt wholesale on every poll cycle and
/// never mutated locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    /// Registry key, 1-based and sequential.
    pub id: u64,
    pub insurer: String,
    pub policyholder: String,
    pub is_finalized: bool,
    pub is_paid_out: bool,
    /// Native-token base units. Serialized as decimal strings: wei-scale
    /// amounts overflow JSON numbers.
    #[serde(with = "amount_string")]
    pub coverage: u128,
    #[serde(with = "amount_string")]
    pub premium: u128,
    /// Unix seconds after which a finalized policy becomes claimable.
    pub maturity_second: i64,
    /// Unix seconds after which an unfinalized policy can no longer be bought.
    pub purchase_deadline: i64,
    #[serde(with = "amount_string")]
    pub deposit: u128,
}

mod amount_string {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(D::Error::custom)
    }
}

/// Display category for a policy. Exactly one holds for any record at any
/// instant; rank order drives the marketplace listing (actionable first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyStatus {
    Claimable,
    Active,
    Purchasable,
    Settled,
}

impl PolicyStatus {
    /// Sort rank: claimable < active < purchasable < settled.
    pub fn rank(&self) -> u8 {
        match self {
            PolicyStatus::Claimable => 1,
            PolicyStatus::Active => 2,
            PolicyStatus::Purchasable => 3,
            PolicyStatus::Settled => 4,
        }
    }
}

/// A classified policy as served to the dashboard. The enable flags use the
/// same deadline/maturity predicates as the dispatcher, so what the UI offers
/// and what the dispatcher accepts never diverge.
#[derive(Debug, Clone, Serialize)]
pub struct ClassifiedPolicy {
    #[serde(flatten)]
    pub record: PolicyRecord,
    pub status: PolicyStatus,
    pub rank: u8,
    pub purchase_enabled: bool,
    pub claim_enabled: bool,
}

/// Pushed to WebSocket consumers after each committed poll cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "event")]
pub enum MirrorEvent {
    Refreshed {
        policies: usize,
        terminated_by: String,
        at: i64,
    },
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub rpc_url: String,
    pub contract_address: String,
    /// Unlocked account used as `from` on submissions. None means read-only:
    /// write-intents are disabled, not attempted.
    pub sender_address: Option<String>,
    pub port: u16,
    pub poll_interval_secs: u64,
    pub scan_cap: u64,
    pub rpc_timeout_secs: u64,
    pub weather_api_url: Option<String>,
    pub weather_poll_secs: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let rpc_url = std::env::var("RPC_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:8545".to_string());

        let contract_address = std::env::var("CONTRACT_ADDRESS")
            .unwrap_or_else(|_| "0xe4ee44a1703f3ed5b4aa58641a6ca0b2f4966a7c".to_string());

        let sender_address = std::env::var("SENDER_ADDRESS")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .unwrap_or(8080);

        let poll_interval_secs = std::env::var("POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let scan_cap = std::env::var("SCAN_CAP")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);

        let rpc_timeout_secs = std::env::var("RPC_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let weather_api_url = std::env::var("WEATHER_API_URL")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let weather_poll_secs = std::env::var("WEATHER_POLL_SECS")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        Ok(Self {
            rpc_url,
            contract_address,
            sender_address,
            port,
            poll_interval_secs,
            scan_cap,
            rpc_timeout_secs,
            weather_api_url,
            weather_poll_secs,
        })
    }
}
