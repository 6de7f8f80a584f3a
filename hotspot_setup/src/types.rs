use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// USD value of a single data credit. Fixed by the network.
pub const DC_USD_PRICE: Decimal = dec!(0.00001);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HotspotType {
    Iot,
    Mobile,
}

impl HotspotType {
    /// Lower case network name as used in onboarding server routes.
    pub fn as_path(&self) -> &'static str {
        match self {
            Self::Iot => "iot",
            Self::Mobile => "mobile",
        }
    }
}

impl fmt::Display for HotspotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iot => f.write_str("IOT"),
            Self::Mobile => f.write_str("MOBILE"),
        }
    }
}

/// A base64 encoded, serialized solana transaction. Never inspected here,
/// only carried from the onboarding server to the submission step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolanaTransaction(String);

impl SolanaTransaction {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SolanaTransaction {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SolanaTransaction {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balances {
    pub hnt: Decimal,
    pub dc: u64,
    pub sol: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerFees {
    pub dc: u64,
    pub sol: Decimal,
}

impl OwnerFees {
    pub fn dc_usd(&self) -> Decimal {
        Decimal::from(self.dc) * DC_USD_PRICE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OraclePrice {
    /// USD per HNT
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Maker {
    pub id: u64,
    pub name: String,
    pub address: String,
    #[serde(default)]
    pub location_nonce_limit: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub id: u64,
    pub onboarding_key: String,
    #[serde(default)]
    pub public_address: Option<String>,
    pub maker_id: u64,
    #[serde(default)]
    pub maker: Option<Maker>,
}

/// On-chain hotspot info. Only its presence matters to the confirmation
/// flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotDetails {
    pub address: String,
    pub owner: String,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub elevation: Option<i32>,
    #[serde(default)]
    pub gain: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertData {
    pub balances: Balances,
    pub owner_fees: OwnerFees,
    pub oracle_price: OraclePrice,
    pub has_sufficient_balance: bool,
    pub has_sufficient_sol: bool,
    pub is_free: bool,
    pub solana_transactions: Vec<SolanaTransaction>,
}

impl AssertData {
    pub fn insufficient_sol(&self) -> bool {
        !self.has_sufficient_sol
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardTransactions {
    pub solana_transactions: Vec<SolanaTransaction>,
}

/// Location parameters shared by the assert and onboard requests.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationParams {
    pub decimal_gain: f64,
    pub elevation: i32,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertRequest<'a> {
    #[serde(flatten)]
    pub location: LocationParams,
    pub gateway: &'a str,
    pub owner: &'a str,
    pub onboarding_record: &'a OnboardingRecord,
    pub hotspot_types: &'a [HotspotType],
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardRequest<'a> {
    pub hotspot_address: &'a str,
    pub hotspot_types: &'a [HotspotType],
    #[serde(flatten)]
    pub location: LocationParams,
}
