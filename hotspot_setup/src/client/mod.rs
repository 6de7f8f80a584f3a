pub mod http;

use crate::types::{
    AssertData, AssertRequest, HotspotDetails, HotspotType, Maker, OnboardRequest,
    OnboardTransactions, OnboardingRecord, OraclePrice,
};

pub use http::HttpClient;

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    UnexpectedStatus(String),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected value {0}")]
    Value(String),
}

/// Onboarding server operations: onboarding records, maker registry and
/// transaction construction for location assertion.
#[async_trait::async_trait]
pub trait OnboardingApi: Send + Sync {
    async fn get_onboarding_record(&self, address: &str)
        -> Result<OnboardingRecord, ClientError>;

    async fn get_assert_data(&self, request: AssertRequest<'_>)
        -> Result<AssertData, ClientError>;

    async fn get_onboard_transactions(
        &self,
        request: OnboardRequest<'_>,
    ) -> Result<OnboardTransactions, ClientError>;

    async fn get_makers(&self) -> Result<Vec<Maker>, ClientError>;
}

/// Blockchain reads.
#[async_trait::async_trait]
pub trait ChainApi: Send + Sync {
    /// Returns `None` when the hotspot is not on chain yet.
    async fn get_hotspot_details(
        &self,
        address: &str,
        hotspot_type: HotspotType,
    ) -> Result<Option<HotspotDetails>, ClientError>;

    async fn get_block_height(&self) -> Result<u64, ClientError>;

    async fn get_current_oracle_price(&self) -> Result<OraclePrice, ClientError>;

    async fn get_predicted_oracle_prices(&self) -> Result<Vec<OraclePrice>, ClientError>;

    async fn get_hotspot_count(&self) -> Result<u64, ClientError>;
}
