use super::{ChainApi, ClientError, OnboardingApi};
use crate::{
    settings::Settings,
    types::{
        AssertData, AssertRequest, HotspotDetails, HotspotType, Maker, OnboardRequest,
        OnboardTransactions, OnboardingRecord, OraclePrice,
    },
};
use chrono::{TimeZone, Utc};
use reqwest::Url;
use rust_decimal::Decimal;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// The default client useragent for onboarding and api requests
static USERAGENT: &str = concat!("hotspot-setup/", env!("CARGO_PKG_VERSION"));
/// Oracle prices are reported as integers with 8 implied decimals
const ORACLE_PRICE_DECIMALS: u32 = 8;

#[derive(Clone, Debug)]
pub struct HttpClient {
    client: reqwest::Client,
    api_url: Url,
    onboarding_url: Url,
}

/// Response envelope used by both the api and the onboarding server
#[derive(Deserialize)]
struct Data<T> {
    data: T,
}

#[derive(Deserialize)]
struct RawHeight {
    height: u64,
}

#[derive(Deserialize)]
struct RawCounts {
    hotspots: u64,
}

#[derive(Debug, Deserialize)]
struct RawOraclePrice {
    price: i64,
    #[serde(default)]
    block: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawPrediction {
    price: i64,
    time: i64,
}

impl From<RawOraclePrice> for OraclePrice {
    fn from(value: RawOraclePrice) -> Self {
        Self {
            price: Decimal::new(value.price, ORACLE_PRICE_DECIMALS),
            height: value.block,
            timestamp: None,
        }
    }
}

impl TryFrom<RawPrediction> for OraclePrice {
    type Error = ClientError;

    fn try_from(value: RawPrediction) -> Result<Self, Self::Error> {
        let timestamp = Utc
            .timestamp_opt(value.time, 0)
            .single()
            .ok_or_else(|| ClientError::Value(format!("invalid prediction time {}", value.time)))?;
        Ok(Self {
            price: Decimal::new(value.price, ORACLE_PRICE_DECIMALS),
            height: None,
            timestamp: Some(timestamp),
        })
    }
}

impl HttpClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(USERAGENT)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self {
            client,
            api_url: base_url(&settings.api_url)?,
            onboarding_url: base_url(&settings.onboarding_url)?,
        })
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        tracing::debug!(%url, "get");
        let response = self.client.get(url.clone()).send().await?;
        decode(url, response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, ClientError> {
        tracing::debug!(%url, "post");
        let response = self.client.post(url.clone()).json(body).send().await?;
        decode(url, response).await
    }

    fn hotspot_url(&self, address: &str, hotspot_type: HotspotType) -> Result<Url, ClientError> {
        let mut url = endpoint(&self.api_url, &["v1", "hotspots", address])?;
        url.query_pairs_mut()
            .append_pair("network", hotspot_type.as_path());
        Ok(url)
    }
}

fn base_url(url: &str) -> Result<Url, ClientError> {
    let parsed =
        Url::parse(url).map_err(|err| ClientError::Value(format!("invalid url {url}: {err}")))?;
    if parsed.cannot_be_a_base() {
        return Err(ClientError::Value(format!("invalid base url {url}")));
    }
    Ok(parsed)
}

/// Appends path segments to a base url. Each segment is percent encoded, so
/// caller supplied values cannot change the route.
fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, ClientError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| ClientError::Value(format!("invalid base url {base}")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

async fn decode<T: DeserializeOwned>(
    url: Url,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    match response.status() {
        reqwest::StatusCode::OK | reqwest::StatusCode::CREATED => {
            let bytes = response.bytes().await?;
            let envelope: Data<T> = serde_json::from_slice(&bytes)?;
            Ok(envelope.data)
        }
        reqwest::StatusCode::NOT_FOUND => Err(ClientError::NotFound(url.to_string())),
        other => Err(ClientError::UnexpectedStatus(other.to_string())),
    }
}

#[async_trait::async_trait]
impl OnboardingApi for HttpClient {
    async fn get_onboarding_record(
        &self,
        address: &str,
    ) -> Result<OnboardingRecord, ClientError> {
        self.get(endpoint(
            &self.onboarding_url,
            &["api", "v3", "hotspots", address],
        )?)
        .await
    }

    async fn get_assert_data(
        &self,
        request: AssertRequest<'_>,
    ) -> Result<AssertData, ClientError> {
        self.post(
            endpoint(&self.onboarding_url, &["api", "v3", "transactions", "assert"])?,
            &request,
        )
        .await
    }

    async fn get_onboard_transactions(
        &self,
        request: OnboardRequest<'_>,
    ) -> Result<OnboardTransactions, ClientError> {
        self.post(
            endpoint(&self.onboarding_url, &["api", "v3", "transactions", "onboard"])?,
            &request,
        )
        .await
    }

    async fn get_makers(&self) -> Result<Vec<Maker>, ClientError> {
        self.get(endpoint(&self.onboarding_url, &["api", "v3", "makers"])?)
            .await
    }
}

#[async_trait::async_trait]
impl ChainApi for HttpClient {
    async fn get_hotspot_details(
        &self,
        address: &str,
        hotspot_type: HotspotType,
    ) -> Result<Option<HotspotDetails>, ClientError> {
        match self.get(self.hotspot_url(address, hotspot_type)?).await {
            Ok(details) => Ok(Some(details)),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    async fn get_block_height(&self) -> Result<u64, ClientError> {
        let raw: RawHeight = self
            .get(endpoint(&self.api_url, &["v1", "blocks", "height"])?)
            .await?;
        Ok(raw.height)
    }

    async fn get_current_oracle_price(&self) -> Result<OraclePrice, ClientError> {
        let raw: RawOraclePrice = self
            .get(endpoint(&self.api_url, &["v1", "oracle", "prices", "current"])?)
            .await?;
        Ok(raw.into())
    }

    async fn get_predicted_oracle_prices(&self) -> Result<Vec<OraclePrice>, ClientError> {
        let raw: Vec<RawPrediction> = self
            .get(endpoint(&self.api_url, &["v1", "oracle", "predictions"])?)
            .await?;
        raw.into_iter().map(OraclePrice::try_from).collect()
    }

    async fn get_hotspot_count(&self) -> Result<u64, ClientError> {
        let raw: RawCounts = self
            .get(endpoint(&self.api_url, &["v1", "stats", "counts"])?)
            .await?;
        Ok(raw.hotspots)
    }
}
