//! Location confirmation for a hotspot.
//!
//! Decides whether asserting a location is free (the hotspot is not on chain
//! yet, or the caller already holds an add gateway transaction) or carries a
//! fee, and gates the hand off to transaction submission on the owner being
//! able to pay.

use crate::{
    client::{ChainApi, OnboardingApi},
    error::{Error, Result},
    metrics::Metrics,
    types::{
        AssertData, AssertRequest, HotspotType, LocationParams, OnboardRequest, SolanaTransaction,
    },
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmLocationParams {
    pub hotspot_address: String,
    /// `[lng, lat]`
    pub coords: [f64; 2],
    pub elevation: i32,
    pub gain: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_gateway_txn: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

impl ConfirmLocationParams {
    pub fn lng(&self) -> f64 {
        self.coords[0]
    }

    pub fn lat(&self) -> f64 {
        self.coords[1]
    }

    fn location(&self) -> Result<LocationParams> {
        if self.hotspot_address.trim().is_empty() {
            return Err(Error::invalid_input("missing hotspot address"));
        }
        let (lat, lng) = (self.lat(), self.lng());
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
            return Err(Error::invalid_input(format!(
                "invalid coordinates lat {lat} lng {lng}"
            )));
        }
        if !self.gain.is_finite() {
            return Err(Error::invalid_input("invalid gain"));
        }
        Ok(LocationParams {
            decimal_gain: self.gain,
            elevation: self.elevation,
            lat,
            lng,
        })
    }
}

/// Outcome of resolving a confirmation. `assert_data` is only present for a
/// hotspot that already exists on chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub is_free: bool,
    pub assert_data: Option<AssertData>,
    pub transactions: Vec<SolanaTransaction>,
}

impl Resolution {
    fn free(transactions: Vec<SolanaTransaction>) -> Self {
        Self {
            is_free: true,
            assert_data: None,
            transactions,
        }
    }

    fn asserted(assert_data: AssertData) -> Self {
        Self {
            is_free: assert_data.is_free,
            transactions: assert_data.solana_transactions.clone(),
            assert_data: Some(assert_data),
        }
    }

    pub fn has_sufficient_balance(&self) -> bool {
        self.assert_data
            .as_ref()
            .is_some_and(|assert_data| assert_data.has_sufficient_balance)
    }

    pub fn can_advance(&self) -> bool {
        self.is_free || self.has_sufficient_balance()
    }
}

/// Payload handed to the transaction submission step. Field names and types
/// are shared with that step and must not change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionHandoff {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub add_gateway_txn: Option<String>,
    pub solana_transactions: Vec<SolanaTransaction>,
    pub hotspot_address: String,
    pub coords: [f64; 2],
    pub elevation: i32,
    pub gain: f64,
}

/// Resolves whether asserting the given location is free and collects the
/// transactions to submit.
///
/// With an `add_gateway_txn` no lookups are made. Otherwise the hotspot is
/// probed on chain: a missing hotspot gets onboard transactions and is free,
/// an existing one gets a full fee and balance assertion for `owner`.
pub async fn resolve<O, C>(
    onboarding: &O,
    chain: &C,
    params: &ConfirmLocationParams,
    owner: Option<&str>,
    hotspot_types: &[HotspotType],
) -> Result<Resolution>
where
    O: OnboardingApi + ?Sized,
    C: ChainApi + ?Sized,
{
    let location = params.location()?;
    let address = params.hotspot_address.as_str();

    if params.add_gateway_txn.is_some() {
        tracing::info!(hotspot = address, "add gateway transaction present, assert is free");
        return Ok(Resolution::free(vec![]));
    }

    let hotspot_type = hotspot_types
        .first()
        .copied()
        .ok_or_else(|| Error::invalid_input("no hotspot types configured"))?;

    let details = chain.get_hotspot_details(address, hotspot_type).await?;
    if details.is_none() {
        tracing::info!(hotspot = address, %hotspot_type, "hotspot not on chain, onboarding");
        let onboard = onboarding
            .get_onboard_transactions(OnboardRequest {
                hotspot_address: address,
                hotspot_types,
                location,
            })
            .await?;
        return Ok(Resolution::free(onboard.solana_transactions));
    }

    let owner = owner
        .filter(|owner| !owner.trim().is_empty())
        .ok_or_else(|| Error::invalid_input("missing owner address"))?;
    let onboarding_record = onboarding.get_onboarding_record(address).await?;
    let assert_data = onboarding
        .get_assert_data(AssertRequest {
            location,
            gateway: address,
            owner,
            onboarding_record: &onboarding_record,
            hotspot_types,
        })
        .await?;

    tracing::info!(
        hotspot = address,
        is_free = assert_data.is_free,
        sufficient_balance = assert_data.has_sufficient_balance,
        dc_fee = assert_data.owner_fees.dc,
        "assert data resolved"
    );
    Ok(Resolution::asserted(assert_data))
}

#[derive(Debug, Clone)]
pub enum ConfirmationState {
    Unresolved,
    Free(Resolution),
    FeeResolved(Resolution),
    Failed(Error),
    Submitting,
}

impl ConfirmationState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::Free(_) => "free",
            Self::FeeResolved(_) => "fee_resolved",
            Self::Failed(_) => "failed",
            Self::Submitting => "submitting",
        }
    }
}

/// One confirmation session. A session never moves back once submitting;
/// confirming again requires a new session.
#[derive(Debug)]
pub struct ConfirmLocation {
    params: ConfirmLocationParams,
    owner: Option<String>,
    hotspot_types: Vec<HotspotType>,
    state: ConfirmationState,
}

impl ConfirmLocation {
    pub fn new(
        params: ConfirmLocationParams,
        owner: Option<String>,
        hotspot_types: Vec<HotspotType>,
    ) -> Self {
        Self {
            params,
            owner,
            hotspot_types,
            state: ConfirmationState::Unresolved,
        }
    }

    pub fn params(&self) -> &ConfirmLocationParams {
        &self.params
    }

    pub fn state(&self) -> &ConfirmationState {
        &self.state
    }

    pub fn resolution(&self) -> Option<&Resolution> {
        match &self.state {
            ConfirmationState::Free(resolution) | ConfirmationState::FeeResolved(resolution) => {
                Some(resolution)
            }
            _ => None,
        }
    }

    /// `None` until resolved.
    pub fn is_free(&self) -> Option<bool> {
        self.resolution().map(|resolution| resolution.is_free)
    }

    pub fn assert_data(&self) -> Option<&AssertData> {
        self.resolution()
            .and_then(|resolution| resolution.assert_data.as_ref())
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.state {
            ConfirmationState::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Resolves the session, bound to the owner's lifetime through
    /// `teardown`. Triggering it abandons the lookups and leaves the session
    /// as it was.
    ///
    /// Calling this again after a failure retries, after a fee resolution it
    /// re-fetches the assertion. A free session is already final.
    pub async fn resolve<O, C>(
        &mut self,
        onboarding: &O,
        chain: &C,
        teardown: &triggered::Listener,
    ) -> Result<()>
    where
        O: OnboardingApi + ?Sized,
        C: ChainApi + ?Sized,
    {
        match self.state {
            ConfirmationState::Free(_) => return Ok(()),
            ConfirmationState::Submitting => {
                return Err(Error::InvalidTransition {
                    from: self.state.name(),
                    action: "resolve",
                })
            }
            _ => (),
        }

        let result = tokio::select! {
            biased;
            _ = teardown.clone() => Err(Error::Cancelled),
            result = resolve(
                onboarding,
                chain,
                &self.params,
                self.owner.as_deref(),
                &self.hotspot_types,
            ) => result,
        };

        match result {
            Ok(resolution) if resolution.is_free => {
                Metrics::confirmation("free");
                self.state = ConfirmationState::Free(resolution);
                Ok(())
            }
            Ok(resolution) => {
                Metrics::confirmation("fee");
                self.state = ConfirmationState::FeeResolved(resolution);
                Ok(())
            }
            Err(Error::Cancelled) => {
                tracing::debug!(hotspot = %self.params.hotspot_address, "confirmation torn down");
                Err(Error::Cancelled)
            }
            Err(err) => {
                tracing::error!(hotspot = %self.params.hotspot_address, ?err, "confirmation failed");
                Metrics::confirmation("failed");
                self.state = ConfirmationState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// Disabled unless the assert is free or the owner can pay for it.
    pub fn can_advance(&self) -> bool {
        self.resolution().is_some_and(Resolution::can_advance)
    }

    /// Moves the session to submitting and returns the payload for the
    /// submission step.
    pub fn advance(&mut self) -> Result<TransactionHandoff> {
        let resolution = match &self.state {
            ConfirmationState::Free(resolution) | ConfirmationState::FeeResolved(resolution) => {
                resolution
            }
            other => {
                return Err(Error::InvalidTransition {
                    from: other.name(),
                    action: "advance",
                })
            }
        };
        if !resolution.can_advance() {
            return Err(Error::InsufficientBalance);
        }

        let handoff = TransactionHandoff {
            add_gateway_txn: self.params.add_gateway_txn.clone(),
            solana_transactions: resolution.transactions.clone(),
            hotspot_address: self.params.hotspot_address.clone(),
            coords: self.params.coords,
            elevation: self.params.elevation,
            gain: self.params.gain,
        };
        self.state = ConfirmationState::Submitting;
        tracing::info!(
            hotspot = %handoff.hotspot_address,
            transactions = handoff.solana_transactions.len(),
            "handing off to submission"
        );
        Ok(handoff)
    }
}
