//! Process wide cache of blockchain derived facts that are not tied to the
//! current user: block height, oracle prices, the maker registry and the
//! hotspot count.
//!
//! Every field is a [`Loadable`] and every fetch commits its result as one
//! state transition through a [`watch`] channel, so subscribers observe each
//! commit atomically. A field with nothing to show is marked loading while
//! its read is in flight. A fetch future that is dropped before its reads
//! complete puts such fields back the way it found them and commits nothing.

use crate::{
    client::{ChainApi, ClientError, OnboardingApi},
    error::FetchError,
    metrics::Metrics,
    types::{Maker, OraclePrice},
};
use serde::Serialize;
use std::{future::Future, sync::Arc};
use tokio::sync::watch;

const BLOCK_HEIGHT: &str = "block_height";
const CURRENT_ORACLE_PRICE: &str = "current_oracle_price";
const PREDICTED_ORACLE_PRICES: &str = "predicted_oracle_prices";
const MAKERS: &str = "makers";
const HOTSPOT_COUNT: &str = "hotspot_count";

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Loadable<T> {
    NotLoaded,
    Loading,
    Loaded(T),
    Failed(FetchError),
}

impl<T> Default for Loadable<T> {
    fn default() -> Self {
        Self::NotLoaded
    }
}

impl<T> Loadable<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            Self::Failed(error) => Some(error),
            _ => None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }

    /// Nothing to show yet, neither a value nor a fetch in flight.
    fn is_idle(&self) -> bool {
        matches!(self, Self::NotLoaded | Self::Failed(_))
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct HeliumDataState {
    pub block_height: Loadable<u64>,
    pub current_oracle_price: Loadable<OraclePrice>,
    pub predicted_oracle_prices: Loadable<Vec<OraclePrice>>,
    pub makers: Loadable<Vec<Maker>>,
    pub hotspot_count: Loadable<u64>,
}

impl HeliumDataState {
    /// Predicted prices, empty until first loaded.
    pub fn predicted_oracle_prices(&self) -> &[OraclePrice] {
        self.predicted_oracle_prices
            .value()
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

#[derive(Clone)]
pub struct HeliumData {
    sender: Arc<watch::Sender<HeliumDataState>>,
}

impl Default for HeliumData {
    fn default() -> Self {
        Self::new()
    }
}

impl HeliumData {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(HeliumDataState::default());
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<HeliumDataState> {
        self.sender.subscribe()
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> HeliumDataState {
        self.sender.borrow().clone()
    }

    /// Whether the maker registry has been loaded.
    pub fn makers_loaded(&self) -> bool {
        self.sender.borrow().makers.is_loaded()
    }

    /// Updates the block height only if it changed. An equal height leaves
    /// the state untouched and subscribers are not notified.
    pub async fn fetch_block_height<C>(&self, chain: &C) -> Result<u64, FetchError>
    where
        C: ChainApi + ?Sized,
    {
        let height = self
            .fetch(
                BLOCK_HEIGHT,
                |state| &mut state.block_height,
                chain.get_block_height(),
            )
            .await?;

        let changed = self.sender.send_if_modified(|state| {
            if state.block_height.value() == Some(&height) {
                false
            } else {
                state.block_height = Loadable::Loaded(height);
                true
            }
        });
        if changed {
            tracing::debug!(height, "block height updated");
            Metrics::block_height(height);
        }
        Ok(height)
    }

    pub async fn fetch_current_oracle_price<C>(&self, chain: &C) -> Result<OraclePrice, FetchError>
    where
        C: ChainApi + ?Sized,
    {
        let price = self
            .fetch(
                CURRENT_ORACLE_PRICE,
                |state| &mut state.current_oracle_price,
                chain.get_current_oracle_price(),
            )
            .await?;

        Metrics::oracle_price(&price.price);
        tracing::info!(price = %price.price, "current oracle price updated");
        self.sender.send_modify(|state| {
            state.current_oracle_price = Loadable::Loaded(price.clone());
        });
        Ok(price)
    }

    pub async fn fetch_predicted_oracle_prices<C>(
        &self,
        chain: &C,
    ) -> Result<Vec<OraclePrice>, FetchError>
    where
        C: ChainApi + ?Sized,
    {
        let prices = self
            .fetch(
                PREDICTED_ORACLE_PRICES,
                |state| &mut state.predicted_oracle_prices,
                chain.get_predicted_oracle_prices(),
            )
            .await?;

        tracing::debug!(count = prices.len(), "predicted oracle prices updated");
        self.sender.send_modify(|state| {
            state.predicted_oracle_prices = Loadable::Loaded(prices.clone());
        });
        Ok(prices)
    }

    pub async fn fetch_hotspot_count<C>(&self, chain: &C) -> Result<u64, FetchError>
    where
        C: ChainApi + ?Sized,
    {
        let count = self
            .fetch(
                HOTSPOT_COUNT,
                |state| &mut state.hotspot_count,
                chain.get_hotspot_count(),
            )
            .await?;

        self.sender.send_modify(|state| {
            state.hotspot_count = Loadable::Loaded(count);
        });
        Ok(count)
    }

    /// Reads oracle prices, makers and block height concurrently and commits
    /// them as a single transition. Nothing is committed unless all four
    /// reads succeed.
    pub async fn fetch_initial_data<O, C>(&self, onboarding: &O, chain: &C) -> Result<(), FetchError>
    where
        O: OnboardingApi + ?Sized,
        C: ChainApi + ?Sized,
    {
        let guards = (
            self.loading(|state| &mut state.current_oracle_price),
            self.loading(|state| &mut state.predicted_oracle_prices),
            self.loading(|state| &mut state.makers),
            self.loading(|state| &mut state.block_height),
        );

        let results = futures::join!(
            chain.get_current_oracle_price(),
            chain.get_predicted_oracle_prices(),
            onboarding.get_makers(),
            chain.get_block_height(),
        );

        guards.0.disarm();
        guards.1.disarm();
        guards.2.disarm();
        guards.3.disarm();
        for (field, success) in bundle_outcomes(&results) {
            Metrics::fetch(field, success);
        }

        let error = match results {
            (Ok(price), Ok(predicted), Ok(makers), Ok(height)) => {
                Metrics::oracle_price(&price.price);
                Metrics::block_height(height);
                tracing::info!(
                    height,
                    price = %price.price,
                    makers = makers.len(),
                    "initial helium data loaded"
                );
                self.sender.send_modify(|state| {
                    state.current_oracle_price = Loadable::Loaded(price);
                    state.predicted_oracle_prices = Loadable::Loaded(predicted);
                    state.makers = Loadable::Loaded(makers);
                    state.block_height = Loadable::Loaded(height);
                });
                return Ok(());
            }
            (Err(err), ..) => FetchError::new(CURRENT_ORACLE_PRICE, err),
            (_, Err(err), ..) => FetchError::new(PREDICTED_ORACLE_PRICES, err),
            (_, _, Err(err), _) => FetchError::new(MAKERS, err),
            (_, _, _, Err(err)) => FetchError::new(BLOCK_HEIGHT, err),
        };

        tracing::warn!(%error, "initial helium data fetch failed");
        self.sender.send_if_modified(|state| {
            let mut modified = false;
            modified |= mark_failed(&mut state.current_oracle_price, &error);
            modified |= mark_failed(&mut state.predicted_oracle_prices, &error);
            modified |= mark_failed(&mut state.makers, &error);
            modified |= mark_failed(&mut state.block_height, &error);
            modified
        });
        Err(error)
    }

    pub async fn fetch_makers<O>(&self, onboarding: &O) -> Result<Vec<Maker>, FetchError>
    where
        O: OnboardingApi + ?Sized,
    {
        let makers = self
            .fetch(MAKERS, |state| &mut state.makers, onboarding.get_makers())
            .await?;

        self.sender.send_modify(|state| {
            state.makers = Loadable::Loaded(makers.clone());
        });
        Ok(makers)
    }

    /// Runs a single field read. Marks the field loading when it has nothing
    /// to show, and failed when the read errors and it still has nothing to
    /// show. The successful value is left for the caller to commit.
    async fn fetch<T, F, Fut>(&self, field: &'static str, slot: F, read: Fut) -> Result<T, FetchError>
    where
        F: Fn(&mut HeliumDataState) -> &mut Loadable<T> + Copy,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        let guard = self.loading(slot);
        let result = read.await;
        guard.disarm();

        match result {
            Ok(value) => {
                Metrics::fetch(field, true);
                Ok(value)
            }
            Err(err) => {
                let error = FetchError::new(field, err);
                tracing::warn!(%error, "helium data fetch failed");
                Metrics::fetch(field, false);
                self.sender
                    .send_if_modified(|state| mark_failed(slot(state), &error));
                Err(error)
            }
        }
    }

    /// Marks the field loading if it has nothing to show. The returned guard
    /// restores it if dropped before [`LoadingGuard::disarm`].
    fn loading<T, F>(&self, slot: F) -> LoadingGuard<'_, T, F>
    where
        F: Fn(&mut HeliumDataState) -> &mut Loadable<T>,
    {
        let mut previous = None;
        self.sender.send_if_modified(|state| {
            let field = slot(state);
            if field.is_idle() {
                previous = Some(std::mem::replace(field, Loadable::Loading));
                true
            } else {
                false
            }
        });
        LoadingGuard {
            sender: &self.sender,
            slot,
            previous,
        }
    }
}

struct LoadingGuard<'a, T, F>
where
    F: Fn(&mut HeliumDataState) -> &mut Loadable<T>,
{
    sender: &'a watch::Sender<HeliumDataState>,
    slot: F,
    previous: Option<Loadable<T>>,
}

impl<T, F> LoadingGuard<'_, T, F>
where
    F: Fn(&mut HeliumDataState) -> &mut Loadable<T>,
{
    /// The read completed, the caller commits its outcome.
    fn disarm(mut self) {
        self.previous = None;
    }
}

impl<T, F> Drop for LoadingGuard<'_, T, F>
where
    F: Fn(&mut HeliumDataState) -> &mut Loadable<T>,
{
    fn drop(&mut self) {
        let Some(previous) = self.previous.take() else {
            return;
        };
        let slot = &self.slot;
        self.sender.send_if_modified(|state| {
            let field = slot(state);
            if field.is_loading() {
                *field = previous;
                true
            } else {
                false
            }
        });
    }
}

/// Per field outcome of the initial bundle reads, in bundle order.
fn bundle_outcomes<A, B, C, D>(
    results: &(
        Result<A, ClientError>,
        Result<B, ClientError>,
        Result<C, ClientError>,
        Result<D, ClientError>,
    ),
) -> [(&'static str, bool); 4] {
    [
        (CURRENT_ORACLE_PRICE, results.0.is_ok()),
        (PREDICTED_ORACLE_PRICES, results.1.is_ok()),
        (MAKERS, results.2.is_ok()),
        (BLOCK_HEIGHT, results.3.is_ok()),
    ]
}

fn mark_failed<T>(slot: &mut Loadable<T>, error: &FetchError) -> bool {
    if slot.is_loaded() {
        false
    } else {
        *slot = Loadable::Failed(error.clone());
        true
    }
}
