use crate::{
    client::{ChainApi, OnboardingApi},
    helium_data::HeliumData,
    settings::Settings,
};
use std::{sync::Arc, time::Duration};
use tokio::time::{self, MissedTickBehavior};

/// Keeps [`HeliumData`] fresh: loads the initial bundle, then refreshes
/// block height and oracle prices on their own intervals until shutdown.
/// Makers are fetched again on the block height tick until they load.
/// Fetch failures never stop the refresher, they are recorded in the state
/// and retried on the next tick.
pub struct Refresher<O: ?Sized, C: ?Sized> {
    data: HeliumData,
    onboarding: Arc<O>,
    chain: Arc<C>,
    block_height_interval: Duration,
    oracle_price_interval: Duration,
}

impl<O, C> Refresher<O, C>
where
    O: OnboardingApi + ?Sized,
    C: ChainApi + ?Sized,
{
    pub fn new(data: HeliumData, onboarding: Arc<O>, chain: Arc<C>, settings: &Settings) -> Self {
        Self {
            data,
            onboarding,
            chain,
            block_height_interval: settings.block_height_interval,
            oracle_price_interval: settings.oracle_price_interval,
        }
    }

    pub async fn run(self, shutdown: triggered::Listener) -> anyhow::Result<()> {
        tracing::info!(
            block_height_interval = ?self.block_height_interval,
            oracle_price_interval = ?self.oracle_price_interval,
            "starting helium data refresher"
        );

        tokio::select! {
            _ = shutdown.clone() => {
                tracing::info!("stopping helium data refresher");
                return Ok(());
            }
            result = self.data.fetch_initial_data(&*self.onboarding, &*self.chain) => {
                // failures stay visible in the state, the ticks below retry
                let _ = result;
            }
        }

        let mut block_height_timer = time::interval(self.block_height_interval);
        block_height_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut oracle_price_timer = time::interval(self.oracle_price_interval);
        oracle_price_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // the initial bundle covers the immediate first tick
        block_height_timer.tick().await;
        oracle_price_timer.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.clone() => break,
                _ = block_height_timer.tick() => {
                    if self.data.makers_loaded() {
                        let _ = self.data.fetch_block_height(&*self.chain).await;
                    } else {
                        let _ = futures::join!(
                            self.data.fetch_block_height(&*self.chain),
                            self.data.fetch_makers(&*self.onboarding),
                        );
                    }
                }
                _ = oracle_price_timer.tick() => {
                    let _ = futures::join!(
                        self.data.fetch_current_oracle_price(&*self.chain),
                        self.data.fetch_predicted_oracle_prices(&*self.chain),
                    );
                }
            }
        }

        tracing::info!("stopping helium data refresher");
        Ok(())
    }
}
