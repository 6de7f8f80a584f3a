use anyhow::Result;
use clap::Parser;
use hotspot_setup::{
    metrics, ConfirmLocation, ConfirmLocationParams, HeliumData, HttpClient, Refresher, Settings,
};
use std::{path::PathBuf, sync::Arc};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, clap::Parser)]
#[clap(version = env!("CARGO_PKG_VERSION"))]
#[clap(about = "Helium Hotspot Setup")]
pub struct Cli {
    /// Optional configuration file to use. If present the toml file at the
    /// given path will be loaded. Env variables can override the
    /// settings in the given file.
    #[clap(short = 'c')]
    config: Option<PathBuf>,

    #[clap(subcommand)]
    cmd: Cmd,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let settings = Settings::new(self.config)?;
        tracing_subscriber::registry()
            .with(tracing_subscriber::EnvFilter::new(&settings.log))
            .with(tracing_subscriber::fmt::layer())
            .init();

        self.cmd.run(settings).await
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Cmd {
    /// Keep helium data fresh until terminated
    Server(Server),
    /// Confirm the location of a hotspot and print the submission payload
    Confirm(Confirm),
    /// Fetch helium data once and print it
    Check,
}

impl Cmd {
    pub async fn run(self, settings: Settings) -> Result<()> {
        match self {
            Self::Server(cmd) => cmd.run(&settings).await,
            Self::Confirm(cmd) => cmd.run(&settings).await,
            Self::Check => check(&settings).await,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct Server {}

impl Server {
    pub async fn run(&self, settings: &Settings) -> Result<()> {
        metrics::install(&settings.metrics)?;

        // configure shutdown trigger
        let (shutdown_trigger, shutdown) = triggered::trigger();

        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => shutdown_trigger.trigger(),
                _ = signal::ctrl_c() => shutdown_trigger.trigger(),
            }
        });

        let client = Arc::new(HttpClient::from_settings(settings)?);
        let data = HeliumData::new();

        let mut receiver = data.subscribe();
        let watch_shutdown = shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = watch_shutdown.clone() => break,
                    changed = receiver.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let state = receiver.borrow_and_update();
                        tracing::debug!(
                            block_height = ?state.block_height.value(),
                            oracle_price = ?state.current_oracle_price.value().map(|price| price.price),
                            predictions = state.predicted_oracle_prices().len(),
                            makers = ?state.makers.value().map(Vec::len),
                            "helium data changed"
                        );
                    }
                }
            }
        });

        Refresher::new(data, client.clone(), client, settings)
            .run(shutdown)
            .await
    }
}

#[derive(Debug, clap::Args)]
pub struct Confirm {
    /// Hotspot address
    hotspot: String,
    #[clap(long, allow_hyphen_values = true)]
    lat: f64,
    #[clap(long, allow_hyphen_values = true)]
    lng: f64,
    /// Elevation in meters
    #[clap(long, default_value_t = 0)]
    elevation: i32,
    /// Antenna gain in dBi
    #[clap(long, default_value_t = 1.2)]
    gain: f64,
    /// Owner wallet address, overrides the configured owner
    #[clap(long)]
    owner: Option<String>,
    /// Add gateway transaction already held for this hotspot
    #[clap(long)]
    add_gateway_txn: Option<String>,
}

impl Confirm {
    pub async fn run(self, settings: &Settings) -> Result<()> {
        let client = HttpClient::from_settings(settings)?;
        let params = ConfirmLocationParams {
            hotspot_address: self.hotspot,
            coords: [self.lng, self.lat],
            elevation: self.elevation,
            gain: self.gain,
            add_gateway_txn: self.add_gateway_txn,
            location_name: None,
        };
        let owner = self.owner.or_else(|| settings.owner.clone());
        let mut session = ConfirmLocation::new(params, owner, settings.hotspot_types.clone());

        let (teardown_trigger, teardown) = triggered::trigger();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                teardown_trigger.trigger();
            }
        });
        session.resolve(&client, &client, &teardown).await?;

        if session.is_free() == Some(true) {
            println!("Asserting this location is free");
        } else if let Some(assert_data) = session.assert_data() {
            println!("Asserting this location carries a fee");
            println!("Balance   HNT {}", assert_data.balances.hnt.round_dp(4));
            println!("          DC  {}", assert_data.balances.dc);
            println!("          SOL {}", assert_data.balances.sol.round_dp(4));
            println!(
                "Fee       ${} ({} DC)",
                assert_data.owner_fees.dc_usd().round_dp(2),
                assert_data.owner_fees.dc
            );
            println!("          SOL {}", assert_data.owner_fees.sol.round_dp(2));
            if assert_data.insufficient_sol() {
                println!("Not enough SOL to pay transaction fees");
            }
        }

        let handoff = session.advance()?;
        println!("{}", serde_json::to_string_pretty(&handoff)?);
        Ok(())
    }
}

async fn check(settings: &Settings) -> Result<()> {
    let client = HttpClient::from_settings(settings)?;
    let data = HeliumData::new();
    data.fetch_initial_data(&client, &client).await?;
    println!("{}", serde_json::to_string_pretty(&data.snapshot())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.run().await
}
