pub mod client;
pub mod confirm;
pub mod error;
pub mod helium_data;
pub mod metrics;
pub mod refresher;
pub mod settings;
pub mod types;

pub use client::{ChainApi, ClientError, HttpClient, OnboardingApi};
pub use confirm::{ConfirmLocation, ConfirmLocationParams, ConfirmationState, TransactionHandoff};
pub use error::{Error, FetchError, Result};
pub use helium_data::{HeliumData, HeliumDataState, Loadable};
pub use refresher::Refresher;
pub use settings::Settings;
