use crate::common::{self, MockClient};
use hotspot_setup::{HeliumData, Loadable};
use rust_decimal_macros::dec;

#[tokio::test]
async fn initial_bundle_loads_everything_at_once() -> anyhow::Result<()> {
    let client = MockClient::new().with_heights(&[1_234]);
    let data = HeliumData::new();
    let mut receiver = data.subscribe();

    data.fetch_initial_data(&client, &client).await?;

    assert!(receiver.has_changed()?);
    let state = receiver.borrow_and_update().clone();
    assert_eq!(Some(&1_234), state.block_height.value());
    assert_eq!(
        Some(dec!(2.31)),
        state.current_oracle_price.value().map(|price| price.price)
    );
    assert_eq!(2, state.predicted_oracle_prices().len());
    assert_eq!(Some(1), state.makers.value().map(Vec::len));
    assert!(matches!(state.hotspot_count, Loadable::NotLoaded));

    for operation in [
        common::GET_BLOCK_HEIGHT,
        common::GET_CURRENT_ORACLE_PRICE,
        common::GET_PREDICTED_ORACLE_PRICES,
        common::GET_MAKERS,
    ] {
        assert_eq!(1, client.calls(operation), "{operation}");
    }
    Ok(())
}

#[tokio::test]
async fn initial_bundle_commits_nothing_on_failure() -> anyhow::Result<()> {
    let client = MockClient::new()
        .with_heights(&[1_234])
        .failing(common::GET_MAKERS, 1);
    let data = HeliumData::new();

    let error = data
        .fetch_initial_data(&client, &client)
        .await
        .unwrap_err();
    assert_eq!("makers", error.field);

    let state = data.snapshot();
    assert!(state.block_height.error().is_some());
    assert!(state.current_oracle_price.error().is_some());
    assert!(state.makers.error().is_some());
    assert!(state.predicted_oracle_prices().is_empty());

    data.fetch_initial_data(&client, &client).await?;
    assert_eq!(Some(&1_234), data.snapshot().block_height.value());
    Ok(())
}

#[tokio::test]
async fn block_height_refresh_only_notifies_on_change() -> anyhow::Result<()> {
    let client = MockClient::new().with_heights(&[10, 10, 11]);
    let data = HeliumData::new();
    let mut receiver = data.subscribe();

    assert_eq!(10, data.fetch_block_height(&client).await?);
    receiver.borrow_and_update();

    assert_eq!(10, data.fetch_block_height(&client).await?);
    assert!(!receiver.has_changed()?);

    assert_eq!(11, data.fetch_block_height(&client).await?);
    assert!(receiver.has_changed()?);
    Ok(())
}

#[tokio::test]
async fn oracle_price_always_overwrites() -> anyhow::Result<()> {
    let client = MockClient::new();
    let data = HeliumData::new();
    let mut receiver = data.subscribe();

    data.fetch_current_oracle_price(&client).await?;
    receiver.borrow_and_update();

    data.fetch_current_oracle_price(&client).await?;
    assert!(receiver.has_changed()?);
    assert_eq!(
        Some(dec!(2.31)),
        receiver
            .borrow_and_update()
            .current_oracle_price
            .value()
            .map(|price| price.price)
    );
    Ok(())
}

#[tokio::test]
async fn predicted_prices_and_makers_load_independently() -> anyhow::Result<()> {
    let client = MockClient::new().failing(common::GET_PREDICTED_ORACLE_PRICES, 1);
    let data = HeliumData::new();

    assert!(data.fetch_predicted_oracle_prices(&client).await.is_err());
    data.fetch_makers(&client).await?;

    let state = data.snapshot();
    assert!(state.predicted_oracle_prices.error().is_some());
    assert!(state.makers.is_loaded());

    data.fetch_predicted_oracle_prices(&client).await?;
    assert_eq!(2, data.snapshot().predicted_oracle_prices().len());
    Ok(())
}
