use crate::common::{self, MockClient};
use hotspot_setup::{
    confirm, types::HotspotType, ConfirmLocation, ConfirmLocationParams, ConfirmationState, Error,
};
use std::time::Duration;

const OWNER: &str = "owner-wallet";

fn params(address: &str) -> ConfirmLocationParams {
    ConfirmLocationParams {
        hotspot_address: address.to_string(),
        coords: [10.0, 20.0],
        elevation: 5,
        gain: 12.0,
        add_gateway_txn: None,
        location_name: Some("Somewhere".to_string()),
    }
}

fn session(address: &str) -> ConfirmLocation {
    ConfirmLocation::new(
        params(address),
        Some(OWNER.to_string()),
        vec![HotspotType::Iot],
    )
}

#[tokio::test]
async fn missing_hotspot_is_onboarded_for_free() -> anyhow::Result<()> {
    let client = MockClient::new();

    let resolution = confirm::resolve(
        &client,
        &client,
        &params("hotspot-a"),
        Some(OWNER),
        &[HotspotType::Iot],
    )
    .await?;

    assert!(resolution.is_free);
    assert!(resolution.assert_data.is_none());
    assert_eq!(
        vec!["onboard-txn-1", "onboard-txn-2"],
        resolution
            .transactions
            .iter()
            .map(|txn| txn.as_str())
            .collect::<Vec<_>>()
    );
    assert_eq!(1, client.calls(common::GET_HOTSPOT_DETAILS));
    assert_eq!(1, client.calls(common::GET_ONBOARD_TRANSACTIONS));
    assert_eq!(0, client.calls(common::GET_ASSERT_DATA));

    let requests = client.requests();
    assert_eq!(1, requests.len());
    assert_eq!("hotspot-a", requests[0]["hotspotAddress"]);
    assert_eq!(20.0, requests[0]["lat"]);
    assert_eq!(10.0, requests[0]["lng"]);
    assert_eq!(12.0, requests[0]["decimalGain"]);
    assert_eq!(5, requests[0]["elevation"]);
    assert_eq!(serde_json::json!(["IOT"]), requests[0]["hotspotTypes"]);
    Ok(())
}

#[tokio::test]
async fn missing_hotspot_does_not_need_an_owner() -> anyhow::Result<()> {
    let client = MockClient::new();

    let resolution =
        confirm::resolve(&client, &client, &params("hotspot-a"), None, &[HotspotType::Iot])
            .await?;

    assert!(resolution.is_free);
    Ok(())
}

#[tokio::test]
async fn existing_hotspot_asserts_exactly_once() -> anyhow::Result<()> {
    let client = MockClient::new()
        .with_existing("hotspot-b")
        .with_assert(common::assert_data(true));

    let resolution = confirm::resolve(
        &client,
        &client,
        &params("hotspot-b"),
        Some(OWNER),
        &[HotspotType::Iot],
    )
    .await?;

    assert!(!resolution.is_free);
    assert!(resolution.can_advance());
    assert_eq!("assert-txn", resolution.transactions[0].as_str());
    assert_eq!(1, client.calls(common::GET_ASSERT_DATA));
    assert_eq!(1, client.calls(common::GET_ONBOARDING_RECORD));
    assert_eq!(0, client.calls(common::GET_ONBOARD_TRANSACTIONS));

    let requests = client.requests();
    assert_eq!("hotspot-b", requests[0]["gateway"]);
    assert_eq!(OWNER, requests[0]["owner"]);
    assert_eq!("hotspot-b", requests[0]["onboardingRecord"]["onboardingKey"]);
    Ok(())
}

#[tokio::test]
async fn add_gateway_txn_skips_all_lookups() -> anyhow::Result<()> {
    let client = MockClient::new().with_existing("hotspot-c");
    let mut params = params("hotspot-c");
    params.add_gateway_txn = Some("add-gateway-txn".to_string());

    let mut session = ConfirmLocation::new(params, None, vec![HotspotType::Iot]);
    let (_trigger, teardown) = triggered::trigger();
    session.resolve(&client, &client, &teardown).await?;

    assert_eq!(Some(true), session.is_free());
    assert!(session.assert_data().is_none());
    assert_eq!(0, client.total_calls());

    let handoff = session.advance()?;
    assert_eq!(Some("add-gateway-txn".to_string()), handoff.add_gateway_txn);
    assert!(handoff.solana_transactions.is_empty());
    Ok(())
}

#[tokio::test]
async fn advance_stays_disabled_until_refetch_reports_balance() -> anyhow::Result<()> {
    let client = MockClient::new()
        .with_existing("hotspot-b")
        .with_assert(common::assert_data(false))
        .with_assert(common::assert_data(true));
    let mut session = session("hotspot-b");
    let (_trigger, teardown) = triggered::trigger();

    session.resolve(&client, &client, &teardown).await?;
    assert!(matches!(session.state(), ConfirmationState::FeeResolved(_)));
    assert_eq!(Some(false), session.is_free());
    assert!(!session.can_advance());
    assert!(matches!(session.advance(), Err(Error::InsufficientBalance)));

    session.resolve(&client, &client, &teardown).await?;
    assert!(session.can_advance());
    assert_eq!(2, client.calls(common::GET_ASSERT_DATA));

    let handoff = session.advance()?;
    assert_eq!("hotspot-b", handoff.hotspot_address);
    assert_eq!([10.0, 20.0], handoff.coords);
    assert_eq!(5, handoff.elevation);
    assert_eq!(12.0, handoff.gain);
    assert!(matches!(session.state(), ConfirmationState::Submitting));

    assert!(matches!(
        session.resolve(&client, &client, &teardown).await,
        Err(Error::InvalidTransition { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn network_failure_is_terminal_and_retryable() -> anyhow::Result<()> {
    let client = MockClient::new()
        .with_existing("hotspot-b")
        .with_assert(common::assert_data(true))
        .failing(common::GET_HOTSPOT_DETAILS, 1);
    let mut session = session("hotspot-b");
    let (_trigger, teardown) = triggered::trigger();

    let error = session
        .resolve(&client, &client, &teardown)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::Network(_)));
    assert!(error.is_retryable());
    assert!(matches!(session.state(), ConfirmationState::Failed(_)));
    assert!(session.error().is_some());
    assert!(!session.can_advance());

    session.resolve(&client, &client, &teardown).await?;
    assert!(session.can_advance());
    assert!(session.error().is_none());
    Ok(())
}

#[tokio::test]
async fn existing_hotspot_without_owner_is_invalid_input() -> anyhow::Result<()> {
    let client = MockClient::new()
        .with_existing("hotspot-b")
        .with_assert(common::assert_data(true));
    let mut session = ConfirmLocation::new(params("hotspot-b"), None, vec![HotspotType::Iot]);
    let (_trigger, teardown) = triggered::trigger();

    let error = session
        .resolve(&client, &client, &teardown)
        .await
        .unwrap_err();
    assert!(matches!(error, Error::InvalidInput(_)));
    assert!(!error.is_retryable());
    assert_eq!(0, client.calls(common::GET_ASSERT_DATA));
    Ok(())
}

#[tokio::test]
async fn torn_down_session_makes_no_calls() -> anyhow::Result<()> {
    let client = MockClient::new();
    let mut session = session("hotspot-a");
    let (trigger, teardown) = triggered::trigger();
    trigger.trigger();

    let result = session.resolve(&client, &client, &teardown).await;

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(matches!(session.state(), ConfirmationState::Unresolved));
    assert_eq!(0, client.total_calls());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn teardown_mid_flight_leaves_session_unresolved() -> anyhow::Result<()> {
    let client = MockClient::new().with_details_delay(Duration::from_secs(10));
    let mut session = session("hotspot-a");
    let (trigger, teardown) = triggered::trigger();

    let (result, _) = tokio::join!(session.resolve(&client, &client, &teardown), async {
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();
    });

    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(matches!(session.state(), ConfirmationState::Unresolved));
    assert_eq!(0, client.calls(common::GET_ONBOARD_TRANSACTIONS));
    Ok(())
}
