//! Integration tests for the background drain loop.

mod common;

use common::{wait_for, RecordingSink};
use faucet_dispatch::{ClaimOutcome, ClaimRequest, Faucet, FaucetConfig, TransferError};
use std::sync::Arc;
use std::time::Duration;

fn claim(dest: &str) -> ClaimRequest {
    ClaimRequest::native(dest).unwrap()
}

/// Queue `dests` behind a gated in-flight transfer, then let that transfer finish.
async fn queue_behind_busy(faucet: &Arc<Faucet>, native: &RecordingSink, dests: &[&str]) {
    let busy = {
        let faucet = Arc::clone(faucet);
        tokio::spawn(async move { faucet.admit(claim("0xBUSY")).await })
    };
    wait_for(|| native.in_flight() == 1).await;

    for dest in dests {
        assert_eq!(faucet.admit(claim(dest)).await, Ok(ClaimOutcome::Queued));
    }

    native.release(1);
    busy.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_tick_drains_queue_in_order() {
    let native = RecordingSink::gated();
    let faucet = Arc::new(
        Faucet::builder()
            .with_native_sink(native.clone())
            .with_drain_period(Duration::from_millis(20))
            .build()
            .unwrap(),
    );

    queue_behind_busy(&faucet, &native, &["0xX", "0xY"]).await;
    native.release(2);

    let drain = faucet.start_drain();
    wait_for(|| faucet.admission().queue().is_empty() && native.destinations().len() == 3).await;
    drain.shutdown().await.unwrap();

    assert_eq!(native.destinations(), vec!["0xBUSY", "0xX", "0xY"]);
    assert!(!faucet.admission().lock().is_held());
}

#[tokio::test]
async fn test_failed_queued_transfer_is_not_retried() {
    let native = RecordingSink::gated();
    let faucet = Arc::new(
        Faucet::builder()
            .with_native_sink(native.clone())
            .build()
            .unwrap(),
    );

    queue_behind_busy(&faucet, &native, &["0xX", "0xY"]).await;
    native.fail_next(TransferError::Rpc {
        code: -32000,
        message: "nonce too low".into(),
    });
    native.release(2);

    let records = faucet.drain().drain_once().await;
    assert_eq!(records.len(), 2);
    assert!(!records[0].is_success());
    assert!(records[1].is_success());

    // A second tick finds nothing to do.
    assert!(faucet.drain().drain_once().await.is_empty());
    assert_eq!(native.destinations(), vec!["0xBUSY", "0xX", "0xY"]);

    let stats = faucet.metrics().snapshot();
    assert_eq!(stats.transfers_failed, 1);
    assert_eq!(stats.transfers_succeeded, 2);
}

#[tokio::test]
async fn test_shutdown_sends_remaining_claims() {
    let native = RecordingSink::gated();
    let faucet = Arc::new(
        Faucet::builder()
            .with_native_sink(native.clone())
            .with_drain_period(Duration::from_secs(3600))
            .build()
            .unwrap(),
    );

    let drain = faucet.start_drain();
    // First tick fires immediately with an empty queue.
    tokio::time::sleep(Duration::from_millis(20)).await;

    queue_behind_busy(&faucet, &native, &["0xLATE"]).await;
    native.release(1);

    drain.shutdown().await.unwrap();
    assert_eq!(native.destinations(), vec!["0xBUSY", "0xLATE"]);
    assert!(faucet.admission().queue().is_empty());
}

#[tokio::test]
async fn test_shutdown_without_final_drain_keeps_queue() {
    let native = RecordingSink::gated();
    let config = FaucetConfig {
        queue_cap: 4,
        ..FaucetConfig::default()
    };
    let faucet = Arc::new(
        Faucet::builder()
            .with_config(config)
            .with_native_sink(native.clone())
            .with_drain_period(Duration::from_secs(3600))
            .with_drain_on_shutdown(false)
            .build()
            .unwrap(),
    );

    let drain = faucet.start_drain();
    tokio::time::sleep(Duration::from_millis(20)).await;
    queue_behind_busy(&faucet, &native, &["0xLATE"]).await;

    drain.shutdown().await.unwrap();
    assert_eq!(faucet.admission().queue().len(), 1);
}
