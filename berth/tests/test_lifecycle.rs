//! Lifecycle manager tests over the mock engine

mod common;

use std::sync::Arc;
use std::time::Duration;

use berth::app::state::AppState;

use common::{test_options, write_artifact, MockEngine};

#[tokio::test]
async fn test_expiry_reclaims_container_port_and_artifact() {
    let engine = Arc::new(MockEngine::new());
    let options = test_options(31100, 31109, Duration::from_millis(100));
    let state = AppState::with_engine(engine.clone(), &options);

    let artifact = write_artifact("expiry");
    let receipt = state
        .service
        .deploy(artifact.clone(), "example.test")
        .await
        .unwrap();
    let port: u16 = receipt.url.rsplit(':').next().unwrap().parse().unwrap();

    assert_eq!(state.lifecycle.active_count().await, 1);
    assert!(state.ports.is_claimed(port).await);

    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(state.lifecycle.active_count().await, 0);
    assert!(state.lifecycle.lookup(receipt.id).await.is_none());
    assert_eq!(engine.call_count("stop:"), 1);
    assert_eq!(engine.call_count("remove:"), 1);
    assert_eq!(engine.container_count(), 0);
    assert!(!artifact.exists());

    // The port is allocatable again.
    assert!(!state.ports.is_claimed(port).await);
    let reallocated = state.ports.allocate().await.unwrap();
    assert_eq!(reallocated, port);
    state.ports.release(reallocated).await;
}

#[tokio::test]
async fn test_cancel_tears_down_immediately() {
    let engine = Arc::new(MockEngine::new());
    let options = test_options(31110, 31119, Duration::from_secs(30 * 60));
    let state = AppState::with_engine(engine.clone(), &options);

    let artifact = write_artifact("cancel");
    let receipt = state
        .service
        .deploy(artifact.clone(), "example.test")
        .await
        .unwrap();

    assert!(state.lifecycle.cancel(receipt.id).await);

    assert_eq!(state.lifecycle.active_count().await, 0);
    assert_eq!(state.ports.claimed_count().await, 0);
    assert_eq!(engine.container_count(), 0);
    assert!(!artifact.exists());
}

#[tokio::test]
async fn test_second_cancel_is_a_noop() {
    let engine = Arc::new(MockEngine::new());
    let options = test_options(31120, 31129, Duration::from_secs(30 * 60));
    let state = AppState::with_engine(engine.clone(), &options);

    let receipt = state
        .service
        .deploy(write_artifact("twice"), "example.test")
        .await
        .unwrap();

    assert!(state.lifecycle.cancel(receipt.id).await);
    assert!(!state.lifecycle.cancel(receipt.id).await);

    assert_eq!(engine.call_count("stop:"), 1);
    assert_eq!(engine.call_count("remove:"), 1);
}

#[tokio::test]
async fn test_expire_after_cancel_is_a_noop() {
    let engine = Arc::new(MockEngine::new());
    let options = test_options(31130, 31139, Duration::from_secs(30 * 60));
    let state = AppState::with_engine(engine.clone(), &options);

    let receipt = state
        .service
        .deploy(write_artifact("mixed"), "example.test")
        .await
        .unwrap();

    state.lifecycle.cancel(receipt.id).await;
    state.lifecycle.expire(receipt.id).await;

    assert_eq!(engine.call_count("stop:"), 1);
    assert_eq!(engine.call_count("remove:"), 1);
}

#[tokio::test]
async fn test_concurrent_triggers_tear_down_once() {
    let engine = Arc::new(MockEngine::new());
    let options = test_options(31140, 31149, Duration::from_secs(30 * 60));
    let state = AppState::with_engine(engine.clone(), &options);

    let receipt = state
        .service
        .deploy(write_artifact("race"), "example.test")
        .await
        .unwrap();

    tokio::join!(
        state.lifecycle.expire(receipt.id),
        state.lifecycle.expire(receipt.id),
        state.lifecycle.cancel(receipt.id),
    );

    assert_eq!(engine.call_count("stop:"), 1);
    assert_eq!(engine.call_count("remove:"), 1);
    assert_eq!(state.lifecycle.active_count().await, 0);
}

#[tokio::test]
async fn test_cancel_all_empties_the_registry() {
    let engine = Arc::new(MockEngine::new());
    let options = test_options(31150, 31159, Duration::from_secs(30 * 60));
    let state = AppState::with_engine(engine.clone(), &options);

    let a = write_artifact("all-a");
    let b = write_artifact("all-b");
    state.service.deploy(a.clone(), "example.test").await.unwrap();
    state.service.deploy(b.clone(), "example.test").await.unwrap();
    assert_eq!(state.lifecycle.active_count().await, 2);

    state.lifecycle.cancel_all().await;

    assert_eq!(state.lifecycle.active_count().await, 0);
    assert_eq!(state.ports.claimed_count().await, 0);
    assert_eq!(engine.container_count(), 0);
    assert!(!a.exists());
    assert!(!b.exists());
}

#[tokio::test]
async fn test_cancel_unknown_id_returns_false() {
    let engine = Arc::new(MockEngine::new());
    let options = test_options(31160, 31169, Duration::from_secs(30 * 60));
    let state = AppState::with_engine(engine, &options);

    assert!(!state.lifecycle.cancel(uuid::Uuid::new_v4()).await);
}
