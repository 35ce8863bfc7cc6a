//! Command surface integration tests
//!
//! Parses host method calls, dispatches them through the engine and checks
//! replies and error codes as the dispatch layer would see them.

mod helpers;

use haptics_common::events::CapabilityTier;
use haptics_engine::backend::{BackendCall, SimulatedBackend};
use haptics_engine::command::{Command, CommandReply};
use haptics_engine::Result;
use helpers::{manual_backend, TestRig};
use serde_json::{json, Value};
use std::time::Duration;

async fn call(rig: &TestRig, method: &str, args: Value) -> Result<CommandReply> {
    let command = Command::from_method_call(method, &args)?;
    rig.engine.dispatch(command).await
}

async fn error_code(rig: &TestRig, method: &str, args: Value) -> &'static str {
    call(rig, method, args)
        .await
        .expect_err("command should fail")
        .code()
}

#[tokio::test]
async fn test_capability_query_per_tier() {
    let cases = [
        (CapabilityTier::None, false),
        (CapabilityTier::Coarse, false),
        (CapabilityTier::Amplitude, true),
        (CapabilityTier::Full, true),
    ];
    for (tier, expected) in cases {
        let rig = TestRig::new(SimulatedBackend::with_tier(tier));
        let reply = call(&rig, "hasCustomHapticsSupport", Value::Null).await.unwrap();
        assert_eq!(reply, CommandReply::Bool(expected), "tier {}", tier);
    }
}

#[tokio::test]
async fn test_play_waveform_command() {
    let rig = TestRig::new(manual_backend());
    let reply = call(
        &rig,
        "playWaveform",
        json!({"timings": [100, 50, 100], "amplitudes": [0, 255, 150], "startOffset": 0}),
    )
    .await
    .unwrap();
    assert_eq!(reply, CommandReply::Done);
    assert!(rig.journal().contains(&BackendCall::MakePlayer { player: 1, events: 2 }));

    let code = error_code(
        &rig,
        "playWaveform",
        json!({"timings": [100, 50], "amplitudes": [255]}),
    )
    .await;
    assert_eq!(code, "ARGUMENT_MISMATCH");
}

#[tokio::test]
async fn test_transport_commands() {
    let rig = TestRig::new(manual_backend());
    assert_eq!(error_code(&rig, "pause", json!({})).await, "NO_ACTIVE_PLAYER");
    assert_eq!(error_code(&rig, "seek", json!({"offset": 10})).await, "NO_ACTIVE_PLAYER");

    call(&rig, "success", Value::Null).await.unwrap();
    call(&rig, "pause", json!({"atOffset": 20})).await.unwrap();
    call(&rig, "resume", json!({"atOffset": 20})).await.unwrap();
    call(&rig, "seek", json!({"offset": 75})).await.unwrap();
    call(&rig, "stop", json!({})).await.unwrap();

    assert!(rig.journal().contains(&BackendCall::PlayerSeek {
        player: 1,
        offset: Duration::from_millis(75)
    }));
    assert_eq!(error_code(&rig, "stop", json!({})).await, "NO_ACTIVE_PLAYER");
}

#[tokio::test]
async fn test_cancel_always_done() {
    for tier in [CapabilityTier::None, CapabilityTier::Coarse, CapabilityTier::Full] {
        let rig = TestRig::new(SimulatedBackend::with_tier(tier).with_auto_complete(false));
        assert_eq!(call(&rig, "cancel", Value::Null).await.unwrap(), CommandReply::Done);
    }
}

#[tokio::test]
async fn test_predefined_and_asset_commands() {
    let rig = TestRig::new(manual_backend());
    call(&rig, "playPredefined", json!({"effectId": "heavy_click"}))
        .await
        .unwrap();
    assert_eq!(
        error_code(&rig, "playPredefined", json!({"effectId": "rumble"})).await,
        "INVALID_ARGS"
    );

    rig.write_asset("ok.ahap", helpers::SAMPLE_AHAP);
    rig.write_asset("bad.ahap", "not json");
    call(&rig, "playAhap", json!({"path": "ok.ahap", "startOffset": 10}))
        .await
        .unwrap();
    assert_eq!(
        error_code(&rig, "playAhap", json!({"path": "bad.ahap"})).await,
        "PATTERN_PARSE_ERROR"
    );
    assert_eq!(
        error_code(&rig, "playAhap", json!({"path": "gone.ahap"})).await,
        "NOT_FOUND"
    );
    assert_eq!(error_code(&rig, "playAhap", json!({})).await, "INVALID_ARGS");
}

#[tokio::test]
async fn test_reduced_tier_error_codes() {
    let rig = TestRig::new(SimulatedBackend::with_tier(CapabilityTier::Coarse));
    assert_eq!(error_code(&rig, "pause", Value::Null).await, "UNSUPPORTED_OPERATION");

    let rig = TestRig::new(SimulatedBackend::with_tier(CapabilityTier::None));
    assert_eq!(error_code(&rig, "success", Value::Null).await, "ACTUATOR_UNAVAILABLE");
}

#[tokio::test]
async fn test_unknown_method() {
    let rig = TestRig::new(manual_backend());
    assert_eq!(error_code(&rig, "vibrate", Value::Null).await, "NOT_IMPLEMENTED");
}
