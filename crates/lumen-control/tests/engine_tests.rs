mod common;

use common::{settle, start_engine, test_config, RecordingTransport};
use lumen_control::{ConfiguredInterface, ControlError, DmxEngine, DmxTransport, RateMode};
use std::sync::Arc;
use std::thread;

#[tokio::test(start_paused = true)]
async fn test_second_start_is_rejected() {
    let (engine, _transport) = start_engine(1);
    let result = engine.start_with_transport(None);
    assert!(matches!(result, Err(ControlError::AlreadyRunning)));

    engine.stop().await;
    // A stopped engine may be started again
    engine.start_with_transport(None).unwrap();
    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_restart_inside_high_rate_window_sends_keepalive() {
    let (engine, _transport) = start_engine(2);
    settle().await;
    engine.set_channel_value(1, 1, 10);
    settle().await;
    assert_eq!(engine.get_transmission_status().mode, RateMode::High);

    // Stop well inside the 2 s high-rate window
    engine.stop().await;

    let transport = Arc::new(RecordingTransport::default());
    engine
        .start_with_transport(Some(transport.clone() as Arc<dyn DmxTransport>))
        .unwrap();
    settle().await;

    let packets = transport.packets();
    assert_eq!(packets.len(), 2);
    assert_eq!(packets[0].universe, 1);
    assert_eq!(packets[1].universe, 2);
    assert!(packets.iter().all(|p| p.channels.iter().all(|&v| v == 0)));
    assert_eq!(engine.get_transmission_status().mode, RateMode::Idle);

    engine.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_disabled_artnet_runs_in_simulation_mode() {
    let engine = Arc::new(DmxEngine::new(test_config(2)).unwrap());
    engine.start(&ConfiguredInterface::new(false, "")).unwrap();
    settle().await;

    let status = engine.get_transmission_status();
    assert!(status.running);
    assert!(status.simulation);
    assert!(status.destination.is_none());
    assert_eq!(status.keepalive_flushes, 1);
    assert_eq!(status.packets_sent, 0);

    engine.stop().await;
    assert!(!engine.get_transmission_status().simulation);
}

#[tokio::test]
async fn test_invalid_broadcast_address_fails_start() {
    let engine = Arc::new(DmxEngine::new(test_config(1)).unwrap());
    let result = engine.start(&ConfiguredInterface::new(true, "not-an-ip"));
    assert!(matches!(result, Err(ControlError::InvalidAddress { .. })));
    assert!(!engine.is_running());
}

#[tokio::test]
async fn test_start_with_closure_selector() {
    let engine = Arc::new(DmxEngine::new(test_config(1)).unwrap());
    let selector = || Some("127.0.0.1".to_string());
    engine.start(&selector).unwrap();

    let status = engine.get_transmission_status();
    assert_eq!(status.destination.as_deref(), Some("artnet://127.0.0.1:6454"));
    engine.stop().await;
}

#[test]
fn test_concurrent_writers_are_serialized() {
    let engine = Arc::new(DmxEngine::new(test_config(4)).unwrap());

    let handles: Vec<_> = (1..=4u16)
        .map(|universe| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for round in 0..50 {
                    for channel in 1..=512u16 {
                        engine.set_channel_value(universe, channel, (channel as i32 + round) % 256);
                    }
                    engine.set_channel_override(universe, 1, round);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    for universe in 1..=4u16 {
        assert_eq!(engine.get_channel_value(universe, 100), ((100 + 49) % 256) as u8);
        assert_eq!(engine.get_universe_output(universe)[0], 49);
    }
    let status = engine.get_transmission_status();
    assert_eq!(status.dirty_universes, vec![1, 2, 3, 4]);
    assert_eq!(status.mode, RateMode::High);
}

#[test]
fn test_universe_views() {
    let engine = DmxEngine::new(test_config(2)).unwrap();
    engine.set_channel_value(2, 512, 9);

    assert!(engine.get_universe_channels(3).is_none());
    assert_eq!(engine.get_universe_channels(2).unwrap()[511], 9);
    assert_eq!(engine.get_universe_output(3), [0u8; 512]);

    let outputs = engine.get_all_universe_outputs();
    assert_eq!(outputs.len(), 2);
    assert_eq!(outputs[1].channels[511], 9);
}

#[test]
fn test_status_serializes_to_json() {
    let engine = DmxEngine::new(test_config(1)).unwrap();
    engine.set_channel_value(1, 1, 1);
    let json = engine.get_transmission_status().to_json().unwrap();
    assert!(json.contains("\"mode\":\"high\""));
    assert!(json.contains("\"dirty_universes\":[1]"));
}
