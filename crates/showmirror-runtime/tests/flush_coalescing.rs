//! Trailing-edge coalescing of value flushes through the mirror.

use showmirror_core::{ParamId, ParamValue, Value};
use showmirror_runtime::transport::{RecordingConsumer, RecordingTransport};
use showmirror_runtime::{Composition, Mirror, MirrorConfig, Parameter, ParameterMessage};
use web_time::{Duration, Instant};

fn speed(v: f64) -> ParameterMessage {
    ParameterMessage::new(ParamId(7), ParamValue::Scalar(Some(Value::Float(v))))
}

fn mirror(interval_ms: u64) -> (Mirror<RecordingTransport, RecordingConsumer>, Instant) {
    let config = MirrorConfig {
        flush_interval_ms: interval_ms,
        ..MirrorConfig::default()
    };
    let mut mirror = Mirror::new(config, RecordingTransport::new(), RecordingConsumer::new());
    let t0 = Instant::now();
    mirror.set_composition(
        Composition {
            speed: Some(Parameter::scalar(ParamId(7), 1.0)),
            ..Composition::default()
        },
        t0,
    );
    mirror.set_connected(true, t0);
    mirror.flush_now();
    mirror.consumer_mut().clear();
    (mirror, t0)
}

#[test]
fn burst_inside_window_flushes_once_with_last_value() {
    let (mut mirror, t0) = mirror(100);
    let t = t0 + Duration::from_millis(1000);
    mirror.on_message(&speed(1.5), t);
    mirror.on_message(&speed(2.0), t + Duration::from_millis(30));

    assert!(!mirror.poll(t + Duration::from_millis(99)));
    assert!(mirror.poll(t + Duration::from_millis(100)));
    assert!(!mirror.poll(t + Duration::from_millis(500)));

    let values = &mirror.consumer().values;
    assert_eq!(values.len(), 1);
    assert_eq!(values[0].get("composition_speed"), Some(&Some(Value::Float(2.0))));
}

#[test]
fn continuous_stream_is_not_starved() {
    let (mut mirror, t0) = mirror(100);
    let mut fired = 0;
    for i in 0..50u64 {
        let now = t0 + Duration::from_millis(1000 + i * 20);
        mirror.on_message(&speed(i as f64), now);
        if mirror.poll(now) {
            fired += 1;
        }
    }
    // A window opens on the first update after each flush, so with updates
    // every 20 ms the flushes land 120 ms apart.
    assert_eq!(fired, 8);
    assert_eq!(mirror.consumer().values.len(), 8);
    let stats = mirror.flush_scheduler().stats();
    assert_eq!(stats.flushes, fired);
    assert!(stats.coalesced > 0);
}

#[test]
fn unchanged_value_publishes_nothing() {
    let (mut mirror, t0) = mirror(100);
    let t = t0 + Duration::from_millis(1000);
    mirror.on_message(&speed(1.0), t);
    assert!(mirror.poll(t + Duration::from_millis(100)));
    assert!(mirror.consumer().values.is_empty());
}

#[test]
fn interval_comes_from_config() {
    let (mut mirror, t0) = mirror(250);
    let t = t0 + Duration::from_millis(1000);
    mirror.on_message(&speed(3.0), t);
    assert_eq!(mirror.next_deadline(), Some(t + Duration::from_millis(250)));
    assert!(!mirror.poll(t + Duration::from_millis(200)));
    assert!(mirror.poll(t + Duration::from_millis(250)));
}
