//! Reconciliation behavior observed through the transport and the cache.

use showmirror_core::{ParamId, Value, ValueCache};
use showmirror_runtime::transport::{RecordingTransport, TransportCall};
use showmirror_runtime::{Descriptor, Parameter, ReconcileMode, Reconciler};

fn desired_with_choice() -> Vec<Descriptor> {
    let playmode = Parameter::choice(ParamId(1), 2, "Bounce");
    let name = Parameter::scalar(ParamId(2), "Intro");
    vec![
        Descriptor::new("playmode", "Play Mode").source(Some(&playmode)),
        Descriptor::new("name", "Name").source(Some(&name)),
    ]
}

#[test]
fn second_identical_reconcile_is_silent() {
    let mut reconciler = Reconciler::new();
    let mut cache = ValueCache::new();
    let mut transport = RecordingTransport::new();

    let first = reconciler.reconcile(
        desired_with_choice(),
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    assert!(first.definitions_changed);
    assert_eq!(first.subscribed, 2);
    transport.take();

    let second = reconciler.reconcile(
        desired_with_choice(),
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    assert!(second.short_circuited);
    assert!(!second.definitions_changed);
    assert!(transport.calls.is_empty());
}

#[test]
fn choice_expands_to_key_and_text() {
    let mut reconciler = Reconciler::new();
    let mut cache = ValueCache::new();
    let mut transport = RecordingTransport::new();
    reconciler.reconcile(
        desired_with_choice(),
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    let keys: Vec<String> = reconciler.definitions().into_iter().map(|d| d.key).collect();
    assert_eq!(keys, vec!["playmode", "playmode_text", "name"]);

    let changes = cache.commit();
    assert_eq!(changes.get("playmode"), Some(&Some(Value::Int(2))));
    assert_eq!(
        changes.get("playmode_text"),
        Some(&Some(Value::from("Bounce")))
    );
}

#[test]
fn full_removal_of_choice_unsets_key_and_text() {
    let mut reconciler = Reconciler::new();
    let mut cache = ValueCache::new();
    let mut transport = RecordingTransport::new();
    reconciler.reconcile(
        desired_with_choice(),
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    cache.commit();
    transport.take();

    let name = Parameter::scalar(ParamId(2), "Intro");
    let report = reconciler.reconcile(
        vec![Descriptor::new("name", "Name").source(Some(&name))],
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    assert_eq!(report.removed, 2);
    assert_eq!(transport.take(), vec![TransportCall::Unsubscribe(ParamId(1))]);

    let changes = cache.commit();
    assert_eq!(changes.get("playmode"), Some(&None));
    assert_eq!(changes.get("playmode_text"), Some(&None));
    assert_eq!(changes.len(), 2);
    assert!(reconciler.descriptor("playmode_text").is_none());
}

#[test]
fn partial_reconcile_never_removes() {
    let mut reconciler = Reconciler::new();
    let mut cache = ValueCache::new();
    let mut transport = RecordingTransport::new();
    reconciler.reconcile(
        desired_with_choice(),
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    cache.commit();
    transport.take();

    let extra = Parameter::range(ParamId(3), 0.5, 0.0, 1.0);
    let report = reconciler.reconcile(
        vec![Descriptor::new("opacity", "Opacity").source(Some(&extra))],
        ReconcileMode::Partial,
        &mut cache,
        &mut transport,
    );
    assert_eq!(report.removed, 0);
    assert_eq!(report.added, 3);
    assert!(report.definitions_changed);
    assert_eq!(transport.take(), vec![TransportCall::Subscribe(ParamId(3))]);

    let changes = cache.commit();
    assert!(changes.values().all(Option::is_some));
    assert!(!changes.contains_key("playmode"));

    // Partial republication still lists the union.
    let keys: Vec<String> = reconciler.definitions().into_iter().map(|d| d.key).collect();
    assert_eq!(
        keys,
        vec!["playmode", "playmode_text", "name", "opacity", "opacity_min", "opacity_max"]
    );
}

#[test]
fn partial_with_nothing_new_is_a_no_op() {
    let mut reconciler = Reconciler::new();
    let mut cache = ValueCache::new();
    let mut transport = RecordingTransport::new();
    reconciler.reconcile(
        desired_with_choice(),
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    let name = Parameter::scalar(ParamId(2), "Intro");
    let report = reconciler.reconcile(
        vec![Descriptor::new("name", "Name").source(Some(&name))],
        ReconcileMode::Partial,
        &mut cache,
        &mut transport,
    );
    assert!(report.short_circuited);
    assert!(!report.definitions_changed);
}

#[test]
fn shape_change_reexpands_family() {
    let mut reconciler = Reconciler::new();
    let mut cache = ValueCache::new();
    let mut transport = RecordingTransport::new();
    let as_range = Parameter::range(ParamId(5), 1.0, 0.0, 2.0);
    reconciler.reconcile(
        vec![Descriptor::new("speed", "Speed").source(Some(&as_range))],
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    cache.commit();

    let as_scalar = Parameter::scalar(ParamId(5), 1.0);
    reconciler.reconcile(
        vec![Descriptor::new("speed", "Speed").source(Some(&as_scalar))],
        ReconcileMode::Full,
        &mut cache,
        &mut transport,
    );
    let changes = cache.commit();
    assert_eq!(changes.get("speed_min"), Some(&None));
    assert_eq!(changes.get("speed_max"), Some(&None));
    assert_eq!(reconciler.len(), 1);
    assert!(reconciler.is_subscribed(ParamId(5)));
    assert!(reconciler.check_consistency().is_ok());
}
