#![forbid(unsafe_code)]

//! Showmirror Runtime
//!
//! Keeps a flat key/value store in step with a remote, tree-shaped
//! parameter graph.
//!
//! # Key Components
//!
//! - [`Mirror`] - single-writer state object driven by the host loop
//! - [`Reconciler`] - diffs desired keys against live bindings and issues
//!   the minimum subscribe/unsubscribe traffic
//! - [`CursorState`] - selection cursors as an explicit transition table
//! - [`FlushScheduler`] - trailing-edge throttle for value emission
//! - [`Transport`] / [`Consumer`] - seams to the remote link and the store
//!
//! # Logging
//!
//! Everything is reported through `tracing` under the `showmirror.*`
//! targets: `reconcile`, `cursor`, `flush`, `transport`, `mirror`.
//!
//! # Features
//!
//! - `serde`: JSON decoding of snapshots and update messages.
//! - `config`: TOML/JSON loading of [`MirrorConfig`].

pub mod composition;
pub mod config;
pub mod cursor;
pub mod definitions;
pub mod descriptor;
pub mod flush;
pub mod mirror;
pub mod reconcile;
pub mod transport;

pub use composition::{Clip, ClipTransport, Column, Composition, Layer, Parameter};
pub use config::{ConfigError, ConnectionConfig, MirrorConfig};
pub use cursor::{ClipCoord, CursorEvent, CursorKind, CursorState, Entity};
pub use descriptor::{Binding, Definition, Descriptor, Facet, Master, ValueFormat};
pub use flush::{FlushScheduler, FlushStats};
pub use mirror::Mirror;
pub use reconcile::{ReconcileMode, ReconcileReport, Reconciler};
pub use transport::{Consumer, ParameterMessage, Transport};
