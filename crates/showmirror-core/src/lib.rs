#![forbid(unsafe_code)]

//! Showmirror Core
//!
//! Leaf data structures for mirroring a remote, tree-shaped parameter graph
//! into a flat key/value store.
//!
//! # Key Components
//!
//! - [`IdentityMap`] - many-to-one association between upstream identities
//!   ("masters") and output keys ("slaves")
//! - [`ValueCache`] - last-published values plus a pending-write buffer that
//!   commits as a sparse diff
//! - [`cycle_next`] - next index in a bounded cyclic window
//! - [`format_timecode`] - `HH:MM:SS.cc` rendering for transport values
//!
//! # Role in Showmirror
//! `showmirror-core` has no knowledge of the remote graph's shape, the
//! transport, or the consumer. `showmirror-runtime` builds reconciliation,
//! selection tracking, and flush scheduling on top of these types.

pub mod identity_map;
pub mod timecode;
pub mod toggle;
pub mod value;
pub mod value_cache;

pub use identity_map::IdentityMap;
pub use timecode::format_timecode;
pub use toggle::cycle_next;
pub use value::{ParamId, ParamShape, ParamValue, Value};
pub use value_cache::{ValueCache, ValueChanges};
