//! Core event-tracing state for waytrace
//!
//! This crate holds everything that must stay consistent across the
//! compositor's event stream: the include/exclude filter engine, the XKB
//! keymap decoder, the data-offer lifecycle tracker and the line formatter.
//! It knows nothing about the wire; the `waytrace` binary decodes each
//! protocol event into the enums defined here and feeds them to [`Tracer`],
//! one at a time, in arrival order.

mod error;
mod event;
mod filter;
mod keymap;
mod names;
mod offer;
mod trace;

pub use error::KeymapError;
pub use event::*;
pub use filter::{FilterRule, FilterSet};
pub use keymap::{KeymapDecoder, KeymapFormat, KEYCODE_OFFSET};
pub use names::*;
pub use offer::{OfferHandle, OfferTracker, DND_ACTION_ASK, DND_ACTION_COPY, DND_ACTION_MOVE};
pub use trace::{TraceLog, Tracer};
