//! Clock-synchronized looping channel.
//!
//! A channel is a [`Playlist`] played end to end forever, starting at an
//! anchor instant. Every caller that agrees on the playlist and the anchor
//! computes the same live episode for the same instant, with no shared state:
//!
//! - [`compute_anchor`] derives the anchor from a local time of day,
//! - [`resolve_live_pointer`] answers "what is on air at this instant",
//! - [`build_schedule`] answers "what is on air from now until the horizon".
//!
//! All three are pure and can be called from any number of threads.

mod anchor;
mod builder;
mod clock;
mod error;
mod playlist;
mod pointer;

pub use anchor::{AnchorRule, CanonicalTime, compute_anchor};
pub use builder::{Schedule, ScheduleSlot, build_schedule};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{Result, ScheduleError};
pub use playlist::{Episode, Playlist};
pub use pointer::{LivePointer, resolve_live_pointer};
