//! Clock-synchronized "linear TV" scheduling for a looping episode playlist.
//!
//! The [`schedule`] module is the pure core. [`manifest`] and [`config`]
//! load its inputs for the `liveloop` binary and any other host.

pub mod config;
mod http;
pub mod manifest;
pub mod paths;
pub mod schedule;

pub use http::RetryPolicy;
