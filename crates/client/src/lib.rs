//! FRA Atlas client — records API access and the async search controller.
//!
//! # Modules
//!
//! - [`source`] — The [`ClaimSource`] seam and response decoding
//! - [`http`] — reqwest-backed [`HttpClaimSource`]
//! - [`controller`] — Session task with debounce timers and state broadcast

pub mod controller;
pub mod http;
pub mod source;

pub use controller::{AtlasHandle, Command};
pub use http::HttpClaimSource;
pub use source::{decode_claims, ClaimSource};
