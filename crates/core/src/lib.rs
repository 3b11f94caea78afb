//! FRA Atlas core — claim model and search session for the Forest Rights Act atlas.
//!
//! This crate holds everything that does not touch the network: the claim
//! record model, the synchronous search session that drives the atlas view,
//! map geometry, and configuration.
//!
//! # Modules
//!
//! - [`types`] — Claim records, claim status, query state, search parameters
//! - [`session`] — Query controller, result projector, and feature selector
//! - [`geo`] — Coordinate parsing, status markers, claim footprints, GeoJSON
//! - [`config`] — `.fra-atlas.toml` and environment configuration
//! - [`error`] — Error taxonomy shared with the network client

pub mod config;
pub mod error;
pub mod geo;
pub mod session;
pub mod types;

pub use config::AtlasConfig;
pub use error::{AtlasError, Result};
pub use session::{AtlasSession, AtlasView, DebounceTicket, SearchRequest};
pub use types::{ClaimId, ClaimRecord, ClaimStatus, QueryState, SearchParams, StatusCounts};
