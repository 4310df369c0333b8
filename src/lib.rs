//! Queue reservation and wait-time estimation engine for the ONEA client app.
//!
//! Clients are matched to their nearest agency, take a sequential ticket and
//! follow their position and estimated arrival time in the shared queue.

pub mod agency;
pub mod api;
pub mod config;
pub mod error;
pub mod estimator;
pub mod external;
pub mod geo;
pub mod models;
pub mod queue;
pub mod search;
pub mod service;
pub mod session;
