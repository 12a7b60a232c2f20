//! RSS middle tier: stores which feeds each user follows and serves the
//! aggregated, freshly fetched contents of those feeds over HTTP.

pub mod api;
pub mod config;
pub mod feed;
pub mod service;
pub mod storage;
pub mod util;
