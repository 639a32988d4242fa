//! Remote client tests.
//!
//! Each test starts a fake backend with axum on an ephemeral port and talks
//! to it through the reqwest-based clients.

#[cfg(feature = "http")]
mod support;

#[cfg(feature = "http")]
mod project;
#[cfg(feature = "http")]
mod storage;
