//! Resource service API layer.
//!
//! This module provides:
//! - The [`RequestExecutor`] contract every adapter talks through
//! - An HTTP implementation of it over `reqwest`
//! - An offline implementation for dry runs

mod client;
mod transport;

pub use client::ApiClient;
pub use transport::{ApiRequest, OfflineExecutor, RequestExecutor};

#[cfg(test)]
pub(crate) use transport::MockRequestExecutor;
