//! Bluetooth Module
//!
//! BLE communication with the Oignies SNCV train module.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   TrainRemoteService                     │
//! │     (Bluetooth thread - executes UI commands in order)   │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┴──────────────┐
//!         │                            │
//!         ▼                            ▼
//! ┌───────────────────┐  shared  ┌───────────────────┐
//! │ ConnectionManager │◄──link──►│ CommandDispatcher │
//! │ - discovery       │          │ - Command encode  │
//! │ - connect/close   │          │ - TrainState      │
//! │ - link loss       │          │   mirror          │
//! └─────────┬─────────┘          └───────────────────┘
//!           │
//!           ▼
//! ┌───────────────────┐
//! │   BleTransport    │  WinRT on Windows, unsupported elsewhere
//! └───────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - UUIDs and the JSON command format
//! - [`transport`] - Traits a platform backend implements
//! - [`connection`] - Session lifecycle
//! - [`dispatcher`] - Setters and the optimistic state mirror
//! - [`service`] - Bluetooth thread and UI handle

pub mod connection;
pub mod dispatcher;
pub mod protocol;
#[cfg(any(windows, test))]
mod scanner;
pub mod service;
pub mod transport;
#[cfg(windows)]
pub mod winrt;

use std::sync::Arc;
use transport::BleTransport;

// Re-export main service for convenience
pub use service::{RemoteHandle, TrainRemoteService};

/// The BLE backend for this host.
pub fn platform_transport() -> Arc<dyn BleTransport> {
    #[cfg(windows)]
    {
        Arc::new(winrt::WinRtTransport)
    }
    #[cfg(not(windows))]
    {
        Arc::new(transport::UnsupportedTransport)
    }
}
