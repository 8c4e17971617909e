//! WiFi Diagnostic Access Point
//!
//! Brings up a WPA2 access point and serves a small HTTP diagnostic API on it:
//! device status, neighbourhood scans, latency and throughput probes, and the
//! associated station roster.

pub mod backend;
pub mod config;
pub mod core;
pub mod protocol;
pub mod transport;

pub use core::{
    error::{ConfigError, ProbeError, RadioError, TransportError},
    types::{AuthMode, DiagnosticSnapshot, MacAddress, RadioEvent, Station, WifiNetwork},
};
