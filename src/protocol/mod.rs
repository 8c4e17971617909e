//! Protocol message definitions

pub mod response;

pub use response::{NetworkEntry, StationEntry, StatusResponse, scan_body, stations_body};
