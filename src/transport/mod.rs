//! Transport layer

pub mod http;
