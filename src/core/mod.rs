//! Core diagnostic logic

pub mod error;
pub mod events;
pub mod monitor;
pub mod reporter;
pub mod scanner;
pub mod throughput;
pub mod types;
