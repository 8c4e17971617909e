//! HTTP/1.1 transport

pub mod deadline;
pub mod handler;
pub mod server;

pub use {
    deadline::DeadlineStream,
    handler::{DiagnosticState, INDEX_HTML, router},
    server::{ConnectionEnd, HttpServer},
};
