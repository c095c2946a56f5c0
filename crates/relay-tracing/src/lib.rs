//! Tracing collaborator for relay-service: reporter setup, span macros, and
//! trace/correlation propagation.

pub mod config;
pub mod otlp;
pub mod propagation;
pub mod spans;

pub use config::{Reporter, TracingConfig};
pub use otlp::{init_tracing, TracingGuard};
pub use propagation::Tracer;
