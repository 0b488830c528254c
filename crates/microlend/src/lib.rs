//! Micro-lending engine: bracket-based loan pricing, reloan balance merging and
//! the staff-driven application lifecycle.

pub mod config;
pub mod error;
pub mod lending;
pub mod telemetry;

pub use error::AppError;
