//! `snapback-telemetry` — Error Sanitizer (§4.11), Performance Wrapper
//! (§4.12) and the fire-and-forget Telemetry Sink (§3, §5).

pub mod perf;
pub mod sanitize;
pub mod sink;

pub use perf::{measured, Measurement};
pub use sanitize::{sanitize, SanitizedError};
pub use sink::{TelemetryEvent, TelemetrySink};
