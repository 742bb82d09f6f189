//! Client for the TPNet reporting portal.
//!
//! The portal exposes no API, only an interactive HTML form and a
//! client-side XML export; this module owns the browser-automation session
//! that drives the form and the decoding of the exported artifact.

mod errors;
mod export;
mod session;

pub use errors::PortalError;
pub use export::{parse_export, parse_export_bytes};
pub use session::PortalClient;
