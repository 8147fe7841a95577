//! # Marionette Core
//!
//! Core utilities and foundational types for the Marionette IK toolkit.
//!
//! This crate provides:
//! - Common error types and result aliases
//! - Logging and tracing infrastructure
//! - Math extensions on top of glam (robust quaternion conversions,
//!   ZXY Euler handling, arc rotations with fallback axes)
//! - A lazily-synchronized affine transform

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod affine;
pub mod error;
pub mod logger;
pub mod math;

pub use affine::{AffineTransform, TransformConfig};
pub use error::{Error, Result};
pub use logger::{LogLevel, Logger};

/// Marionette version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize core systems (logging, etc.)
///
/// # Errors
///
/// Returns an error if initialization fails (e.g., logging already initialized)
pub fn init() -> Result<()> {
    Logger::default().install()?;
    tracing::info!("Marionette v{VERSION} initialized");
    Ok(())
}
