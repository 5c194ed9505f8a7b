//! sf-core: stable foundation for surgeflow.
//!
//! Contains:
//! - units (uom SI types + constructors, water constants)
//! - numeric (Real + tolerances + float helpers)
//! - ids (stable compact IDs for network elements and computational nodes)
//! - error (shared error types)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{SfError, SfResult};
pub use ids::*;
pub use numeric::*;
pub use units::*;
