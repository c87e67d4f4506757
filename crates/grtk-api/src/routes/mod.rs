//! # Route Modules
//!
//! - [`physics`]: `/physics/*` capability routes.

pub mod physics;
