//! easel-core: shared vocabulary for the easel deployment tools.
//!
//! The locate and deploy steps communicate through these types: candidate
//! addresses tagged by how they were derived, probe and verification
//! outcomes, and the common error type.

pub mod error;
pub mod types;

pub use error::EaselError;
