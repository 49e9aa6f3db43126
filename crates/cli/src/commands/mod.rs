//! CLI command implementations

pub mod artifacts;
pub mod predict;
pub mod status;
