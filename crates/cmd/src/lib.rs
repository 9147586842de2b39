//! Operator tooling for the overlay filesystem: inspect a descriptor,
//! resolve virtual paths, and generate descriptors from host directories.

pub mod commands;
pub mod common;
