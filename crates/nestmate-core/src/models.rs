//! Domain models for Nestmate.
//!
//! These are the core types shared across all crates.

pub mod group;
pub mod invitation;
pub mod view;
