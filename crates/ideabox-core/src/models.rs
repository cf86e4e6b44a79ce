//! Domain models for Ideabox.
//!
//! These are the core types shared across all crates.

pub mod comment;
pub mod idea;
pub mod tag;
pub mod tenant;
pub mod user;
