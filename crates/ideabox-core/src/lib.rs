//! Ideabox Core: domain models, repository traits and error types for
//! the tenant-scoped idea store.
//!
//! This crate has no database dependency. Storage backends implement the
//! traits in [`repository`].

pub mod error;
pub mod models;
pub mod repository;
pub mod slug;
