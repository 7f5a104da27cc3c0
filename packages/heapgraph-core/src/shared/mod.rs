//! Shared models and utilities

pub mod interner;
pub mod models;
