//! Command implementations

pub mod config;
pub mod internal;
pub mod run;
pub mod validate;
pub mod version;
