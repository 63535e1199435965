//! Infrastructure layer: concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, the
//! OpenSSH transport and its HTTP proxy tunnel, filesystem access and
//! settings.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

pub mod command_runner;
pub mod config;
pub mod fleet;
pub mod proxy;
pub mod record;
pub mod request;
pub mod source;
pub mod ssh;
