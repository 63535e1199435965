//! Unit tests for hostexec
//!
//! These tests use mocked dependencies and run fast without external I/O.

mod architecture;
mod helpers;
mod mocks;
mod property_tests;
