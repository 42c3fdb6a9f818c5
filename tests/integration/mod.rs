//! Integration test module
//!
//! Each test spins a session on a free loopback port and drives it over HTTP.

pub mod common;
pub mod crud_tests;
pub mod dsl_tests;
pub mod lifecycle_tests;
pub mod scenario_tests;
pub mod strict_tests;
