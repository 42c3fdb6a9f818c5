//! Property-based tests using proptest
//!
//! Constraint properties of compiled values and pluralization invariants.

pub mod generator_tests;
pub mod pluralize_tests;
pub mod validator_tests;
