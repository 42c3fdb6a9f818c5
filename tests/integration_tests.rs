//! End-to-end tests against a real listener

mod integration;
