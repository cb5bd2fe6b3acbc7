//! Integration tests for Archive-Harvest
//!
//! These drive the full harvester against a scripted in-memory extraction
//! backend and against the HTTP backend talking to a mock server.

mod harvest_tests;
mod http_backend_tests;
mod support;
