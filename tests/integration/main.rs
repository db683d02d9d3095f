//! Integration tests for Fedimap
//!
//! Every simulated federation node is its own wiremock server, addressed by
//! the `127.0.0.1:<port>` node name over plain http.

mod crawl_tests;
mod edges_tests;
