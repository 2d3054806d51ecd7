//! lender_server: REST surface of the lender backend.
//!
//! Library half of the binary so that router-level tests can build the app
//! over in-memory stores.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod vintage;
