//! Domain core of the lender backend: authorization, branch visibility,
//! change auditing, entity rules and the storage ports they run against.
//!
//! Nothing here talks to a database or the network. `lender_postgres`
//! supplies the stores and `lender_server` the HTTP surface.

pub mod audit;
pub mod branch;
pub mod error;
pub mod memory;
pub mod models;
pub mod permission;
pub mod ports;
pub mod principal;
pub mod service;
pub mod validation;

pub use error::{LenderError, Result};
pub use service::LenderService;
