pub mod contacts;
pub mod customers;
pub mod guarantors;
pub mod health;
pub mod interactions;
pub mod referees;
pub mod users;

use std::sync::Arc;

use lender_core::LenderService;

/// Shared service handle carried as a router extension.
pub type Service = Arc<LenderService>;
