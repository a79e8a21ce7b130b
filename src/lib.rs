//! HTTP façade over the battery metrics store for the energy dashboard.

pub mod api;
pub mod app_state;
pub mod core;
pub mod domain;
pub mod errors;
pub mod routes;
