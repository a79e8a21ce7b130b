//! API route declarations (e.g., /api/*)

pub mod metrics_routes;
