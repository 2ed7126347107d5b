//! OnSale Email Analysis report service library.
//!
//! Exposes the report engine and HTTP router for the `onsale-report`
//! binary and for integration testing.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod report;
pub mod routes;
pub mod state;
