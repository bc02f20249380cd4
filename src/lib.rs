//! Multi-tenant bus ticketing backend: operator console (onboarding,
//! organizations, fleet and route management) plus a public storefront.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod models;

pub use config::Config;
pub use handlers::configure;
