pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod query;
pub mod routes;
pub mod store;
