pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod query;
pub mod routes;
pub mod services;
pub mod state;
pub mod worker;
