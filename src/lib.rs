pub mod api;
pub mod client;
pub mod config;
pub mod models;
pub mod providers;
pub mod routes;
pub mod services;
