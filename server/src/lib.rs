pub mod config;
pub mod gateways;
pub mod handlers;
pub mod models;
pub mod pages;
pub mod routes;
pub mod services;
pub mod store;
pub mod utils;
