pub mod api;
pub mod config;
pub mod flows;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod templates;
pub mod utils;
pub mod wizard;
