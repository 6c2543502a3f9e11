pub mod applications;
pub mod assistant;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod schema;
pub mod state;
pub mod tracker;
pub mod utils;
