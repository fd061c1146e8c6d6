// Library exports for focusboard
// This allows integration tests and external code to use focusboard modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod forum;
pub mod routes;
pub mod state;
pub mod stats;
pub mod timer;
