pub mod app;
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod health;
pub mod mail;
pub mod response;
pub mod seed;
pub mod state;
pub mod telemetry;
pub mod users;
pub mod validation;
