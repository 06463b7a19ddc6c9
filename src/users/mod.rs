pub mod dto;
pub mod handlers;
pub mod memory;
pub mod model;
pub mod repo;
pub mod services;

pub use handlers::{admin_router, router};
