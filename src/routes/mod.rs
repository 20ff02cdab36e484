pub mod auth;
pub mod tx;
pub mod user;
pub mod utils;
