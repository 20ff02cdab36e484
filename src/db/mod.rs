pub mod auth;
pub mod pg;
pub mod store;
pub mod tx;
pub mod user;
