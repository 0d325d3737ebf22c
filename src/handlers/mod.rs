pub mod admin;
pub mod auth;
pub mod buyer;
pub mod farmer;
