//! Application services layer.

pub mod auth;
pub mod banners;
pub mod cache;
pub mod error;
pub mod repos;
pub mod resolution;
