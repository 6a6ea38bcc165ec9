//! vitrine: banner resolution over a cache-aside read path and transactional
//! banner writes.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
