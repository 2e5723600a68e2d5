//! Shopfront: catalogue, blog, booking and back-office API for a small
//! business, backed by Postgres with a read-through cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
