//! Application services: validation, state machines, caching and
//! invalidation on top of the repository traits.

pub mod appointments;
pub mod auth;
pub mod blog;
pub mod error;
pub mod inquiries;
pub mod invalidation;
pub mod products;
pub mod repairs;
pub mod repos;
pub mod settings;
pub mod validate;
