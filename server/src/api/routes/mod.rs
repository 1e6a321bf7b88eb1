//! API route handlers

pub mod analytics;
pub mod evaluations;
pub mod health;
pub mod sessions;

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
