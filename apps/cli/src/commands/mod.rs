//! Command implementations.

pub mod backends;
pub mod pause;
pub mod provision;
pub mod run;
