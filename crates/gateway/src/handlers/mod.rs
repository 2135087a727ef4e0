//! API handlers module

pub mod analysis;
pub mod health;
