//! Postgres persistence for larder: users, pantry rows, stored meal plans
//! and confirmed meal history.

pub mod config;
pub mod models;
pub mod pool;
pub mod queries;
