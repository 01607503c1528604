//! Query functions, one module per table.

pub mod meal_entries;
pub mod meal_plans;
pub mod pantry;
pub mod users;
