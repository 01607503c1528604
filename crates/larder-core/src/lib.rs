//! Core planning pipeline for larder.
//!
//! ```text
//! PlanRequest ──> planner::plan ──(per day)──> DayGenerator (GeneratorGateway)
//!                     │                             │ backend -> normalize -> schema
//!                     │ <────────── DayPlan ─────────┘
//!                     ├── pantry::deplete   (running pantry for the next day)
//!                     └── pantry::shopping_list (against the initial snapshot)
//!
//! StoredPlan ──> confirm::confirm_plan ──> live pantry + meal history (once)
//! ```

pub mod confirm;
pub mod error;
pub mod generator;
pub mod model;
pub mod pantry;
pub mod planner;
pub mod service;

pub use error::PlanError;
pub use model::{
    DayPlan, DietType, Ingredient, MeasurementSystem, MultiDayPlan, PlanRequest, PlannedMeal,
    StoredPlan, Variability,
};
pub use pantry::PantryItem;
