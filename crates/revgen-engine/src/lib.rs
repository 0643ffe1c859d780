//! Orchestration for review generation and scheduling.
//!
//! Ties the pure selection/slot-search algorithms from `revgen-core` to the
//! database and the LLM client: picks products, generates pending reviews up
//! to each shop's weekly cadence, and assigns posting slots to approved
//! reviews.

pub mod error;
pub mod generation;
pub mod scheduling;
pub mod selection;

pub use error::EngineError;
pub use generation::{generate_reviews_for_shop, GenerationOutcome, GenerationSettings};
pub use scheduling::{
    generated_count_this_week, schedule_reviews_for_shop, scheduled_count_this_week,
    ScheduleOutcome,
};
pub use selection::select_products;
