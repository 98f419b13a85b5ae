//! Domain model: aggregates enforcing the business rules, value objects and events.
pub mod aggregates;
pub mod events;
pub mod value_objects;
