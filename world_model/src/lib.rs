//! # World Model
//!
//! The "World Ledger" crate - contains the entity graph, entity definitions and
//! the typed field-accessor layer used to address them by path.
//! This crate holds state only; evaluation and mutation live in `state_engine`.

pub mod entities;
pub mod value;
pub mod world_state;

pub use entities::*;
pub use value::*;
pub use world_state::*;
