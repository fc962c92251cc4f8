//! # World State Engine
//!
//! Reads, checks and mutates the entity graph held by `world_model`, and
//! bounds how much of it is handed to downstream consumers.
//!
//! ## Core Components
//!
//! - **path**: Dotted addresses into the entity graph, plus role shorthand
//! - **delta**: Typed mutation operators, ledger transfers, batch reports
//! - **expr**: Prerequisite expressions evaluated against role-bound entities
//! - **retriever**: Bounded k-hop neighborhoods of the relationship graph
//! - **config**: Engine limits loaded from TOML
//!
//! ## Design Philosophy
//!
//! - **Synchronous**: Every call runs to completion against one caller-owned graph
//! - **Failures as Data**: Each rejected operation carries a stable reason code
//! - **Deterministic**: Same graph and inputs always produce the same result

pub mod config;
pub mod delta;
pub mod expr;
pub mod path;
pub mod retriever;

pub use config::*;
pub use delta::*;
pub use expr::*;
pub use path::*;
pub use retriever::*;
