//! Entity definitions for the world.

mod assets;
mod character;
mod relationship;
mod secret;
mod thread;

pub use assets::*;
pub use character::*;
pub use relationship::*;
pub use secret::*;
pub use thread::*;
