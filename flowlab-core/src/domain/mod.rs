//! Domain types for flowlab

pub mod bar;
pub mod factor;
pub mod signal;

pub use bar::{Bar, BarError};
pub use factor::{Factor, UnknownFactor};
pub use signal::{Direction, Signal};
