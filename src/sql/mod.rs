//! Safe SQL builder for row pass-through: validated identifiers, values as parameters.

mod builder;
pub mod params;
pub use builder::*;
pub use params::*;
