//! Outer surfaces: fixture loading and the JSON-lines command script driver.

pub mod fixtures;
pub mod script;
