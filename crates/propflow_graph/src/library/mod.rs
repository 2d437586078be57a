// SPDX-License-Identifier: MIT OR Apache-2.0
//! Standard component types built on the core framework.

pub mod logic;
pub mod math;

use crate::component::ComponentRegistry;

pub use logic::{Compare, Counter};
pub use math::{Add, Oscillator, Scale};

/// Create a registry holding every standard component type
pub fn create_standard_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();

    // Math
    registry.register::<Add>();
    registry.register::<Scale>();
    registry.register::<Oscillator>();

    // Logic
    registry.register::<Compare>();
    registry.register::<Counter>();

    registry
}
