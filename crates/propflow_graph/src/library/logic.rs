// SPDX-License-Identifier: MIT OR Apache-2.0
//! Comparison and counting components.

use crate::component::Behavior;
use crate::error::GraphError;
use crate::property_set::PropertySet;
use crate::schema::PropertySchema;
use crate::system::UpdateContext;

/// Labels of [`Compare`]'s mode input
pub const COMPARE_MODES: [&str; 3] = ["Equal", "Less", "Greater"];

/// Compares two numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct Compare;

impl Behavior for Compare {
    fn type_name(&self) -> &str {
        "Compare"
    }

    fn declare(&self, ins: &mut PropertySet, outs: &mut PropertySet) -> Result<(), GraphError> {
        ins.append([
            ("a", PropertySchema::number("A", 0.0)),
            ("b", PropertySchema::number("B", 0.0)),
            ("mode", PropertySchema::enumeration("Mode", COMPARE_MODES, 0)),
        ])?;
        outs.append([("result", PropertySchema::boolean("Result", true))])?;
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), GraphError> {
        let (a, b) = (ctx.number("a")?, ctx.number("b")?);
        let result = match ctx.number("mode")? as usize {
            1 => a < b,
            2 => a > b,
            _ => a == b,
        };
        ctx.set_output("result", result)
    }
}

/// Counts `increment` events; `reset` sets the count back to zero
#[derive(Debug, Clone, Copy, Default)]
pub struct Counter {
    count: f64,
}

impl Behavior for Counter {
    fn type_name(&self) -> &str {
        "Counter"
    }

    fn declare(&self, ins: &mut PropertySet, outs: &mut PropertySet) -> Result<(), GraphError> {
        ins.append([
            ("increment", PropertySchema::event("Increment")),
            ("reset", PropertySchema::event("Reset")),
            ("step", PropertySchema::number("Step", 1.0)),
        ])?;
        outs.append([("count", PropertySchema::number("Count", 0.0))])?;
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), GraphError> {
        if ctx.changed("reset")? {
            self.count = 0.0;
        }
        if ctx.changed("increment")? {
            self.count += ctx.number("step")?;
        }
        ctx.set_output("count", self.count)
    }
}
