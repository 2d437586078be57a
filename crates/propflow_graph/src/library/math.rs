// SPDX-License-Identifier: MIT OR Apache-2.0
//! Arithmetic components.

use crate::component::Behavior;
use crate::error::GraphError;
use crate::property_set::PropertySet;
use crate::schema::PropertySchema;
use crate::system::UpdateContext;
use std::f64::consts::TAU;

/// Sum of two numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct Add;

impl Behavior for Add {
    fn type_name(&self) -> &str {
        "Add"
    }

    fn declare(&self, ins: &mut PropertySet, outs: &mut PropertySet) -> Result<(), GraphError> {
        ins.append([
            ("a", PropertySchema::number("A", 0.0)),
            ("b", PropertySchema::number("B", 0.0)),
        ])?;
        outs.append([("sum", PropertySchema::number("Sum", 0.0))])?;
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), GraphError> {
        let sum = ctx.number("a")? + ctx.number("b")?;
        ctx.set_output("sum", sum)
    }
}

/// Multiplies a 3-vector by a factor
#[derive(Debug, Clone, Copy, Default)]
pub struct Scale;

impl Behavior for Scale {
    fn type_name(&self) -> &str {
        "Scale"
    }

    fn declare(&self, ins: &mut PropertySet, outs: &mut PropertySet) -> Result<(), GraphError> {
        ins.append([
            ("vector", PropertySchema::vector("Vector", [0.0; 3])),
            ("factor", PropertySchema::number("Factor", 1.0).with_step(0.1)),
        ])?;
        outs.append([("vector", PropertySchema::vector("Vector", [0.0; 3]))])?;
        Ok(())
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<(), GraphError> {
        let factor = ctx.number("factor")?;
        let vector = ctx.numbers("vector")?;

        // Write in place, then announce once
        for (i, v) in vector.into_iter().enumerate() {
            ctx.set_output_element("vector", i, v * factor)?;
        }
        ctx.announce("vector")
    }
}

/// Sine wave driven by frame time
#[derive(Debug, Clone, Copy, Default)]
pub struct Oscillator;

impl Behavior for Oscillator {
    fn type_name(&self) -> &str {
        "Oscillator"
    }

    fn declare(&self, ins: &mut PropertySet, outs: &mut PropertySet) -> Result<(), GraphError> {
        ins.append([
            ("frequency", PropertySchema::number("Frequency", 1.0).with_bounds(0.0, 1000.0)),
            ("amplitude", PropertySchema::number("Amplitude", 1.0)),
            ("enabled", PropertySchema::boolean("Enabled", true)),
        ])?;
        outs.append([("value", PropertySchema::number("Value", 0.0).with_precision(3))])?;
        Ok(())
    }

    fn tick(&mut self, ctx: &mut UpdateContext<'_>) -> Result<bool, GraphError> {
        if !ctx.boolean("enabled")? {
            return Ok(false);
        }

        let frame = ctx.frame();
        let t = frame.time + frame.delta;
        let value = ctx.number("amplitude")? * (TAU * ctx.number("frequency")? * t).sin();
        ctx.set_output("value", value)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::system::System;
    use crate::value::Value;

    #[test]
    fn test_add_chain() {
        let mut graph = Graph::new("Math");
        let node = graph.create_node("Math");
        let first = graph.create_named_component(node, "First", Add).unwrap();
        let second = graph.create_named_component(node, "Second", Add).unwrap();

        let sum = graph.output(first, "sum").unwrap();
        graph.link_properties(sum, graph.input(second, "a").unwrap()).unwrap();
        graph.set_value(graph.input(first, "a").unwrap(), 2.0).unwrap();
        graph.set_value(graph.input(first, "b").unwrap(), 3.0).unwrap();
        graph.set_value(graph.input(second, "b").unwrap(), 10.0).unwrap();

        let mut system = System::new(graph);
        system.tick(0.0).unwrap();

        let total = system.graph().output(second, "sum").unwrap();
        assert_eq!(system.graph().value(total).unwrap().as_number(), Some(15.0));
    }

    #[test]
    fn test_scale_announces_whole_vector() {
        let mut graph = Graph::new("Math");
        let node = graph.create_node("Scale");
        let scale = graph.create_component(node, Scale).unwrap();
        graph
            .set_value(graph.input(scale, "vector").unwrap(), Value::from([1.0, 2.0, 3.0]))
            .unwrap();
        graph.set_value(graph.input(scale, "factor").unwrap(), 2.0).unwrap();

        let mut system = System::new(graph);
        system.tick(0.0).unwrap();

        let out = system.graph().output(scale, "vector").unwrap();
        let property = system.graph().property(out).unwrap();
        assert_eq!(property.value().as_numbers(), Some(vec![2.0, 4.0, 6.0]));
        assert!(property.changed());
    }

    #[test]
    fn test_oscillator_ticks_every_frame() {
        let mut graph = Graph::new("Wave");
        let node = graph.create_node("Wave");
        let osc = graph.create_component(node, Oscillator).unwrap();
        graph.set_value(graph.input(osc, "frequency").unwrap(), 0.25).unwrap();

        let mut system = System::new(graph);
        let report = system.tick(1.0).unwrap();
        assert_eq!(report.ticked, vec![osc]);

        let out = system.graph().output(osc, "value").unwrap();
        let value = system.graph().value(out).unwrap().as_number().unwrap();
        assert!((value - 1.0).abs() < 1e-9);

        let enabled = system.graph().input(osc, "enabled").unwrap();
        system.graph_mut().set_value(enabled, false).unwrap();
        assert!(system.tick(1.0).unwrap().ticked.is_empty());
    }
}
