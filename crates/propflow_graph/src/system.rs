// SPDX-License-Identifier: MIT OR Apache-2.0
//! Ordered update passes over a graph.

use crate::component::{ComponentId, ComponentState};
use crate::error::GraphError;
use crate::graph::Graph;
use crate::property::{Direction, Property};
use crate::settings::SystemSettings;
use crate::value::{Scalar, Value};

/// Timing of the tick being run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameInfo {
    /// Frame number, starting at 0
    pub frame: u64,
    /// Seconds elapsed before this frame
    pub time: f64,
    /// Seconds covered by this frame
    pub delta: f64,
}

/// View of the graph handed to a component while it runs
///
/// Inputs are read-only; outputs are written through the graph so they
/// propagate over links like any other write.
pub struct UpdateContext<'a> {
    graph: &'a mut Graph,
    component: ComponentId,
    frame: FrameInfo,
}

impl<'a> UpdateContext<'a> {
    /// The component being run
    pub fn component(&self) -> ComponentId {
        self.component
    }

    /// Timing of the current tick
    pub fn frame(&self) -> FrameInfo {
        self.frame
    }

    /// Get an input property
    pub fn input(&self, key: &str) -> Result<&Property, GraphError> {
        self.graph.component(self.component)?.ins().get(key)
    }

    /// Get an output property
    pub fn output(&self, key: &str) -> Result<&Property, GraphError> {
        self.graph.component(self.component)?.outs().get(key)
    }

    /// Get the value of an input
    pub fn value(&self, key: &str) -> Result<&Value, GraphError> {
        Ok(self.input(key)?.value())
    }

    /// Whether an input changed since the last update
    pub fn changed(&self, key: &str) -> Result<bool, GraphError> {
        Ok(self.input(key)?.changed())
    }

    /// Read a scalar number input
    pub fn number(&self, key: &str) -> Result<f64, GraphError> {
        let input = self.input(key)?;
        input.value().as_number().ok_or_else(|| expected(input, "a number"))
    }

    /// Read a scalar boolean input
    pub fn boolean(&self, key: &str) -> Result<bool, GraphError> {
        let input = self.input(key)?;
        input.value().as_bool().ok_or_else(|| expected(input, "a boolean"))
    }

    /// Read a number array input
    pub fn numbers(&self, key: &str) -> Result<Vec<f64>, GraphError> {
        let input = self.input(key)?;
        input.value().as_numbers().ok_or_else(|| expected(input, "numbers"))
    }

    /// Write an output and propagate it
    pub fn set_output(&mut self, key: &str, value: impl Into<Value>) -> Result<(), GraphError> {
        let output = self.graph.output(self.component, key)?;
        self.graph.set_value(output, value)
    }

    /// Overwrite one output element in place; follow with [`UpdateContext::announce`]
    pub fn set_output_element(
        &mut self,
        key: &str,
        index: usize,
        value: impl Into<Scalar>,
    ) -> Result<(), GraphError> {
        let output = self.graph.output(self.component, key)?;
        self.graph.set_element(output, index, value)
    }

    /// Flag an output as changed and propagate its current value (fires events)
    pub fn announce(&mut self, key: &str) -> Result<(), GraphError> {
        let output = self.graph.output(self.component, key)?;
        self.graph.set(output)
    }
}

fn expected(property: &Property, what: &str) -> GraphError {
    GraphError::InvalidValue {
        path: property.path().to_string(),
        reason: format!("expected {what}, found {}", property.value()),
    }
}

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Frame number of the tick
    pub frame: u64,
    /// Components whose `update` ran, in run order
    pub updated: Vec<ComponentId>,
    /// Components whose `tick` reported written outputs
    pub ticked: Vec<ComponentId>,
}

/// Drives update passes over a graph in dependency order
#[derive(Debug)]
pub struct System {
    graph: Graph,
    settings: SystemSettings,
    frame: u64,
    time: f64,
}

impl System {
    /// Create a system with default settings
    pub fn new(graph: Graph) -> Self {
        Self::with_settings(graph, SystemSettings::default())
    }

    /// Create a system with explicit settings
    pub fn with_settings(graph: Graph, settings: SystemSettings) -> Self {
        Self {
            graph,
            settings,
            frame: 0,
            time: 0.0,
        }
    }

    /// The driven graph
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The driven graph, for wiring and external writes between ticks
    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    /// Take the graph back
    pub fn into_graph(self) -> Graph {
        self.graph
    }

    /// Active settings
    pub fn settings(&self) -> &SystemSettings {
        &self.settings
    }

    /// Number of completed ticks
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Run one ordered pass. Each component runs `update` if it is dirty or an
    /// input changed, then `tick`, before the next component in the order.
    ///
    /// Output `changed` flags stay raised after the pass. They are cleared
    /// only when their component next starts an `update`.
    pub fn tick(&mut self, delta: f64) -> Result<TickReport, GraphError> {
        let info = FrameInfo {
            frame: self.frame,
            time: self.time,
            delta,
        };
        let order = self.graph.sort_with(self.settings.cycle_policy)?;
        let mut report = TickReport {
            frame: self.frame,
            ..TickReport::default()
        };

        for id in order {
            if self.graph.component(id)?.needs_update() {
                self.update_component(id, info)?;
                report.updated.push(id);
            }
            if self.tick_component(id, info)? {
                report.ticked.push(id);
            }
        }

        self.frame += 1;
        self.time += delta;
        Ok(report)
    }

    fn update_component(&mut self, id: ComponentId, frame: FrameInfo) -> Result<(), GraphError> {
        let component = self.graph.component_mut(id)?;
        if self.settings.trace_updates {
            tracing::debug!("Updating '{}' at frame {}", component.name(), frame.frame);
        } else {
            tracing::trace!("Updating '{}' at frame {}", component.name(), frame.frame);
        }

        component.set_state(ComponentState::Updating);
        component.properties_mut(Direction::Output).clear_changed();

        let result = match component.take_behavior() {
            Some(mut behavior) => {
                let mut ctx = UpdateContext {
                    graph: &mut self.graph,
                    component: id,
                    frame,
                };
                let result = behavior.update(&mut ctx);
                self.graph.component_mut(id)?.restore_behavior(behavior);
                result
            }
            None => Ok(()),
        };

        let component = self.graph.component_mut(id)?;
        match result {
            Ok(()) => {
                component.properties_mut(Direction::Input).clear_changed();
                component.set_state(ComponentState::Clean);
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Update of '{}' failed: {e}", component.name());
                component.set_state(ComponentState::Dirty);
                Err(e)
            }
        }
    }

    fn tick_component(&mut self, id: ComponentId, frame: FrameInfo) -> Result<bool, GraphError> {
        let Some(mut behavior) = self.graph.component_mut(id)?.take_behavior() else {
            return Ok(false);
        };
        let mut ctx = UpdateContext {
            graph: &mut self.graph,
            component: id,
            frame,
        };
        let result = behavior.tick(&mut ctx);
        self.graph.component_mut(id)?.restore_behavior(behavior);
        result
    }
}
