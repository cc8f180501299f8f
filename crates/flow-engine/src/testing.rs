//! Test doubles for exercising the engine without concrete node kinds
//!
//! These behaviors have no parameters worth persisting and no domain logic;
//! they exist so graph, connectivity and propagation tests can shape ports
//! and failure modes freely.

use std::any::Any;

use crate::error::{FlowError, Result};
use crate::node::{NodeBehavior, UpdateContext};
use crate::package::Package;
use crate::types::{PortSpec, PortType};

/// Forwards the union of everything on its input ports to every output port
pub struct Relay {
    inputs: Vec<PortSpec>,
    outputs: Vec<PortSpec>,
}

impl Relay {
    /// A relay with one single-arity `in` port and one `out` port
    pub fn new() -> Self {
        Self::with_ports(
            vec![PortSpec::single("in", "Input", PortType::Subset)],
            vec![PortSpec::multiple("out", "Output", PortType::Subset)],
        )
    }

    /// A relay with an arbitrary port layout
    pub fn with_ports(inputs: Vec<PortSpec>, outputs: Vec<PortSpec>) -> Self {
        Self { inputs, outputs }
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for Relay {
    fn node_type(&self) -> &'static str {
        "relay"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        self.inputs.clone()
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        self.outputs.clone()
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        let mut merged = Package::new();
        for spec in &self.inputs {
            for package in ctx.input_packages(&spec.id) {
                merged = merged.merge(package);
            }
        }
        for spec in &self.outputs {
            ctx.set_output(&spec.id, merged.clone());
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Emits a fixed package on its single `out` port
pub struct Emitter {
    port: PortSpec,
    package: Package,
}

impl Emitter {
    /// Create an emitter producing the given package
    pub fn new(package: Package) -> Self {
        Self {
            port: PortSpec::multiple("out", "Output", PortType::Subset),
            package,
        }
    }

    /// Change the output port's declared type
    pub fn with_port_type(mut self, port_type: PortType) -> Self {
        self.port.port_type = port_type;
        self
    }

    /// Replace the emitted package; pair with `Graph::touch` to re-propagate
    pub fn set_package(&mut self, package: Package) {
        self.package = package;
    }
}

impl NodeBehavior for Emitter {
    fn node_type(&self) -> &'static str {
        "emitter"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![]
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        vec![self.port.clone()]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        ctx.set_output("out", self.package.clone());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A relay that can be switched into a failing mode
pub struct FailSwitch {
    failing: bool,
}

impl FailSwitch {
    /// Create a working switch; flip it with `set_failing`
    pub fn new() -> Self {
        Self { failing: false }
    }

    /// Make subsequent updates fail (or succeed again)
    pub fn set_failing(&mut self, failing: bool) {
        self.failing = failing;
    }
}

impl Default for FailSwitch {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeBehavior for FailSwitch {
    fn node_type(&self) -> &'static str {
        "fail-switch"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::single("in", "Input", PortType::Subset)]
    }

    fn output_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::multiple("out", "Output", PortType::Subset)]
    }

    fn update(&mut self, ctx: &mut UpdateContext<'_>) -> Result<()> {
        if self.failing {
            return Err(FlowError::failed(ctx.node_id(), "switched to failing"));
        }
        let package = ctx.input_package("in").cloned().unwrap_or_default();
        ctx.set_output("out", package);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
