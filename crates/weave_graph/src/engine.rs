// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scheduling and evaluation of a package's graph.
//!
//! A [`Schedule`] groups nodes into dependency layers. Links that close a
//! cycle are marked as feedback links: they deliver the value committed by
//! the previous pass, which gives feedback paths a one-step delay and keeps
//! every pass finite. A tick repeats passes until nothing changes or the
//! configured pass budget runs out.

use crate::element::EvaluateError;
use crate::link::{Link, LinkId};
use crate::node::{Node, NodeId};
use crate::package::Package;
use crate::socket::SocketDirection;
use crate::value::Value;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};

/// Evaluation order for one package
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    /// Nodes grouped by dependency depth
    layers: Vec<Vec<NodeId>>,
    /// Links feeding each node, in link insertion order
    inbound: HashMap<NodeId, Vec<Link>>,
    /// Links that close a cycle
    feedback: HashSet<LinkId>,
}

impl Schedule {
    /// Compute the schedule of a package
    pub fn build(package: &Package) -> Self {
        let mut inbound: HashMap<NodeId, Vec<Link>> = HashMap::new();
        for link in package.links() {
            inbound.entry(link.to_node).or_default().push(link.clone());
        }

        let (order, feedback) = Self::walk(package, &inbound);

        // Longest path over forward links; `order` lists sources before targets.
        let mut depth: HashMap<NodeId, usize> = HashMap::new();
        for node_id in &order {
            let d = inbound
                .get(node_id)
                .into_iter()
                .flatten()
                .filter(|link| !feedback.contains(&link.id))
                .filter_map(|link| depth.get(&link.from_node).map(|d| d + 1))
                .max()
                .unwrap_or(0);
            depth.insert(*node_id, d);
        }

        let mut layers: Vec<Vec<NodeId>> = Vec::new();
        for node_id in package.node_ids() {
            let d = depth.get(&node_id).copied().unwrap_or(0);
            if layers.len() <= d {
                layers.resize_with(d + 1, Vec::new);
            }
            layers[d].push(node_id);
        }

        Self {
            layers,
            inbound,
            feedback,
        }
    }

    /// Depth-first walk against link direction, in node insertion order.
    ///
    /// Returns the post-order (every node after its forward dependencies) and
    /// the links whose source was still on the walk stack.
    fn walk(package: &Package, inbound: &HashMap<NodeId, Vec<Link>>) -> (Vec<NodeId>, HashSet<LinkId>) {
        #[derive(Clone, Copy, PartialEq, Eq)]
        enum Mark {
            Visiting,
            Done,
        }

        let mut marks: HashMap<NodeId, Mark> = HashMap::new();
        let mut order = Vec::with_capacity(package.node_count());
        let mut feedback = HashSet::new();

        for root in package.node_ids() {
            if marks.contains_key(&root) {
                continue;
            }
            marks.insert(root, Mark::Visiting);
            let mut stack = vec![(root, 0usize)];

            while let Some(&(node_id, next)) = stack.last() {
                let links = inbound.get(&node_id).map_or(&[][..], Vec::as_slice);
                let Some(link) = links.get(next) else {
                    marks.insert(node_id, Mark::Done);
                    order.push(node_id);
                    stack.pop();
                    continue;
                };
                if let Some(top) = stack.last_mut() {
                    top.1 += 1;
                }
                match marks.get(&link.from_node) {
                    Some(Mark::Visiting) => {
                        feedback.insert(link.id);
                    }
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(link.from_node, Mark::Visiting);
                        stack.push((link.from_node, 0));
                    }
                }
            }
        }

        (order, feedback)
    }

    /// Nodes grouped into layers; a layer only depends on earlier layers
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    /// Whether a link closes a cycle
    pub fn is_feedback(&self, link_id: LinkId) -> bool {
        self.feedback.contains(&link_id)
    }

    /// Number of feedback links
    pub fn feedback_count(&self) -> usize {
        self.feedback.len()
    }

    /// Links feeding a node
    pub fn inbound(&self, node_id: NodeId) -> &[Link] {
        self.inbound.get(&node_id).map_or(&[][..], Vec::as_slice)
    }
}

/// A node evaluation that failed during a pass
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFault {
    /// Faulting node
    pub node: NodeId,
    /// Node display name
    pub name: String,
    /// What went wrong
    pub error: EvaluateError,
}

/// Result of one evaluation pass
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Nodes whose committed outputs changed, or whose nested state is still moving
    pub changed: Vec<NodeId>,
    /// Nodes that faulted
    pub faults: Vec<NodeFault>,
}

/// How a tick ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A pass left every committed value unchanged
    Settled {
        /// Passes run, including the final quiet one
        passes: usize,
    },
    /// Values were still changing when the pass budget ran out
    Unstable {
        /// Passes run
        passes: usize,
        /// Nodes still changing in the last pass
        nodes: Vec<NodeId>,
    },
}

/// Result of a tick
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Convergence outcome
    pub outcome: TickOutcome,
    /// Faults raised in the final pass
    pub faults: Vec<NodeFault>,
}

impl TickReport {
    /// Whether the tick settled
    pub fn is_settled(&self) -> bool {
        matches!(self.outcome, TickOutcome::Settled { .. })
    }

    /// Number of passes run
    pub fn passes(&self) -> usize {
        match self.outcome {
            TickOutcome::Settled { passes } | TickOutcome::Unstable { passes, .. } => passes,
        }
    }
}

/// Evaluation state of a package
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackageState {
    /// Not evaluated since the last structural edit
    Idle,
    /// A tick is running
    Evaluating {
        /// Current pass, starting at 1
        pass: usize,
    },
    /// The last tick settled
    Settled,
    /// The last tick ran out of passes
    Unstable,
}

/// Run one pass over every node of the package.
pub(crate) fn run_pass(package: &mut Package) -> PassReport {
    let schedule = package.schedule();
    let mut report = PassReport::default();

    for layer in schedule.layers() {
        let blocked = deliver(package, &schedule, layer, &mut report);

        let parallel = package.config.parallel && layer.len() >= package.config.parallel_threshold.max(2);
        let results: Vec<(NodeId, bool)> = if parallel {
            let members: HashSet<NodeId> = layer.iter().copied().filter(|id| !blocked.contains(id)).collect();
            package
                .nodes
                .values_mut()
                .filter(|node| members.contains(&node.id))
                .collect::<Vec<&mut Node>>()
                .into_par_iter()
                .map(|node| (node.id, evaluate(node)))
                .collect()
        } else {
            let mut results = Vec::with_capacity(layer.len());
            for node_id in layer.iter().filter(|id| !blocked.contains(id)) {
                if let Some(node) = package.nodes.get_mut(node_id) {
                    results.push((*node_id, evaluate(node)));
                }
            }
            results
        };

        for (node_id, changed) in results {
            let Some(node) = package.nodes.get(&node_id) else {
                continue;
            };
            if changed {
                report.changed.push(node_id);
            }
            if let Some(error) = &node.fault {
                report.faults.push(NodeFault {
                    node: node_id,
                    name: node.name.clone(),
                    error: error.clone(),
                });
            }
        }
    }

    tracing::trace!(
        package = %package.name,
        changed = report.changed.len(),
        faults = report.faults.len(),
        "pass complete"
    );
    report
}

fn evaluate(node: &mut Node) -> bool {
    let changed = node.evaluate();
    changed || !node.element.is_settled()
}

/// Copy committed source values along every link into this layer's inputs.
///
/// Returns the nodes that could not take a delivered value; they sit out the
/// pass with a fault recorded.
fn deliver(package: &mut Package, schedule: &Schedule, layer: &[NodeId], report: &mut PassReport) -> HashSet<NodeId> {
    let mut deliveries: Vec<(NodeId, usize, Value)> = Vec::new();
    for node_id in layer {
        for link in schedule.inbound(*node_id) {
            let Some(value) = package
                .nodes
                .get(&link.from_node)
                .and_then(|source| source.output_value(link.from_socket))
            else {
                continue;
            };
            let target = package
                .nodes
                .get(node_id)
                .and_then(|node| node.sockets().input(link.to_socket))
                .map(|socket| socket.value_type());
            let converted = target.and_then(|ty| value.convert_to(ty)).unwrap_or_else(|| value.clone());
            deliveries.push((*node_id, link.to_socket, converted));
        }
    }

    let mut blocked = HashSet::new();
    for (node_id, index, value) in deliveries {
        let Some(node) = package.nodes.get_mut(&node_id) else {
            continue;
        };
        if let Err(e) = node.element.sockets_mut().write(SocketDirection::Input, index, value) {
            tracing::warn!(node = %node_id, index, "delivery rejected: {e}");
            let error = EvaluateError::from(e);
            node.fault = Some(error.clone());
            report.faults.push(NodeFault {
                node: node_id,
                name: node.name.clone(),
                error,
            });
            blocked.insert(node_id);
        }
    }
    blocked
}

impl Package {
    /// Run one settle cycle: passes until quiet or out of budget.
    ///
    /// Package inputs are forwarded before the first pass and outputs are
    /// collected after the last. Faults and non-convergence are reported in
    /// the returned value; the package stays usable either way.
    pub fn tick(&mut self) -> TickReport {
        self.load_inputs();
        let budget = self.config.max_settle_passes.max(1);

        let mut last = PassReport::default();
        let mut outcome = None;
        for pass in 1..=budget {
            self.state = PackageState::Evaluating { pass };
            last = run_pass(self);
            if last.changed.is_empty() {
                outcome = Some(TickOutcome::Settled { passes: pass });
                break;
            }
        }
        self.settled = last.changed.is_empty();
        self.store_outputs();

        let outcome = outcome.unwrap_or_else(|| TickOutcome::Unstable {
            passes: budget,
            nodes: last.changed.clone(),
        });
        match &outcome {
            TickOutcome::Settled { passes } => {
                self.state = PackageState::Settled;
                tracing::debug!(package = %self.name, passes, "tick settled");
            }
            TickOutcome::Unstable { passes, nodes } => {
                self.state = PackageState::Unstable;
                tracing::warn!(package = %self.name, passes, unstable = nodes.len(), "tick did not settle");
            }
        }
        for fault in &last.faults {
            tracing::warn!(package = %self.name, node = %fault.node, "node fault: {}", fault.error);
        }

        TickReport {
            outcome,
            faults: last.faults,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::element::Element;
    use crate::link::SocketAddr;
    use crate::registry::Registry;
    use crate::socket::SocketError;
    use crate::value::ValueType;

    fn out(node: NodeId) -> SocketAddr {
        SocketAddr::output(node, 0)
    }

    fn input(node: NodeId, index: usize) -> SocketAddr {
        SocketAddr::input(node, index)
    }

    fn constant(package: &mut Package, registry: &Registry, value: Value) -> NodeId {
        let type_name = match value.value_type() {
            ValueType::Bool => "values/const_bool",
            ValueType::Int => "values/const_int",
            ValueType::Float => "values/const_float",
            ValueType::String => "values/const_string",
        };
        let id = package.add_node(registry, type_name, [0.0, 0.0]).unwrap();
        package.configure_node(id, value).unwrap();
        id
    }

    #[test]
    fn test_chain_settles_in_order() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("chain");
        // Inserted back to front so insertion order is not evaluation order.
        let n3 = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        let n2 = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        let n1 = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        let c = constant(&mut package, &registry, Value::Bool(true));
        package.connect(out(c), input(n1, 0)).unwrap();
        package.connect(out(n1), input(n2, 0)).unwrap();
        package.connect(out(n2), input(n3, 0)).unwrap();

        let report = package.tick();
        assert_eq!(report.outcome, TickOutcome::Settled { passes: 2 });
        assert!(report.faults.is_empty());
        assert_eq!(package.node(n3).unwrap().output_value(0), Some(&Value::Bool(false)));
        assert_eq!(package.state(), &PackageState::Settled);

        let schedule = package.schedule();
        assert_eq!(schedule.feedback_count(), 0);
        let layer_of = |id: NodeId| schedule.layers().iter().position(|l| l.contains(&id)).unwrap();
        assert!(layer_of(c) < layer_of(n1));
        assert!(layer_of(n1) < layer_of(n2));
        assert!(layer_of(n2) < layer_of(n3));
    }

    #[test]
    fn test_stable_feedback_loop_settles() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("hold");
        let c = constant(&mut package, &registry, Value::Bool(true));
        let or = package.add_node(&registry, "logic/or", [0.0, 0.0]).unwrap();
        package.connect(out(c), input(or, 0)).unwrap();
        package.connect(out(or), input(or, 1)).unwrap();

        let report = package.tick();
        assert!(report.is_settled());
        assert!(report.passes() <= package.config().max_settle_passes);
        assert_eq!(package.schedule().feedback_count(), 1);
        assert_eq!(package.node(or).unwrap().output_value(0), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_sr_latch_holds_state() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("latch");
        let s = constant(&mut package, &registry, Value::Bool(true));
        let r = constant(&mut package, &registry, Value::Bool(false));
        let q = package.add_node(&registry, "logic/nor", [0.0, 0.0]).unwrap();
        let q_bar = package.add_node(&registry, "logic/nor", [0.0, 0.0]).unwrap();
        package.connect(out(r), input(q, 0)).unwrap();
        package.connect(out(q_bar), input(q, 1)).unwrap();
        package.connect(out(s), input(q_bar, 0)).unwrap();
        package.connect(out(q), input(q_bar, 1)).unwrap();

        assert!(package.tick().is_settled());
        assert_eq!(package.node(q).unwrap().output_value(0), Some(&Value::Bool(true)));
        assert_eq!(package.node(q_bar).unwrap().output_value(0), Some(&Value::Bool(false)));

        // Release set: the latch keeps its state.
        package.configure_node(s, Value::Bool(false)).unwrap();
        assert!(package.tick().is_settled());
        assert_eq!(package.node(q).unwrap().output_value(0), Some(&Value::Bool(true)));

        // Reset.
        package.configure_node(r, Value::Bool(true)).unwrap();
        assert!(package.tick().is_settled());
        assert_eq!(package.node(q).unwrap().output_value(0), Some(&Value::Bool(false)));
        assert_eq!(package.node(q_bar).unwrap().output_value(0), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_inverter_ring_is_unstable() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("ring").with_config(EngineConfig {
            max_settle_passes: 16,
            ..EngineConfig::default()
        });
        let not = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        package.connect(out(not), input(not, 0)).unwrap();

        let report = package.tick();
        assert_eq!(
            report.outcome,
            TickOutcome::Unstable {
                passes: 16,
                nodes: vec![not]
            }
        );
        assert_eq!(package.state(), &PackageState::Unstable);

        // Still usable: another tick runs and reports again.
        assert!(!package.tick().is_settled());
    }

    #[test]
    fn test_three_inverter_ring_is_unstable() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("ring3");
        let a = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        let b = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        let c = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        package.connect(out(a), input(b, 0)).unwrap();
        package.connect(out(b), input(c, 0)).unwrap();
        package.connect(out(c), input(a, 0)).unwrap();

        let report = package.tick();
        assert!(!report.is_settled());
        assert_eq!(report.passes(), package.config().max_settle_passes);
    }

    #[test]
    fn test_fault_is_isolated() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("faulty");
        let x = constant(&mut package, &registry, Value::Float(1.0));
        let zero = constant(&mut package, &registry, Value::Float(0.0));
        let div = package.add_node(&registry, "math/divide", [0.0, 0.0]).unwrap();
        let orphan = package.add_node(&registry, "values/int_to_float", [0.0, 0.0]).unwrap();
        let b = constant(&mut package, &registry, Value::Bool(false));
        let not = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        package.connect(out(x), input(div, 0)).unwrap();
        package.connect(out(zero), input(div, 1)).unwrap();
        package.connect(out(b), input(not, 0)).unwrap();

        let report = package.tick();
        assert!(report.is_settled());
        // The orphan has no forward dependencies, so its layer runs first.
        let faulted: Vec<NodeId> = report.faults.iter().map(|f| f.node).collect();
        assert_eq!(faulted, vec![orphan, div]);
        assert_eq!(report.faults[1].error, EvaluateError::DivisionByZero);
        assert!(matches!(
            report.faults[0].error,
            EvaluateError::Socket(SocketError::Uninitialized { .. })
        ));
        assert_eq!(package.node(div).unwrap().output_value(0), None);
        assert!(package.node(div).unwrap().fault().is_some());
        assert_eq!(package.node(not).unwrap().output_value(0), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_fault_holds_last_committed_value() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("hold");
        let x = constant(&mut package, &registry, Value::Float(1.0));
        let y = constant(&mut package, &registry, Value::Float(4.0));
        let div = package.add_node(&registry, "math/divide", [0.0, 0.0]).unwrap();
        package.connect(out(x), input(div, 0)).unwrap();
        package.connect(out(y), input(div, 1)).unwrap();
        assert!(package.tick().faults.is_empty());
        assert_eq!(package.node(div).unwrap().output_value(0), Some(&Value::Float(0.25)));

        package.configure_node(y, Value::Float(0.0)).unwrap();
        let report = package.tick();
        assert_eq!(report.faults.len(), 1);
        assert_eq!(package.node(div).unwrap().output_value(0), Some(&Value::Float(0.25)));
    }

    #[test]
    fn test_int_feeds_float_through_conversion() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("convert");
        let c = constant(&mut package, &registry, Value::Int(180));
        let rad = package.add_node(&registry, "values/degree_to_radian", [0.0, 0.0]).unwrap();
        package.connect(out(c), input(rad, 0)).unwrap();
        assert!(package.tick().is_settled());
        let value = package.node(rad).unwrap().output_value(0).unwrap().as_float().unwrap();
        assert!((value - std::f64::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let registry = Registry::with_builtins().unwrap();
        let build = |parallel: bool| {
            let mut package = Package::new("wide").with_config(EngineConfig {
                parallel,
                parallel_threshold: 2,
                ..EngineConfig::default()
            });
            let c = constant(&mut package, &registry, Value::Bool(true));
            let gates: Vec<NodeId> = (0..32)
                .map(|i| {
                    let kind = if i % 2 == 0 { "logic/not" } else { "logic/toggle" };
                    let id = package.add_node(&registry, kind, [0.0, 0.0]).unwrap();
                    package.connect(out(c), input(id, 0)).unwrap();
                    id
                })
                .collect();
            let report = package.tick();
            let values: Vec<Option<Value>> = gates
                .iter()
                .map(|id| package.node(*id).unwrap().output_value(0).cloned())
                .collect();
            (report.outcome, values)
        };
        assert_eq!(build(true), build(false));
    }

    #[test]
    fn test_schedule_invalidated_by_edits() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("edits");
        let a = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        let first = package.schedule();
        assert!(std::sync::Arc::ptr_eq(&first, &package.schedule()));

        let b = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        package.connect(out(a), input(b, 0)).unwrap();
        let second = package.schedule();
        assert!(!std::sync::Arc::ptr_eq(&first, &second));
        assert_eq!(second.inbound(b).len(), 1);
        assert_eq!(package.state(), &PackageState::Idle);
    }

    #[test]
    fn test_package_inputs_flow_to_outputs() {
        let registry = Registry::with_builtins().unwrap();
        let mut package = Package::new("io");
        package.add_input(ValueType::Bool, "in").unwrap();
        package.add_output(ValueType::Bool, "out").unwrap();
        let not = package.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        package.connect(SocketAddr::output(NodeId::INPUTS, 0), input(not, 0)).unwrap();
        package.connect(out(not), SocketAddr::input(NodeId::OUTPUTS, 0)).unwrap();

        for b in [false, true] {
            package.set_input(0, Value::Bool(b)).unwrap();
            assert!(package.tick().is_settled());
            assert_eq!(package.output(0), Some(&Value::Bool(!b)));
        }
        assert_eq!(package.sockets().outputs().len(), 1);
    }

    fn nand_package(registry: &Registry) -> Package {
        let mut inner = Package::new("NAND");
        inner.add_input(ValueType::Bool, "a").unwrap();
        inner.add_input(ValueType::Bool, "b").unwrap();
        inner.add_output(ValueType::Bool, "out").unwrap();
        let and = inner.add_node(registry, "logic/and", [0.0, 0.0]).unwrap();
        let not = inner.add_node(registry, "logic/not", [0.0, 0.0]).unwrap();
        inner.connect(SocketAddr::output(NodeId::INPUTS, 0), input(and, 0)).unwrap();
        inner.connect(SocketAddr::output(NodeId::INPUTS, 1), input(and, 1)).unwrap();
        inner.connect(out(and), input(not, 0)).unwrap();
        inner.connect(out(not), SocketAddr::input(NodeId::OUTPUTS, 0)).unwrap();
        inner
    }

    #[test]
    fn test_nested_package_matches_flat_graph() {
        let registry = Registry::with_builtins().unwrap();
        for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
            let mut nested = Package::new("nested");
            let ca = constant(&mut nested, &registry, Value::Bool(a));
            let cb = constant(&mut nested, &registry, Value::Bool(b));
            let gate = nested.add_package(nand_package(&registry), [0.0, 0.0]);
            nested.connect(out(ca), input(gate, 0)).unwrap();
            nested.connect(out(cb), input(gate, 1)).unwrap();

            let mut flat = Package::new("flat");
            let ca = constant(&mut flat, &registry, Value::Bool(a));
            let cb = constant(&mut flat, &registry, Value::Bool(b));
            let and = flat.add_node(&registry, "logic/and", [0.0, 0.0]).unwrap();
            let not = flat.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
            flat.connect(out(ca), input(and, 0)).unwrap();
            flat.connect(out(cb), input(and, 1)).unwrap();
            flat.connect(out(and), input(not, 0)).unwrap();

            assert!(nested.tick().is_settled());
            assert!(flat.tick().is_settled());
            let expected = Value::Bool(!(a && b));
            assert_eq!(flat.node(not).unwrap().output_value(0), Some(&expected));
            assert_eq!(nested.node(gate).unwrap().output_value(0), Some(&expected));
        }
    }

    #[test]
    fn test_nested_fault_surfaces_on_parent_node() {
        let registry = Registry::with_builtins().unwrap();
        let mut inner = Package::new("divider");
        inner.add_output(ValueType::Float, "q").unwrap();
        let one = constant(&mut inner, &registry, Value::Float(1.0));
        let zero = constant(&mut inner, &registry, Value::Float(0.0));
        let div = inner.add_node(&registry, "math/divide", [0.0, 0.0]).unwrap();
        inner.connect(out(one), input(div, 0)).unwrap();
        inner.connect(out(zero), input(div, 1)).unwrap();
        inner.connect(out(div), SocketAddr::input(NodeId::OUTPUTS, 0)).unwrap();

        let mut outer = Package::new("outer");
        let nested = outer.add_package(inner, [0.0, 0.0]);
        let report = outer.tick();
        assert_eq!(report.faults.len(), 1);
        assert_eq!(report.faults[0].node, nested);
        assert!(matches!(report.faults[0].error, EvaluateError::Nested { faults: 1, .. }));
        assert_eq!(outer.node(nested).unwrap().output_value(0), None);
    }

    #[test]
    fn test_stray_inner_fault_keeps_healthy_outputs() {
        let registry = Registry::with_builtins().unwrap();

        let mut inner = Package::new("inverter");
        inner.add_input(ValueType::Bool, "in").unwrap();
        inner.add_output(ValueType::Bool, "out").unwrap();
        let not = inner.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        inner.add_node(&registry, "values/int_to_float", [0.0, 80.0]).unwrap();
        inner.connect(SocketAddr::output(NodeId::INPUTS, 0), input(not, 0)).unwrap();
        inner.connect(out(not), SocketAddr::input(NodeId::OUTPUTS, 0)).unwrap();

        let mut nested = Package::new("nested");
        let c = constant(&mut nested, &registry, Value::Bool(false));
        let gate = nested.add_package(inner, [0.0, 0.0]);
        nested.connect(out(c), input(gate, 0)).unwrap();

        let mut flat = Package::new("flat");
        let c = constant(&mut flat, &registry, Value::Bool(false));
        let flat_not = flat.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        let stray = flat.add_node(&registry, "values/int_to_float", [0.0, 80.0]).unwrap();
        flat.connect(out(c), input(flat_not, 0)).unwrap();

        let nested_report = nested.tick();
        let flat_report = flat.tick();
        assert!(nested_report.is_settled());
        assert!(flat_report.is_settled());

        let expected = Some(&Value::Bool(true));
        assert_eq!(flat.node(flat_not).unwrap().output_value(0), expected);
        assert_eq!(nested.node(gate).unwrap().output_value(0), expected);

        assert_eq!(flat_report.faults.len(), 1);
        assert_eq!(flat_report.faults[0].node, stray);
        assert_eq!(nested_report.faults.len(), 1);
        assert_eq!(nested_report.faults[0].node, gate);
        assert!(matches!(
            nested_report.faults[0].error,
            EvaluateError::Nested { faults: 1, .. }
        ));
    }

    #[test]
    fn test_unstable_nested_package_keeps_parent_ticking() {
        let registry = Registry::with_builtins().unwrap();

        let mut ring = Package::new("ring");
        ring.add_output(ValueType::Bool, "q").unwrap();
        let not = ring.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        ring.connect(out(not), input(not, 0)).unwrap();
        ring.connect(out(not), SocketAddr::input(NodeId::OUTPUTS, 0)).unwrap();

        let config = EngineConfig {
            max_settle_passes: 8,
            ..EngineConfig::default()
        };
        let mut parent = Package::new("parent").with_config(config);
        let nested = parent.add_package(ring, [0.0, 0.0]);
        let report = parent.tick();
        assert_eq!(
            report.outcome,
            TickOutcome::Unstable {
                passes: 8,
                nodes: vec![nested]
            }
        );
        assert!(report.faults.is_empty());
        assert_eq!(parent.state(), &PackageState::Unstable);
        assert!(!parent.node(nested).unwrap().element().is_settled());

        // A second tick is still bounded, and the parent accepts edits.
        assert!(!parent.tick().is_settled());
        parent.remove_node(nested).unwrap();
        let c = constant(&mut parent, &registry, Value::Bool(true));
        let inverter = parent.add_node(&registry, "logic/not", [0.0, 0.0]).unwrap();
        parent.connect(out(c), input(inverter, 0)).unwrap();
        assert!(parent.tick().is_settled());
        assert_eq!(parent.state(), &PackageState::Settled);
        assert_eq!(
            parent.node(inverter).unwrap().output_value(0),
            Some(&Value::Bool(false))
        );
    }
}
