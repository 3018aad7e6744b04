//! Dependency graph owning every real-valued node.
//!
//! Nodes are stored by [`NodeId`] with an explicit list of servers (the
//! nodes they read from). Mutations go through the graph so that dirty flags
//! can be pushed to all clients, and formula values are cached until one of
//! their servers changes.

pub mod id;

#[cfg(test)]
mod tests;

pub use id::NodeId;

use crate::formula::{Dependent, EvalError, FormulaError};
use crate::real::{format_value, BoundedScalar, FormatOptions, FormulaNode, PrintStyle, RealValued, ValueDisplay};
use crate::stream::{LineParser, Mode, ReadError, Serializable, WriteError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("Node {0} not found")]
    UnknownNode(NodeId),
    #[error("No node named '{0}'")]
    UnknownName(String),
    #[error("Node '{0}' already exists")]
    DuplicateName(String),
    #[error("Node '{0}' is not a scalar")]
    NotAScalar(String),
    #[error("Circular dependency: {}", .0.join(" → "))]
    Cycle(Vec<String>),
    #[error("Node '{name}' is still read by {clients:?}")]
    InUse { name: String, clients: Vec<String> },
    #[error(transparent)]
    Formula(#[from] FormulaError),
    #[error(transparent)]
    Eval(#[from] EvalError),
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// A node of the graph, dispatched by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "node")]
pub enum Node {
    Scalar(BoundedScalar),
    Formula(FormulaNode),
}

impl Node {
    pub fn as_real(&self) -> &dyn RealValued {
        match self {
            Node::Scalar(s) => s,
            Node::Formula(f) => f,
        }
    }

    pub fn as_real_mut(&mut self) -> &mut dyn RealValued {
        match self {
            Node::Scalar(s) => s,
            Node::Formula(f) => f,
        }
    }

    pub fn as_serializable_mut(&mut self) -> &mut dyn Serializable {
        match self {
            Node::Scalar(s) => s,
            Node::Formula(f) => f,
        }
    }

    pub fn as_serializable(&self) -> &dyn Serializable {
        match self {
            Node::Scalar(s) => s,
            Node::Formula(f) => f,
        }
    }

    pub fn name(&self) -> &str {
        self.as_real().name()
    }

    /// Ids this node reads from.
    fn server_ids(&self) -> Vec<NodeId> {
        match self {
            Node::Scalar(_) => Vec::new(),
            Node::Formula(f) => f.dependents().iter().map(|d| d.id).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    node: Node,
    servers: Vec<NodeId>,
    #[serde(skip)]
    cached: Option<f64>,
}

/// Owner of all nodes and their server edges.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    nodes: HashMap<NodeId, Entry>,
    /// Fast lookup by name
    #[serde(skip)]
    by_name: HashMap<String, NodeId>,
    /// Insertion order
    order: Vec<NodeId>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, node: Node) -> Result<NodeId, GraphError> {
        let name = node.name().to_string();
        if self.by_name.contains_key(&name) {
            return Err(GraphError::DuplicateName(name));
        }
        let id = NodeId::new();
        let servers = node.server_ids();
        self.by_name.insert(name, id);
        self.order.push(id);
        self.nodes.insert(
            id,
            Entry {
                node,
                servers,
                cached: None,
            },
        );
        Ok(id)
    }

    pub fn add_scalar(&mut self, scalar: BoundedScalar) -> Result<NodeId, GraphError> {
        self.insert(Node::Scalar(scalar))
    }

    /// Compile `expression` over the named nodes in `servers`. Only the
    /// nodes the expression references become servers of the new node.
    pub fn add_formula(&mut self, name: &str, expression: &str, servers: &[NodeId]) -> Result<NodeId, GraphError> {
        let offered = self.dependents_of(servers)?;
        let node = FormulaNode::new(name, expression, &offered)?;
        self.insert(Node::Formula(node))
    }

    fn dependents_of(&self, ids: &[NodeId]) -> Result<Vec<Dependent>, GraphError> {
        ids.iter()
            .map(|id| {
                self.nodes
                    .get(id)
                    .map(|e| Dependent::new(*id, e.node.name()))
                    .ok_or(GraphError::UnknownNode(*id))
            })
            .collect()
    }

    fn entry(&self, id: NodeId) -> Result<&Entry, GraphError> {
        self.nodes.get(&id).ok_or(GraphError::UnknownNode(id))
    }

    fn entry_mut(&mut self, id: NodeId) -> Result<&mut Entry, GraphError> {
        self.nodes.get_mut(&id).ok_or(GraphError::UnknownNode(id))
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).map(|e| &e.node)
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.by_name.get(name).copied()
    }

    /// Like [`find`](Self::find), as an error when missing.
    pub fn lookup(&self, name: &str) -> Result<NodeId, GraphError> {
        self.find(name).ok_or_else(|| GraphError::UnknownName(name.to_string()))
    }

    pub fn scalar(&self, id: NodeId) -> Option<&BoundedScalar> {
        match self.get(id)? {
            Node::Scalar(s) => Some(s),
            Node::Formula(_) => None,
        }
    }

    pub fn formula(&self, id: NodeId) -> Option<&FormulaNode> {
        match self.get(id)? {
            Node::Formula(f) => Some(f),
            Node::Scalar(_) => None,
        }
    }

    fn scalar_mut(&mut self, id: NodeId) -> Result<&mut BoundedScalar, GraphError> {
        match &mut self.entry_mut(id)?.node {
            Node::Scalar(s) => Ok(s),
            Node::Formula(f) => Err(GraphError::NotAScalar(f.name().to_string())),
        }
    }

    pub fn servers(&self, id: NodeId) -> Result<&[NodeId], GraphError> {
        Ok(&self.entry(id)?.servers)
    }

    /// Nodes that read directly from `id`.
    pub fn clients(&self, id: NodeId) -> Vec<NodeId> {
        self.order
            .iter()
            .filter(|cid| self.nodes.get(cid).is_some_and(|e| e.servers.contains(&id)))
            .copied()
            .collect()
    }

    /// Nodes in insertion order.
    pub fn ordered_nodes(&self) -> Vec<(NodeId, &Node)> {
        self.order
            .iter()
            .filter_map(|id| self.nodes.get(id).map(|e| (*id, &e.node)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Mark `id` and everything downstream of it dirty, dropping cached values.
    pub fn invalidate(&mut self, id: NodeId, shape: bool) {
        let mut pending = vec![id];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if !seen.insert(current) {
                continue;
            }
            if let Some(entry) = self.nodes.get_mut(&current) {
                entry.cached = None;
                let real = entry.node.as_real_mut();
                real.mark_value_dirty();
                if shape {
                    real.mark_shape_dirty();
                }
            }
            pending.extend(self.clients(current));
        }
    }

    /// Clamped set of a scalar's value.
    pub fn set_value(&mut self, id: NodeId, value: f64) -> Result<(), GraphError> {
        self.scalar_mut(id)?.set_value(value);
        self.invalidate(id, false);
        Ok(())
    }

    pub fn set_fit_range(&mut self, id: NodeId, min: f64, max: f64) -> Result<(), GraphError> {
        self.scalar_mut(id)?.set_fit_range(min, max);
        self.invalidate(id, true);
        Ok(())
    }

    /// Current value of a node, recomputing dirty formulas from their servers.
    pub fn value(&mut self, id: NodeId) -> Result<f64, GraphError> {
        let mut visiting = Vec::new();
        self.value_inner(id, &mut visiting)
    }

    fn value_inner(&mut self, id: NodeId, visiting: &mut Vec<NodeId>) -> Result<f64, GraphError> {
        if visiting.contains(&id) {
            visiting.push(id);
            return Err(GraphError::Cycle(self.names(visiting)));
        }

        let entry = self.entry(id)?;
        if let Node::Scalar(s) = &entry.node {
            return Ok(s.value());
        }
        if let (Some(cached), false) = (entry.cached, entry.node.as_real().dirty().value) {
            return Ok(cached);
        }
        let servers = entry.servers.clone();

        visiting.push(id);
        let mut inputs = Vec::with_capacity(servers.len());
        for server in servers {
            inputs.push(self.value_inner(server, visiting)?);
        }
        visiting.pop();

        let entry = self.entry_mut(id)?;
        let value = match &entry.node {
            Node::Formula(f) => f.evaluate(&inputs)?,
            Node::Scalar(s) => s.value(),
        };
        debug!("recomputed {} = {}", entry.node.name(), value);
        entry.cached = Some(value);
        entry.node.as_real_mut().clear_dirty();
        Ok(value)
    }

    fn names(&self, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|id| {
                self.nodes
                    .get(id)
                    .map(|e| e.node.name().to_string())
                    .unwrap_or_else(|| id.to_string())
            })
            .collect()
    }

    /// Rewire the servers of `id` to same-named nodes among `new_servers`.
    /// Nothing changes if the formula rejects the new set or the rewiring
    /// would make the node read from itself.
    pub fn redirect_servers(
        &mut self,
        id: NodeId,
        new_servers: &[NodeId],
        must_replace_all: bool,
    ) -> Result<(), GraphError> {
        let offered = self.dependents_of(new_servers)?;
        let mut node = self.entry(id)?.node.clone();
        if let Node::Formula(f) = &mut node {
            f.on_dependency_set_changed(&offered, must_replace_all)?;
        }
        let servers = node.server_ids();
        if let Some(server) = servers.iter().find(|s| self.depends_on(**s, id)) {
            return Err(GraphError::Cycle(self.names(&[id, *server, id])));
        }

        let entry = self.entry_mut(id)?;
        entry.node = node;
        entry.servers = servers;
        self.invalidate(id, true);
        Ok(())
    }

    /// Whether `node` is `target` or reads from it, directly or not.
    pub fn depends_on(&self, node: NodeId, target: NodeId) -> bool {
        let mut pending = vec![node];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if current == target {
                return true;
            }
            if seen.insert(current) {
                if let Some(entry) = self.nodes.get(&current) {
                    pending.extend(entry.servers.iter().copied());
                }
            }
        }
        false
    }

    /// Give a node a new unique name. Formulas keep referring to it under
    /// the name they were compiled with until their servers are redirected.
    pub fn rename(&mut self, id: NodeId, new_name: &str) -> Result<(), GraphError> {
        if let Some(&existing) = self.by_name.get(new_name) {
            if existing != id {
                return Err(GraphError::DuplicateName(new_name.to_string()));
            }
        }
        let entry = self.entry_mut(id)?;
        let old_name = entry.node.name().to_string();
        entry.node.as_real_mut().core_mut().name = new_name.to_string();
        self.by_name.remove(&old_name);
        self.by_name.insert(new_name.to_string(), id);
        Ok(())
    }

    /// Apply one line of text to a node. The node is invalidated even when
    /// the line fails, since earlier tokens may already have taken effect.
    pub fn read_line(&mut self, id: NodeId, line: &str, mode: Mode) -> Result<(), GraphError> {
        let entry = self.entry_mut(id)?;
        let mut parser = LineParser::new(line);
        let result = entry.node.as_serializable_mut().read(&mut parser, mode);
        entry.servers = entry.node.server_ids();
        self.invalidate(id, true);
        result.map_err(GraphError::from)
    }

    pub fn write(&self, id: NodeId, mode: Mode) -> Result<String, GraphError> {
        Ok(self.entry(id)?.node.as_serializable().write(mode)?)
    }

    pub fn format(&mut self, id: NodeId, sig_digits: i32, opts: FormatOptions) -> Result<String, GraphError> {
        let value = self.value(id)?;
        match &self.entry(id)?.node {
            Node::Scalar(s) => Ok(s.format(sig_digits, opts)),
            Node::Formula(f) => {
                let display = ValueDisplay {
                    label: f.name(),
                    value,
                    error: 0.0,
                    constant: false,
                    unit: f.unit(),
                };
                Ok(format_value(&display, sig_digits, opts))
            }
        }
    }

    pub fn print(&mut self, id: NodeId, style: PrintStyle) -> Result<String, GraphError> {
        let value = self.value(id)?;
        match &self.entry(id)?.node {
            Node::Scalar(s) => Ok(s.print(style)),
            Node::Formula(f) => Ok(f.print(value)),
        }
    }

    /// Remove a node nothing reads from.
    pub fn remove(&mut self, id: NodeId) -> Result<Node, GraphError> {
        let clients = self.clients(id);
        let entry = self.entry(id)?;
        if !clients.is_empty() {
            return Err(GraphError::InUse {
                name: entry.node.name().to_string(),
                clients: self.names(&clients),
            });
        }
        let entry = self.nodes.remove(&id).ok_or(GraphError::UnknownNode(id))?;
        self.by_name.remove(entry.node.name());
        self.order.retain(|&oid| oid != id);
        Ok(entry.node)
    }

    /// Servers before clients. Fails with the offending path on a cycle.
    pub fn topological_order(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut sorted = Vec::new();
        let mut visited = HashSet::new();
        let mut path = Vec::new();

        for id in &self.order {
            if !visited.contains(id) {
                self.visit(*id, &mut visited, &mut path, &mut sorted)?;
            }
        }
        Ok(sorted)
    }

    fn visit(
        &self,
        id: NodeId,
        visited: &mut HashSet<NodeId>,
        path: &mut Vec<NodeId>,
        sorted: &mut Vec<NodeId>,
    ) -> Result<(), GraphError> {
        if path.contains(&id) {
            path.push(id);
            return Err(GraphError::Cycle(self.names(path)));
        }
        if visited.contains(&id) {
            return Ok(());
        }

        path.push(id);
        if let Some(entry) = self.nodes.get(&id) {
            for server in &entry.servers {
                self.visit(*server, visited, path, sorted)?;
            }
        }
        path.pop();

        visited.insert(id);
        sorted.push(id);
        Ok(())
    }

    /// Rebuild the by_name index (call after deserialization)
    pub fn rebuild_index(&mut self) {
        self.by_name.clear();
        for (id, entry) in &self.nodes {
            self.by_name.insert(entry.node.name().to_string(), *id);
        }
    }
}
