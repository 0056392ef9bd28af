//! Model graph: the hierarchy of atomic and coupled models.
//!
//! Models live in an arena indexed by [`ModelId`]. Slots of removed
//! models are left empty and never reused, so an ID held by a stale
//! reference can never alias a model created later.
//!
//! Connections are owned by the coupled model that encloses both
//! endpoints. Three shapes exist, as in classic DEVS coupling:
//!
//! | Shape | Source | Destination |
//! |---|---|---|
//! | internal | child output | child input |
//! | input | coupled input | child input |
//! | output | child output | coupled output |
//!
//! The kernel only reads the graph through [`ModelGraph::atomic_targets`]
//! and the hierarchy accessors; executives mutate it through the
//! coordinator.

use std::collections::BTreeMap;

use crate::error::{DevsError, DevsResult};

/// Separator between the names of a model path (`top:sub:a`).
pub const PATH_SEPARATOR: char = ':';

// ── Model ID ──────────────────────────────────────────────────────────

/// Index of a model node in a [`ModelGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ModelId(usize);

impl ModelId {
    #[inline]
    pub fn new(raw: usize) -> Self {
        ModelId(raw)
    }

    #[inline]
    pub fn raw(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

// ── Nodes ─────────────────────────────────────────────────────────────

/// Behavior reference of an atomic model: which dynamics to build, which
/// conditions to initialise it with, and which observable describes its
/// observed ports. All three are names resolved by the model factory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct AtomicNode {
    pub dynamics: String,
    pub conditions: Vec<String>,
    pub observable: Option<String>,
}

impl AtomicNode {
    pub fn new(dynamics: impl Into<String>) -> Self {
        AtomicNode {
            dynamics: dynamics.into(),
            conditions: Vec::new(),
            observable: None,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    pub fn with_observable(mut self, observable: impl Into<String>) -> Self {
        self.observable = Some(observable.into());
        self
    }
}

/// A port-to-port link inside a coupled model.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Connection {
    pub src: ModelId,
    pub src_port: String,
    pub dst: ModelId,
    pub dst_port: String,
}

#[derive(Debug, Clone, Default)]
pub struct CoupledNode {
    children: BTreeMap<String, ModelId>,
    connections: Vec<Connection>,
}

impl CoupledNode {
    pub fn children(&self) -> &BTreeMap<String, ModelId> {
        &self.children
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    Atomic(AtomicNode),
    Coupled(CoupledNode),
}

#[derive(Debug, Clone)]
pub struct ModelNode {
    name: String,
    parent: Option<ModelId>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    kind: NodeKind,
}

impl ModelNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ModelId> {
        self.parent
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self.kind, NodeKind::Atomic(_))
    }

    pub fn is_coupled(&self) -> bool {
        matches!(self.kind, NodeKind::Coupled(_))
    }
}

// ── ModelGraph ────────────────────────────────────────────────────────

/// Arena-backed model hierarchy rooted at a coupled model.
#[derive(Debug, Clone)]
pub struct ModelGraph {
    nodes: Vec<Option<ModelNode>>,
    root: ModelId,
}

impl ModelGraph {
    /// A graph holding only an empty root coupled model.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = ModelNode {
            name: root_name.into(),
            parent: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            kind: NodeKind::Coupled(CoupledNode::default()),
        };
        ModelGraph {
            nodes: vec![Some(root)],
            root: ModelId(0),
        }
    }

    pub fn root(&self) -> ModelId {
        self.root
    }

    pub fn contains(&self, id: ModelId) -> bool {
        matches!(self.nodes.get(id.0), Some(Some(_)))
    }

    /// Number of live models, root included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node(&self, id: ModelId) -> DevsResult<&ModelNode> {
        self.nodes
            .get(id.0)
            .and_then(Option::as_ref)
            .ok_or_else(|| DevsError::Graph(format!("unknown model {}", id)))
    }

    fn node_mut(&mut self, id: ModelId) -> DevsResult<&mut ModelNode> {
        self.nodes
            .get_mut(id.0)
            .and_then(Option::as_mut)
            .ok_or_else(|| DevsError::Graph(format!("unknown model {}", id)))
    }

    fn coupled(&self, id: ModelId) -> DevsResult<&CoupledNode> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Coupled(c) => Ok(c),
            NodeKind::Atomic(_) => Err(DevsError::Graph(format!(
                "model `{}` is not a coupled model",
                node.name
            ))),
        }
    }

    fn coupled_mut(&mut self, id: ModelId) -> DevsResult<&mut CoupledNode> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            NodeKind::Coupled(c) => Ok(c),
            NodeKind::Atomic(_) => Err(DevsError::Graph(format!(
                "model `{}` is not a coupled model",
                node.name
            ))),
        }
    }

    /// The behavior reference of an atomic model.
    pub fn atomic(&self, id: ModelId) -> DevsResult<&AtomicNode> {
        let node = self.node(id)?;
        match &node.kind {
            NodeKind::Atomic(a) => Ok(a),
            NodeKind::Coupled(_) => Err(DevsError::Graph(format!(
                "model `{}` is not an atomic model",
                node.name
            ))),
        }
    }

    pub fn name(&self, id: ModelId) -> DevsResult<&str> {
        Ok(self.node(id)?.name())
    }

    pub fn parent(&self, id: ModelId) -> DevsResult<Option<ModelId>> {
        Ok(self.node(id)?.parent)
    }

    /// Full path from the root, e.g. `top:sub:a`.
    pub fn path(&self, id: ModelId) -> DevsResult<String> {
        let mut names = Vec::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = self.node(current)?;
            names.push(node.name.as_str());
            cursor = node.parent;
        }
        names.reverse();
        Ok(names.join(&PATH_SEPARATOR.to_string()))
    }

    /// The child of `parent` called `name`.
    pub fn child(&self, parent: ModelId, name: &str) -> DevsResult<ModelId> {
        self.coupled(parent)?
            .children
            .get(name)
            .copied()
            .ok_or_else(|| {
                DevsError::Graph(format!(
                    "model `{}` has no child `{}`",
                    self.name(parent).unwrap_or("?"),
                    name
                ))
            })
    }

    /// Children of a coupled model, sorted by name.
    pub fn children(&self, parent: ModelId) -> DevsResult<Vec<ModelId>> {
        Ok(self.coupled(parent)?.children.values().copied().collect())
    }

    /// Resolve a `top:sub:a` path.
    pub fn find(&self, path: &str) -> DevsResult<ModelId> {
        let mut parts = path.split(PATH_SEPARATOR);
        let root_name = parts.next().unwrap_or_default();
        if root_name != self.name(self.root)? {
            return Err(DevsError::Graph(format!("unknown model path `{}`", path)));
        }
        let mut cursor = self.root;
        for part in parts {
            cursor = self.child(cursor, part)?;
        }
        Ok(cursor)
    }

    /// Every atomic model at or below `id`, depth-first, children in name
    /// order.
    pub fn atomics_under(&self, id: ModelId) -> DevsResult<Vec<ModelId>> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            match &self.node(current)?.kind {
                NodeKind::Atomic(_) => out.push(current),
                NodeKind::Coupled(c) => {
                    stack.extend(c.children.values().rev().copied());
                }
            }
        }
        Ok(out)
    }

    // ── Construction ──────────────────────────────────────────

    fn insert(&mut self, parent: ModelId, node: ModelNode) -> DevsResult<ModelId> {
        let id = ModelId(self.nodes.len());
        let name = node.name.clone();
        let siblings = self.coupled_mut(parent)?;
        if siblings.children.contains_key(&name) {
            return Err(DevsError::Graph(format!(
                "model `{}` already exists in its parent",
                name
            )));
        }
        siblings.children.insert(name, id);
        self.nodes.push(Some(node));
        Ok(id)
    }

    /// Add an atomic model under the coupled model `parent`.
    pub fn add_atomic(
        &mut self,
        parent: ModelId,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
        atomic: AtomicNode,
    ) -> DevsResult<ModelId> {
        self.insert(
            parent,
            ModelNode {
                name: name.to_string(),
                parent: Some(parent),
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
                kind: NodeKind::Atomic(atomic),
            },
        )
    }

    /// Add an empty coupled model under `parent`.
    pub fn add_coupled(
        &mut self,
        parent: ModelId,
        name: &str,
        inputs: &[&str],
        outputs: &[&str],
    ) -> DevsResult<ModelId> {
        self.insert(
            parent,
            ModelNode {
                name: name.to_string(),
                parent: Some(parent),
                inputs: inputs.iter().map(|s| s.to_string()).collect(),
                outputs: outputs.iter().map(|s| s.to_string()).collect(),
                kind: NodeKind::Coupled(CoupledNode::default()),
            },
        )
    }

    /// Copy the whole of `template` under `parent`, its root renamed to
    /// `name`. Returns the ID of the copied root.
    pub fn graft(&mut self, parent: ModelId, name: &str, template: &ModelGraph) -> DevsResult<ModelId> {
        let mut mapping: BTreeMap<ModelId, ModelId> = BTreeMap::new();
        let mut order = vec![template.root];
        let mut i = 0;
        while i < order.len() {
            if let NodeKind::Coupled(c) = &template.node(order[i])?.kind {
                order.extend(c.children.values().copied());
            }
            i += 1;
        }

        for old in order {
            let source = template.node(old)?;
            let (new_parent, new_name) = match source.parent {
                None => (parent, name.to_string()),
                Some(p) => (mapping[&p], source.name.clone()),
            };
            let kind = match &source.kind {
                NodeKind::Atomic(a) => NodeKind::Atomic(a.clone()),
                NodeKind::Coupled(_) => NodeKind::Coupled(CoupledNode::default()),
            };
            let new_id = self.insert(
                new_parent,
                ModelNode {
                    name: new_name,
                    parent: Some(new_parent),
                    inputs: source.inputs.clone(),
                    outputs: source.outputs.clone(),
                    kind,
                },
            )?;
            mapping.insert(old, new_id);
        }

        for (old, new) in &mapping {
            if let NodeKind::Coupled(c) = &template.node(*old)?.kind {
                let remapped: Vec<Connection> = c
                    .connections
                    .iter()
                    .map(|conn| Connection {
                        src: mapping[&conn.src],
                        src_port: conn.src_port.clone(),
                        dst: mapping[&conn.dst],
                        dst_port: conn.dst_port.clone(),
                    })
                    .collect();
                self.coupled_mut(*new)?.connections = remapped;
            }
        }

        Ok(mapping[&template.root])
    }

    // ── Structure changes ─────────────────────────────────────

    /// Remove `id` and its whole subtree, with every connection touching
    /// it in the parent.
    pub fn remove(&mut self, id: ModelId) -> DevsResult<()> {
        let parent = self.node(id)?.parent.ok_or_else(|| {
            DevsError::Graph("the root model cannot be removed".to_string())
        })?;
        let name = self.node(id)?.name.clone();

        let siblings = self.coupled_mut(parent)?;
        siblings.children.remove(&name);
        siblings.connections.retain(|c| c.src != id && c.dst != id);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                if let NodeKind::Coupled(c) = node.kind {
                    stack.extend(c.children.into_values());
                }
            }
        }
        Ok(())
    }

    pub fn rename(&mut self, id: ModelId, new_name: &str) -> DevsResult<()> {
        let node = self.node(id)?;
        let old_name = node.name.clone();
        if let Some(parent) = node.parent {
            let siblings = self.coupled_mut(parent)?;
            if siblings.children.contains_key(new_name) {
                return Err(DevsError::Graph(format!(
                    "cannot rename `{}`: `{}` already exists",
                    old_name, new_name
                )));
            }
            siblings.children.remove(&old_name);
            siblings.children.insert(new_name.to_string(), id);
        }
        self.node_mut(id)?.name = new_name.to_string();
        Ok(())
    }

    pub fn add_input_port(&mut self, id: ModelId, port: &str) -> DevsResult<()> {
        let node = self.node_mut(id)?;
        if !node.inputs.iter().any(|p| p == port) {
            node.inputs.push(port.to_string());
        }
        Ok(())
    }

    pub fn add_output_port(&mut self, id: ModelId, port: &str) -> DevsResult<()> {
        let node = self.node_mut(id)?;
        if !node.outputs.iter().any(|p| p == port) {
            node.outputs.push(port.to_string());
        }
        Ok(())
    }

    /// Remove an input port and every connection ending on it.
    pub fn remove_input_port(&mut self, id: ModelId, port: &str) -> DevsResult<()> {
        let node = self.node_mut(id)?;
        let before = node.inputs.len();
        node.inputs.retain(|p| p != port);
        if node.inputs.len() == before {
            return Err(DevsError::Graph(format!(
                "model `{}` has no input port `{}`",
                node.name, port
            )));
        }
        let parent = node.parent;
        if let Some(parent) = parent {
            self.coupled_mut(parent)?
                .connections
                .retain(|c| !(c.dst == id && c.dst_port == port));
        }
        if let Ok(inner) = self.coupled_mut(id) {
            inner.connections.retain(|c| !(c.src == id && c.src_port == port));
        }
        Ok(())
    }

    /// Remove an output port and every connection starting from it.
    pub fn remove_output_port(&mut self, id: ModelId, port: &str) -> DevsResult<()> {
        let node = self.node_mut(id)?;
        let before = node.outputs.len();
        node.outputs.retain(|p| p != port);
        if node.outputs.len() == before {
            return Err(DevsError::Graph(format!(
                "model `{}` has no output port `{}`",
                node.name, port
            )));
        }
        let parent = node.parent;
        if let Some(parent) = parent {
            self.coupled_mut(parent)?
                .connections
                .retain(|c| !(c.src == id && c.src_port == port));
        }
        if let Ok(inner) = self.coupled_mut(id) {
            inner.connections.retain(|c| !(c.dst == id && c.dst_port == port));
        }
        Ok(())
    }

    /// The coupled model owning a connection between `src` and `dst`,
    /// with the port lists each endpoint must provide.
    fn connection_owner(&self, src: ModelId, dst: ModelId) -> DevsResult<(ModelId, bool, bool)> {
        let src_parent = self.parent(src)?;
        let dst_parent = self.parent(dst)?;

        // (owner, source uses its inputs, destination uses its outputs)
        if src_parent.is_some() && src_parent == dst_parent && src != dst {
            Ok((src_parent.unwrap_or(self.root), false, false))
        } else if dst_parent == Some(src) {
            Ok((src, true, false))
        } else if src_parent == Some(dst) {
            Ok((dst, false, true))
        } else if src == dst && self.node(src)?.is_coupled() {
            Ok((src, true, true))
        } else {
            Err(DevsError::Graph(format!(
                "`{}` and `{}` cannot be connected",
                self.path(src)?,
                self.path(dst)?
            )))
        }
    }

    /// Connect `src.src_port` to `dst.dst_port`.
    pub fn add_connection(
        &mut self,
        src: ModelId,
        src_port: &str,
        dst: ModelId,
        dst_port: &str,
    ) -> DevsResult<()> {
        let (owner, src_in, dst_out) = self.connection_owner(src, dst)?;

        let src_node = self.node(src)?;
        let src_ports = if src_in { &src_node.inputs } else { &src_node.outputs };
        if !src_ports.iter().any(|p| p == src_port) {
            return Err(DevsError::Graph(format!(
                "model `{}` has no port `{}` to connect from",
                src_node.name, src_port
            )));
        }
        let dst_node = self.node(dst)?;
        let dst_ports = if dst_out { &dst_node.outputs } else { &dst_node.inputs };
        if !dst_ports.iter().any(|p| p == dst_port) {
            return Err(DevsError::Graph(format!(
                "model `{}` has no port `{}` to connect to",
                dst_node.name, dst_port
            )));
        }

        let conn = Connection {
            src,
            src_port: src_port.to_string(),
            dst,
            dst_port: dst_port.to_string(),
        };
        let coupled = self.coupled_mut(owner)?;
        if !coupled.connections.contains(&conn) {
            coupled.connections.push(conn);
        }
        Ok(())
    }

    pub fn remove_connection(
        &mut self,
        src: ModelId,
        src_port: &str,
        dst: ModelId,
        dst_port: &str,
    ) -> DevsResult<()> {
        let (owner, _, _) = self.connection_owner(src, dst)?;
        let coupled = self.coupled_mut(owner)?;
        let before = coupled.connections.len();
        coupled.connections.retain(|c| {
            !(c.src == src && c.src_port == src_port && c.dst == dst && c.dst_port == dst_port)
        });
        if coupled.connections.len() == before {
            return Err(DevsError::Graph(format!(
                "no connection {}.{} -> {}.{}",
                src, src_port, dst, dst_port
            )));
        }
        Ok(())
    }

    // ── Routing ───────────────────────────────────────────────

    /// Every `(atomic model, input port)` reached from the output port
    /// `port` of `model`, following connections up and down the
    /// hierarchy. Empty when the port is connected to nothing.
    pub fn atomic_targets(&self, model: ModelId, port: &str) -> Vec<(ModelId, String)> {
        let mut out = Vec::new();
        self.follow_output(model, port, &mut out);
        out
    }

    fn follow_output(&self, model: ModelId, port: &str, out: &mut Vec<(ModelId, String)>) {
        let Ok(Some(parent)) = self.parent(model) else {
            return;
        };
        let Ok(coupled) = self.coupled(parent) else {
            return;
        };
        for conn in &coupled.connections {
            if conn.src == model && conn.src_port == port {
                self.reach(parent, conn.dst, &conn.dst_port, out);
            }
        }
    }

    fn follow_input(&self, coupled_id: ModelId, port: &str, out: &mut Vec<(ModelId, String)>) {
        let Ok(coupled) = self.coupled(coupled_id) else {
            return;
        };
        for conn in &coupled.connections {
            if conn.src == coupled_id && conn.src_port == port {
                self.reach(coupled_id, conn.dst, &conn.dst_port, out);
            }
        }
    }

    fn reach(&self, owner: ModelId, dst: ModelId, port: &str, out: &mut Vec<(ModelId, String)>) {
        if dst == owner {
            self.follow_output(owner, port, out);
            return;
        }
        match self.node(dst).map(ModelNode::is_atomic) {
            Ok(true) => out.push((dst, port.to_string())),
            Ok(false) => self.follow_input(dst, port, out),
            Err(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atomic() -> AtomicNode {
        AtomicNode::new("dyn")
    }

    #[test]
    fn test_paths_and_lookup() {
        let mut g = ModelGraph::new("top");
        let sub = g.add_coupled(g.root(), "sub", &[], &[]).unwrap();
        let a = g.add_atomic(sub, "a", &[], &[], atomic()).unwrap();
        assert_eq!(g.path(a).unwrap(), "top:sub:a");
        assert_eq!(g.find("top:sub:a").unwrap(), a);
        assert!(g.find("other:a").is_err());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut g = ModelGraph::new("top");
        g.add_atomic(g.root(), "a", &[], &[], atomic()).unwrap();
        let err = g.add_atomic(g.root(), "a", &[], &[], atomic()).unwrap_err();
        assert!(matches!(err, DevsError::Graph(_)));
    }

    #[test]
    fn test_sibling_routing() {
        let mut g = ModelGraph::new("top");
        let root = g.root();
        let a = g.add_atomic(root, "a", &[], &["out"], atomic()).unwrap();
        let b = g.add_atomic(root, "b", &["in"], &[], atomic()).unwrap();
        g.add_connection(a, "out", b, "in").unwrap();
        assert_eq!(g.atomic_targets(a, "out"), vec![(b, "in".to_string())]);
        assert!(g.atomic_targets(a, "other").is_empty());
    }

    #[test]
    fn test_routing_through_coupled_boundaries() {
        // a.out -> sub.in -> sub:b.in ; sub:b.out -> sub.out -> c.in
        let mut g = ModelGraph::new("top");
        let root = g.root();
        let a = g.add_atomic(root, "a", &[], &["out"], atomic()).unwrap();
        let sub = g.add_coupled(root, "sub", &["in"], &["out"]).unwrap();
        let b = g.add_atomic(sub, "b", &["in"], &["out"], atomic()).unwrap();
        let c = g.add_atomic(root, "c", &["in"], &[], atomic()).unwrap();
        g.add_connection(a, "out", sub, "in").unwrap();
        g.add_connection(sub, "in", b, "in").unwrap();
        g.add_connection(b, "out", sub, "out").unwrap();
        g.add_connection(sub, "out", c, "in").unwrap();

        assert_eq!(g.atomic_targets(a, "out"), vec![(b, "in".to_string())]);
        assert_eq!(g.atomic_targets(b, "out"), vec![(c, "in".to_string())]);
    }

    #[test]
    fn test_connection_needs_ports() {
        let mut g = ModelGraph::new("top");
        let root = g.root();
        let a = g.add_atomic(root, "a", &[], &["out"], atomic()).unwrap();
        let b = g.add_atomic(root, "b", &["in"], &[], atomic()).unwrap();
        assert!(g.add_connection(a, "nope", b, "in").is_err());
        assert!(g.add_connection(a, "out", b, "nope").is_err());
    }

    #[test]
    fn test_remove_subtree_and_connections() {
        let mut g = ModelGraph::new("top");
        let root = g.root();
        let a = g.add_atomic(root, "a", &[], &["out"], atomic()).unwrap();
        let sub = g.add_coupled(root, "sub", &["in"], &[]).unwrap();
        let b = g.add_atomic(sub, "b", &["in"], &[], atomic()).unwrap();
        g.add_connection(a, "out", sub, "in").unwrap();
        g.add_connection(sub, "in", b, "in").unwrap();

        g.remove(sub).unwrap();
        assert!(!g.contains(sub));
        assert!(!g.contains(b));
        assert!(g.atomic_targets(a, "out").is_empty());
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn test_remove_output_port_drops_connections() {
        let mut g = ModelGraph::new("top");
        let root = g.root();
        let a = g.add_atomic(root, "a", &[], &["out"], atomic()).unwrap();
        let b = g.add_atomic(root, "b", &["in"], &[], atomic()).unwrap();
        g.add_connection(a, "out", b, "in").unwrap();
        g.remove_output_port(a, "out").unwrap();
        assert!(g.atomic_targets(a, "out").is_empty());
        assert!(g.remove_output_port(a, "out").is_err());
    }

    #[test]
    fn test_graft_copies_structure() {
        let mut class = ModelGraph::new("class");
        let croot = class.root();
        class.add_input_port(croot, "in").unwrap();
        let x = class.add_atomic(croot, "x", &["in"], &[], atomic()).unwrap();
        class.add_connection(croot, "in", x, "in").unwrap();

        let mut g = ModelGraph::new("top");
        let root = g.root();
        let src = g.add_atomic(root, "src", &[], &["out"], atomic()).unwrap();
        let copy = g.graft(root, "inst", &class).unwrap();
        g.add_connection(src, "out", copy, "in").unwrap();

        let x_copy = g.find("top:inst:x").unwrap();
        assert_eq!(g.atomic_targets(src, "out"), vec![(x_copy, "in".to_string())]);
        assert_eq!(g.atomics_under(root).unwrap(), vec![x_copy, src]);
    }

    #[test]
    fn test_rename() {
        let mut g = ModelGraph::new("top");
        let root = g.root();
        let a = g.add_atomic(root, "a", &[], &[], atomic()).unwrap();
        g.add_atomic(root, "b", &[], &[], atomic()).unwrap();
        assert!(g.rename(a, "b").is_err());
        g.rename(a, "z").unwrap();
        assert_eq!(g.child(root, "z").unwrap(), a);
        assert!(g.child(root, "a").is_err());
    }
}
