// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-root, single-leaf directed acyclic graph of saga requests
//!
//! Adjacency is stored as a forward child map plus a precomputed parent
//! map, so the scheduler can walk both directions without back-references
//! between nodes. All invariants are checked at build time, before any
//! event is appended.

use crate::request::{SagaRequest, TaskKind};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use thiserror::Error;

/// Identifies a node within one graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Construction-time graph violations
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph has no nodes")]
    Empty,
    #[error("node {0} is declared twice")]
    DuplicateNode(NodeId),
    #[error("request id '{0}' is carried by more than one node")]
    DuplicateRequest(String),
    #[error("edge references unknown node {0}")]
    UnknownNode(NodeId),
    #[error("expected exactly one root, found {0}")]
    RootCount(usize),
    #[error("expected exactly one leaf, found {0}")]
    LeafCount(usize),
    #[error("root node {0} must carry the saga-start request")]
    RootKind(NodeId),
    #[error("leaf node {0} must carry the saga-end request")]
    LeafKind(NodeId),
    #[error("graph contains a cycle")]
    Cycle,
    #[error("node {0} is not on a root-to-leaf path")]
    Disconnected(NodeId),
}

/// Accumulates nodes and edges, validated by [`GraphBuilder::build`]
#[derive(Default)]
pub struct GraphBuilder {
    nodes: Vec<(NodeId, SagaRequest)>,
    edges: Vec<(NodeId, NodeId)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, id: u64, request: SagaRequest) -> Self {
        self.nodes.push((NodeId(id), request));
        self
    }

    pub fn edge(mut self, parent: u64, child: u64) -> Self {
        self.edges.push((NodeId(parent), NodeId(child)));
        self
    }

    pub fn build(self) -> Result<SagaGraph, GraphError> {
        if self.nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut requests: HashMap<NodeId, SagaRequest> = HashMap::new();
        let mut by_request: HashMap<String, NodeId> = HashMap::new();
        for (id, request) in self.nodes {
            if requests.contains_key(&id) {
                return Err(GraphError::DuplicateNode(id));
            }
            if by_request.insert(request.id.clone(), id).is_some() {
                return Err(GraphError::DuplicateRequest(request.id));
            }
            requests.insert(id, request);
        }

        let mut children: HashMap<NodeId, BTreeSet<NodeId>> =
            requests.keys().map(|&id| (id, BTreeSet::new())).collect();
        let mut parents: HashMap<NodeId, BTreeSet<NodeId>> =
            requests.keys().map(|&id| (id, BTreeSet::new())).collect();
        for (parent, child) in self.edges {
            if !requests.contains_key(&parent) {
                return Err(GraphError::UnknownNode(parent));
            }
            if !requests.contains_key(&child) {
                return Err(GraphError::UnknownNode(child));
            }
            children.entry(parent).or_default().insert(child);
            parents.entry(child).or_default().insert(parent);
        }

        let roots: Vec<NodeId> = requests
            .keys()
            .copied()
            .filter(|id| parents[id].is_empty())
            .collect();
        if roots.len() != 1 {
            return Err(GraphError::RootCount(roots.len()));
        }
        let leaves: Vec<NodeId> = requests
            .keys()
            .copied()
            .filter(|id| children[id].is_empty())
            .collect();
        if leaves.len() != 1 {
            return Err(GraphError::LeafCount(leaves.len()));
        }
        let root = roots[0];
        let leaf = leaves[0];

        if requests[&root].task != TaskKind::SagaStart {
            return Err(GraphError::RootKind(root));
        }
        if requests[&leaf].task != TaskKind::SagaEnd {
            return Err(GraphError::LeafKind(leaf));
        }

        // Kahn's algorithm; any node left over sits on a cycle.
        let mut in_degree: HashMap<NodeId, usize> =
            requests.keys().map(|&id| (id, parents[&id].len())).collect();
        let mut queue: VecDeque<NodeId> = VecDeque::from([root]);
        let mut visited = 0usize;
        while let Some(node) = queue.pop_front() {
            visited += 1;
            for &child in &children[&node] {
                let degree = in_degree
                    .get_mut(&child)
                    .ok_or(GraphError::UnknownNode(child))?;
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }
        if visited != requests.len() {
            return Err(GraphError::Cycle);
        }

        let graph = SagaGraph {
            requests,
            children,
            parents,
            by_request,
            root,
            leaf,
        };

        // Every node must lie on some root-to-leaf path.
        let from_root = graph.walk(root, Direction::Down);
        let to_leaf = graph.walk(leaf, Direction::Up);
        for &id in graph.requests.keys() {
            if !from_root.contains(&id) || !to_leaf.contains(&id) {
                return Err(GraphError::Disconnected(id));
            }
        }

        Ok(graph)
    }
}

/// Validated request graph
pub struct SagaGraph {
    requests: HashMap<NodeId, SagaRequest>,
    children: HashMap<NodeId, BTreeSet<NodeId>>,
    parents: HashMap<NodeId, BTreeSet<NodeId>>,
    by_request: HashMap<String, NodeId>,
    root: NodeId,
    leaf: NodeId,
}

impl SagaGraph {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn leaf(&self) -> NodeId {
        self.leaf
    }

    pub fn node_count(&self) -> usize {
        self.requests.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.requests.keys().copied()
    }

    /// The request carried by `node`
    ///
    /// Panics on an id from a different graph; node ids never escape the
    /// graph they were validated against.
    pub fn request(&self, node: NodeId) -> &SagaRequest {
        &self.requests[&node]
    }

    pub fn node_for_request(&self, request_id: &str) -> Option<NodeId> {
        self.by_request.get(request_id).copied()
    }

    pub fn children(&self, node: NodeId) -> &BTreeSet<NodeId> {
        &self.children[&node]
    }

    pub fn parents(&self, node: NodeId) -> &BTreeSet<NodeId> {
        &self.parents[&node]
    }

    /// All nodes strictly below `node`
    pub fn descendants(&self, node: NodeId) -> HashSet<NodeId> {
        let mut reached = self.walk(node, Direction::Down);
        reached.remove(&node);
        reached
    }

    fn walk(&self, start: NodeId, direction: Direction) -> HashSet<NodeId> {
        let mut reached = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            let step = match direction {
                Direction::Down => &self.children[&node],
                Direction::Up => &self.parents[&node],
            };
            for &next in step {
                if reached.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        reached
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Down,
    Up,
}

#[cfg(test)]
#[path = "graph_tests.rs"]
mod tests;
