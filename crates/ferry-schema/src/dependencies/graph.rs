//! Table dependency graph
//!
//! Edges follow foreign keys: a table depends on every table it references.
//! The graph records depth levels for creation ordering and flags tables that
//! take part in circular reference chains.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use ferry_core::TableDescriptor;

/// One table in the dependency graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyNode {
    /// Table name
    pub table: String,
    /// Tables this table references
    pub depends_on: Vec<String>,
    /// Tables that reference this table
    pub dependents: Vec<String>,
    /// 0 for tables without dependencies, otherwise 1 + max level of dependencies.
    /// Not meaningful for circular tables.
    pub level: usize,
    /// Whether the table is part of a circular reference chain
    pub circular: bool,
}

impl DependencyNode {
    fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            depends_on: Vec::new(),
            dependents: Vec::new(),
            level: 0,
            circular: false,
        }
    }

    /// Check if this table has any dependencies
    pub fn has_dependencies(&self) -> bool {
        !self.depends_on.is_empty()
    }

    /// Check if any tables depend on this
    pub fn has_dependents(&self) -> bool {
        !self.dependents.is_empty()
    }

    fn add_dependency(&mut self, table: &str) {
        if !self.depends_on.iter().any(|t| t == table) {
            self.depends_on.push(table.to_string());
        }
    }

    fn add_dependent(&mut self, table: &str) {
        if !self.dependents.iter().any(|t| t == table) {
            self.dependents.push(table.to_string());
        }
    }
}

/// Dependency graph over the tables of one schema snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, DependencyNode>,
    /// Detected cycles, each rotated to start at its smallest member
    cycles: Vec<Vec<String>>,
}

impl DependencyGraph {
    /// Create an empty dependency graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the graph, detect cycles and compute levels
    ///
    /// References to tables outside the snapshot are not edges.
    pub fn from_tables(tables: &[TableDescriptor]) -> Self {
        let mut graph = Self::new();
        let known: HashSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

        for table in tables {
            graph
                .nodes
                .entry(table.name.clone())
                .or_insert_with(|| DependencyNode::new(&table.name));
        }

        for table in tables {
            for target in table.referenced_tables() {
                if !known.contains(target) {
                    continue;
                }
                graph.add_edge(&table.name, target);
            }
        }

        graph.detect_cycles();
        graph.compute_levels();
        graph
    }

    fn add_edge(&mut self, from: &str, to: &str) {
        if let Some(node) = self.nodes.get_mut(from) {
            node.add_dependency(to);
        }
        if let Some(node) = self.nodes.get_mut(to) {
            node.add_dependent(from);
        }
    }

    /// Depth-first search from every table with a fresh visited set and
    /// recursion stack per run. Reaching a table that is still on the stack
    /// closes a cycle made of the stack slice starting at that table.
    fn detect_cycles(&mut self) {
        let mut found: Vec<Vec<String>> = Vec::new();

        for start in self.nodes.keys() {
            let mut visited = HashSet::new();
            let mut stack = Vec::new();
            self.visit(start, &mut visited, &mut stack, &mut found);
        }

        let mut seen: HashSet<BTreeSet<String>> = HashSet::new();
        let mut cycles = Vec::new();
        for cycle in found {
            let members: BTreeSet<String> = cycle.iter().cloned().collect();
            if seen.insert(members) {
                cycles.push(rotate_to_smallest(cycle));
            }
        }
        cycles.sort();

        for cycle in &cycles {
            for table in cycle {
                if let Some(node) = self.nodes.get_mut(table) {
                    node.circular = true;
                }
            }
        }
        self.cycles = cycles;
    }

    fn visit<'a>(
        &'a self,
        table: &'a str,
        visited: &mut HashSet<&'a str>,
        stack: &mut Vec<&'a str>,
        found: &mut Vec<Vec<String>>,
    ) {
        visited.insert(table);
        stack.push(table);

        if let Some(node) = self.nodes.get(table) {
            for dep in &node.depends_on {
                if let Some(pos) = stack.iter().position(|t| *t == dep.as_str()) {
                    found.push(stack[pos..].iter().map(|t| t.to_string()).collect());
                } else if !visited.contains(dep.as_str()) {
                    self.visit(dep, visited, stack, found);
                }
            }
        }

        stack.pop();
    }

    /// Memoized depth computation. Edges between members of the same cycle
    /// are skipped; an in-progress guard cuts any loop the cycle search did
    /// not report.
    fn compute_levels(&mut self) {
        let mut cycle_peers: HashMap<String, HashSet<String>> = HashMap::new();
        for cycle in &self.cycles {
            for table in cycle {
                cycle_peers
                    .entry(table.clone())
                    .or_default()
                    .extend(cycle.iter().cloned());
            }
        }

        let edges: HashMap<String, Vec<String>> = self
            .nodes
            .iter()
            .map(|(name, node)| (name.clone(), node.depends_on.clone()))
            .collect();

        let mut levels: HashMap<String, usize> = HashMap::new();
        let mut in_progress: HashSet<String> = HashSet::new();
        for name in self.nodes.keys() {
            level_of(name, &edges, &cycle_peers, &mut levels, &mut in_progress);
        }

        for (name, node) in self.nodes.iter_mut() {
            node.level = levels.get(name).copied().unwrap_or(0);
        }
    }

    /// Get the node for a table
    pub fn get(&self, table: &str) -> Option<&DependencyNode> {
        self.nodes.get(table)
    }

    /// All nodes ordered by table name
    pub fn nodes(&self) -> impl Iterator<Item = &DependencyNode> {
        self.nodes.values()
    }

    /// Get count of tables in the graph
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Detected cycles
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    pub fn has_cycles(&self) -> bool {
        self.nodes.values().any(|n| n.circular)
    }

    /// Names of all tables flagged as circular
    pub fn circular_tables(&self) -> Vec<&str> {
        self.nodes
            .values()
            .filter(|n| n.circular)
            .map(|n| n.table.as_str())
            .collect()
    }

    /// Tables grouped by depth level
    pub fn levels(&self) -> BTreeMap<usize, Vec<String>> {
        let mut levels: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for node in self.nodes.values() {
            levels.entry(node.level).or_default().push(node.table.clone());
        }
        levels
    }

    /// Find all tables that transitively depend on the given table
    pub fn find_all_dependents(&self, table: &str) -> HashSet<String> {
        let mut visited = HashSet::new();
        let mut queue = vec![table.to_string()];

        while let Some(current) = queue.pop() {
            if visited.contains(&current) {
                continue;
            }
            visited.insert(current.clone());

            if let Some(node) = self.nodes.get(&current) {
                for dep in &node.dependents {
                    if !visited.contains(dep) {
                        queue.push(dep.clone());
                    }
                }
            }
        }

        visited.remove(table);
        visited
    }
}

fn level_of(
    table: &str,
    edges: &HashMap<String, Vec<String>>,
    cycle_peers: &HashMap<String, HashSet<String>>,
    levels: &mut HashMap<String, usize>,
    in_progress: &mut HashSet<String>,
) -> usize {
    if let Some(level) = levels.get(table) {
        return *level;
    }
    if in_progress.contains(table) {
        return 0;
    }
    in_progress.insert(table.to_string());

    let peers = cycle_peers.get(table);
    let mut level = 0;
    for dep in edges.get(table).into_iter().flatten() {
        if peers.is_some_and(|p| p.contains(dep)) {
            continue;
        }
        let dep_level = level_of(dep, edges, cycle_peers, levels, in_progress);
        level = level.max(dep_level + 1);
    }

    in_progress.remove(table);
    levels.insert(table.to_string(), level);
    level
}

fn rotate_to_smallest(mut cycle: Vec<String>) -> Vec<String> {
    if let Some(min_pos) = cycle
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.cmp(b.1))
        .map(|(i, _)| i)
    {
        cycle.rotate_left(min_pos);
    }
    cycle
}
