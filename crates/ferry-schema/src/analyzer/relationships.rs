//! Table relationship map

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use ferry_core::TableDescriptor;

use crate::dependencies::DependencyGraph;

/// A parent reachable through a junction table
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManyToManyHint {
    /// Junction table holding both foreign keys
    pub through: String,
    /// The table on the other side of the junction
    pub target: String,
}

/// Relationships of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRelationships {
    /// Tables this table references
    pub parents: Vec<String>,
    /// Tables that reference this table
    pub children: Vec<String>,
    pub many_to_many: Vec<ManyToManyHint>,
    /// Members of every cycle this table takes part in
    pub circular: Vec<String>,
}

impl TableRelationships {
    /// A table without parents or children
    pub fn is_isolated(&self) -> bool {
        self.parents.is_empty() && self.children.is_empty()
    }
}

/// Build the relationship map for a snapshot
///
/// Keys are exactly the snapshot's table names. Children are found by
/// scanning every table's foreign keys, so parent and child edges mirror
/// each other.
pub(crate) fn map_relationships(
    tables: &[TableDescriptor],
    graph: &DependencyGraph,
) -> BTreeMap<String, TableRelationships> {
    let known: BTreeSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();
    let mut map: BTreeMap<String, TableRelationships> = BTreeMap::new();

    for table in tables {
        let parents: Vec<String> = table
            .referenced_tables()
            .into_iter()
            .filter(|t| known.contains(t))
            .map(str::to_string)
            .collect();

        let children: Vec<String> = tables
            .iter()
            .filter(|other| {
                other
                    .referenced_tables()
                    .iter()
                    .any(|target| *target == table.name)
            })
            .map(|other| other.name.clone())
            .collect();

        let mut circular = BTreeSet::new();
        for cycle in graph.cycles() {
            if cycle.contains(&table.name) {
                circular.extend(cycle.iter().cloned());
            }
        }

        map.insert(
            table.name.clone(),
            TableRelationships {
                parents,
                children,
                many_to_many: Vec::new(),
                circular: circular.into_iter().collect(),
            },
        );
    }

    // A junction reaches two or more distinct parents other than itself
    let junctions: Vec<(String, Vec<String>)> = map
        .iter()
        .filter_map(|(name, rel)| {
            let parents: Vec<String> = rel
                .parents
                .iter()
                .filter(|p| *p != name)
                .cloned()
                .collect();
            (parents.len() >= 2).then(|| (name.clone(), parents))
        })
        .collect();

    for (junction, parents) in junctions {
        for parent in &parents {
            let Some(rel) = map.get_mut(parent) else {
                continue;
            };
            for target in parents.iter().filter(|t| *t != parent) {
                let hint = ManyToManyHint {
                    through: junction.clone(),
                    target: target.clone(),
                };
                if !rel.many_to_many.contains(&hint) {
                    rel.many_to_many.push(hint);
                }
            }
        }
    }

    for rel in map.values_mut() {
        rel.many_to_many.sort();
    }

    map
}
