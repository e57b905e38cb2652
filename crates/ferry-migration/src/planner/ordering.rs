//! Dependency-respecting operation ordering

use std::collections::{HashMap, HashSet};

use crate::operation::MigrationOperation;

/// Stable sort by priority, then place each operation after its
/// dependencies, inserting those recursively first
///
/// Unknown dependency ids are skipped. A dependency loop is cut at the
/// operation already in progress.
pub(crate) fn order_operations(mut operations: Vec<MigrationOperation>) -> Vec<MigrationOperation> {
    operations.sort_by_key(|op| op.priority);

    let index: HashMap<String, usize> = operations
        .iter()
        .enumerate()
        .map(|(i, op)| (op.id.clone(), i))
        .collect();

    let mut placed: HashSet<usize> = HashSet::new();
    let mut in_progress: HashSet<usize> = HashSet::new();
    let mut order: Vec<usize> = Vec::with_capacity(operations.len());

    for i in 0..operations.len() {
        place(
            i,
            &operations,
            &index,
            &mut placed,
            &mut in_progress,
            &mut order,
        );
    }

    let mut slots: Vec<Option<MigrationOperation>> = operations.into_iter().map(Some).collect();
    order
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

fn place(
    i: usize,
    operations: &[MigrationOperation],
    index: &HashMap<String, usize>,
    placed: &mut HashSet<usize>,
    in_progress: &mut HashSet<usize>,
    order: &mut Vec<usize>,
) {
    if placed.contains(&i) || !in_progress.insert(i) {
        return;
    }

    for dep in &operations[i].dependencies {
        match index.get(dep) {
            Some(&d) => place(d, operations, index, placed, in_progress, order),
            None => tracing::warn!(
                operation = %operations[i].id,
                dependency = %dep,
                "Ignoring unknown dependency"
            ),
        }
    }

    in_progress.remove(&i);
    placed.insert(i);
    order.push(i);
}
