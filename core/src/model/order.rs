//! Topological ordering of the operator graph.

use crate::error::{InferError, InferResult};
use bit_set::BitSet;
use quiver_data::TVec;

/// Computes one evaluation order over predecessor lists: every node appears
/// after all of its predecessors. `targets` seeds the walk, so nodes no
/// target depends on are left out of the schedule.
pub fn eval_order(preds: &[TVec<usize>], targets: &[usize]) -> InferResult<Vec<usize>> {
    let mut done = BitSet::with_capacity(preds.len());
    let mut pending = BitSet::with_capacity(preds.len());
    let mut order: Vec<usize> = Vec::with_capacity(preds.len());
    let mut needed: Vec<usize> = targets.to_vec();
    while let Some(&node) = needed.last() {
        if done.contains(node) {
            needed.pop();
            continue;
        }
        if preds[node].iter().all(|&p| done.contains(p)) {
            order.push(node);
            done.insert(node);
            needed.pop();
        } else {
            // a node revisited with unresolved predecessors can only come
            // back around through itself
            if !pending.insert(node) {
                return Err(InferError::Graph(format!(
                    "the graph contains a cycle through node {node}"
                )));
            }
            for &p in preds[node].iter().rev() {
                if !done.contains(p) {
                    needed.push(p);
                }
            }
        }
    }
    Ok(order)
}
