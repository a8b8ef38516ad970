//! The operator DAG and its forward driver.

use crate::internal::*;
use std::mem;

/// One operator instance wired into the graph.
#[derive(Debug)]
pub struct Node {
    pub id: usize,
    pub name: String,
    pub ty: String,
    pub op: Box<dyn Op>,
    /// Input edge ids, in record order.
    pub inputs: TVec<usize>,
    /// Output edge ids, in record order.
    pub outputs: TVec<usize>,
}

/// A named producer→consumers connection carrying one tensor slot per batch
/// item. Slots persist across forward calls so stable shapes never
/// reallocate.
#[derive(Debug)]
struct Edge {
    name: String,
    producer: Option<usize>,
    consumers: TVec<usize>,
    slots: Vec<Option<Tensor>>,
}

/// An executable graph: built once from the parsed model description, then
/// driven through any number of forward passes.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    edges_by_name: HashMap<String, usize>,
    entries: TVec<usize>,
    exits: TVec<usize>,
    order: Vec<usize>,
}

fn intern(edges: &mut Vec<Edge>, by_name: &mut HashMap<String, usize>, name: &str) -> usize {
    if let Some(&e) = by_name.get(name) {
        return e;
    }
    let id = edges.len();
    edges.push(Edge {
        name: name.to_string(),
        producer: None,
        consumers: tvec!(),
        slots: vec![],
    });
    by_name.insert(name.to_string(), id);
    id
}

impl Graph {
    /// Builds the graph: resolves every record through the registry, wires
    /// the named edges into a DAG and computes the execution order. Any
    /// failure here leaves no usable graph behind.
    pub fn build(
        records: &[OpRecord],
        weights: &HashMap<String, Tensor>,
        registry: &OpRegistry,
    ) -> InferResult<Graph> {
        if records.is_empty() {
            return Err(InferError::Graph("the operator record list is empty".to_string()));
        }
        let mut nodes: Vec<Node> = Vec::with_capacity(records.len());
        let mut edges: Vec<Edge> = vec![];
        let mut edges_by_name: HashMap<String, usize> = HashMap::new();
        for (id, record) in records.iter().enumerate() {
            if record.ty.is_empty() || record.name.is_empty() {
                return Err(InferError::NullOperator(format!(
                    "record {id} is missing its type tag or name"
                )));
            }
            let mut record = record.clone();
            if let Some(key) = record.weight_key.clone() {
                match weights.get(&key) {
                    Some(w) => record.weights = Some(w.clone()),
                    None => {
                        return Err(InferError::Param(format!(
                            "{}: no weight blob under key {key}",
                            record.name
                        )));
                    }
                }
            }
            let op = registry.build(&record)?;
            let mut input_ids = tvec!();
            for edge in &record.inputs {
                let e = intern(&mut edges, &mut edges_by_name, edge);
                edges[e].consumers.push(id);
                input_ids.push(e);
            }
            let mut output_ids = tvec!();
            for edge in &record.outputs {
                let e = intern(&mut edges, &mut edges_by_name, edge);
                if let Some(previous) = edges[e].producer {
                    return Err(InferError::Graph(format!(
                        "edge {edge} has two producers: {} and {}",
                        nodes[previous].name, record.name
                    )));
                }
                edges[e].producer = Some(id);
                output_ids.push(e);
            }
            log::debug!("node #{id} {} ({})", record.name, record.ty);
            nodes.push(Node {
                id,
                name: record.name.clone(),
                ty: record.ty.clone(),
                op,
                inputs: input_ids,
                outputs: output_ids,
            });
        }
        for edge in &edges {
            if edge.producer.is_none() {
                return Err(InferError::Graph(format!(
                    "edge {} is consumed but has no producer",
                    edge.name
                )));
            }
            if edge.consumers.is_empty() {
                return Err(InferError::Graph(format!(
                    "edge {} is produced but never consumed",
                    edge.name
                )));
            }
        }
        let entries: TVec<usize> = nodes
            .iter()
            .filter(|n| n.op.name() == "Source")
            .flat_map(|n| n.outputs.iter().copied())
            .collect();
        let exits: TVec<usize> = nodes
            .iter()
            .filter(|n| n.op.name() == "Sink")
            .flat_map(|n| n.inputs.iter().copied())
            .collect();
        if entries.is_empty() {
            return Err(InferError::Graph("the graph declares no entry operator".to_string()));
        }
        if exits.is_empty() {
            return Err(InferError::Graph("the graph declares no exit operator".to_string()));
        }
        let mut preds: Vec<TVec<usize>> = vec![tvec!(); nodes.len()];
        for node in &nodes {
            for &e in &node.inputs {
                if let Some(p) = edges[e].producer {
                    preds[node.id].push(p);
                }
            }
        }
        let targets: Vec<usize> =
            nodes.iter().filter(|n| n.op.name() == "Sink").map(|n| n.id).collect();
        let order = super::order::eval_order(&preds, &targets)?;
        log::debug!("schedule over {} of {} nodes", order.len(), nodes.len());
        Ok(Graph { nodes, edges, edges_by_name, entries, exits, order })
    }

    /// Binds a batch of externally supplied tensors to an entry edge.
    /// Ownership moves into the graph's edge storage.
    pub fn set_inputs(&mut self, edge: &str, tensors: Vec<Tensor>) -> InferResult<()> {
        let e = self.edge_id(edge)?;
        if !self.entries.contains(&e) {
            return Err(InferError::Graph(format!("edge {edge} is not an entry edge")));
        }
        if tensors.is_empty() {
            return Err(InferError::InputsEmpty(format!(
                "no tensors supplied for entry edge {edge}"
            )));
        }
        self.edges[e].slots = tensors.into_iter().map(Some).collect();
        Ok(())
    }

    /// Runs the whole schedule once. Every entry edge must be bound with the
    /// same batch length beforehand. The first failing operator aborts the
    /// walk; its identity is part of the returned error.
    pub fn forward(&mut self) -> InferResult<()> {
        let batch = self.bound_batch()?;
        for e in 0..self.edges.len() {
            if self.entries.contains(&e) {
                continue;
            }
            if self.edges[e].slots.len() != batch {
                self.edges[e].slots.clear();
                self.edges[e].slots.resize_with(batch, || None);
            }
        }
        for &n in &self.order {
            let node = &self.nodes[n];
            let op_name = node.op.name();
            if op_name == "Source" || op_name == "Sink" {
                continue;
            }
            // detach this node's output slots, then borrow the rest of the
            // edge storage for inputs
            let mut lens: TVec<usize> = tvec!();
            let mut flat: Vec<Option<Tensor>> = vec![];
            for &e in &node.outputs {
                let mut slots = mem::take(&mut self.edges[e].slots);
                lens.push(slots.len());
                flat.append(&mut slots);
            }
            let status = {
                let mut ins: TVec<&Tensor> = tvec!();
                let mut missing = None;
                for &e in &node.inputs {
                    for slot in &self.edges[e].slots {
                        match slot {
                            Some(t) => ins.push(t),
                            None => missing = Some(self.edges[e].name.clone()),
                        }
                    }
                }
                match missing {
                    Some(name) => Err(InferError::Graph(format!(
                        "edge {name} was not computed before its consumer"
                    ))),
                    None => node.op.forward(&ins, &mut flat),
                }
            };
            for (&e, &len) in node.outputs.iter().zip(lens.iter()) {
                let tail = flat.split_off(len);
                self.edges[e].slots = mem::replace(&mut flat, tail);
            }
            if let Err(err) = status {
                log::error!("forward pass aborted at node {}: {err}", node.name);
                return Err(err.in_node(&node.name));
            }
        }
        Ok(())
    }

    /// Reads an exit edge after a successful forward pass.
    pub fn outputs(&self, edge: &str) -> InferResult<Vec<&Tensor>> {
        let e = self.edge_id(edge)?;
        if !self.exits.contains(&e) {
            return Err(InferError::Graph(format!("edge {edge} is not an exit edge")));
        }
        if self.edges[e].slots.is_empty() {
            return Err(InferError::Graph(format!(
                "edge {edge} has not been computed, run forward first"
            )));
        }
        self.edges[e]
            .slots
            .iter()
            .map(|s| {
                s.as_ref().ok_or_else(|| {
                    InferError::Graph(format!(
                        "edge {edge} has not been computed, run forward first"
                    ))
                })
            })
            .collect()
    }

    fn edge_id(&self, name: &str) -> InferResult<usize> {
        self.edges_by_name
            .get(name)
            .copied()
            .ok_or_else(|| InferError::Graph(format!("unknown edge {name}")))
    }

    fn bound_batch(&self) -> InferResult<usize> {
        let mut batch = 0;
        for &e in &self.entries {
            let edge = &self.edges[e];
            let n = edge.slots.len();
            if n == 0 || edge.slots.iter().any(|s| s.is_none()) {
                return Err(InferError::DimMismatch(format!(
                    "entry edge {} has no bound input batch",
                    edge.name
                )));
            }
            if batch == 0 {
                batch = n;
            } else if batch != n {
                return Err(InferError::DimMismatch(format!(
                    "entry edge {} carries {n} tensors, expected {batch}",
                    edge.name
                )));
            }
        }
        Ok(batch)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn edge_name(&self, e: usize) -> &str {
        &self.edges[e].name
    }

    pub fn entry_edges(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|&e| self.edges[e].name.as_str())
    }

    pub fn exit_edges(&self) -> impl Iterator<Item = &str> + '_ {
        self.exits.iter().map(|&e| self.edges[e].name.as_str())
    }
}
