//! Record Nesting Graph
//!
//! Directed graph of records, with an edge wherever one record's rendered field
//! is object-typed and names another record. Used to find records that are
//! always inlined elsewhere, and record cycles that cannot be inlined fully.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

use super::{is_skipped, EsType};
use crate::codegen::TypeModel;

/// Nesting relation between the records of a model
#[derive(Debug)]
pub struct RecordGraph {
    /// Edge weight is the JSON name of the field
    graph: DiGraph<String, String>,
}

impl RecordGraph {
    pub fn build(model: &TypeModel, date_format: &str) -> Self {
        let mut graph = DiGraph::new();
        let mut index: HashMap<String, NodeIndex> = HashMap::new();

        for name in model.structs.keys() {
            index.insert(name.clone(), graph.add_node(name.clone()));
        }

        for (name, record) in &model.structs {
            let from = index[name];
            for field in record.fields.values() {
                if is_skipped(&field.json_name) || EsType::of(field, date_format) != EsType::Object {
                    continue;
                }
                if let Some(&to) = field.ty.record_name().and_then(|target| index.get(target)) {
                    graph.add_edge(from, to, field.json_name.clone());
                }
            }
        }

        Self { graph }
    }

    /// Records nested inside some other record.
    ///
    /// A record that only refers to itself is not counted as nested.
    pub fn nested_records(&self) -> BTreeSet<String> {
        self.graph
            .node_indices()
            .filter(|&idx| {
                self.graph
                    .edges_directed(idx, Direction::Incoming)
                    .any(|e| e.source() != idx)
            })
            .map(|idx| self.graph[idx].clone())
            .collect()
    }

    /// Records taking part in a nesting cycle, self-references included
    pub fn cyclic_records(&self) -> BTreeSet<String> {
        let mut cyclic = BTreeSet::new();
        for scc in kosaraju_scc(&self.graph) {
            let self_loop = scc.len() == 1 && self.graph.contains_edge(scc[0], scc[0]);
            if scc.len() > 1 || self_loop {
                cyclic.extend(scc.iter().map(|&idx| self.graph[idx].clone()));
            }
        }
        cyclic
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::{Field, Struct, TypeRef};

    fn field(json_name: &str, ty: TypeRef) -> Field {
        Field {
            name: json_name.to_uppercase(),
            json_name: json_name.to_string(),
            ty,
            required: false,
            description: String::new(),
            format: String::new(),
        }
    }

    fn model() -> TypeModel {
        let mut model = TypeModel::new();

        let mut order = Struct::new("#", "Order", "");
        order.add_field(field("customer", TypeRef::Pointer("Customer".into())));
        order.add_field(field("lines", TypeRef::Array(Box::new(TypeRef::Named("Line".into())))));
        order.add_field(field("_meta", TypeRef::Pointer("Meta".into())));
        order.add_field(field("note", TypeRef::String));
        model.insert_struct(order);

        let mut customer = Struct::new("#/definitions/customer", "Customer", "");
        customer.add_field(field("referrer", TypeRef::Pointer("Customer".into())));
        model.insert_struct(customer);

        let mut line = Struct::new("#/definitions/line", "Line", "");
        line.add_field(field("order", TypeRef::Pointer("Order".into())));
        model.insert_struct(line);

        model.insert_struct(Struct::new("#/definitions/meta", "Meta", ""));
        model
    }

    #[test]
    fn test_nested_records() {
        let graph = RecordGraph::build(&model(), "date-time");
        let nested: Vec<String> = graph.nested_records().into_iter().collect();
        // Meta is only reachable through a skipped field
        assert_eq!(nested, vec!["Customer", "Line", "Order"]);
    }

    #[test]
    fn test_cyclic_records() {
        let graph = RecordGraph::build(&model(), "date-time");
        let cyclic: Vec<String> = graph.cyclic_records().into_iter().collect();
        assert_eq!(cyclic, vec!["Customer", "Line", "Order"]);
    }

    #[test]
    fn test_self_reference_is_not_nesting() {
        let mut model = TypeModel::new();
        let mut node = Struct::new("#", "Node", "");
        node.add_field(field("next", TypeRef::Pointer("Node".into())));
        model.insert_struct(node);

        let graph = RecordGraph::build(&model, "date-time");
        assert!(graph.nested_records().is_empty());
        assert!(graph.cyclic_records().contains("Node"));
    }
}
