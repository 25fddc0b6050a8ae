// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! DAG (Directed Acyclic Graph) builder for stage dependencies
//!
//! Builds and validates the stage graph, ensuring a valid execution order
//! and detecting cycles.

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use crate::errors::AssetflowError;
use crate::pipeline::Pipeline;

/// Builder for stage dependency DAGs
pub struct DagBuilder {
    graph: DiGraph<usize, ()>,
    name_to_index: HashMap<String, NodeIndex>,
    index_to_name: HashMap<NodeIndex, String>,
}

impl DagBuilder {
    /// Create a new DAG builder
    pub fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            name_to_index: HashMap::new(),
            index_to_name: HashMap::new(),
        }
    }

    /// Build a DAG from a pipeline
    pub fn build(pipeline: &Pipeline) -> Result<Self, AssetflowError> {
        let mut builder = Self::new();

        for (idx, stage) in pipeline.stages.iter().enumerate() {
            let node = builder.graph.add_node(idx);
            builder.name_to_index.insert(stage.name.clone(), node);
            builder.index_to_name.insert(node, stage.name.clone());
        }

        for stage in &pipeline.stages {
            let stage_node = builder.name_to_index[&stage.name];

            for dep_name in &stage.depends_on {
                let dep_node = builder.name_to_index.get(dep_name).ok_or_else(|| {
                    AssetflowError::UnknownDependency {
                        stage: stage.name.clone(),
                        dependency: dep_name.clone(),
                    }
                })?;

                if !builder.graph.contains_edge(*dep_node, stage_node) {
                    builder.graph.add_edge(*dep_node, stage_node, ());
                }
            }
        }

        builder.validate_acyclic()?;

        Ok(builder)
    }

    /// Validate that the graph is acyclic
    fn validate_acyclic(&self) -> Result<(), AssetflowError> {
        toposort(&self.graph, None).map(|_| ()).map_err(|cycle| {
            AssetflowError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            }
        })
    }

    /// Find the stages on a cycle through `start`
    fn find_cycle_members(&self, start: NodeIndex) -> Vec<String> {
        use petgraph::visit::{depth_first_search, Control, DfsEvent};

        let mut in_cycle = vec![self.index_to_name[&start].clone()];

        depth_first_search(&self.graph, Some(start), |event| match event {
            DfsEvent::TreeEdge(_, to) => {
                in_cycle.push(self.index_to_name[&to].clone());
                Control::<()>::Continue
            }
            DfsEvent::BackEdge(_, to) if to == start => {
                in_cycle.push(self.index_to_name[&start].clone());
                Control::Break(())
            }
            _ => Control::Continue,
        });

        in_cycle
    }

    /// Get topologically sorted stage indices
    pub fn topological_order(&self) -> Result<Vec<usize>, AssetflowError> {
        toposort(&self.graph, None)
            .map(|nodes| nodes.into_iter().map(|n| self.graph[n]).collect())
            .map_err(|cycle| AssetflowError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            })
    }

    /// Get topologically sorted stage names
    pub fn topological_order_names(&self) -> Result<Vec<String>, AssetflowError> {
        toposort(&self.graph, None)
            .map(|nodes| {
                nodes
                    .into_iter()
                    .map(|n| self.index_to_name[&n].clone())
                    .collect()
            })
            .map_err(|cycle| AssetflowError::CircularDependency {
                stages: self.find_cycle_members(cycle.node_id()),
            })
    }

    /// Get dependencies for a stage (stages that must run before it)
    pub fn dependencies(&self, stage_name: &str) -> Option<Vec<String>> {
        let node = self.name_to_index.get(stage_name)?;
        let mut deps: Vec<String> = self
            .graph
            .neighbors_directed(*node, petgraph::Direction::Incoming)
            .map(|n| self.index_to_name[&n].clone())
            .collect();
        deps.sort();
        Some(deps)
    }

    /// Check if stage A depends (directly or transitively) on stage B
    pub fn depends_on(&self, stage_a: &str, stage_b: &str) -> bool {
        let Some(node_a) = self.name_to_index.get(stage_a) else {
            return false;
        };
        let Some(node_b) = self.name_to_index.get(stage_b) else {
            return false;
        };

        petgraph::algo::has_path_connecting(&self.graph, *node_b, *node_a, None)
    }

    fn sorted_edges(&self) -> Vec<(&str, &str)> {
        let mut edges: Vec<(&str, &str)> = self
            .graph
            .edge_indices()
            .filter_map(|edge| self.graph.edge_endpoints(edge))
            .map(|(from, to)| {
                (
                    self.index_to_name[&from].as_str(),
                    self.index_to_name[&to].as_str(),
                )
            })
            .collect();
        edges.sort();
        edges
    }

    fn sorted_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.name_to_index.keys().map(String::as_str).collect();
        names.sort();
        names
    }

    /// Generate Mermaid diagram of the DAG
    pub fn to_mermaid(&self) -> String {
        let mut out = String::from("graph TD\n");

        for name in self.sorted_names() {
            out.push_str(&format!("    {}[{}]\n", name, name));
        }

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    {} --> {}\n", from, to));
        }

        out
    }

    /// Generate DOT diagram of the DAG
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph pipeline {\n");
        out.push_str("    rankdir=TB;\n");
        out.push_str("    node [shape=box, style=rounded];\n\n");

        for (from, to) in self.sorted_edges() {
            out.push_str(&format!("    \"{}\" -> \"{}\";\n", from, to));
        }

        for name in self.sorted_names() {
            let node = self.name_to_index[name];
            if self.graph.neighbors_undirected(node).count() == 0 {
                out.push_str(&format!("    \"{}\";\n", name));
            }
        }

        out.push_str("}\n");
        out
    }

    /// Generate text representation of execution order
    pub fn to_text(&self, pipeline: &Pipeline) -> Result<String, AssetflowError> {
        let order = self.topological_order()?;
        let mut out = String::new();

        for (i, idx) in order.iter().enumerate() {
            let stage = &pipeline.stages[*idx];
            let deps = self.dependencies(&stage.name).unwrap_or_default();

            out.push_str(&format!("{}. {} ({})", i + 1, stage.name, stage.step_summary()));

            if !deps.is_empty() {
                out.push_str(&format!(" [depends: {}]", deps.join(", ")));
            }

            out.push('\n');
        }

        Ok(out)
    }
}

impl Default for DagBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{BuildMode, Stage, TransformStep};

    fn make_test_pipeline(stages: Vec<(&str, Vec<&str>)>) -> Pipeline {
        Pipeline::new(
            "dist",
            BuildMode::Development,
            stages
                .into_iter()
                .map(|(name, deps)| {
                    Stage::new(
                        name,
                        format!("src/{}", name),
                        vec!["*".into()],
                        format!("dist/{}", name),
                        vec![TransformStep::RawCopy],
                    )
                    .with_depends_on(&deps)
                })
                .collect(),
        )
    }

    #[test]
    fn test_linear_dag() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();
        let order = dag.topological_order_names().unwrap();

        assert_eq!(order, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diamond_dag() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["a"]),
            ("d", vec!["b", "c"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();
        let order = dag.topological_order_names().unwrap();

        assert_eq!(order[0], "a");
        assert_eq!(order[3], "d");
        assert!(order[1] == "b" || order[1] == "c");
        assert!(order[2] == "b" || order[2] == "c");
        assert!(dag.depends_on("d", "a"));
        assert!(!dag.depends_on("b", "c"));
        assert_eq!(dag.dependencies("d").unwrap(), vec!["b", "c"]);
    }

    #[test]
    fn test_circular_dependency_detection() {
        let pipeline = make_test_pipeline(vec![("a", vec!["b"]), ("b", vec!["a"])]);

        let result = DagBuilder::build(&pipeline);
        match result {
            Err(AssetflowError::CircularDependency { stages }) => {
                assert!(stages.contains(&"a".to_string()));
                assert!(stages.contains(&"b".to_string()));
            }
            other => panic!("expected a cycle, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_unknown_dependency() {
        let pipeline = make_test_pipeline(vec![("a", vec!["nonexistent"])]);

        let result = DagBuilder::build(&pipeline);
        assert!(matches!(result, Err(AssetflowError::UnknownDependency { .. })));
    }

    #[test]
    fn test_depends_on_check() {
        let pipeline = make_test_pipeline(vec![
            ("a", vec![]),
            ("b", vec!["a"]),
            ("c", vec!["b"]),
        ]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        assert!(dag.depends_on("c", "a"));
        assert!(dag.depends_on("c", "b"));
        assert!(dag.depends_on("b", "a"));
        assert!(!dag.depends_on("a", "c"));
        assert!(!dag.depends_on("a", "b"));
    }

    #[test]
    fn test_graph_renderings() {
        let pipeline = make_test_pipeline(vec![("a", vec![]), ("b", vec!["a"]), ("solo", vec![])]);

        let dag = DagBuilder::build(&pipeline).unwrap();

        let mermaid = dag.to_mermaid();
        assert!(mermaid.contains("graph TD"));
        assert!(mermaid.contains("a --> b"));

        let dot = dag.to_dot();
        assert!(dot.contains("\"a\" -> \"b\";"));
        assert!(dot.contains("    \"solo\";"));

        let text = dag.to_text(&pipeline).unwrap();
        assert!(text.contains("(raw-copy) [depends: a]"));
    }
}
