use std::collections::HashMap;
use std::collections::hash_map::Entry;

use log::debug;
use serde::Deserialize;

use crate::error::{Error, Result};

/// Entity id as sent by the backend; numeric and string ids are normalized
/// to the same textual form, so `1`, `1.0` and `"1"` name one node.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

impl<'de> Deserialize<'de> for NodeId {
	fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		#[derive(Deserialize)]
		#[serde(untagged)]
		enum Raw {
			Text(String),
			Number(serde_json::Number),
		}
		Ok(match Raw::deserialize(deserializer)? {
			Raw::Text(s) => NodeId(s),
			Raw::Number(n) => NodeId(number_text(&n)),
		})
	}
}

// Integral floats within the exactly representable range print as integers.
fn number_text(n: &serde_json::Number) -> String {
	match n.as_f64() {
		Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9_007_199_254_740_992.0 => {
			(f as i64).to_string()
		}
		_ => n.to_string(),
	}
}

/// Node as the backend sends it.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawNode {
	pub(crate) id: NodeId,
	#[serde(default)]
	pub(crate) label: Option<String>,
}

/// Relation as the backend sends it.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawEdge {
	pub(crate) source: NodeId,
	pub(crate) target: NodeId,
	#[serde(default)]
	pub(crate) label: String,
}

/// Body of the knowledge-graph endpoint. Relations arrive as `edges` or
/// `links` depending on the backend version; a missing or empty node list
/// means there is no graph.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct GraphResponse {
	#[serde(default)]
	pub(crate) nodes: Option<Vec<RawNode>>,
	#[serde(default)]
	pub(crate) edges: Option<Vec<RawEdge>>,
	#[serde(default)]
	pub(crate) links: Option<Vec<RawEdge>>,
}

/// Entity of a loaded graph.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	/// Backend id.
	pub id: NodeId,
	/// Text drawn under the node.
	pub label: String,
}

/// Directed relation between two nodes, stored as indices into
/// [`GraphModel::nodes`].
#[derive(Clone, Debug, PartialEq)]
pub struct GraphEdge {
	/// Index of the start node.
	pub source: usize,
	/// Index of the node the arrow points at.
	pub target: usize,
	/// Text drawn at the middle of the edge.
	pub label: String,
}

/// Validated graph: every edge endpoint refers to an existing node.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphModel {
	/// Nodes in backend order, without duplicates.
	pub nodes: Vec<GraphNode>,
	/// Edges whose endpoints both exist.
	pub edges: Vec<GraphEdge>,
	index: HashMap<NodeId, usize>,
}

impl GraphModel {
	/// Build a model from a raw response. No nodes means no graph.
	pub fn from_response(raw: GraphResponse) -> Result<Self> {
		let raw_nodes = raw.nodes.unwrap_or_default();
		if raw_nodes.is_empty() {
			return Err(Error::EmptyGraph);
		}

		let mut model = GraphModel::default();
		for node in raw_nodes {
			match model.index.entry(node.id.clone()) {
				Entry::Occupied(_) => debug!("duplicate node id {:?} ignored", node.id.0),
				Entry::Vacant(slot) => {
					slot.insert(model.nodes.len());
					let label = node.label.unwrap_or_else(|| node.id.0.clone());
					model.nodes.push(GraphNode { id: node.id, label });
				}
			}
		}

		let raw_edges = raw
			.edges
			.unwrap_or_default()
			.into_iter()
			.chain(raw.links.unwrap_or_default());
		for edge in raw_edges {
			match (model.index_of(&edge.source), model.index_of(&edge.target)) {
				(Some(source), Some(target)) => model.edges.push(GraphEdge {
					source,
					target,
					label: edge.label,
				}),
				_ => debug!(
					"dropping edge {:?} -> {:?}: unresolved endpoint",
					edge.source.0, edge.target.0
				),
			}
		}
		Ok(model)
	}

	/// Index of the node with the given id.
	pub fn index_of(&self, id: &NodeId) -> Option<usize> {
		self.index.get(id).copied()
	}

	/// Node with the given id.
	pub fn node(&self, id: &NodeId) -> Option<&GraphNode> {
		self.index_of(id).map(|i| &self.nodes[i])
	}

	/// Number of nodes.
	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	/// Whether the graph has no nodes.
	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Number of edges touching each node, by node index.
	pub fn degrees(&self) -> Vec<usize> {
		let mut degrees = vec![0; self.nodes.len()];
		for edge in &self.edges {
			degrees[edge.source] += 1;
			degrees[edge.target] += 1;
		}
		degrees
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(json: &str) -> Result<GraphModel> {
		GraphModel::from_response(serde_json::from_str(json).unwrap())
	}

	#[test]
	fn unresolved_edges_are_dropped() {
		let model = parse(
			r#"{
				"nodes": [{"id": 1, "label": "A"}, {"id": 2, "label": "B"}],
				"edges": [
					{"source": 1, "target": 2, "label": "treats"},
					{"source": 1, "target": 99, "label": "x"}
				]
			}"#,
		)
		.unwrap();

		assert_eq!(model.len(), 2);
		assert_eq!(
			model.edges,
			vec![GraphEdge {
				source: 0,
				target: 1,
				label: "treats".into()
			}]
		);
		assert_eq!(model.node(&NodeId("2".into())).unwrap().label, "B");
	}

	#[test]
	fn links_and_string_ids_are_accepted() {
		let model = parse(
			r#"{
				"nodes": [{"id": "Ginseng", "label": "Ginseng"}, {"id": "Fatigue"}],
				"links": [{"source": "Ginseng", "target": "Fatigue", "label": "relieves"}]
			}"#,
		)
		.unwrap();

		assert_eq!(model.edges.len(), 1);
		assert_eq!(model.nodes[1].label, "Fatigue");
		assert_eq!(model.degrees(), vec![1, 1]);
	}

	#[test]
	fn duplicate_nodes_keep_first() {
		let model = parse(
			r#"{"nodes": [{"id": 1, "label": "first"}, {"id": "1", "label": "second"}]}"#,
		)
		.unwrap();
		assert_eq!(model.len(), 1);
		assert_eq!(model.nodes[0].label, "first");
	}

	#[test]
	fn integral_float_ids_match_integer_ids() {
		let model = parse(
			r#"{
				"nodes": [{"id": 1.0, "label": "A"}, {"id": 2.5, "label": "B"}],
				"links": [
					{"source": 1, "target": "2.5", "label": "x"},
					{"source": "1", "target": 2.5, "label": "y"}
				]
			}"#,
		)
		.unwrap();

		assert_eq!(model.nodes[0].id, NodeId("1".into()));
		assert_eq!(model.edges.len(), 2);
	}

	#[test]
	fn missing_or_empty_nodes_mean_no_graph() {
		assert!(matches!(parse(r#"{}"#), Err(Error::EmptyGraph)));
		assert!(matches!(
			parse(r#"{"nodes": [], "links": []}"#),
			Err(Error::EmptyGraph)
		));
		assert!(matches!(parse(r#"{"nodes": null}"#), Err(Error::EmptyGraph)));
	}
}
