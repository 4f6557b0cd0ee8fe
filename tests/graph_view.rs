use relgraph_chat::Error;
use relgraph_chat::components::force_graph::{
	ForceGraphState, GraphModel, GraphResponse, LayoutConfig, LayoutKind, Phase,
};

const GRAPH: &str = r#"{
	"nodes": [
		{"id": "Ginseng", "label": "Ginseng"},
		{"id": "Qi deficiency", "label": "Qi deficiency"},
		{"id": "Fatigue", "label": "Fatigue"},
		{"id": "Astragalus", "label": "Astragalus"},
		{"id": "Spleen", "label": "Spleen"}
	],
	"links": [
		{"source": "Ginseng", "target": "Qi deficiency", "label": "treats"},
		{"source": "Astragalus", "target": "Qi deficiency", "label": "treats"},
		{"source": "Qi deficiency", "target": "Fatigue", "label": "causes"},
		{"source": "Ginseng", "target": "Spleen", "label": "enters"},
		{"source": "Ginseng", "target": "Unknown herb", "label": "pairs with"}
	]
}"#;

fn model() -> GraphModel {
	let raw: GraphResponse = serde_json::from_str(GRAPH).unwrap();
	GraphModel::from_response(raw).unwrap()
}

fn settle(kind: LayoutKind) -> ForceGraphState {
	let config = LayoutConfig {
		kind,
		..LayoutConfig::default()
	};
	let mut state = ForceGraphState::new(model(), &config, 1280.0, 720.0);
	let mut frames = 0;
	while state.simulation.phase() != Phase::Settled {
		state.tick();
		frames += 1;
		assert!(frames < 1_000, "layout never settled");
	}
	state
}

#[test]
fn unresolved_links_are_dropped_at_load() {
	let model = model();
	assert_eq!(model.len(), 5);
	assert_eq!(model.edges.len(), 4);
}

#[test]
fn empty_backend_answer_is_not_a_graph() {
	let raw: GraphResponse = serde_json::from_str(r#"{"nodes": [], "links": []}"#).unwrap();
	assert!(matches!(GraphModel::from_response(raw), Err(Error::EmptyGraph)));
}

#[test]
fn both_engines_settle_inside_the_viewport() {
	for kind in [LayoutKind::Force, LayoutKind::ChargeSpring] {
		let state = settle(kind);
		let t = state.transform();
		for p in state.positions() {
			assert!(p.is_finite(), "{kind:?} produced {p:?}");
			let s = t.to_screen(*p);
			assert!((0.0..=1280.0).contains(&s.x), "{kind:?} x {}", s.x);
			assert!((0.0..=720.0).contains(&s.y), "{kind:?} y {}", s.y);
		}
	}
}

#[test]
fn view_controls_leave_the_layout_alone() {
	let mut state = settle(LayoutKind::Force);
	let positions = state.positions().to_vec();
	let fitted = state.transform();

	for _ in 0..10 {
		state.zoom_in();
	}
	assert_eq!(state.view.zoom_level, 2.5);
	state.zoom_out();
	state.resize(800.0, 600.0);
	assert_eq!(state.simulation.phase(), Phase::Settled);
	assert_eq!(state.positions(), positions.as_slice());

	state.resize(1280.0, 720.0);
	state.reset_view();
	assert_eq!(state.view.zoom_level, 1.0);
	assert_eq!(state.transform(), fitted);
}
