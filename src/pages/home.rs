use leptos::prelude::*;
use serde_json::{Map, Value, json};

use crate::components::force_graph::ResultGraphCanvas;
use crate::graph::{
	EdgeRecord, EntityRecord, Operation, OperationChain, QueryTicket, ResultBatch, ResultEvent,
	Schema, literal,
};

const PERSON: &str = "Person";
const KNOWS: &str = "knows";

fn person(name: &str) -> EntityRecord {
	EntityRecord {
		group: PERSON.into(),
		vertex: json!(name),
		properties: Map::new(),
	}
}

fn knows(source: &str, destination: &str) -> EdgeRecord {
	EdgeRecord {
		group: KNOWS.into(),
		source: json!(source),
		destination: json!(destination),
		directed: true,
		properties: Map::new(),
	}
}

fn demo_schema() -> Schema {
	serde_json::from_value(json!({
		"types": {"name": {"class": "java.lang.String"}},
		"entities": {PERSON: {"vertex": "name"}},
		"edges": {KNOWS: {"source": "name", "destination": "name"}}
	}))
	.unwrap_or_default()
}

fn demo_configuration() -> Value {
	json!({"graph": {
		"defaultStyle": {"vertices": {"color": "#eeeeee"}},
		"style": {
			"vertexTypes": {"name": {
				"style": {"background-color": "#4aa3df"},
				"fieldOverrides": {"value": {"p0": {"background-color": "#e67e22", "width": 45}}}
			}},
			"edges": {KNOWS: {"line-color": "rgb(160, 160, 200)"}}
		}
	}})
}

/// Simple pseudo-random number generator (deterministic for consistency).
fn rand_simple(seed: usize) -> f64 {
	let x = ((seed + 1) * 9301 + 49297) % 233280;
	(x as f64) / 233280.0
}

/// A random tree of people, some of them only appearing as edge endpoints.
fn sample_results(n: usize) -> ResultBatch {
	let entities = (0..n)
		.filter(|i| i % 4 != 3)
		.map(|i| person(&format!("p{i}")))
		.collect();
	let edges = (1..n)
		.map(|i| {
			let target = (rand_simple(i) * (i as f64)) as usize;
			knows(&format!("p{i}"), &format!("p{target}"))
		})
		.collect();
	ResultBatch { entities, edges }
}

/// Stands in for the query service: every seed gains a few new acquaintances.
fn answer(chain: &OperationChain) -> ResultBatch {
	let mut results = ResultBatch::default();
	for operation in &chain.operations {
		let Operation::GetElements { input, .. } = operation else {
			continue;
		};
		for seed in input {
			let Some(name) = literal(&seed.vertex) else {
				continue;
			};
			for k in 0..3 {
				let friend = format!("{name}.{k}");
				results.entities.push(person(&friend));
				results.edges.push(knows(&name, &friend));
			}
		}
	}
	results
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let results = RwSignal::new(ResultEvent::Incoming(sample_results(40)));
	let search = RwSignal::new(String::new());
	let completed = RwSignal::new(None::<QueryTicket>);
	let on_query = Callback::new(move |(ticket, chain): (QueryTicket, OperationChain)| {
		results.set(ResultEvent::Incoming(answer(&chain)));
		completed.set(Some(ticket));
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="fullscreen-graph">
				<ResultGraphCanvas
					schema=demo_schema()
					configuration=demo_configuration()
					results=results
					search=search
					on_query=on_query
					completed=completed
					fullscreen=true
				/>
				<div class="graph-overlay">
					<h1>"Result Graph"</h1>
					<p class="subtitle">
						"Click to select, shift-click to add. Double-click a vertex to hop. Drag to move, scroll to zoom."
					</p>
					<input
						type="search"
						placeholder="Filter vertices"
						on:input=move |ev| search.set(event_target_value(&ev))
					/>
					<button on:click=move |_| results.set(ResultEvent::Cleared)>"Clear results"</button>
				</div>
			</div>
		</ErrorBoundary>
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::quick_hop;
	use crate::config::OperationSettings;

	#[test]
	fn demo_schema_parses() {
		assert!(demo_schema().entities.contains_key(PERSON));
	}

	#[test]
	fn answers_hop_from_each_seed() {
		let (_, chain) = quick_hop(&["\"p1\"".to_owned()], &OperationSettings::default()).unwrap();
		let batch = answer(&chain);
		assert_eq!(batch.entities.len(), 3);
		assert!(batch.edges.iter().all(|e| e.source == json!("p1")));
	}
}
