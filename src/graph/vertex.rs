//! Stable identifiers and labels for vertex values.
//!
//! A vertex is either a primitive (`"foo"`, `1`, `true`) or a single-key structured
//! value such as `{"TypeSubTypeValue": {"type": "t", "value": "v"}}`. Its identifier is
//! the compact JSON serialization of the whole value with object keys written in
//! sorted order, so structurally equal values always serialize identically.

use serde_json::Value;

/// An arbitrary vertex value from a result record.
pub type Vertex = Value;

/// Identifier of an element on the rendering surface.
pub type ElementId = String;

/// Derives the short, human readable form of structured vertices.
pub trait ShortForm {
	/// Short form of `vertex`, or `None` when the value is not understood.
	fn short_form(&self, vertex: &Vertex) -> Option<String>;
}

/// Canonical identifier of a vertex value.
///
/// Strings are quoted, numbers and booleans are rendered as their literal text.
pub fn identify(vertex: &Vertex) -> ElementId {
	canonical(vertex).to_string()
}

fn canonical(value: &Value) -> Value {
	match value {
		Value::Object(map) => {
			let mut entries: Vec<_> = map.iter().collect();
			entries.sort_by(|a, b| a.0.cmp(b.0));
			Value::Object(
				entries
					.into_iter()
					.map(|(k, v)| (k.clone(), canonical(v)))
					.collect(),
			)
		}
		Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
		other => other.clone(),
	}
}

/// Reverses [`identify`], falling back to the raw id as a string vertex.
pub fn parse_id(id: &str) -> Vertex {
	serde_json::from_str(id).unwrap_or_else(|_| Value::String(id.to_owned()))
}

/// Literal text of a primitive value (strings unquoted).
pub fn literal(vertex: &Vertex) -> Option<String> {
	match vertex {
		Value::String(s) => Some(s.clone()),
		Value::Number(n) => Some(n.to_string()),
		Value::Bool(b) => Some(b.to_string()),
		Value::Null => Some("null".into()),
		_ => None,
	}
}

/// Label shown next to a vertex on the canvas.
pub fn short_label(vertex: &Vertex, types: &dyn ShortForm) -> String {
	literal(vertex)
		.or_else(|| types.short_form(vertex))
		.unwrap_or_else(|| identify(vertex))
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	struct NoShortForm;

	impl ShortForm for NoShortForm {
		fn short_form(&self, _: &Vertex) -> Option<String> {
			None
		}
	}

	#[test]
	fn strings_are_quoted() {
		assert_eq!(identify(&json!("foo")), "\"foo\"");
	}

	#[test]
	fn numbers_are_not_quoted() {
		assert_eq!(identify(&json!(1)), "1");
		assert_ne!(identify(&json!(1)), identify(&json!("1")));
		assert_eq!(identify(&json!("1")), "\"1\"");
	}

	#[test]
	fn structured_values_use_their_serialization() {
		let v = json!({"complexObject": {"type": "t1", "value": "v1"}});
		assert_eq!(identify(&v), r#"{"complexObject":{"type":"t1","value":"v1"}}"#);
	}

	#[test]
	fn equal_structures_share_an_id() {
		let a: Vertex = serde_json::from_str(r#"{"c":{"value":"v","type":"t"}}"#).unwrap();
		let b: Vertex = serde_json::from_str(r#"{"c":{"type":"t","value":"v"}}"#).unwrap();
		assert_eq!(a, b);
		assert_eq!(identify(&a), identify(&b));
		assert_ne!(identify(&a), identify(&json!({"c": {"type": "t", "value": "w"}})));
	}

	#[test]
	fn parse_id_round_trips() {
		for v in [json!("foo"), json!(7), json!(false), json!({"c": {"a": 1}})] {
			assert_eq!(parse_id(&identify(&v)), v);
		}
		assert_eq!(parse_id("not json"), json!("not json"));
	}

	#[test]
	fn labels_for_primitives_are_literal() {
		assert_eq!(short_label(&json!("foo"), &NoShortForm), "foo");
		assert_eq!(short_label(&json!(3), &NoShortForm), "3");
		let v = json!({"c": {"a": 1}});
		assert_eq!(short_label(&v, &NoShortForm), identify(&v));
	}
}
