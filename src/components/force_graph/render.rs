use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::ForceGraphState;
use super::style::ResolvedStyle;

const SELECTED_COLOR: &str = "rgb(255, 200, 60)";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Draws one frame of the surface.
pub fn render(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_edges(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

/// `rgb(r, g, b)` and `#rrggbb` colours with the given alpha; anything else is
/// returned unchanged.
fn with_alpha(color: &str, alpha: f64) -> String {
	if let Some(inner) = color.strip_prefix("rgb(").and_then(|c| c.strip_suffix(')')) {
		return format!("rgba({inner}, {alpha})");
	}
	if let Some(hex) = color.strip_prefix('#').filter(|h| h.len() == 6 && h.is_ascii()) {
		let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
		if let (Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4)) {
			return format!("rgba({r}, {g}, {b}, {alpha})");
		}
	}
	color.to_owned()
}

fn draw_edges(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let (dash, gap, arrow_size) = (8.0 / k, 4.0 / k, 8.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);

	state.graph.visit_edges(|n1, n2, edge| {
		let id = &edge.user_data.id;
		let style = state.style_of(id);
		let (src_style, tgt_style) = (
			state.style_of(&n1.data.user_data.id),
			state.style_of(&n2.data.user_data.id),
		);
		if style.hidden || src_style.hidden || tgt_style.hidden {
			return;
		}
		let (x1, y1, x2, y2) = (n1.x() as f64, n1.y() as f64, n2.x() as f64, n2.y() as f64);
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			return;
		}

		let selected = state.element(id).is_some_and(|e| e.selected);
		let is_highlighted = state.is_highlighted(n1.index()) && state.is_highlighted(n2.index());
		let line_width = style.line_width / k * if selected { 2.0 } else { 1.0 };

		// t=0: all edges at base (0.6), t=1: highlighted at 0.9, others at 0.15
		let (edge_alpha, arrow_alpha, width) = if is_highlighted {
			(0.6 + 0.3 * t, 0.8 + 0.1 * t, line_width * (1.0 + 0.3 * t))
		} else {
			(0.6 - 0.45 * t, 0.8 - 0.45 * t, line_width * (1.0 - 0.3 * t))
		};
		let color = if selected { SELECTED_COLOR } else { style.line_color.as_str() };

		ctx.set_stroke_style_str(&with_alpha(color, edge_alpha));
		ctx.set_line_width(width);
		let _ = ctx.set_line_dash(&js_sys::Array::of2(
			&JsValue::from_f64(dash),
			&JsValue::from_f64(gap),
		));
		ctx.set_line_dash_offset(dash_offset);

		let (ux, uy) = (dx / dist, dy / dist);
		let (r1, r2) = (src_style.radius, tgt_style.radius);
		let head = if style.arrow { arrow_size } else { 0.0 };
		ctx.begin_path();
		ctx.move_to(x1 + ux * r1, y1 + uy * r1);
		ctx.line_to(x2 - ux * (r2 + head), y2 - uy * (r2 + head));
		ctx.stroke();
		let _ = ctx.set_line_dash(&js_sys::Array::new());

		if !style.arrow {
			return;
		}
		ctx.set_fill_style_str(&with_alpha(color, arrow_alpha));
		let (tip_x, tip_y) = (x2 - ux * r2, y2 - uy * r2);
		let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
		let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
		ctx.begin_path();
		ctx.move_to(tip_x, tip_y);
		ctx.line_to(back_x + px, back_y + py);
		ctx.line_to(back_x - px, back_y - py);
		ctx.close_path();
		ctx.fill();
	});
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_node(
	ctx: &CanvasRenderingContext2d,
	style: &ResolvedStyle,
	(x, y): (f64, f64),
	radius: f64,
	selected: bool,
	k: f64,
) {
	ctx.begin_path();
	let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&style.background_color);
	ctx.fill();
	if style.border_width > 0.0 {
		ctx.set_stroke_style_str(&style.border_color);
		ctx.set_line_width(style.border_width);
		ctx.stroke();
	}
	if selected {
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
		ctx.set_stroke_style_str(SELECTED_COLOR);
		ctx.set_line_width(2.0 / k);
		ctx.stroke();
	}
}

fn draw_label(
	ctx: &CanvasRenderingContext2d,
	style: &ResolvedStyle,
	label: &str,
	(x, y): (f64, f64),
	radius: f64,
	alpha: f64,
	k: f64,
) {
	ctx.set_fill_style_str(&with_alpha(&style.label_color, alpha));
	ctx.set_font(&format!("{}px sans-serif", style.font_size / k.max(0.5)));
	let _ = ctx.fill_text(label, x + radius + 3.0, y + 3.0);
}

fn draw_nodes(state: &ForceGraphState, ctx: &CanvasRenderingContext2d) {
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);

	state.graph.visit_nodes(|node| {
		let idx = node.index();
		if has_highlight && state.is_highlighted(idx) {
			return;
		}
		let id = &node.data.user_data.id;
		let style = state.style_of(id);
		if style.hidden {
			return;
		}
		let element = state.element(id);
		let pos = (node.x() as f64, node.y() as f64);
		let (alpha, radius) = (1.0 - 0.7 * t, style.radius * (1.0 - 0.15 * t));

		ctx.set_global_alpha(alpha);
		draw_node(ctx, &style, pos, radius, element.is_some_and(|e| e.selected), k);
		ctx.set_global_alpha(1.0);

		if let Some(label) = element.and_then(|e| e.label()) {
			draw_label(ctx, &style, label, pos, radius, alpha * 0.8, k);
		}
	});

	if !has_highlight {
		return;
	}

	state.graph.visit_nodes(|node| {
		let idx = node.index();
		if !state.is_highlighted(idx) {
			return;
		}
		let id = &node.data.user_data.id;
		let style = state.style_of(id);
		if style.hidden {
			return;
		}
		let element = state.element(id);
		let (x, y) = (node.x() as f64, node.y() as f64);
		let is_hovered = state.is_hovered(idx);
		let is_neighbor =
			state.hover.neighbors.contains(&idx) || state.hover.prev_neighbors.contains(&idx);

		let base = style.radius;
		let (radius, glow_radius) = if is_hovered {
			(base * (1.0 + 0.35 * t), base * (1.8 + 1.2 * t))
		} else if is_neighbor {
			(base * (1.0 + 0.2 * t), base * (1.4 + 0.6 * t))
		} else {
			(base, 0.0)
		};

		if glow_radius > 0.0 && t > 0.01 {
			let gradient = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius);
			if let Ok(gradient) = gradient {
				let alpha = if is_hovered { 0.35 * t } else { 0.2 * t };
				let _ = gradient.add_color_stop(0.0, &format!("rgba(255, 255, 255, {})", alpha));
				let _ = gradient
					.add_color_stop(0.6, &format!("rgba(200, 220, 255, {})", alpha * 0.3));
				let _ = gradient.add_color_stop(1.0, "rgba(255, 255, 255, 0)");
				ctx.begin_path();
				let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
				#[allow(deprecated)]
				ctx.set_fill_style(&gradient);
				ctx.fill();
			}
		}

		draw_node(ctx, &style, (x, y), radius, element.is_some_and(|e| e.selected), k);

		if is_hovered && t > 0.01 {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 4.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(&format!("rgba(255, 255, 255, {})", 0.7 * t));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		if let Some(label) = element.and_then(|e| e.label()) {
			draw_label(ctx, &style, label, (x, y), radius, 1.0, k);
		}
	});
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn colours_gain_alpha() {
		assert_eq!(with_alpha("rgb(1, 2, 3)", 0.5), "rgba(1, 2, 3, 0.5)");
		assert_eq!(with_alpha("#ff0080", 1.0), "rgba(255, 0, 128, 1)");
		assert_eq!(with_alpha("red", 0.5), "red");
		assert_eq!(with_alpha("#aé€", 0.5), "#aé€");
	}
}
