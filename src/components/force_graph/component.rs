use std::cell::RefCell;
use std::rc::Rc;

use leptos::prelude::*;
use log::{debug, error};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, MouseEvent, WheelEvent, Window};

use super::render;
use super::state::ForceGraphState;
use crate::config::{GraphSession, OperationSettings};
use crate::error::Result;
use crate::graph::{
	GraphController, OperationChain, OperationChainBuilder, Phase, QueryTicket, ResultEvent,
	Schema, SelectionModel, TypeTable,
};

type Controller = GraphController<ForceGraphState, OperationChainBuilder>;
type Handle = StoredValue<Controller, LocalStorage>;

/// Pointer travel, in pixels, below which a press and release counts as a click.
const CLICK_SLOP: f64 = 3.0;

/// Where queued query chains go, and whether the host reports their completion.
#[derive(Clone, Copy)]
struct QuerySink {
	on_query: Option<Callback<(QueryTicket, OperationChain)>>,
	host_completes: bool,
}

/// Runs `action` against the controller, dispatches the surface events it caused and
/// hands any queued query chains to the host.
fn run(
	handle: Handle,
	sink: QuerySink,
	status: RwSignal<Option<String>>,
	action: impl FnOnce(&mut Controller) -> Result<()>,
) {
	let outcome = handle.try_update_value(|c| {
		let result = action(c).and_then(|()| c.process_events());
		(result, c.query_mut().take_pending())
	});
	let Some((result, pending)) = outcome else {
		return;
	};
	match result {
		Ok(()) => status.set(None),
		Err(e) => {
			if !e.is_validation() {
				error!("{e}");
			}
			status.set(Some(e.to_string()));
		}
	}
	for (ticket, chain) in pending {
		debug!("Handing off {ticket:?}");
		if let Some(on_query) = sink.on_query {
			on_query.run((ticket, chain));
		}
		if !sink.host_completes {
			complete(handle, ticket);
		}
	}
}

fn complete(handle: Handle, ticket: QueryTicket) {
	if let Some(Err(e)) = handle.try_update_value(|c| c.query_completed(ticket)) {
		error!("{e}");
	}
}

fn pointer(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

fn window_size(window: &Window) -> Option<(f64, f64)> {
	Some((
		window.inner_width().ok()?.as_f64()?,
		window.inner_height().ok()?.as_f64()?,
	))
}

/// Interactive view of a streamed result graph.
///
/// `results` delivers result-stream notifications; queries started from the view are
/// handed to `on_query` together with their ticket. A host that sets `completed` to
/// the ticket once the query's results have arrived gets the selection cleared at that
/// point; without it the hand-off counts as completion.
#[component]
pub fn ResultGraphCanvas(
	/// Schema records are classified against.
	schema: Schema,
	/// Result-stream notifications.
	#[prop(into)]
	results: Signal<ResultEvent>,
	/// Value classes and their parts.
	#[prop(optional)]
	types: TypeTable,
	/// Configuration document as served by the configuration provider.
	#[prop(optional)]
	configuration: Value,
	/// Settings for quick-hop queries.
	#[prop(optional)]
	settings: OperationSettings,
	/// Session shared with other views.
	#[prop(optional)]
	session: Option<Rc<RefCell<GraphSession>>>,
	/// Live filter term.
	#[prop(optional, into)]
	search: Option<Signal<String>>,
	/// Receives each query chain started from the view.
	#[prop(optional, into)]
	on_query: Option<Callback<(QueryTicket, OperationChain)>>,
	/// Set by the host to a ticket once that query's results have arrived.
	#[prop(optional, into)]
	completed: Option<Signal<Option<QueryTicket>>>,
	/// Size the canvas to the window.
	#[prop(default = false)]
	fullscreen: bool,
	/// Fixed canvas width; defaults to the parent's.
	#[prop(default = None)]
	width: Option<f64>,
	/// Fixed canvas height; defaults to the parent's.
	#[prop(default = None)]
	height: Option<f64>,
) -> impl IntoView {
	let mut builder = GraphController::builder(
		ForceGraphState::new(width.unwrap_or(800.0), height.unwrap_or(600.0)),
		OperationChainBuilder::default(),
	)
	.selection(SelectionModel::default())
	.schema(schema)
	.types(types)
	.settings(settings);
	if let Some(session) = session {
		builder = builder.session(session);
	}
	let started = builder.build().and_then(|mut c| {
		if c.start()? == Phase::AwaitingConfiguration {
			c.configuration_loaded(&configuration)?;
		}
		Ok(c)
	});
	let controller = match started {
		Ok(c) => c,
		Err(e) => {
			error!("Graph view failed to start: {e}");
			return view! { <p class="graph-error">{e.to_string()}</p> }.into_any();
		}
	};

	let handle: Handle = StoredValue::new_local(controller);
	let sink = QuerySink {
		on_query,
		host_completes: completed.is_some(),
	};
	let status = RwSignal::new(None::<String>);
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let resize_cb: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));

	on_cleanup(move || {
		handle.try_update_value(|c| c.teardown());
	});

	Effect::new(move |_| {
		let event = results.get();
		run(handle, sink, status, move |c| c.handle_results(event));
	});

	if let Some(completed) = completed {
		Effect::new(move |_| {
			if let Some(ticket) = completed.get() {
				complete(handle, ticket);
			}
		});
	}

	if let Some(search) = search {
		Effect::new(move |_| {
			let term = search.get();
			handle.try_update_value(|c| c.search(&term));
		});
	}

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			return;
		};

		let (w, h) = if fullscreen {
			window_size(&window).unwrap_or((800.0, 600.0))
		} else {
			let parent = canvas.parent_element();
			(
				width.unwrap_or_else(|| {
					parent
						.as_ref()
						.map_or(800.0, |p| p.client_width() as f64)
				}),
				height.unwrap_or_else(|| {
					parent
						.as_ref()
						.map_or(600.0, |p| p.client_height() as f64)
				}),
			)
		};
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let ctx = match canvas.get_context("2d") {
			Ok(Some(ctx)) => ctx,
			_ => {
				error!("Canvas has no 2d context");
				return;
			}
		};
		let Ok(ctx) = ctx.dyn_into::<CanvasRenderingContext2d>() else {
			return;
		};
		handle.try_update_value(|c| {
			let surface = c.surface_mut();
			surface.resize(w, h);
			surface.fit_to_view();
		});

		if fullscreen {
			let canvas_resize = canvas.clone();
			*resize_cb.borrow_mut() = Some(Closure::new(move || {
				let Some((nw, nh)) = web_sys::window().as_ref().and_then(window_size) else {
					return;
				};
				canvas_resize.set_width(nw as u32);
				canvas_resize.set_height(nh as u32);
				handle.try_update_value(|c| c.surface_mut().resize(nw, nh));
			}));
			if let Some(ref cb) = *resize_cb.borrow() {
				let _ =
					window.add_event_listener_with_callback("resize", cb.as_ref().unchecked_ref());
			}
		}

		let animate_inner = animate.clone();
		*animate.borrow_mut() = Some(Closure::new(move || {
			let alive = handle
				.try_update_value(|c| {
					if c.phase() == Phase::Destroyed {
						return false;
					}
					c.tick(js_sys::Date::now());
					let s = c.surface_mut();
					if s.animation_running {
						s.tick(0.016);
					}
					render::render(s, &ctx);
					true
				})
				.unwrap_or(false);
			if !alive {
				return;
			}
			if let (Some(win), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		handle.try_update_value(|c| {
			let s = c.surface_mut();
			s.drag.moved = false;
			if let Some(idx) = s.node_at_position(x, y) {
				s.drag.active = true;
				s.drag.node_idx = Some(idx);
				s.drag.start_x = x;
				s.drag.start_y = y;
				s.graph.visit_nodes(|node| {
					if node.index() == idx {
						s.drag.node_start_x = node.x();
						s.drag.node_start_y = node.y();
					}
				});
			} else {
				s.pan.active = true;
				s.pan.start_x = x;
				s.pan.start_y = y;
				s.pan.transform_start_x = s.transform.x;
				s.pan.transform_start_y = s.transform.y;
			}
		});
	};

	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		handle.try_update_value(|c| {
			let s = c.surface_mut();
			if !s.drag.active {
				let hovered = s.node_at_position(x, y);
				s.set_hover(hovered);
			}

			if s.drag.active {
				if (x - s.drag.start_x).abs() + (y - s.drag.start_y).abs() > CLICK_SLOP {
					s.drag.moved = true;
				}
				if let (Some(idx), true) = (s.drag.node_idx, s.drag.moved) {
					let (dx, dy) = (
						(x - s.drag.start_x) / s.transform.k,
						(y - s.drag.start_y) / s.transform.k,
					);
					let (nx, ny) = (
						s.drag.node_start_x + dx as f32,
						s.drag.node_start_y + dy as f32,
					);
					s.graph.visit_nodes_mut(|node| {
						if node.index() == idx {
							node.data.x = nx;
							node.data.y = ny;
							node.data.is_anchor = true;
						}
					});
				}
			} else if s.pan.active {
				if (x - s.pan.start_x).abs() + (y - s.pan.start_y).abs() > CLICK_SLOP {
					s.drag.moved = true;
				}
				s.transform.x = s.pan.transform_start_x + (x - s.pan.start_x);
				s.transform.y = s.pan.transform_start_y + (y - s.pan.start_y);
			}
		});
	};

	let on_mouseup = move |ev: MouseEvent| {
		let at = js_sys::Date::now();
		let position = pointer(canvas_ref, &ev);
		let additive = ev.shift_key();
		run(handle, sink, status, move |c| {
			let s = c.surface_mut();
			let pressed = s.drag.active || s.pan.active;
			let clicked = pressed && !s.drag.moved;
			s.drag.active = false;
			s.drag.node_idx = None;
			s.drag.moved = false;
			s.pan.active = false;
			if let (true, Some((x, y))) = (clicked, position) {
				s.click(x, y, additive, at);
			}
			Ok(())
		});
	};

	let on_mouseleave = move |_: MouseEvent| {
		handle.try_update_value(|c| {
			let s = c.surface_mut();
			s.drag.active = false;
			s.drag.node_idx = None;
			s.pan.active = false;
			s.set_hover(None);
		});
	};

	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer(canvas_ref, &ev) else {
			return;
		};
		handle.try_update_value(|c| {
			let s = c.surface_mut();
			let factor = if ev.delta_y() > 0.0 { 0.9 } else { 1.1 };
			let new_k = (s.transform.k * factor).clamp(0.1, 10.0);
			let ratio = new_k / s.transform.k;
			s.transform.x = x - (x - s.transform.x) * ratio;
			s.transform.y = y - (y - s.transform.y) * ratio;
			s.transform.k = new_k;
		});
	};

	view! {
		<div class="result-graph">
			<div class="graph-toolbar">
				<button on:click=move |_| {
					run(handle, sink, status, |c| c.quick_hop(None).map(|_| ()))
				}>"Quick hop"</button>
				<button on:click=move |_| {
					run(handle, sink, status, |c| c.remove_selected())
				}>"Remove selected"</button>
				<button on:click=move |_| {
					run(handle, sink, status, |c| c.deselect_all())
				}>"Deselect all"</button>
				<button on:click=move |_| {
					run(handle, sink, status, |c| c.redraw())
				}>"Redraw"</button>
				<button on:click=move |_| {
					run(handle, sink, status, |c| c.reset())
				}>"Reset"</button>
			</div>
			{move || status.get().map(|message| view! { <p class="graph-message">{message}</p> })}
			<canvas
				node_ref=canvas_ref
				class="force-graph-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
		</div>
	}
	.into_any()
}
