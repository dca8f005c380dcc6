//! Tells single taps from double taps.
//!
//! Time is supplied by the caller in milliseconds, so the detector is a plain state
//! value with no timers of its own. There is at most one pending tap; a new tap always
//! supersedes it.

use super::vertex::ElementId;

/// Two taps on the same element closer together than this make a double tap.
pub const DOUBLE_TAP_WINDOW_MS: f64 = 300.0;

/// Where the detector is between taps.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum TapState {
	/// No tap pending.
	#[default]
	Idle,
	/// One tap seen; a second on `id` before `deadline` is a double tap.
	AwaitingSecondTap {
		/// Element tapped first.
		id: ElementId,
		/// End of the window in milliseconds.
		deadline: f64,
	},
}

/// How a tap was classified.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TapOutcome {
	/// A first tap, or one outside the window.
	Single,
	/// The second tap on an element within the window.
	Double(ElementId),
}

/// Single/double tap detector with one pending tap.
#[derive(Clone, Debug)]
pub struct TapDisambiguator {
	state: TapState,
	window_ms: f64,
}

impl Default for TapDisambiguator {
	fn default() -> Self {
		Self {
			state: TapState::Idle,
			window_ms: DOUBLE_TAP_WINDOW_MS,
		}
	}
}

impl TapDisambiguator {
	/// Current state.
	pub fn state(&self) -> &TapState {
		&self.state
	}

	/// Drops a pending tap whose window has closed.
	pub fn tick(&mut self, now: f64) {
		if let TapState::AwaitingSecondTap { deadline, .. } = self.state {
			if now >= deadline {
				self.state = TapState::Idle;
			}
		}
	}

	/// Classifies a tap on element `id` at `now`.
	pub fn tap(&mut self, id: &str, now: f64) -> TapOutcome {
		self.tick(now);
		match &self.state {
			TapState::AwaitingSecondTap { id: pending, .. } if pending == id => {
				self.state = TapState::Idle;
				TapOutcome::Double(id.to_owned())
			}
			_ => {
				self.state = TapState::AwaitingSecondTap {
					id: id.to_owned(),
					deadline: now + self.window_ms,
				};
				TapOutcome::Single
			}
		}
	}

	/// A tap on the background supersedes any pending element tap.
	pub fn tap_background(&mut self, now: f64) {
		self.tick(now);
		self.state = TapState::Idle;
	}

	/// Drops any pending tap.
	pub fn reset(&mut self) {
		self.state = TapState::Idle;
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn quick_taps_on_one_element_are_a_double_tap() {
		let mut taps = TapDisambiguator::default();
		assert_eq!(taps.tap("a", 1000.0), TapOutcome::Single);
		assert_eq!(taps.tap("a", 1200.0), TapOutcome::Double("a".into()));
		assert_eq!(taps.state(), &TapState::Idle);
	}

	#[test]
	fn slow_taps_are_two_singles() {
		let mut taps = TapDisambiguator::default();
		assert_eq!(taps.tap("a", 1000.0), TapOutcome::Single);
		assert_eq!(taps.tap("a", 1301.0), TapOutcome::Single);
	}

	#[test]
	fn taps_on_different_elements_reset_the_window() {
		let mut taps = TapDisambiguator::default();
		taps.tap("a", 0.0);
		assert_eq!(taps.tap("b", 100.0), TapOutcome::Single);
		assert_eq!(taps.tap("a", 200.0), TapOutcome::Single);
		assert_eq!(taps.tap("a", 250.0), TapOutcome::Double("a".into()));
	}

	#[test]
	fn a_third_tap_starts_over() {
		let mut taps = TapDisambiguator::default();
		taps.tap("a", 0.0);
		taps.tap("a", 100.0);
		assert_eq!(taps.tap("a", 150.0), TapOutcome::Single);
	}

	#[test]
	fn a_background_tap_in_between_breaks_the_pair() {
		let mut taps = TapDisambiguator::default();
		taps.tap("a", 0.0);
		taps.tap_background(100.0);
		assert_eq!(taps.state(), &TapState::Idle);
		assert_eq!(taps.tap("a", 200.0), TapOutcome::Single);
	}

	#[test]
	fn tick_expires_the_pending_tap() {
		let mut taps = TapDisambiguator::default();
		taps.tap("a", 0.0);
		taps.tick(299.0);
		assert!(matches!(taps.state(), TapState::AwaitingSecondTap { .. }));
		taps.tick(300.0);
		assert_eq!(taps.state(), &TapState::Idle);
	}
}
