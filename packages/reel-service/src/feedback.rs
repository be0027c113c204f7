use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;
use time::OffsetDateTime;
use tokio::sync::mpsc;

use crate::search::optimize::ProfileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
	Click,
	View,
	Like,
}
impl InteractionKind {
	/// Relative strength of the signal when aggregated per item.
	pub fn weight(self) -> f32 {
		match self {
			Self::Click => 0.1,
			Self::View => 0.2,
			Self::Like => 0.5,
		}
	}
}

/// One user interaction with a served result. Consumed only in aggregate;
/// recording never blocks the search path.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct InteractionSignal {
	pub item_id: i64,
	pub user_id: Option<String>,
	pub kind: InteractionKind,
	/// Normalized query the interaction belongs to, when known; feeds the
	/// per-query click-through profile.
	pub query: Option<String>,
	pub recorded_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum FeedbackEvent {
	Signal(InteractionSignal),
	Served { query: String, result_count: u32, recorded_at: OffsetDateTime },
}

/// Aggregate per-item relevance signal in [0, 1], saturating. Lost updates
/// under extreme concurrency are acceptable.
#[derive(Default)]
pub struct InteractionStats {
	inner: RwLock<HashMap<i64, f32>>,
}
impl InteractionStats {
	pub fn signal(&self, item_id: i64) -> f32 {
		self.inner.read().get(&item_id).copied().unwrap_or(0.0)
	}

	pub fn apply(&self, item_id: i64, weight: f32) {
		let mut inner = self.inner.write();
		let entry = inner.entry(item_id).or_insert(0.0);

		*entry = (*entry + weight).min(1.0);
	}

	pub fn tracked_items(&self) -> usize {
		self.inner.read().len()
	}
}

/// Fire-and-forget feedback channel. The search path sends and returns; a
/// spawned worker drains the queue and maintains the aggregate stores.
pub struct FeedbackHub {
	tx: mpsc::UnboundedSender<FeedbackEvent>,
	stats: Arc<InteractionStats>,
}
impl FeedbackHub {
	/// Must be called from within a Tokio runtime.
	pub fn spawn(profiles: Arc<ProfileStore>) -> Self {
		let (tx, mut rx) = mpsc::unbounded_channel();
		let stats = Arc::new(InteractionStats::default());
		let worker_stats = stats.clone();

		tokio::spawn(async move {
			while let Some(event) = rx.recv().await {
				match event {
					FeedbackEvent::Signal(signal) => {
						worker_stats.apply(signal.item_id, signal.kind.weight());

						if let Some(query) = signal.query.as_deref()
							&& matches!(signal.kind, InteractionKind::Click | InteractionKind::Like)
						{
							profiles.note_click(query);
						}
					},
					FeedbackEvent::Served { query, .. } => {
						profiles.note_served(&query);
					},
				}
			}
		});

		Self { tx, stats }
	}

	pub fn record(&self, event: FeedbackEvent) {
		if self.tx.send(event).is_err() {
			tracing::warn!("Interaction worker is gone; feedback event dropped.");
		}
	}

	pub fn stats(&self) -> &Arc<InteractionStats> {
		&self.stats
	}
}

#[cfg(test)]
impl FeedbackHub {
	/// Hub with no worker attached; sends are dropped. For synchronous unit
	/// tests that never await the worker.
	pub(crate) fn detached() -> Self {
		let (tx, _rx) = mpsc::unbounded_channel();

		Self { tx, stats: Arc::new(InteractionStats::default()) }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn interaction_signals_saturate_at_one() {
		let stats = InteractionStats::default();

		for _ in 0..30 {
			stats.apply(7, InteractionKind::Like.weight());
		}

		assert_eq!(stats.signal(7), 1.0);
		assert_eq!(stats.signal(8), 0.0);
		assert_eq!(stats.tracked_items(), 1);
	}

	#[test]
	fn like_outweighs_click() {
		assert!(InteractionKind::Like.weight() > InteractionKind::Click.weight());
	}
}
