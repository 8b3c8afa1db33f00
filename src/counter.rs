use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// Tracks one entity's cumulative energy counter across polling intervals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeltaCounter {
	/// Last observed cumulative reading
	previous: u64,

	/// Delta computed for the interval that just completed
	current: u64,
}

impl DeltaCounter {
	/// Records a new cumulative reading and returns the interval delta
	///
	/// A reading below the previous one means the counter restarted, so the
	/// new reading itself is taken as the delta.
	pub fn update(&mut self, raw: u64) -> u64 {
		self.current = if raw >= self.previous {
			raw - self.previous
		} else {
			tracing::warn!(previous = self.previous, raw, "energy counter went backwards, assuming restart");
			raw
		};
		self.previous = raw;
		self.current
	}

	/// Delta for the last completed interval
	pub fn delta(&self) -> u64 {
		self.current
	}

	/// Last cumulative reading seen
	pub fn previous(&self) -> u64 {
		self.previous
	}

	/// Clears the interval delta while keeping the counter history
	pub fn reset(&mut self) {
		self.current = 0;
	}
}

/// Delta counters for every entity of one energy domain
#[derive(Debug, Clone)]
pub struct DeltaCounterSet<K> {
	counters: HashMap<K, DeltaCounter>,
}

impl<K> Default for DeltaCounterSet<K> {
	fn default() -> Self {
		Self {
			counters: HashMap::new(),
		}
	}
}

impl<K: Eq + Hash + Debug> DeltaCounterSet<K> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Feeds a cumulative reading for `id`, registering the entity on first sight
	pub fn update(&mut self, id: K, raw: u64) -> u64 {
		self.counters.entry(id).or_default().update(raw)
	}

	/// Delta of one entity, zero when it has never been seen
	pub fn delta(&self, id: &K) -> u64 {
		self.counters.get(id).map_or(0, DeltaCounter::delta)
	}

	/// Zeroes every delta; registered entities and their history survive
	pub fn reset(&mut self) {
		for counter in self.counters.values_mut() {
			counter.reset();
		}
	}

	/// Sum of the interval deltas of all entities
	pub fn total(&self) -> u64 {
		self.counters.values().fold(0u64, |acc, c| acc.saturating_add(c.delta()))
	}

	pub fn contains(&self, id: &K) -> bool {
		self.counters.contains_key(id)
	}

	pub fn len(&self) -> usize {
		self.counters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.counters.is_empty()
	}

	pub fn ids(&self) -> impl Iterator<Item = &K> {
		self.counters.keys()
	}
}
