use slot_table_types::CompletionValue;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Items waiting for the consumer to reach a certain [`CompletionValue`] before they may be released.
///
/// Backed by a min-heap ordered by the value at which an item becomes safe to release. Items becoming safe at
/// the same value are released in insertion order.
pub struct PendingQueue<T> {
	heap: BinaryHeap<Reverse<PendingEntry<T>>>,
	next_seq: u64,
}

struct PendingEntry<T> {
	safe_at: CompletionValue,
	seq: u64,
	item: T,
}

impl<T> PendingEntry<T> {
	fn key(&self) -> (CompletionValue, u64) {
		(self.safe_at, self.seq)
	}
}

impl<T> PartialEq for PendingEntry<T> {
	fn eq(&self, other: &Self) -> bool {
		self.key() == other.key()
	}
}

impl<T> Eq for PendingEntry<T> {}

impl<T> PartialOrd for PendingEntry<T> {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl<T> Ord for PendingEntry<T> {
	fn cmp(&self, other: &Self) -> Ordering {
		self.key().cmp(&other.key())
	}
}

impl<T> PendingQueue<T> {
	pub fn new() -> Self {
		Self {
			heap: BinaryHeap::new(),
			next_seq: 0,
		}
	}

	pub fn len(&self) -> usize {
		self.heap.len()
	}

	pub fn is_empty(&self) -> bool {
		self.heap.is_empty()
	}

	/// Queue `item` to be released once `safe_at` has been reached.
	pub fn push(&mut self, item: T, safe_at: CompletionValue) {
		let seq = self.next_seq;
		self.next_seq += 1;
		self.heap.push(Reverse(PendingEntry { safe_at, seq, item }));
	}

	/// The smallest value any queued item is waiting for.
	pub fn next_safe_at(&self) -> Option<CompletionValue> {
		self.heap.peek().map(|Reverse(entry)| entry.safe_at)
	}

	/// Pop a single item that is safe to release at `completed`.
	pub fn pop_completed(&mut self, completed: CompletionValue) -> Option<T> {
		if completed.has_reached(self.next_safe_at()?) {
			self.heap.pop().map(|Reverse(entry)| entry.item)
		} else {
			None
		}
	}

	/// Drain all items that are safe to release at `completed`.
	pub fn drain_completed(&mut self, completed: CompletionValue) -> impl Iterator<Item = T> + '_ {
		std::iter::from_fn(move || self.pop_completed(completed))
	}

	/// Drain all items regardless of the value they wait for, in release order.
	pub fn drain_all(&mut self) -> impl Iterator<Item = T> + '_ {
		std::iter::from_fn(move || self.heap.pop().map(|Reverse(entry)| entry.item))
	}

	pub fn clear(&mut self) {
		self.heap.clear();
	}

	pub fn iter(&self) -> impl Iterator<Item = (&T, CompletionValue)> + '_ {
		self.heap.iter().map(|Reverse(entry)| (&entry.item, entry.safe_at))
	}
}

impl<T> Default for PendingQueue<T> {
	fn default() -> Self {
		Self::new()
	}
}
