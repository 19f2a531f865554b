use crate::backing::pending::PendingQueue;
use crate::backing::range_set::SlotIndexRangeSet;
use crate::backing::slot_array::SlotArray;
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use slot_table_types::{CompletionValue, SlotIndex};
use static_assertions::const_assert_eq;
use std::fmt::{Debug, Formatter};
use std::mem::size_of;
use thiserror::Error;

#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum SlotState {
	/// Part of the reserved prefix, never handed out.
	Reserved,
	/// May be handed out by the next allocation.
	#[default]
	Free,
	/// Owned by exactly one caller.
	Live,
	/// Freed, but the consumer may still reference it until a certain [`CompletionValue`] is reached.
	PendingRelease,
}
const_assert_eq!(size_of::<SlotState>(), 1);

/// A bounded table of slots that are handed out to owners and only become reusable once the consumer is known
/// to no longer reference them.
///
/// Slots are handed out from a LIFO free list first and from a watermark bump pointer second. Freed slots that may
/// still be read by the consumer wait in a min-heap keyed by the [`CompletionValue`] at which they become safe, and
/// are moved back to the free list by [`Self::garbage_collect`].
pub struct SlotAllocator {
	capacity: u32,
	state: CachePadded<Mutex<AllocatorState>>,
}

struct AllocatorState {
	base_index: u32,
	watermark: u32,
	free_list: Vec<SlotIndex>,
	pending: PendingQueue<SlotIndex>,
	/// the greatest value this allocator was garbage collected at
	last_completed: CompletionValue,
	slot_states: SlotArray<SlotState>,
}

impl AllocatorState {
	fn push_free(&mut self, index: SlotIndex) {
		if index.to_u32() < self.base_index {
			// the prefix was reserved while this slot was alive
			self.slot_states[index] = SlotState::Reserved;
		} else {
			self.slot_states[index] = SlotState::Free;
			self.free_list.push(index);
		}
	}

	#[inline]
	fn debug_assert_live(&self, index: SlotIndex) {
		debug_assert_eq!(
			self.slot_states.get(index).copied(),
			Some(SlotState::Live),
			"freeing {:?} which is not a live slot",
			index
		);
	}
}

impl SlotAllocator {
	pub fn new(capacity: u32) -> Self {
		Self::with_reserved_prefix(capacity, 0)
	}

	/// Create an allocator whose first `reserved` slots are never handed out, see [`Self::reserve_prefix`].
	pub fn with_reserved_prefix(capacity: u32, reserved: u32) -> Self {
		let base_index = reserved.min(capacity);
		Self {
			capacity,
			state: CachePadded::new(Mutex::new(AllocatorState {
				base_index,
				watermark: base_index,
				free_list: Vec::new(),
				pending: PendingQueue::new(),
				last_completed: CompletionValue::ZERO,
				slot_states: SlotArray::new_generator(capacity, |i| {
					if i < base_index {
						SlotState::Reserved
					} else {
						SlotState::Free
					}
				}),
			})),
		}
	}

	/// Allocate a slot. Running out of slots is an expected outcome under load, the caller has to either wait for a
	/// future [`Self::garbage_collect`] to release slots or skip whatever needed the slot.
	pub fn allocate(&self) -> Result<SlotIndex, SlotAllocationError> {
		let mut state = self.state.lock();
		let index = if let Some(index) = state.free_list.pop() {
			index
		} else if state.watermark < self.capacity {
			let index = SlotIndex::new(state.watermark);
			state.watermark += 1;
			index
		} else {
			return Err(SlotAllocationError::NoMoreCapacity(self.capacity));
		};
		debug_assert_eq!(state.slot_states[index], SlotState::Free, "allocated slot {:?} was not free", index);
		state.slot_states[index] = SlotState::Live;
		Ok(index)
	}

	/// Free `index` once the consumer has reached `safe_at`, which must be the completion value of (or after) the
	/// last submission that may reference `index`.
	///
	/// If `safe_at` has already been observed by a previous [`Self::garbage_collect`], the slot is reusable
	/// immediately, otherwise it waits for a garbage collection at or after `safe_at`.
	pub fn free(&self, index: SlotIndex, safe_at: CompletionValue) {
		let mut state = self.state.lock();
		state.debug_assert_live(index);
		if state.last_completed.has_reached(safe_at) {
			state.push_free(index);
		} else {
			state.slot_states[index] = SlotState::PendingRelease;
			state.pending.push(index, safe_at);
		}
	}

	/// Return `index` to the free list right away.
	///
	/// # Safety
	/// The consumer must not be referencing `index` and must never reference it again, e.g. by being fully idle.
	/// Nothing verifies this, prefer [`Self::free`].
	pub unsafe fn free_immediate(&self, index: SlotIndex) {
		let mut state = self.state.lock();
		state.debug_assert_live(index);
		state.push_free(index);
	}

	/// Release all slots whose completion value has been reached by `completed`. Returns the amount of slots that
	/// were released, calling this again with the same value releases nothing.
	pub fn garbage_collect(&self, completed: CompletionValue) -> usize {
		profiling::function_scope!();
		let mut state = self.state.lock();
		state.last_completed = state.last_completed.max(completed);
		let mut released = 0;
		while let Some(index) = state.pending.pop_completed(completed) {
			state.push_free(index);
			released += 1;
		}
		if released > 0 {
			log::trace!("released {} slots at completion value {}", released, completed);
		}
		released
	}

	/// Reconcile the bookkeeping with an externally known set of live slots, which must be sorted and unique.
	///
	/// All pending releases are dropped. The watermark is set to one past the greatest used slot and every unused
	/// slot below it becomes free. Slots above the watermark stay reachable through the watermark only.
	pub fn rebuild_free_list_except(&self, used_sorted_unique: &[SlotIndex]) {
		profiling::function_scope!();
		debug_assert!(
			used_sorted_unique.windows(2).all(|w| w[0] < w[1]),
			"used slots must be sorted and unique"
		);

		let mut state = self.state.lock();
		let base_index = state.base_index;
		debug_assert!(
			used_sorted_unique
				.iter()
				.all(|i| (base_index..self.capacity).contains(&i.to_u32())),
			"used slots must be within [{}, {})",
			base_index,
			self.capacity
		);

		let watermark = used_sorted_unique
			.last()
			.map_or(base_index, |last| last.to_u32() + 1)
			.max(base_index);
		let used = used_sorted_unique.iter().copied().collect::<SlotIndexRangeSet>();
		let outer = SlotIndex::new(base_index)..SlotIndex::new(watermark);

		state.pending.clear();
		state.free_list.clear();
		state.free_list.extend(used.gaps(&outer));
		for i in base_index..self.capacity {
			state.slot_states[SlotIndex::new(i)] = SlotState::Free;
		}
		for &i in used_sorted_unique {
			state.slot_states[i] = SlotState::Live;
		}
		state.watermark = watermark;
		log::debug!(
			"rebuilt free list around {} used slots: {} free, watermark {}",
			used_sorted_unique.len(),
			state.free_list.len(),
			watermark
		);
	}

	/// Never hand out slots below `count`. May only raise the reserved prefix, and is meant to be called once early
	/// on before any slot in that prefix is allocated.
	pub fn reserve_prefix(&self, count: u32) {
		let mut state = self.state.lock();
		let base_index = count.min(self.capacity);
		if base_index <= state.base_index {
			return;
		}
		for i in state.base_index..base_index {
			let index = SlotIndex::new(i);
			debug_assert_ne!(
				state.slot_states[index],
				SlotState::Live,
				"reserving {:?} which is live",
				index
			);
			if state.slot_states[index] == SlotState::Free {
				state.slot_states[index] = SlotState::Reserved;
			}
		}
		state.base_index = base_index;
		state.watermark = state.watermark.max(base_index);
		state.free_list.retain(|i| i.to_u32() >= base_index);
		log::debug!("reserved slot prefix [0, {})", base_index);
	}

	#[inline]
	pub fn capacity(&self) -> u32 {
		self.capacity
	}

	pub fn base_index(&self) -> u32 {
		self.state.lock().base_index
	}

	pub fn watermark(&self) -> u32 {
		self.state.lock().watermark
	}

	/// Slots in the free list, not counting never-issued slots above the watermark.
	pub fn free_count(&self) -> usize {
		self.state.lock().free_list.len()
	}

	pub fn pending_count(&self) -> usize {
		self.state.lock().pending.len()
	}

	/// The amount of slots the next allocations can hand out without any garbage collection.
	pub fn available(&self) -> usize {
		let state = self.state.lock();
		state.free_list.len() + (self.capacity - state.watermark) as usize
	}

	/// The smallest completion value a pending release is waiting for.
	pub fn next_pending_release(&self) -> Option<CompletionValue> {
		self.state.lock().pending.next_safe_at()
	}

	pub fn slot_state(&self, index: SlotIndex) -> Option<SlotState> {
		self.state.lock().slot_states.get(index).copied()
	}
}

impl Debug for SlotAllocator {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let state = self.state.lock();
		f.debug_struct("SlotAllocator")
			.field("capacity", &self.capacity)
			.field("base_index", &state.base_index)
			.field("watermark", &state.watermark)
			.field("free", &state.free_list.len())
			.field("pending", &state.pending.len())
			.field("last_completed", &state.last_completed)
			.finish()
	}
}

#[derive(Copy, Clone, Debug, Error, Eq, PartialEq)]
pub enum SlotAllocationError {
	#[error("Ran out of available slots with a capacity of {0}!")]
	NoMoreCapacity(u32),
}
