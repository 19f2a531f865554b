use crate::backing::allocator::{SlotAllocationError, SlotAllocator};
use crate::backing::pending::PendingQueue;
use crate::batch::GrowthPolicy;
use crate::platform::SlotPlatform;
use crate::slot::{StaticSlot, StaticSlotError};
use crossbeam_utils::CachePadded;
use parking_lot::Mutex;
use slot_table_types::{CompletionValue, SlotIndex};
use smallvec::SmallVec;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct SlotTableConfig {
	/// The amount of slots in the table.
	pub capacity: u32,
	/// Slots at the start of the table owned by someone else, never handed out.
	pub reserved_prefix: u32,
	/// The growth policy batches use unless they specify their own.
	pub growth: GrowthPolicy,
}

impl SlotTableConfig {
	pub const REASONABLE_DEFAULTS: Self = SlotTableConfig {
		capacity: 10_000,
		reserved_prefix: 0,
		growth: GrowthPolicy::DOUBLING,
	};
}

impl Default for SlotTableConfig {
	fn default() -> Self {
		Self::REASONABLE_DEFAULTS
	}
}

/// Everything sharing one slot table: the platform, the [`SlotAllocator`] and the storage blocks waiting for the
/// consumer to finish with them. Every batch and static slot keeps an `Arc` to its context.
pub struct SlotContext<P: SlotPlatform> {
	platform: P,
	allocator: SlotAllocator,
	retired: CachePadded<Mutex<PendingQueue<P::Storage>>>,
	growth: GrowthPolicy,
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct GarbageCollected {
	pub slots: usize,
	pub storage: usize,
}

impl<P: SlotPlatform> SlotContext<P> {
	pub fn new(platform: P, config: SlotTableConfig) -> Arc<Self> {
		Arc::new(Self {
			platform,
			allocator: SlotAllocator::with_reserved_prefix(config.capacity, config.reserved_prefix),
			retired: CachePadded::new(Mutex::new(PendingQueue::new())),
			growth: config.growth,
		})
	}

	#[inline]
	pub fn platform(&self) -> &P {
		&self.platform
	}

	#[inline]
	pub fn allocator(&self) -> &SlotAllocator {
		&self.allocator
	}

	#[inline]
	pub fn growth_policy(&self) -> GrowthPolicy {
		self.growth
	}

	/// Free `slot` once all work recorded up until now has finished executing.
	pub fn free_slot(&self, slot: SlotIndex) {
		self.allocator.free(slot, self.platform.pending_value());
	}

	/// Keep `storage` alive until all work recorded up until now has finished executing.
	pub fn retire_storage(&self, storage: P::Storage) {
		let safe_at = self.platform.pending_value();
		self.retired.lock().push(storage, safe_at);
	}

	/// The amount of storage blocks waiting to be dropped.
	pub fn retired_count(&self) -> usize {
		self.retired.lock().len()
	}

	/// Release all slots and storage blocks the consumer has finished with, according to the platform's
	/// [`completed_value`](crate::platform::CompletionSource::completed_value). Should be called once per frame.
	pub fn garbage_collect(&self) -> GarbageCollected {
		self.garbage_collect_at(self.platform.completed_value())
	}

	/// Like [`Self::garbage_collect`] but with an explicit completion value.
	pub fn garbage_collect_at(&self, completed: CompletionValue) -> GarbageCollected {
		profiling::function_scope!();
		let slots = self.allocator.garbage_collect(completed);
		// drop storage outside the lock
		let storage = self
			.retired
			.lock()
			.drain_completed(completed)
			.collect::<SmallVec<[P::Storage; 4]>>();
		GarbageCollected {
			slots,
			storage: storage.len(),
		}
	}

	/// Allocate a slot and publish `storage` with `element_count` records at it, until the returned [`StaticSlot`] is
	/// dropped. If no slot is available, `storage` is handed back within the error.
	pub fn alloc_static(
		self: &Arc<Self>,
		storage: P::Storage,
		element_count: u32,
	) -> Result<StaticSlot<P>, StaticSlotError<P>> {
		match self.allocator.allocate() {
			Ok(slot) => {
				self.platform.publish(slot, &storage, element_count);
				Ok(StaticSlot::new(self.clone(), slot, storage, element_count))
			}
			Err(error) => Err(StaticSlotError { error, storage }),
		}
	}

	/// Allocate a slot without publishing anything at it. The caller owns the slot and must return it with
	/// [`Self::free_slot`].
	pub fn alloc_slot(&self) -> Result<SlotIndex, SlotAllocationError> {
		self.allocator.allocate()
	}
}

impl<P: SlotPlatform + Debug> Debug for SlotContext<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("SlotContext")
			.field("platform", &self.platform)
			.field("allocator", &self.allocator)
			.field("retired", &self.retired_count())
			.field("growth", &self.growth)
			.finish()
	}
}
