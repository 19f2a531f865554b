use crate::backing::allocator::SlotAllocationError;
use crate::context::SlotContext;
use crate::platform::SlotPlatform;
use slot_table_types::SlotIndex;
use std::fmt::{Debug, Display, Formatter};
use std::mem::ManuallyDrop;
use std::sync::Arc;
use thiserror::Error;

/// A slot with fixed contents published once, like a texture or a mesh that never changes. Dropping it frees the
/// slot and retires the storage once all work recorded until then has finished executing.
pub struct StaticSlot<P: SlotPlatform> {
	context: Arc<SlotContext<P>>,
	slot: SlotIndex,
	storage: ManuallyDrop<P::Storage>,
	element_count: u32,
}

impl<P: SlotPlatform> StaticSlot<P> {
	pub(crate) fn new(context: Arc<SlotContext<P>>, slot: SlotIndex, storage: P::Storage, element_count: u32) -> Self {
		Self {
			context,
			slot,
			storage: ManuallyDrop::new(storage),
			element_count,
		}
	}

	#[inline]
	pub fn slot(&self) -> SlotIndex {
		self.slot
	}

	#[inline]
	pub fn location(&self) -> P::Location {
		self.context.platform().location_of(self.slot)
	}

	#[inline]
	pub fn element_count(&self) -> u32 {
		self.element_count
	}

	#[inline]
	pub fn storage(&self) -> &P::Storage {
		&self.storage
	}

	#[inline]
	pub fn context(&self) -> &Arc<SlotContext<P>> {
		&self.context
	}
}

impl<P: SlotPlatform> Debug for StaticSlot<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("StaticSlot")
			.field("slot", &self.slot)
			.field("location", &self.location())
			.field("element_count", &self.element_count)
			.finish()
	}
}

impl<P: SlotPlatform> Drop for StaticSlot<P> {
	fn drop(&mut self) {
		// Safety: storage is never accessed again
		let storage = unsafe { ManuallyDrop::take(&mut self.storage) };
		self.context.retire_storage(storage);
		self.context.free_slot(self.slot);
	}
}

/// Failed to allocate a slot for some storage, which is returned unharmed.
#[derive(Error)]
#[error("{error}")]
pub struct StaticSlotError<P: SlotPlatform> {
	#[source]
	pub error: SlotAllocationError,
	pub storage: P::Storage,
}

impl<P: SlotPlatform> Debug for StaticSlotError<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}
