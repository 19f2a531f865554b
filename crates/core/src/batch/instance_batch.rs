use crate::batch::{GrowthPolicy, Instance};
use crate::context::SlotContext;
use crate::platform::SlotPlatform;
use slot_table_types::{InstanceRecord, SlotIndex};
use std::fmt::{Debug, Display, Formatter};
use std::mem::align_of;
use std::sync::Arc;
use thiserror::Error;

struct Backing<P: SlotPlatform> {
	storage: P::Storage,
	capacity: u32,
}

/// A growable list of [`Instance`]s published at a single slot.
///
/// Instances are staged on the CPU and only written to storage by [`Self::build`]. When the storage is too small, a
/// bigger block is created and published at the *same* slot, the previous block stays alive until all work recorded
/// before the growth has finished executing. The slot is owned until the batch is dropped.
pub struct InstanceBatch<P: SlotPlatform> {
	context: Arc<SlotContext<P>>,
	instances: Vec<Instance>,
	backing: Option<Backing<P>>,
	slot: Option<SlotIndex>,
	policy: GrowthPolicy,
	dirty: bool,
	draw_count: u32,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum BuildStatus {
	/// No instances staged, nothing to draw.
	Empty,
	/// Nothing changed since the last build.
	Unchanged,
	/// No slot was available. Nothing was created, the build may be retried in a later frame.
	SlotUnavailable,
	Built {
		count: u32,
		/// Whether new storage was created and published.
		grown: bool,
	},
}

#[derive(Error)]
pub enum BatchError<P: SlotPlatform> {
	#[error("Storage error: {0}")]
	Storage(P::StorageError),
	#[error("Copying instances failed: {0:?}")]
	Copy(presser::CopyError),
	#[error("{0} instances exceed the maximum amount of instances per batch")]
	TooManyInstances(usize),
}

impl<P: SlotPlatform> Debug for BatchError<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		Display::fmt(self, f)
	}
}

impl<P: SlotPlatform> InstanceBatch<P> {
	/// Create an empty batch using the context's [`GrowthPolicy`]. Neither a slot nor storage is allocated until the
	/// first [`Self::build`] with some instances.
	pub fn new(context: &Arc<SlotContext<P>>) -> Self {
		Self::with_policy(context, context.growth_policy())
	}

	pub fn with_policy(context: &Arc<SlotContext<P>>, policy: GrowthPolicy) -> Self {
		Self {
			context: context.clone(),
			instances: Vec::new(),
			backing: None,
			slot: None,
			policy,
			dirty: false,
			draw_count: 0,
		}
	}

	pub fn add_instance(&mut self, instance: Instance) {
		self.instances.push(instance);
		self.dirty = true;
	}

	pub fn extend_instances(&mut self, instances: impl IntoIterator<Item = Instance>) {
		self.instances.extend(instances);
		self.dirty = true;
	}

	/// Remove all staged instances. The storage is kept and reused by the next build.
	pub fn clear_instances(&mut self) {
		self.instances.clear();
		self.dirty = true;
	}

	#[inline]
	pub fn instances(&self) -> &[Instance] {
		&self.instances
	}

	/// Mutable access to a staged instance, marks the batch dirty.
	pub fn instance_mut(&mut self, index: usize) -> Option<&mut Instance> {
		let instance = self.instances.get_mut(index)?;
		self.dirty = true;
		Some(instance)
	}

	#[inline]
	pub fn len(&self) -> usize {
		self.instances.len()
	}

	#[inline]
	pub fn is_empty(&self) -> bool {
		self.instances.is_empty()
	}

	/// Whether the staged instances changed since the last build.
	#[inline]
	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	/// The capacity of the current storage, 0 if none was created yet.
	#[inline]
	pub fn storage_capacity(&self) -> u32 {
		self.backing.as_ref().map_or(0, |b| b.capacity)
	}

	#[inline]
	pub fn slot(&self) -> Option<SlotIndex> {
		self.slot
	}

	#[inline]
	pub fn location(&self) -> Option<P::Location> {
		self.slot.map(|slot| self.context.platform().location_of(slot))
	}

	/// The amount of instances written by the last build, which is what should be drawn.
	#[inline]
	pub fn draw_count(&self) -> u32 {
		self.draw_count
	}

	/// The slot and instance count to draw with, None if there is nothing to draw.
	pub fn draw_info(&self) -> Option<(SlotIndex, u32)> {
		match self.slot {
			Some(slot) if self.draw_count > 0 => Some((slot, self.draw_count)),
			_ => None,
		}
	}

	#[inline]
	pub fn context(&self) -> &Arc<SlotContext<P>> {
		&self.context
	}

	/// Write all staged instances to storage, growing and republishing the storage if required. Unless `force` is
	/// set, a batch that was not modified since the last build is skipped.
	pub fn build(&mut self, force: bool) -> Result<BuildStatus, BatchError<P>> {
		profiling::function_scope!();
		if self.instances.is_empty() {
			self.draw_count = 0;
			self.dirty = false;
			return Ok(BuildStatus::Empty);
		}
		if !force && !self.dirty {
			return Ok(BuildStatus::Unchanged);
		}
		let required =
			u32::try_from(self.instances.len()).map_err(|_| BatchError::TooManyInstances(self.instances.len()))?;

		let platform = self.context.platform();
		let (slot, new_slot) = match self.slot {
			Some(slot) => (slot, false),
			None => match self.context.allocator().allocate() {
				Ok(slot) => {
					self.slot = Some(slot);
					(slot, true)
				}
				Err(err) => {
					log::warn!("Skipping build of batch with {} instances: {}", required, err);
					return Ok(BuildStatus::SlotUnavailable);
				}
			},
		};

		let grown = if let Some(capacity) = self.policy.next_capacity(self.storage_capacity(), required) {
			let storage = platform.create_storage(capacity).map_err(BatchError::Storage)?;
			log::debug!(
				"Growing storage of batch at {:?} from {} to {} instances",
				slot,
				self.storage_capacity(),
				capacity
			);
			if let Some(old) = self.backing.replace(Backing { storage, capacity }) {
				self.context.retire_storage(old.storage);
			}
			true
		} else {
			false
		};

		let Some(backing) = self.backing.as_ref() else {
			unreachable!("storage capacity of 0 always grows for a non-empty batch")
		};
		if grown || new_slot {
			platform.publish(slot, &backing.storage, backing.capacity);
		}

		{
			let mut mapped = platform.map_for_write(&backing.storage).map_err(BatchError::Storage)?;
			let record = presser::copy_from_iter_to_offset_with_align_packed(
				self.instances.iter().map(Instance::to_record),
				&mut mapped,
				0,
				align_of::<InstanceRecord>(),
			)
			.map_err(BatchError::Copy)?;
			if let Some(record) = record {
				debug_assert_eq!(record.copy_start_offset, 0, "presser must not add padding");
			}
		}

		self.dirty = false;
		self.draw_count = required;
		Ok(BuildStatus::Built { count: required, grown })
	}
}

impl<P: SlotPlatform> Debug for InstanceBatch<P> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("InstanceBatch")
			.field("slot", &self.slot)
			.field("instances", &self.instances.len())
			.field("storage_capacity", &self.storage_capacity())
			.field("draw_count", &self.draw_count)
			.field("dirty", &self.dirty)
			.finish()
	}
}

impl<P: SlotPlatform> Drop for InstanceBatch<P> {
	fn drop(&mut self) {
		if let Some(backing) = self.backing.take() {
			self.context.retire_storage(backing.storage);
		}
		if let Some(slot) = self.slot.take() {
			self.context.free_slot(slot);
		}
	}
}
