//! A [`SlotPlatform`] living entirely in host memory. Submissions are simulated by an explicit timeline: every
//! [`HostPlatform::submit`] hands out the next completion value and nothing completes until
//! [`HostPlatform::complete`] is called, which makes it trivial to keep work "in flight" for as many frames as a test
//! needs.

use crate::platform::{CompletionSource, SlotPlatform};
use crossbeam_utils::CachePadded;
use parking_lot::{Mutex, MutexGuard};
use presser::Slab;
use slot_table_types::{CompletionValue, InstanceRecord, SlotIndex};
use std::fmt::{Debug, Formatter};
use std::mem::size_of;
use std::sync::atomic::Ordering::{Acquire, Relaxed, Release};
use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Arc;
use thiserror::Error;

pub const HOST_CPU_HANDLE_BASE: u64 = 0x1000_0000;
pub const HOST_GPU_HANDLE_BASE: u64 = 0x7f00_0000_0000;
pub const HOST_HANDLE_STRIDE: u64 = 32;

pub struct HostPlatform {
	submitted: CachePadded<AtomicU64>,
	completed: CachePadded<AtomicU64>,
	table: Mutex<Vec<Option<HostPublished>>>,
	next_storage_id: AtomicU64,
	fail_next_storage: AtomicBool,
}

impl HostPlatform {
	/// Create a platform whose slot table holds `table_capacity` slots.
	pub fn new(table_capacity: u32) -> Self {
		Self {
			submitted: CachePadded::new(AtomicU64::new(0)),
			completed: CachePadded::new(AtomicU64::new(0)),
			table: Mutex::new(vec![None; table_capacity as usize]),
			next_storage_id: AtomicU64::new(0),
			fail_next_storage: AtomicBool::new(false),
		}
	}

	/// Submit all work recorded so far. It counts as executing until [`Self::complete`] reaches the returned value.
	pub fn submit(&self) -> CompletionValue {
		CompletionValue::new(self.submitted.fetch_add(1, Relaxed) + 1)
	}

	/// The value signaled by the latest [`Self::submit`].
	pub fn submitted_value(&self) -> CompletionValue {
		CompletionValue::new(self.submitted.load(Relaxed))
	}

	/// Finish executing all submissions up to and including `value`.
	pub fn complete(&self, value: CompletionValue) {
		debug_assert!(
			value <= self.submitted_value(),
			"completing {:?} which was never submitted",
			value
		);
		self.completed.fetch_max(value.get(), Release);
	}

	/// Finish executing all submitted work, like waiting for the device to become idle.
	pub fn complete_all(&self) {
		self.complete(self.submitted_value());
	}

	/// What the consumer would read at `slot` right now.
	pub fn published(&self, slot: SlotIndex) -> Option<HostPublished> {
		self.table.lock().get(slot.to_usize()).cloned().flatten()
	}

	/// Read the records published at `slot`, as many as the published element count.
	pub fn read_slot(&self, slot: SlotIndex) -> Option<Vec<InstanceRecord>> {
		self.published(slot)
			.map(|published| published.storage.read(published.element_count as usize))
	}

	/// The amount of storage blocks created so far.
	pub fn storage_created(&self) -> u64 {
		self.next_storage_id.load(Relaxed)
	}

	/// Let the next [`SlotPlatform::create_storage`] fail with [`HostError::OutOfMemory`].
	pub fn fail_next_storage(&self) {
		self.fail_next_storage.store(true, Relaxed);
	}
}

impl Debug for HostPlatform {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HostPlatform")
			.field("submitted", &self.submitted_value())
			.field("completed", &self.completed_value())
			.field("storage_created", &self.storage_created())
			.finish()
	}
}

impl CompletionSource for HostPlatform {
	fn completed_value(&self) -> CompletionValue {
		CompletionValue::new(self.completed.load(Acquire))
	}

	fn pending_value(&self) -> CompletionValue {
		self.submitted_value().next()
	}
}

impl SlotPlatform for HostPlatform {
	type Storage = HostStorage;
	type Mapped<'a> = HostMapping<'a>;
	type Location = HostLocation;
	type StorageError = HostError;

	fn create_storage(&self, capacity: u32) -> Result<Self::Storage, Self::StorageError> {
		if self.fail_next_storage.swap(false, Relaxed) {
			return Err(HostError::OutOfMemory { requested: capacity });
		}
		let id = self.next_storage_id.fetch_add(1, Relaxed);
		Ok(HostStorage(Arc::new(HostStorageInner {
			id,
			capacity,
			records: Mutex::new(vec![InstanceRecord::default(); capacity as usize]),
		})))
	}

	fn map_for_write<'a>(&'a self, storage: &'a Self::Storage) -> Result<Self::Mapped<'a>, Self::StorageError> {
		Ok(HostMapping {
			records: storage.0.records.lock(),
		})
	}

	fn publish(&self, slot: SlotIndex, storage: &Self::Storage, element_count: u32) {
		assert!(
			element_count <= storage.capacity(),
			"publishing {} elements of a storage with capacity {}",
			element_count,
			storage.capacity()
		);
		let mut table = self.table.lock();
		let len = table.len();
		let entry = table
			.get_mut(slot.to_usize())
			.unwrap_or_else(|| panic!("{:?} is out of bounds of the table with {} slots", slot, len));
		*entry = Some(HostPublished {
			storage: storage.clone(),
			element_count,
		});
	}

	fn location_of(&self, slot: SlotIndex) -> Self::Location {
		let offset = slot.to_u32() as u64 * HOST_HANDLE_STRIDE;
		HostLocation {
			cpu: HOST_CPU_HANDLE_BASE + offset,
			gpu: HOST_GPU_HANDLE_BASE + offset,
		}
	}
}

/// A storage block in host memory. Clones refer to the same block, which is how the slot table keeps a published
/// block readable.
#[derive(Clone)]
pub struct HostStorage(Arc<HostStorageInner>);

struct HostStorageInner {
	id: u64,
	capacity: u32,
	records: Mutex<Vec<InstanceRecord>>,
}

impl HostStorage {
	/// Unique per block created by the same [`HostPlatform`].
	pub fn id(&self) -> u64 {
		self.0.id
	}

	pub fn capacity(&self) -> u32 {
		self.0.capacity
	}

	/// Copy out the first `count` records.
	pub fn read(&self, count: usize) -> Vec<InstanceRecord> {
		self.0.records.lock()[..count].to_vec()
	}

	/// The amount of handles referring to this block, including the one held by the slot table if published.
	pub fn handle_count(&self) -> usize {
		Arc::strong_count(&self.0)
	}
}

impl Debug for HostStorage {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HostStorage")
			.field("id", &self.0.id)
			.field("capacity", &self.0.capacity)
			.finish()
	}
}

impl PartialEq for HostStorage {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for HostStorage {}

/// The contents of a slot as the consumer sees them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostPublished {
	pub storage: HostStorage,
	pub element_count: u32,
}

pub struct HostMapping<'a> {
	records: MutexGuard<'a, Vec<InstanceRecord>>,
}

unsafe impl Slab for HostMapping<'_> {
	fn base_ptr(&self) -> *const u8 {
		self.records.as_ptr().cast()
	}

	fn base_ptr_mut(&mut self) -> *mut u8 {
		self.records.as_mut_ptr().cast()
	}

	fn size(&self) -> usize {
		self.records.len() * size_of::<InstanceRecord>()
	}
}

/// A pair of handles, the way a descriptor table would hand them out.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct HostLocation {
	pub cpu: u64,
	pub gpu: u64,
}

#[derive(Debug, Error)]
pub enum HostError {
	#[error("Out of memory allocating storage for {requested} instances")]
	OutOfMemory { requested: u32 },
}
