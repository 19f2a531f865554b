use slot_table_types::{CompletionValue, SlotIndex};
use std::error::Error;
use std::fmt::Debug;

/// The monotonic completion counter of the consumer executing submitted work.
pub trait CompletionSource {
	/// All work submitted with a value less or equal to the returned value has finished executing. Must never
	/// decrease.
	fn completed_value(&self) -> CompletionValue;

	/// The value that work recorded right now will signal once it has finished executing. Resources referenced by
	/// such work may be released once [`Self::completed_value`] reaches this value.
	fn pending_value(&self) -> CompletionValue;
}

/// Interface to the environment that owns the consumer-visible storage and slot table. Implementations
/// exist per consumer, the [`host`](super::host) platform executes everything in memory.
pub trait SlotPlatform: CompletionSource + Sized + Send + Sync + 'static {
	/// A block of storage holding [`InstanceRecord`](slot_table_types::InstanceRecord)s.
	type Storage: Send + Sync + 'static;
	/// A CPU-writable view into some [`Self::Storage`]. Dropping it unmaps the storage.
	type Mapped<'a>: presser::Slab + 'a
	where
		Self: 'a;
	/// Whatever the consumer uses to read a slot, e.g. a pair of descriptor handles.
	type Location: Copy + Debug + Send + Sync + 'static;
	type StorageError: Error + Send + Sync + 'static;

	/// Create a new storage block able to hold `capacity` records.
	fn create_storage(&self, capacity: u32) -> Result<Self::Storage, Self::StorageError>;

	/// Map `storage` for writing. The storage stays mapped for as long as the returned guard is alive.
	fn map_for_write<'a>(&'a self, storage: &'a Self::Storage) -> Result<Self::Mapped<'a>, Self::StorageError>;

	/// Bind `storage` as the contents the consumer reads when referencing `slot`, limited to the first
	/// `element_count` records. Publishing a slot again replaces the previous contents.
	fn publish(&self, slot: SlotIndex, storage: &Self::Storage, element_count: u32);

	fn location_of(&self, slot: SlotIndex) -> Self::Location;
}
