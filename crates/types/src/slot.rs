use bytemuck_derive::{Pod, Zeroable};
use core::fmt::{Debug, Display, Formatter};
use core::mem;
use static_assertions::const_assert_eq;

/// The index of a slot within a slot table. Consumers bind a slot once and locate its contents through it.
#[repr(transparent)]
#[derive(Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd, Zeroable, Pod)]
pub struct SlotIndex(u32);
const_assert_eq!(mem::size_of::<SlotIndex>(), 4);

impl SlotIndex {
	pub const fn new(index: u32) -> Self {
		Self(index)
	}

	pub const fn to_u32(&self) -> u32 {
		self.0
	}

	pub const fn to_usize(&self) -> usize {
		self.0 as usize
	}

	/// The index directly after this one, or None on overflow.
	pub const fn next(&self) -> Option<Self> {
		match self.0.checked_add(1) {
			Some(i) => Some(Self(i)),
			None => None,
		}
	}
}

impl Debug for SlotIndex {
	fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
		f.debug_tuple("SlotIndex").field(&self.0).finish()
	}
}

impl Display for SlotIndex {
	fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl From<SlotIndex> for u32 {
	fn from(value: SlotIndex) -> Self {
		value.0
	}
}
