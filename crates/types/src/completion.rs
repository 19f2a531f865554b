use bytemuck_derive::{Pod, Zeroable};
use core::fmt::{Debug, Display, Formatter};
use core::mem;
use static_assertions::const_assert_eq;

/// A value of the monotonic completion counter advanced by the consumer. Reaching a value means all work
/// submitted with a value less or equal to it has finished executing.
#[repr(transparent)]
#[derive(Copy, Clone, Default, Hash, Eq, PartialEq, Ord, PartialOrd, Zeroable, Pod)]
pub struct CompletionValue(u64);
const_assert_eq!(mem::size_of::<CompletionValue>(), 8);

impl CompletionValue {
	/// No work has ever completed.
	pub const ZERO: Self = Self(0);

	pub const fn new(value: u64) -> Self {
		Self(value)
	}

	pub const fn get(&self) -> u64 {
		self.0
	}

	/// The value the next submission will signal.
	pub const fn next(&self) -> Self {
		Self(self.0 + 1)
	}

	/// Returns true if work submitted at `other` has finished once this value has been reached.
	pub fn has_reached(&self, other: CompletionValue) -> bool {
		*self >= other
	}
}

impl Debug for CompletionValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
		f.debug_tuple("CompletionValue").field(&self.0).finish()
	}
}

impl Display for CompletionValue {
	fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
		Display::fmt(&self.0, f)
	}
}

impl From<u64> for CompletionValue {
	fn from(value: u64) -> Self {
		Self(value)
	}
}
