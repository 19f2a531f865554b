/// How a batch's storage grows once it runs out of capacity. Storage never shrinks.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct GrowthPolicy {
	/// The capacity of the first storage block.
	pub minimum_capacity: u32,
	pub growth_factor: u32,
}

impl GrowthPolicy {
	/// Double the capacity, starting at 256 records.
	pub const DOUBLING: Self = GrowthPolicy {
		minimum_capacity: 256,
		growth_factor: 2,
	};

	/// The capacity to grow to from `current` to fit `required` records, or None if `current` is enough.
	///
	/// Starts at `max(minimum_capacity, current * growth_factor)` and keeps growing by `growth_factor` until
	/// `required` fits, so a single reallocation always suffices.
	pub fn next_capacity(&self, current: u32, required: u32) -> Option<u32> {
		if required <= current {
			return None;
		}
		let mut capacity = self.minimum_capacity.max(current.saturating_mul(self.growth_factor));
		while capacity < required {
			let next = capacity.saturating_mul(self.growth_factor);
			if next <= capacity {
				// growth_factor <= 1 or minimum_capacity == 0
				return Some(required);
			}
			capacity = next;
		}
		Some(capacity)
	}
}

impl Default for GrowthPolicy {
	fn default() -> Self {
		Self::DOUBLING
	}
}
