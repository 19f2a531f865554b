use rangemap::RangeSet;
use slot_table_types::SlotIndex;
use std::ops::Range;

pub fn range_to_slot_index(range: Range<SlotIndex>) -> impl Iterator<Item = SlotIndex> {
	(range.start.to_u32()..range.end.to_u32()).map(SlotIndex::new)
}

pub(crate) fn slot_index_to_range(index: SlotIndex) -> Range<SlotIndex> {
	index..SlotIndex::new(index.to_u32() + 1)
}

/// A set of [`SlotIndex`] stored as coalesced ranges.
#[derive(Clone, Debug, Default)]
pub struct SlotIndexRangeSet {
	range_set: RangeSet<SlotIndex>,
}

impl SlotIndexRangeSet {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn insert(&mut self, index: SlotIndex) {
		self.range_set.insert(slot_index_to_range(index));
	}

	pub fn contains(&self, index: SlotIndex) -> bool {
		self.range_set.contains(&index)
	}

	pub fn is_empty(&self) -> bool {
		self.range_set.is_empty()
	}

	pub fn iter_ranges(&self) -> impl Iterator<Item = Range<SlotIndex>> + '_ {
		self.range_set.iter().cloned()
	}

	pub fn iter(&self) -> impl Iterator<Item = SlotIndex> + '_ {
		self.range_set.iter().cloned().flat_map(range_to_slot_index)
	}

	/// Every index within `outer` that is not part of this set, in ascending order.
	pub fn gaps<'a>(&'a self, outer: &'a Range<SlotIndex>) -> impl Iterator<Item = SlotIndex> + 'a {
		self.range_set.gaps(outer).flat_map(range_to_slot_index)
	}
}

impl FromIterator<SlotIndex> for SlotIndexRangeSet {
	fn from_iter<T: IntoIterator<Item = SlotIndex>>(iter: T) -> Self {
		Self {
			range_set: iter.into_iter().map(slot_index_to_range).collect(),
		}
	}
}
