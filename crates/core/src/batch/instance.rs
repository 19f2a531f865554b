use glam::{Affine3A, Mat4, Vec4};
use slot_table_types::InstanceRecord;

/// The source data of a single instance within a batch, from which its [`InstanceRecord`] is computed on every build.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Instance {
	pub transform: Affine3A,
	pub color: Vec4,
}

impl Instance {
	pub fn new(transform: Affine3A, color: Vec4) -> Self {
		Self { transform, color }
	}

	pub fn to_record(&self) -> InstanceRecord {
		InstanceRecord::new(Mat4::from(self.transform), self.color)
	}
}

impl Default for Instance {
	fn default() -> Self {
		Self::new(Affine3A::IDENTITY, Vec4::ONE)
	}
}
