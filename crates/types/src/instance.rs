use bytemuck_derive::{Pod, Zeroable};
use core::mem;
use glam::{Mat4, Vec4};
use static_assertions::const_assert_eq;

/// Per-instance data as the consumer reads it. Records have no identity, their position within the published
/// storage determines their draw order.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Zeroable, Pod)]
pub struct InstanceRecord {
	/// object to world
	pub world: Mat4,
	/// inverse transpose of `world`, for transforming normals
	pub normal: Mat4,
	pub color: Vec4,
}
const_assert_eq!(mem::size_of::<InstanceRecord>(), 144);

impl InstanceRecord {
	pub fn new(world: Mat4, color: Vec4) -> Self {
		Self {
			world,
			normal: world.inverse().transpose(),
			color,
		}
	}
}
