use glam::{Affine3A, Vec3, Vec4};
use slot_table_core::batch::Instance;
use slot_table_core::context::{SlotContext, SlotTableConfig};
use slot_table_core::platform::host::HostPlatform;
use std::sync::Arc;

pub mod frames;
pub mod growth;
pub mod static_slot;
pub mod threads;

/// Route `log` output through the test harness. Safe to call from every test.
pub fn init_logger() {
	let _ = env_logger::builder().is_test(true).try_init();
}

/// A host context whose table and allocator have the same capacity.
pub fn host_context(config: SlotTableConfig) -> Arc<SlotContext<HostPlatform>> {
	SlotContext::new(HostPlatform::new(config.capacity), config)
}

/// An instance uniquely identifying `owner` and its `index` within a batch.
pub fn tagged_instance(owner: u32, index: u32) -> Instance {
	Instance::new(
		Affine3A::from_translation(Vec3::new(index as f32, 0., 0.)),
		Vec4::new(owner as f32, index as f32, 0., 1.),
	)
}
