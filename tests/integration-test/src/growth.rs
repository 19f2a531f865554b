#![cfg(test)]

use crate::{host_context, init_logger, tagged_instance};
use slot_table_core::batch::{BuildStatus, GrowthPolicy, InstanceBatch};
use slot_table_core::context::SlotTableConfig;

#[test]
fn test_growth_while_in_flight() -> anyhow::Result<()> {
	init_logger();
	let context = host_context(SlotTableConfig {
		capacity: 8,
		reserved_prefix: 0,
		growth: GrowthPolicy {
			minimum_capacity: 4,
			growth_factor: 2,
		},
	});
	let host = context.platform();
	let mut batch = InstanceBatch::new(&context);

	// every frame adds instances, growing 4 -> 8 -> 16 -> 32 while previous frames are still executing
	let mut in_flight = Vec::new();
	let mut seen = Vec::new();
	for frame in 0..8u32 {
		let len = batch.len() as u32;
		batch.extend_instances((len..len + 3).map(|i| tagged_instance(0, i)));
		let status = batch.build(false)?;
		let slot = batch.slot().unwrap();
		let published = host.published(slot).unwrap();
		if let BuildStatus::Built { grown: true, .. } = status {
			seen.push(published.storage.clone());
		}
		assert_eq!(published.element_count, batch.storage_capacity());
		in_flight.push((host.submit(), published.storage));
		log::info!("frame {} draws {} instances", frame, batch.draw_count());
	}
	assert_eq!(batch.storage_capacity(), 32);
	assert_eq!(seen.len(), 4);
	// all but the current storage were retired, none have been dropped yet
	assert_eq!(context.retired_count(), 3);

	for (value, storage) in in_flight.drain(..) {
		host.complete(value);
		context.garbage_collect();
		drop(storage);
	}
	assert_eq!(context.retired_count(), 0);

	// only the batch's current storage and the table entry keep it alive
	for storage in &seen[..3] {
		assert_eq!(storage.handle_count(), 1);
	}
	assert_eq!(seen[3].handle_count(), 3);
	Ok(())
}
