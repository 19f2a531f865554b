#![cfg(test)]

use crate::{host_context, init_logger, tagged_instance};
use slot_table_core::batch::InstanceBatch;
use slot_table_core::context::SlotTableConfig;
use slot_table_core::platform::SlotPlatform;
use slot_table_types::SlotIndex;

#[test]
fn test_static_slots_share_table_with_batches() -> anyhow::Result<()> {
	init_logger();
	let context = host_context(SlotTableConfig {
		capacity: 8,
		reserved_prefix: 2,
		..SlotTableConfig::REASONABLE_DEFAULTS
	});
	let host = context.platform();

	// a texture-like block: written once, published once
	let storage = host.create_storage(4)?;
	{
		let mut mapped = host.map_for_write(&storage)?;
		let records = (0..4).map(|i| tagged_instance(7, i).to_record()).collect::<Vec<_>>();
		presser::copy_from_slice_to_offset(&records, &mut mapped, 0).unwrap();
	}
	let texture = context.alloc_static(storage, 4)?;
	assert_eq!(texture.slot(), SlotIndex::new(2));

	let mut batch = InstanceBatch::new(&context);
	batch.add_instance(tagged_instance(1, 0));
	batch.build(false)?;
	assert_eq!(batch.slot(), Some(SlotIndex::new(3)));
	assert_ne!(batch.location(), Some(texture.location()));

	let records = host.read_slot(texture.slot()).unwrap();
	assert_eq!(records.len(), 4);
	assert_eq!(records[3], tagged_instance(7, 3).to_record());

	// dropping the texture while a frame reads it keeps its slot from being reused
	let frame = host.submit();
	let texture_slot = texture.slot();
	drop(texture);
	let mut other = InstanceBatch::new(&context);
	other.add_instance(tagged_instance(2, 0));
	other.build(false)?;
	assert_ne!(other.slot(), Some(texture_slot));

	host.complete(frame);
	host.submit();
	host.complete_all();
	let collected = context.garbage_collect();
	assert_eq!(collected.slots, 1);
	assert_eq!(collected.storage, 1);
	Ok(())
}
