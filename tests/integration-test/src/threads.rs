#![cfg(test)]

use crate::init_logger;
use slot_table_core::backing::allocator::SlotAllocator;
use slot_table_types::CompletionValue;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering::SeqCst;

#[test]
fn test_allocator_shared_between_threads() -> anyhow::Result<()> {
	init_logger();
	const THREADS: usize = 4;
	const ROUNDS: usize = 500;
	const CAPACITY: u32 = 64;

	let allocator = SlotAllocator::new(CAPACITY);
	let owned = (0..CAPACITY).map(|_| AtomicBool::new(false)).collect::<Vec<_>>();

	std::thread::scope(|scope| {
		for t in 0..THREADS {
			let allocator = &allocator;
			let owned = &owned;
			scope.spawn(move || {
				let mut held = Vec::new();
				for round in 0..ROUNDS {
					if (round + t) % 3 != 2 {
						if let Ok(slot) = allocator.allocate() {
							let was_owned = owned[slot.to_usize()].swap(true, SeqCst);
							assert!(!was_owned, "{:?} handed out twice", slot);
							held.push(slot);
						}
					} else if let Some(slot) = held.pop() {
						owned[slot.to_usize()].store(false, SeqCst);
						// nothing consumes this table, every slot is safe right away
						allocator.free(slot, CompletionValue::ZERO);
					}
				}
				for slot in held {
					owned[slot.to_usize()].store(false, SeqCst);
					allocator.free(slot, CompletionValue::ZERO);
				}
			});
		}
	});

	assert_eq!(allocator.pending_count(), 0);
	assert_eq!(allocator.available(), CAPACITY as usize);
	Ok(())
}

#[test]
fn test_deferred_frees_from_threads() -> anyhow::Result<()> {
	init_logger();
	let allocator = SlotAllocator::new(32);
	let slots = (0..32).map(|_| allocator.allocate()).collect::<Result<Vec<_>, _>>()?;

	std::thread::scope(|scope| {
		for (i, chunk) in slots.chunks(8).enumerate() {
			let allocator = &allocator;
			scope.spawn(move || {
				for slot in chunk {
					allocator.free(*slot, CompletionValue::new(i as u64 + 1));
				}
			});
		}
	});

	assert_eq!(allocator.pending_count(), 32);
	assert_eq!(allocator.garbage_collect(CompletionValue::new(2)), 16);
	assert_eq!(allocator.garbage_collect(CompletionValue::new(4)), 16);
	assert_eq!(allocator.available(), 32);
	Ok(())
}
