#![cfg(test)]

use crate::{host_context, init_logger, tagged_instance};
use slot_table_core::batch::{BuildStatus, InstanceBatch};
use slot_table_core::context::{SlotContext, SlotTableConfig};
use slot_table_core::platform::host::HostPlatform;
use slot_table_core::platform::CompletionSource;
use slot_table_types::{CompletionValue, SlotIndex};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

const FRAMES_IN_FLIGHT: usize = 2;

/// What a submitted frame reads: which owner each drawn slot belonged to at submission.
struct SubmittedFrame {
	value: CompletionValue,
	draws: HashMap<SlotIndex, u32>,
}

struct Scene {
	context: Arc<SlotContext<HostPlatform>>,
	batches: Vec<(u32, InstanceBatch<HostPlatform>)>,
	in_flight: VecDeque<SubmittedFrame>,
	next_owner: u32,
}

impl Scene {
	fn new(capacity: u32) -> Self {
		Self {
			context: host_context(SlotTableConfig {
				capacity,
				..SlotTableConfig::REASONABLE_DEFAULTS
			}),
			batches: Vec::new(),
			in_flight: VecDeque::new(),
			next_owner: 0,
		}
	}

	fn spawn(&mut self, instances: u32) {
		let owner = self.next_owner;
		self.next_owner += 1;
		let mut batch = InstanceBatch::new(&self.context);
		batch.extend_instances((0..instances).map(|i| tagged_instance(owner, i)));
		self.batches.push((owner, batch));
	}

	/// Build all batches and assert that no slot drawn by a frame still in flight was handed to a different owner.
	fn build(&mut self) -> anyhow::Result<()> {
		for (owner, batch) in &mut self.batches {
			if batch.build(false)? == BuildStatus::SlotUnavailable {
				continue;
			}
			let Some(slot) = batch.slot() else { continue };
			for frame in &self.in_flight {
				if let Some(previous) = frame.draws.get(&slot) {
					assert_eq!(
						*previous, *owner,
						"{:?} of owner {} reused while frame {:?} still reads it for owner {}",
						slot, owner, frame.value, previous
					);
				}
			}
		}
		Ok(())
	}

	fn submit(&mut self) {
		let host = self.context.platform();
		let mut draws = HashMap::new();
		for (owner, batch) in &self.batches {
			if let Some((slot, count)) = batch.draw_info() {
				let records = host.read_slot(slot).expect("drawn slot must be published");
				// the consumer reads exactly what this batch wrote
				for (i, record) in records[..count as usize].iter().enumerate() {
					assert_eq!(*record, tagged_instance(*owner, i as u32).to_record());
				}
				draws.insert(slot, *owner);
			}
		}
		let value = host.submit();
		self.in_flight.push_back(SubmittedFrame { value, draws });
	}

	fn complete_oldest(&mut self) {
		if let Some(frame) = self.in_flight.pop_front() {
			self.context.platform().complete(frame.value);
		}
	}
}

#[test]
fn test_lagging_consumer_never_aliases() -> anyhow::Result<()> {
	init_logger();
	let mut scene = Scene::new(12);
	for frame in 0..200u32 {
		// churn: drop some batches, spawn some new ones
		if frame % 3 == 0 && !scene.batches.is_empty() {
			let index = (frame as usize * 7) % scene.batches.len();
			scene.batches.swap_remove(index);
		}
		if scene.batches.len() < 10 {
			scene.spawn(1 + (frame * 13) % 40);
		}
		if frame % 5 == 0 {
			if let Some((owner, batch)) = scene.batches.first_mut() {
				let owner = *owner;
				let len = batch.len() as u32;
				batch.add_instance(tagged_instance(owner, len));
			}
		}

		scene.build()?;
		scene.submit();
		while scene.in_flight.len() > FRAMES_IN_FLIGHT {
			scene.complete_oldest();
		}
		scene.context.garbage_collect();
	}

	// drain everything
	scene.batches.clear();
	let host = scene.context.platform();
	host.submit();
	host.complete_all();
	scene.context.garbage_collect();
	assert_eq!(scene.context.allocator().pending_count(), 0);
	assert_eq!(scene.context.retired_count(), 0);
	assert_eq!(host.completed_value(), host.submitted_value());
	Ok(())
}

#[test]
fn test_exhausted_table_recovers() -> anyhow::Result<()> {
	init_logger();
	let mut scene = Scene::new(4);
	for _ in 0..6 {
		scene.spawn(3);
	}
	scene.build()?;
	let unavailable = scene.batches.iter().filter(|(_, b)| b.slot().is_none()).count();
	assert_eq!(unavailable, 2);
	scene.submit();

	// free two slots, they only become available after the frame reading them completes
	scene.batches.drain(..2).for_each(drop);
	scene.build()?;
	assert_eq!(scene.batches.iter().filter(|(_, b)| b.slot().is_none()).count(), 2);

	scene.submit();
	scene.complete_oldest();
	scene.complete_oldest();
	scene.context.garbage_collect();
	scene.build()?;
	assert!(scene.batches.iter().all(|(_, b)| b.slot().is_some()));
	Ok(())
}
