use alloy::primitives::{Bloom, BloomInput};

use crate::models::ContractEventFilter;

/// Probes a block bloom for a filter's event topic and, when set, its contract address.
///
/// A `false` result means no log in the block can match the filter. A `true` result may be
/// a false positive.
pub fn bloom_may_contain(bloom: &Bloom, filter: &ContractEventFilter) -> bool {
	let topic = filter.event_topic();
	if !bloom.contains_input(BloomInput::Raw(topic.as_slice())) {
		return false;
	}

	match filter.contract_address {
		Some(address) => bloom.contains_input(BloomInput::Raw(address.as_slice())),
		None => true,
	}
}
