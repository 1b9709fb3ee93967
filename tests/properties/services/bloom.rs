use crate::properties::strategies::{address_strategy, b256_strategy};

use chain_event_relay::{
	services::filter::bloom_may_contain,
	utils::tests::builders::{
		block::BlockBuilder, filter::FilterBuilder, log::LogBuilder,
		transaction::TransactionBuilder,
	},
};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	// A block holding a matching log always passes the bloom probe
	#[test]
	fn test_bloom_has_no_false_negatives(
		address in address_strategy(),
		extra_topics in prop::collection::vec(b256_strategy(), 0..3),
		name in "[A-Z][a-zA-Z]{0,12}",
		any_contract in any::<bool>(),
	) {
		let mut filter = FilterBuilder::new()
			.contract_address(address)
			.event_signature(&format!("{}(address,uint256)", name));
		if any_contract {
			filter = filter.any_contract();
		}
		let filter = filter.build();

		let mut log = LogBuilder::new().address(address).topic(filter.event_topic());
		for topic in extra_topics {
			log = log.topic(topic);
		}
		let block = BlockBuilder::new()
			.transaction(TransactionBuilder::new().log(log.build()).build())
			.build();

		prop_assert!(bloom_may_contain(&block.logs_bloom, &filter));
	}
}
