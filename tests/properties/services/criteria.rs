use crate::properties::strategies::{address_strategy, b256_strategy, mixed_case_hex};

use chain_event_relay::{
	models::{TransactionIdentifierType, TransactionMonitoringSpec, TransactionStatus},
	services::filter::TransactionMatchingCriteria,
	utils::tests::builders::{log::LogBuilder, transaction::TransactionBuilder},
};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_address_criteria_match_regardless_of_configured_case(
		(address, value) in address_strategy()
			.prop_flat_map(|address| (Just(address), mixed_case_hex(address.to_vec()))),
		other in address_strategy(),
	) {
		let to = TransactionMonitoringSpec::new(
			TransactionIdentifierType::ToAddress, value.clone(), "mainnet", vec![],
		);
		let from = TransactionMonitoringSpec::new(
			TransactionIdentifierType::FromAddress, value, "mainnet", vec![],
		);
		let to = TransactionMatchingCriteria::compile(&to).unwrap();
		let from = TransactionMatchingCriteria::compile(&from).unwrap();

		let tx = TransactionBuilder::new().to(address).from(address).build();
		prop_assert!(to.matches(&tx));
		prop_assert!(from.matches(&tx));

		prop_assume!(other != address);
		let unrelated = TransactionBuilder::new().to(other).from(other).build();
		prop_assert!(!to.matches(&unrelated));
		prop_assert!(!from.matches(&unrelated));
	}

	#[test]
	fn test_hash_criteria_match_regardless_of_configured_case(
		(hash, value) in b256_strategy()
			.prop_flat_map(|hash| (Just(hash), mixed_case_hex(hash.to_vec()))),
	) {
		let spec = TransactionMonitoringSpec::new(
			TransactionIdentifierType::Hash, value, "mainnet", vec![],
		);
		let criteria = TransactionMatchingCriteria::compile(&spec).unwrap();

		prop_assert!(criteria.matches(&TransactionBuilder::new().hash(hash).build()));
		prop_assert!(criteria.is_one_time_match());
	}

	#[test]
	fn test_topic_criteria_are_never_one_time(topic in b256_strategy(), position in 0usize..3) {
		let spec = TransactionMonitoringSpec::new(
			TransactionIdentifierType::Topic, topic.to_string(), "mainnet", vec![],
		);
		let criteria = TransactionMatchingCriteria::compile(&spec).unwrap();

		let mut log = LogBuilder::new();
		for _ in 0..position {
			log = log.topic(alloy::primitives::B256::repeat_byte(0xee));
		}
		let tx = TransactionBuilder::new().log(log.topic(topic).build()).build();
		prop_assert!(criteria.matches(&tx));
		prop_assert!(!criteria.is_one_time_match());
	}

	// A criteria fires only for the statuses its spec names
	#[test]
	fn test_status_filter(
		wanted in prop::sample::select(TransactionStatus::ALL.to_vec()),
		actual in prop::sample::select(TransactionStatus::ALL.to_vec()),
	) {
		let spec = TransactionMonitoringSpec::new(
			TransactionIdentifierType::ToAddress,
			"0x0202020202020202020202020202020202020202",
			"mainnet",
			vec![wanted],
		);
		let criteria = TransactionMatchingCriteria::compile(&spec).unwrap();
		let tx = TransactionBuilder::new().status(actual).build();
		prop_assert_eq!(criteria.matches(&tx), wanted == actual);
	}
}
