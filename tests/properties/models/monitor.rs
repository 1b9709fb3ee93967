use crate::properties::strategies::{address_strategy, mixed_case_hex, statuses_strategy};

use chain_event_relay::models::{TransactionIdentifierType, TransactionMonitoringSpec};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	// Identical specs written with different casing resolve to one id
	#[test]
	fn test_address_spec_id_ignores_case(
		(value_a, value_b) in address_strategy().prop_flat_map(|address| {
			(
				mixed_case_hex(address.to_vec()),
				mixed_case_hex(address.to_vec()),
			)
		}),
		statuses in statuses_strategy(),
	) {
		let a = TransactionMonitoringSpec::new(
			TransactionIdentifierType::ToAddress,
			value_a,
			"mainnet",
			statuses.clone(),
		);
		let b = TransactionMonitoringSpec::new(
			TransactionIdentifierType::ToAddress,
			value_b,
			"mainnet",
			statuses,
		);
		prop_assert_eq!(&a.id, &b.id);
		prop_assert_eq!(a.transaction_identifier_value, b.transaction_identifier_value);
		prop_assert_eq!(a.id.len(), 64);
	}

	// Status order and repetition never change the id
	#[test]
	fn test_spec_id_ignores_status_order(
		value in "0x[0-9a-f]{64}",
		statuses in statuses_strategy(),
	) {
		let mut reversed = statuses.clone();
		reversed.reverse();
		let mut repeated = statuses.clone();
		repeated.extend(statuses.iter().copied());

		let ids: Vec<String> = [statuses, reversed, repeated]
			.into_iter()
			.map(|statuses| {
				TransactionMonitoringSpec::new(
					TransactionIdentifierType::Hash,
					value.clone(),
					"mainnet",
					statuses,
				)
				.id
			})
			.collect();
		prop_assert!(ids.windows(2).all(|pair| pair[0] == pair[1]));
	}

	// Normalizing twice is the same as normalizing once
	#[test]
	fn test_normalize_is_idempotent(
		value in "[0-9a-fA-Fx ]{1,80}",
		statuses in statuses_strategy(),
		type_ in prop::sample::select(vec![
			TransactionIdentifierType::Hash,
			TransactionIdentifierType::ToAddress,
			TransactionIdentifierType::FromAddress,
			TransactionIdentifierType::Topic,
		]),
	) {
		let spec = TransactionMonitoringSpec::new(type_, value, "mainnet", statuses);
		let mut again = spec.clone();
		again.normalize();
		prop_assert_eq!(spec, again);
	}

	// Specs differing in node or type never share an id
	#[test]
	fn test_distinct_specs_have_distinct_ids(value in "0x[0-9a-f]{64}") {
		let hash = TransactionMonitoringSpec::new(
			TransactionIdentifierType::Hash, value.clone(), "mainnet", vec![],
		);
		let topic = TransactionMonitoringSpec::new(
			TransactionIdentifierType::Topic, value.clone(), "mainnet", vec![],
		);
		let other_node = TransactionMonitoringSpec::new(
			TransactionIdentifierType::Hash, value, "testnet", vec![],
		);
		prop_assert_ne!(&hash.id, &topic.id);
		prop_assert_ne!(&hash.id, &other_node.id);
	}
}
