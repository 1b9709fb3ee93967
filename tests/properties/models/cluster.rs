use crate::properties::strategies::entity_id_strategy;

use chain_event_relay::models::{ClusterControlMessage, ClusterEnvelope};
use proptest::{prelude::*, test_runner::Config};

proptest! {
	#![proptest_config(Config {
		failure_persistence: None,
		..Config::default()
	})]

	#[test]
	fn test_partition_is_within_bounds(
		entity_id in entity_id_strategy(),
		partitions in 0u32..64,
	) {
		let partition = ClusterEnvelope::partition_for(&entity_id, partitions);
		if partitions <= 1 {
			prop_assert_eq!(partition, 0);
		} else {
			prop_assert!(partition < partitions);
		}
	}

	// Every message about one entity lands on the same partition
	#[test]
	fn test_messages_about_one_entity_share_a_partition(
		entity_id in entity_id_strategy(),
		partitions in 1u32..32,
	) {
		let removed = ClusterEnvelope::new(
			"relay-a",
			ClusterControlMessage::FilterRemoved { filter_id: entity_id.clone() },
			partitions,
		);
		let again = ClusterEnvelope::new(
			"relay-b",
			ClusterControlMessage::MonitorRemoved { spec_id: entity_id.clone() },
			partitions,
		);
		prop_assert_eq!(removed.partition, again.partition);
		prop_assert_ne!(removed.id, again.id);
	}

	#[test]
	fn test_envelope_survives_json(entity_id in entity_id_strategy()) {
		let envelope = ClusterEnvelope::new(
			"relay-a",
			ClusterControlMessage::FilterRemoved { filter_id: entity_id },
			3,
		);
		let json = serde_json::to_string(&envelope).unwrap();
		let parsed: ClusterEnvelope = serde_json::from_str(&json).unwrap();
		prop_assert_eq!(parsed, envelope);
	}
}
