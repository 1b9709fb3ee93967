use alloy::primitives::Address;
use std::collections::HashMap;

use crate::models::{ContractEventFilter, CorrelationIdStrategy};

/// A builder for creating test contract event filters.
#[derive(Debug)]
pub struct FilterBuilder {
	filter: ContractEventFilter,
}

impl Default for FilterBuilder {
	/// Default filter watching `Transfer` events of a fixed contract on `mainnet`
	fn default() -> Self {
		Self {
			filter: ContractEventFilter {
				id: "transfer-filter".to_string(),
				node_name: "mainnet".to_string(),
				contract_address: Some(Address::repeat_byte(0xcc)),
				event_signature: "Transfer(address,address,uint256)".to_string(),
				correlation_id_strategy: None,
				start_block: None,
				extension: HashMap::new(),
			},
		}
	}
}

impl FilterBuilder {
	/// Creates a new FilterBuilder instance.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn id(mut self, id: &str) -> Self {
		self.filter.id = id.to_string();
		self
	}

	pub fn node(mut self, node_name: &str) -> Self {
		self.filter.node_name = node_name.to_string();
		self
	}

	pub fn contract_address(mut self, address: Address) -> Self {
		self.filter.contract_address = Some(address);
		self
	}

	/// Watches the event on every contract.
	pub fn any_contract(mut self) -> Self {
		self.filter.contract_address = None;
		self
	}

	pub fn event_signature(mut self, signature: &str) -> Self {
		self.filter.event_signature = signature.to_string();
		self
	}

	pub fn correlation_id_strategy(mut self, strategy: CorrelationIdStrategy) -> Self {
		self.filter.correlation_id_strategy = Some(strategy);
		self
	}

	pub fn start_block(mut self, start_block: u64) -> Self {
		self.filter.start_block = Some(start_block);
		self
	}

	pub fn build(self) -> ContractEventFilter {
		self.filter
	}
}
