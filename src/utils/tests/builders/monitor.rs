use crate::models::{TransactionIdentifierType, TransactionMonitoringSpec, TransactionStatus};

/// A builder for creating test transaction monitoring specs.
///
/// The built spec is normalized, so its id is the deterministic one.
#[derive(Debug)]
pub struct MonitorBuilder {
	type_: TransactionIdentifierType,
	value: String,
	node_name: String,
	statuses: Vec<TransactionStatus>,
}

impl Default for MonitorBuilder {
	fn default() -> Self {
		Self {
			type_: TransactionIdentifierType::ToAddress,
			value: "0x0202020202020202020202020202020202020202".to_string(),
			node_name: "mainnet".to_string(),
			statuses: vec![],
		}
	}
}

impl MonitorBuilder {
	/// Creates a new MonitorBuilder instance.
	pub fn new() -> Self {
		Self::default()
	}

	pub fn type_(mut self, type_: TransactionIdentifierType) -> Self {
		self.type_ = type_;
		self
	}

	pub fn value(mut self, value: &str) -> Self {
		self.value = value.to_string();
		self
	}

	pub fn node(mut self, node_name: &str) -> Self {
		self.node_name = node_name.to_string();
		self
	}

	pub fn status(mut self, status: TransactionStatus) -> Self {
		self.statuses.push(status);
		self
	}

	pub fn build(self) -> TransactionMonitoringSpec {
		TransactionMonitoringSpec::new(self.type_, self.value, self.node_name, self.statuses)
	}
}
