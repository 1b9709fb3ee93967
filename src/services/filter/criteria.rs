//! Transaction matching criteria.
//!
//! A criteria is compiled once from a [`TransactionMonitoringSpec`] when the spec is
//! registered. Values are parsed into fixed-size types, so comparisons ignore the case of
//! the hex text they were configured with.

use alloy::primitives::{Address, B256};
use std::str::FromStr;

use crate::{
	models::{Transaction, TransactionIdentifierType, TransactionMonitoringSpec, TransactionStatus},
	services::filter::FilterError,
};

/// What a criteria compares a transaction against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriteriaKind {
	TxHash(B256),
	ToAddress(Address),
	FromAddress(Address),
	/// Matches when any receipt log of the transaction carries the topic
	Topic(B256),
}

/// Runtime predicate built from one monitoring spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMatchingCriteria {
	pub spec_id: String,
	pub node_name: String,
	pub statuses: Vec<TransactionStatus>,
	pub kind: CriteriaKind,
}

impl TransactionMatchingCriteria {
	/// Compiles a spec into its criteria.
	///
	/// # Arguments
	/// * `spec` - A normalized monitoring spec
	///
	/// # Returns
	/// * `Result<Self, FilterError>` - The criteria, or an error when the spec type is not
	///   supported or its value does not parse
	pub fn compile(spec: &TransactionMonitoringSpec) -> Result<Self, FilterError> {
		let value = spec.transaction_identifier_value.as_str();
		let kind = match spec.type_ {
			TransactionIdentifierType::Hash => CriteriaKind::TxHash(parse_b256(value)?),
			TransactionIdentifierType::ToAddress => CriteriaKind::ToAddress(parse_address(value)?),
			TransactionIdentifierType::FromAddress => {
				CriteriaKind::FromAddress(parse_address(value)?)
			}
			TransactionIdentifierType::Topic => CriteriaKind::Topic(parse_b256(value)?),
			TransactionIdentifierType::Unsupported => {
				return Err(FilterError::unsupported_criteria(format!(
					"spec '{}' has a type the relay cannot match",
					spec.id
				)))
			}
		};

		Ok(Self {
			spec_id: spec.id.clone(),
			node_name: spec.node_name.clone(),
			statuses: spec.statuses.clone(),
			kind,
		})
	}

	/// Whether the spec is removed after its first match
	pub fn is_one_time_match(&self) -> bool {
		!matches!(self.kind, CriteriaKind::Topic(_))
	}

	/// Whether the criteria fires for a transaction in its current status
	pub fn matches(&self, transaction: &Transaction) -> bool {
		if !self.statuses.is_empty() && !self.statuses.contains(&transaction.status) {
			return false;
		}

		match &self.kind {
			CriteriaKind::TxHash(hash) => transaction.hash == *hash,
			CriteriaKind::ToAddress(address) => transaction.to == Some(*address),
			CriteriaKind::FromAddress(address) => transaction.from == *address,
			CriteriaKind::Topic(topic) => transaction
				.logs
				.iter()
				.any(|log| log.topics.contains(topic)),
		}
	}
}

fn parse_address(value: &str) -> Result<Address, FilterError> {
	Address::from_str(value.trim())
		.map_err(|e| FilterError::invalid_criteria(format!("'{}' is not an address: {}", value, e)))
}

fn parse_b256(value: &str) -> Result<B256, FilterError> {
	B256::from_str(value.trim()).map_err(|e| {
		FilterError::invalid_criteria(format!("'{}' is not a 32-byte hex value: {}", value, e))
	})
}
