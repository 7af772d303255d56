//! The emulator boundary.
//!
//! The emulator is a contract on the host chain that runs EVM bytecode on
//! behalf of the caller. This crate only talks to its two entrypoints and
//! treats everything behind them as opaque.

use async_trait::async_trait;
use ethers_core::types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the transport before the emulator produced an outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EmulatorError {
    #[error("emulator did not answer within {0:?}")]
    Timeout(Duration),

    #[error("no contract deployed at {0:?}")]
    NoContract(Address),

    #[error("emulator transport failed: {0}")]
    Transport(String),
}

/// Final state of an emulated call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Succeeded,
    Reverted,
    Halted { reason: String },
}

impl ExecutionStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, ExecutionStatus::Succeeded)
    }
}

/// A log emitted by the emulated contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub topics: Vec<H256>,
    pub data: Bytes,
}

/// Receipt of a state-mutating execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub gas_used: u64,
    pub logs: Vec<LogEntry>,
}

/// What the emulator returned for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorOutcome {
    pub return_data: Bytes,
    pub status: ExecutionStatus,
    /// Only present for [`Emulator::execute`].
    pub receipt: Option<Receipt>,
    /// Set by the transport when this call is being traced.
    pub traced: bool,
}

impl EmulatorOutcome {
    pub fn success(return_data: impl Into<Bytes>) -> Self {
        Self {
            return_data: return_data.into(),
            status: ExecutionStatus::Succeeded,
            receipt: None,
            traced: false,
        }
    }

    pub fn reverted(revert_data: impl Into<Bytes>) -> Self {
        Self {
            return_data: revert_data.into(),
            status: ExecutionStatus::Reverted,
            receipt: None,
            traced: false,
        }
    }

    pub fn halted(reason: impl Into<String>) -> Self {
        Self {
            return_data: Bytes::default(),
            status: ExecutionStatus::Halted {
                reason: reason.into(),
            },
            receipt: None,
            traced: false,
        }
    }

    pub fn with_receipt(mut self, receipt: Receipt) -> Self {
        self.receipt = Some(receipt);
        self
    }

    pub fn traced(mut self, traced: bool) -> Self {
        self.traced = traced;
        self
    }
}

/// The two entrypoints of the emulator contract.
#[async_trait]
pub trait Emulator: Send + Sync {
    /// Run `calldata` against the contract at `address` without committing state.
    async fn simulate(
        &self,
        address: Address,
        value: U256,
        calldata: Bytes,
    ) -> Result<EmulatorOutcome, EmulatorError>;

    /// Run `calldata` as a transaction from `caller`, committing state on success.
    async fn execute(
        &self,
        address: Address,
        value: U256,
        calldata: Bytes,
        caller: Address,
    ) -> Result<EmulatorOutcome, EmulatorError>;
}
