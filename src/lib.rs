//! Route ABI-described contract calls through an EVM emulator.
//!
//! A [`ContractHandle`] is loaded from compiled artifacts, then wrapped with
//! [`wrap`] into an [`EmulatedContract`] whose functions re-encode every call,
//! send it to the emulator's `simulate`/`execute` entrypoints, and decode the
//! emulator's answer back into ABI values.

pub mod cli;
pub mod config;
pub mod runtime;
pub mod trace;

use ethers_core::types::{Address, Bytes};
use runtime::emulator::EmulatorError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub use config::Config;
pub use runtime::{
    load_contract, wrap, wrap_with, Args, ArtifactStore, ContractHandle, ContractInterface,
    EmulatedContract, Emulator, EmulatorOutcome, ExecutionStatus, FunctionDescriptor,
    Invocation, Mutability, Receipt, ReturnValue, WrapOptions,
};
pub use trace::{TraceLog, TraceRecord, TraceSink};

/// Errors surfaced by loading and dispatching emulated contract calls.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("artifact for contract '{contract}' not found at {}", path.display())]
    ArtifactNotFound { contract: String, path: PathBuf },

    #[error("malformed interface for contract '{contract}': {reason}")]
    MalformedInterface { contract: String, reason: String },

    #[error("malformed bytecode for contract '{contract}': {reason}")]
    MalformedBytecode { contract: String, reason: String },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("function '{function}' not found on contract '{contract}'")]
    UnknownFunction { contract: String, function: String },

    #[error("{contract}.{function} mutates state and requires a caller")]
    MissingCaller { contract: String, function: String },

    #[error("{contract}.{function} is a view function and cannot carry value")]
    ValueOnView { contract: String, function: String },

    #[error("failed to encode arguments for {contract}.{function}: {reason}")]
    Encoding {
        contract: String,
        function: String,
        reason: String,
    },

    #[error("{contract}.{function} failed in the emulator: {cause}")]
    EmulatorFailure {
        contract: String,
        function: String,
        cause: FailureCause,
    },

    #[error("failed to decode result of {contract}.{function}: {reason}")]
    Decoding {
        contract: String,
        function: String,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why the emulator did not produce a usable result.
#[derive(Debug, Error)]
pub enum FailureCause {
    #[error("{}", describe_revert(.data, .reason.as_deref()))]
    Reverted {
        data: Bytes,
        reason: Option<String>,
    },

    #[error("halted: {0}")]
    Halted(String),

    #[error(transparent)]
    Transport(#[from] EmulatorError),
}

fn describe_revert(data: &Bytes, reason: Option<&str>) -> String {
    match reason {
        Some(reason) => format!("reverted: {reason}"),
        None if data.is_empty() => "reverted without data".to_string(),
        None => format!("reverted with data 0x{}", hex::encode(data)),
    }
}

impl DispatchError {
    /// Function name the error refers to, when it is tied to a call.
    pub fn function(&self) -> Option<&str> {
        match self {
            DispatchError::UnknownFunction { function, .. }
            | DispatchError::MissingCaller { function, .. }
            | DispatchError::ValueOnView { function, .. }
            | DispatchError::Encoding { function, .. }
            | DispatchError::EmulatorFailure { function, .. }
            | DispatchError::Decoding { function, .. } => Some(function),
            _ => None,
        }
    }

    /// Revert reason reported by the emulator, if the call reverted with one.
    pub fn revert_reason(&self) -> Option<&str> {
        match self {
            DispatchError::EmulatorFailure {
                cause: FailureCause::Reverted { reason, .. },
                ..
            } => reason.as_deref(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Address rendered the way test output shows it.
pub(crate) struct Checksummed<'a>(pub &'a Address);

impl fmt::Display for Checksummed<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&ethers_core::utils::to_checksum(self.0, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn revert_without_reason_shows_data() {
        let cause = FailureCause::Reverted {
            data: Bytes::from(vec![0xde, 0xad]),
            reason: None,
        };
        assert_eq!(cause.to_string(), "reverted with data 0xdead");
    }

    #[test]
    fn empty_revert_is_named_as_such() {
        let cause = FailureCause::Reverted {
            data: Bytes::default(),
            reason: None,
        };
        assert_eq!(cause.to_string(), "reverted without data");
    }

    #[test]
    fn error_exposes_context() {
        let err = DispatchError::EmulatorFailure {
            contract: "Counter".into(),
            function: "fail".into(),
            cause: FailureCause::Reverted {
                data: Bytes::default(),
                reason: Some("nope".into()),
            },
        };
        assert_eq!(err.function(), Some("fail"));
        assert_eq!(err.revert_reason(), Some("nope"));
        assert_eq!(
            err.to_string(),
            "Counter.fail failed in the emulator: reverted: nope"
        );
    }
}
