//! The interception routine installed for every contract function.
//!
//! This module contains the hot path of an emulated call. It wires together:
//! - Argument binding and ABI encoding via [`super::parser`].
//! - The mutability branch: `simulate` for views, `execute` for mutations.
//! - An optional timeout around the emulator round-trip.
//! - Trace replacement on the shared [`TraceSink`].
//! - Result decoding via [`super::result`].

use crate::runtime::emulator::{Emulator, EmulatorError, EmulatorOutcome, ExecutionStatus};
use crate::runtime::interface::{FunctionDescriptor, Mutability};
use crate::runtime::parser::{bind_arguments, Args, Control};
use crate::runtime::result::{decode_return, revert_reason, DisplayToken, ReturnValue};
use crate::trace::{TraceRecord, TraceSink};
use crate::{Checksummed, DispatchError, FailureCause, Result};
use ethers_core::abi::Token;
use ethers_core::types::{Address, Bytes, U256};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Where calls of one wrapped contract are sent.
pub(crate) struct Route {
    pub emulator: Arc<dyn Emulator>,
    pub address: Address,
    pub trace_sink: Option<Arc<dyn TraceSink>>,
    pub timeout: Option<Duration>,
}

/// Which emulator entrypoint a call takes. Chosen once per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Request {
    Simulate,
    Execute { caller: Address, value: U256 },
}

/// One function of an emulated contract, bound to its route.
#[derive(Clone)]
pub struct Interceptor {
    contract: Arc<str>,
    descriptor: FunctionDescriptor,
    route: Arc<Route>,
}

impl fmt::Debug for Interceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interceptor")
            .field("contract", &self.contract)
            .field("function", &self.descriptor.signature())
            .field("mutability", &self.descriptor.mutability())
            .field("address", &self.route.address)
            .finish()
    }
}

impl Interceptor {
    pub(crate) fn new(contract: Arc<str>, descriptor: FunctionDescriptor, route: Arc<Route>) -> Self {
        Self {
            contract,
            descriptor,
            route,
        }
    }

    pub fn descriptor(&self) -> &FunctionDescriptor {
        &self.descriptor
    }

    /// Encode, route, decode and trace one call.
    ///
    /// `args` must already have its control keywords lifted into `control`.
    #[tracing::instrument(skip_all, fields(contract = %self.contract, function = self.descriptor.name()))]
    pub async fn invoke(&self, args: &Args, control: Control) -> Result<ReturnValue> {
        let tokens =
            bind_arguments(&self.descriptor, args).map_err(|reason| self.encoding_error(reason))?;
        let calldata: Bytes = self
            .descriptor
            .abi()
            .encode_input(&tokens)
            .map_err(|e| self.encoding_error(e.to_string()))?
            .into();

        let request = self.request_for(control)?;
        info!(
            "Dispatching {} through {}",
            self.descriptor.signature(),
            match request {
                Request::Simulate => "simulate",
                Request::Execute { .. } => "execute",
            }
        );

        let outcome = self.round_trip(request, calldata).await?;

        if outcome.traced {
            self.record_trace(&tokens, args, request, &outcome);
        }

        match &outcome.status {
            ExecutionStatus::Succeeded => {}
            ExecutionStatus::Reverted => {
                let reason = revert_reason(&outcome.return_data);
                warn!(reason = reason.as_deref().unwrap_or("<none>"), "Emulated call reverted");
                return Err(self.failure(FailureCause::Reverted {
                    data: outcome.return_data.clone(),
                    reason,
                }));
            }
            ExecutionStatus::Halted { reason } => {
                warn!(%reason, "Emulated call halted");
                return Err(self.failure(FailureCause::Halted(reason.clone())));
            }
        }

        let value = decode_return(&self.descriptor, &outcome.return_data).map_err(|reason| {
            DispatchError::Decoding {
                contract: self.contract.to_string(),
                function: self.descriptor.name().to_string(),
                reason,
            }
        })?;
        debug!(%value, "Decoded emulator result");
        Ok(value)
    }

    fn request_for(&self, control: Control) -> Result<Request> {
        let value = control.value.unwrap_or_default();
        match self.descriptor.mutability() {
            Mutability::View => {
                if let Some(caller) = control.caller {
                    debug!(caller = %Checksummed(&caller), "Ignoring caller for view function");
                }
                if !value.is_zero() {
                    return Err(DispatchError::ValueOnView {
                        contract: self.contract.to_string(),
                        function: self.descriptor.name().to_string(),
                    });
                }
                Ok(Request::Simulate)
            }
            Mutability::Mutating => {
                let caller = control.caller.ok_or_else(|| DispatchError::MissingCaller {
                    contract: self.contract.to_string(),
                    function: self.descriptor.name().to_string(),
                })?;
                if !value.is_zero() && !self.descriptor.is_payable() {
                    debug!(%value, "Attaching value to a non-payable function");
                }
                Ok(Request::Execute { caller, value })
            }
        }
    }

    async fn round_trip(&self, request: Request, calldata: Bytes) -> Result<EmulatorOutcome> {
        let route = &self.route;
        let call = async {
            match request {
                Request::Simulate => {
                    route
                        .emulator
                        .simulate(route.address, U256::zero(), calldata)
                        .await
                }
                Request::Execute { caller, value } => {
                    route
                        .emulator
                        .execute(route.address, value, calldata, caller)
                        .await
                }
            }
        };

        let result = match route.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(EmulatorError::Timeout(limit))),
            None => call.await,
        };

        result.map_err(|e| {
            warn!(error = %e, "Emulator transport failed");
            self.failure(FailureCause::Transport(e))
        })
    }

    fn record_trace(&self, tokens: &[Token], args: &Args, request: Request, outcome: &EmulatorOutcome) {
        let Some(sink) = &self.route.trace_sink else {
            return;
        };

        let positional = args.positional().len();
        let kwargs: BTreeMap<String, String> = self
            .descriptor
            .inputs()
            .iter()
            .zip(tokens)
            .skip(positional)
            .map(|(param, token)| (param.name.clone(), DisplayToken(token).to_string()))
            .collect();
        let (caller, value) = match request {
            Request::Simulate => (None, None),
            Request::Execute { caller, value } => {
                (Some(caller), (!value.is_zero()).then_some(value))
            }
        };

        let record = TraceRecord {
            contract: self.contract.to_string(),
            function: self.descriptor.name().to_string(),
            args: tokens[..positional]
                .iter()
                .map(|t| DisplayToken(t).to_string())
                .collect(),
            kwargs,
            caller,
            value,
            status: outcome.status.clone(),
            return_data: outcome.return_data.clone(),
            receipt: outcome.receipt.clone(),
            speculative: false,
        };

        if let Err(e) = sink.commit(record) {
            warn!(error = %e, "Failed to record trace; call outcome is unaffected");
        }
    }

    fn encoding_error(&self, reason: String) -> DispatchError {
        DispatchError::Encoding {
            contract: self.contract.to_string(),
            function: self.descriptor.name().to_string(),
            reason,
        }
    }

    fn failure(&self, cause: FailureCause) -> DispatchError {
        DispatchError::EmulatorFailure {
            contract: self.contract.to_string(),
            function: self.descriptor.name().to_string(),
            cause,
        }
    }
}
