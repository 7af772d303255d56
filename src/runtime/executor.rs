use crate::runtime::emulator::Emulator;
use crate::runtime::interface::FunctionDescriptor;
use crate::runtime::invoker::{Interceptor, Route};
use crate::runtime::loader::ContractHandle;
use crate::runtime::parser::{select_overload, Args, Invocation};
use crate::runtime::result::ReturnValue;
use crate::trace::TraceSink;
use crate::{DispatchError, Result};
use ethers_core::types::{Address, Bytes, U256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Optional behaviour of a wrapped contract.
#[derive(Clone, Default)]
pub struct WrapOptions {
    /// Receives one authoritative record per traced call.
    pub trace_sink: Option<Arc<dyn TraceSink>>,
    /// Upper bound on a single emulator round-trip.
    pub timeout: Option<Duration>,
}

impl WrapOptions {
    pub fn with_trace_sink(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A contract whose every function is routed through the emulator.
#[derive(Debug, Clone)]
pub struct EmulatedContract {
    name: Arc<str>,
    address: Address,
    bytecode: Bytes,
    functions: BTreeMap<String, Vec<Interceptor>>,
}

/// Route every function of `handle` through `emulator` at `address`.
pub fn wrap(handle: ContractHandle, emulator: Arc<dyn Emulator>, address: Address) -> EmulatedContract {
    wrap_with(handle, emulator, address, WrapOptions::default())
}

/// [`wrap`] with tracing and timeout options.
pub fn wrap_with(
    handle: ContractHandle,
    emulator: Arc<dyn Emulator>,
    address: Address,
    options: WrapOptions,
) -> EmulatedContract {
    let name = handle.shared_name();
    let route = Arc::new(Route {
        emulator,
        address,
        trace_sink: options.trace_sink,
        timeout: options.timeout,
    });

    let mut functions: BTreeMap<String, Vec<Interceptor>> = BTreeMap::new();
    for descriptor in handle.interface().functions() {
        functions
            .entry(descriptor.name().to_string())
            .or_default()
            .push(Interceptor::new(
                Arc::clone(&name),
                descriptor.clone(),
                Arc::clone(&route),
            ));
    }

    info!(
        contract = %name,
        address = ?address,
        functions = functions.len(),
        "Wrapped contract for emulation"
    );

    EmulatedContract {
        name,
        address,
        bytecode: handle.bytecode().clone(),
        functions,
    }
}

impl EmulatedContract {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address of the emulated deployment.
    pub fn address(&self) -> Address {
        self.address
    }

    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// Descriptors of every wrapped function, ordered by name.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values().flatten().map(Interceptor::descriptor)
    }

    /// Invoke `function` with arguments and execution metadata.
    pub async fn invoke(&self, function: &str, invocation: Invocation) -> Result<ReturnValue> {
        let interceptors =
            self.functions
                .get(function)
                .ok_or_else(|| DispatchError::UnknownFunction {
                    contract: self.name.to_string(),
                    function: function.to_string(),
                })?;

        let encoding_error = |reason: String| DispatchError::Encoding {
            contract: self.name.to_string(),
            function: function.to_string(),
            reason,
        };

        let (args, control) = invocation.lift_control().map_err(encoding_error)?;

        let interceptor = select_overload(interceptors, &args, Interceptor::descriptor)
            .map_err(encoding_error)?;

        interceptor.invoke(&args, control).await
    }

    /// Call a view function. Mutating functions fail with `MissingCaller`.
    pub async fn call(&self, function: &str, args: Args) -> Result<ReturnValue> {
        self.invoke(function, Invocation::new(args)).await
    }

    /// Send a transaction from `caller`.
    pub async fn send(&self, function: &str, args: Args, caller: Address) -> Result<ReturnValue> {
        self.invoke(function, Invocation::new(args).caller(caller)).await
    }

    /// Send a transaction from `caller` carrying `value` native tokens.
    pub async fn send_with_value(
        &self,
        function: &str,
        args: Args,
        caller: Address,
        value: U256,
    ) -> Result<ReturnValue> {
        self.invoke(function, Invocation::new(args).caller(caller).value(value))
            .await
    }
}
