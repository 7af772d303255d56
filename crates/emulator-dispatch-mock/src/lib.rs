//! In-memory emulator for exercising `emulator-dispatch` bindings.
//!
//! Contracts are Rust closures over a word-addressed [`Storage`]. `simulate`
//! runs against a scratch copy of storage; `execute` commits it unless the
//! handler reverts. When tracing is enabled the emulator pushes a
//! speculative record for each call, as a real tracing transport would.

use async_trait::async_trait;
use emulator_dispatch::runtime::emulator::{
    Emulator, EmulatorError, EmulatorOutcome, LogEntry, Receipt,
};
use emulator_dispatch::trace::{TraceRecord, TraceSink};
use ethers_core::abi::{decode, encode, ParamType, Token};
use ethers_core::types::{Address, Bytes, H256, U256};
use ethers_core::utils::{id, keccak256};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const BASE_GAS: u64 = 21_000;
const CALLDATA_BYTE_GAS: u64 = 16;

/// Word-addressed contract storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Storage(HashMap<U256, U256>);

impl Storage {
    pub fn get(&self, slot: u64) -> U256 {
        self.0.get(&U256::from(slot)).copied().unwrap_or_default()
    }

    pub fn set(&mut self, slot: u64, value: U256) {
        self.0.insert(U256::from(slot), value);
    }

    pub fn get_address(&self, slot: u64) -> Address {
        let mut word = [0u8; 32];
        self.get(slot).to_big_endian(&mut word);
        Address::from_slice(&word[12..])
    }

    pub fn set_address(&mut self, slot: u64, address: Address) {
        self.set(slot, U256::from_big_endian(address.as_bytes()));
    }
}

/// Execution context handed to a contract handler.
pub struct Frame<'a> {
    pub caller: Option<Address>,
    pub value: U256,
    pub calldata: &'a [u8],
    pub storage: &'a mut Storage,
    logs: Vec<LogEntry>,
}

impl Frame<'_> {
    pub fn selector(&self) -> Option<[u8; 4]> {
        self.calldata.get(..4).and_then(|s| s.try_into().ok())
    }

    /// Calldata after the selector.
    pub fn args(&self) -> &[u8] {
        self.calldata.get(4..).unwrap_or_default()
    }

    pub fn emit(&mut self, event_signature: &str, data: Vec<u8>) {
        self.logs.push(LogEntry {
            topics: vec![H256::from(keccak256(event_signature))],
            data: data.into(),
        });
    }
}

/// A contract: returns output bytes or revert data.
pub type Handler = Arc<dyn Fn(&mut Frame<'_>) -> Result<Vec<u8>, Vec<u8>> + Send + Sync>;

struct Deployment {
    handler: Handler,
    storage: Storage,
}

/// An [`Emulator`] that runs Rust handlers in memory.
#[derive(Default)]
pub struct MockEmulator {
    deployments: Mutex<HashMap<Address, Deployment>>,
    trace_sink: Option<Arc<dyn TraceSink>>,
    delay: Option<Duration>,
    halt: Option<String>,
    calls: AtomicUsize,
}

impl MockEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every call as traced and push a speculative record into `sink`.
    pub fn with_tracing(mut self, sink: Arc<dyn TraceSink>) -> Self {
        self.trace_sink = Some(sink);
        self
    }

    /// Sleep before answering each call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Halt every call with `reason` before the contract runs.
    pub fn with_halt(mut self, reason: impl Into<String>) -> Self {
        self.halt = Some(reason.into());
        self
    }

    pub fn deploy(&self, address: Address, handler: Handler) {
        self.deployments.lock().insert(
            address,
            Deployment {
                handler,
                storage: Storage::default(),
            },
        );
    }

    /// Number of `simulate`/`execute` requests received.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn storage(&self, address: Address) -> Option<Storage> {
        self.deployments
            .lock()
            .get(&address)
            .map(|d| d.storage.clone())
    }

    async fn run(
        &self,
        address: Address,
        caller: Option<Address>,
        value: U256,
        calldata: Bytes,
    ) -> Result<EmulatorOutcome, EmulatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let commit = caller.is_some();
        if let Some(reason) = &self.halt {
            if !self.deployments.lock().contains_key(&address) {
                return Err(EmulatorError::NoContract(address));
            }
            debug!(?address, %reason, "Mock emulator halted");
            let outcome = EmulatorOutcome::halted(reason.clone());
            return Ok(self.finish(address, &calldata, outcome));
        }

        let (result, logs) = {
            let mut deployments = self.deployments.lock();
            let deployment = deployments
                .get_mut(&address)
                .ok_or(EmulatorError::NoContract(address))?;

            let mut scratch = deployment.storage.clone();
            let mut frame = Frame {
                caller,
                value,
                calldata: &calldata,
                storage: &mut scratch,
                logs: Vec::new(),
            };
            let result = (deployment.handler)(&mut frame);
            let logs = std::mem::take(&mut frame.logs);
            if commit && result.is_ok() {
                deployment.storage = scratch;
            }
            (result, logs)
        };

        let mut outcome = match result {
            Ok(output) => EmulatorOutcome::success(output),
            Err(revert) => EmulatorOutcome::reverted(revert),
        };
        if commit {
            outcome = outcome.with_receipt(Receipt {
                gas_used: BASE_GAS + CALLDATA_BYTE_GAS * calldata.len() as u64,
                logs,
            });
        }
        debug!(?address, status = ?outcome.status, "Mock emulator answered");
        Ok(self.finish(address, &calldata, outcome))
    }

    /// Mark `outcome` traced and push its speculative record, when tracing.
    fn finish(
        &self,
        address: Address,
        calldata: &[u8],
        outcome: EmulatorOutcome,
    ) -> EmulatorOutcome {
        match &self.trace_sink {
            Some(sink) => {
                let outcome = outcome.traced(true);
                let _ = sink.record(TraceRecord::speculative(address, calldata, &outcome));
                outcome
            }
            None => outcome,
        }
    }
}

#[async_trait]
impl Emulator for MockEmulator {
    async fn simulate(
        &self,
        address: Address,
        value: U256,
        calldata: Bytes,
    ) -> Result<EmulatorOutcome, EmulatorError> {
        self.run(address, None, value, calldata).await
    }

    async fn execute(
        &self,
        address: Address,
        value: U256,
        calldata: Bytes,
        caller: Address,
    ) -> Result<EmulatorOutcome, EmulatorError> {
        self.run(address, Some(caller), value, calldata).await
    }
}

/// Revert payload of Solidity's `require(false, message)`.
pub fn revert_with(message: &str) -> Vec<u8> {
    let mut data = id("Error(string)").to_vec();
    data.extend(encode(&[Token::String(message.to_string())]));
    data
}

const COUNT_SLOT: u64 = 0;
const LAST_CALLER_SLOT: u64 = 1;
const BALANCE_SLOT: u64 = 2;

fn uint_arg(frame: &Frame<'_>, index: usize, arity: usize) -> Result<U256, Vec<u8>> {
    let types = vec![ParamType::Uint(256); arity];
    decode(&types, frame.args())
        .ok()
        .and_then(|tokens| tokens.into_iter().nth(index))
        .and_then(Token::into_uint)
        .ok_or_else(|| revert_with("Counter: bad calldata"))
}

/// Reference implementation of the `Counter` test contract.
///
/// Matches `tests/fixtures/artifacts/Counter.abi`.
pub fn counter() -> Handler {
    Arc::new(counter_call)
}

fn counter_call(frame: &mut Frame<'_>) -> Result<Vec<u8>, Vec<u8>> {
    let Some(selector) = frame.selector() else {
        return Err(Vec::new());
    };
    let caller = frame.caller.unwrap_or_default();

    if selector == id("increment_count()") {
        Ok(encode(&[Token::Uint(frame.storage.get(COUNT_SLOT))]))
    } else if selector == id("increment(uint256)") {
        let amount = uint_arg(frame, 0, 1)?;
        let count = frame
            .storage
            .get(COUNT_SLOT)
            .checked_add(amount)
            .ok_or_else(|| revert_with("Counter: overflow"))?;
        frame.storage.set(COUNT_SLOT, count);
        frame.storage.set_address(LAST_CALLER_SLOT, caller);
        frame.emit("Incremented(uint256)", encode(&[Token::Uint(amount)]));
        Ok(Vec::new())
    } else if selector == id("last_caller()") {
        Ok(encode(&[Token::Address(frame.storage.get_address(LAST_CALLER_SLOT))]))
    } else if selector == id("snapshot()") {
        Ok(encode(&[
            Token::Address(frame.storage.get_address(LAST_CALLER_SLOT)),
            Token::Uint(frame.storage.get(COUNT_SLOT)),
        ]))
    } else if selector == id("reset()") {
        frame.storage.set(COUNT_SLOT, U256::zero());
        Ok(Vec::new())
    } else if selector == id("deposit()") {
        let balance = frame.storage.get(BALANCE_SLOT) + frame.value;
        frame.storage.set(BALANCE_SLOT, balance);
        Ok(encode(&[Token::Uint(balance)]))
    } else if selector == id("balance()") {
        Ok(encode(&[Token::Uint(frame.storage.get(BALANCE_SLOT))]))
    } else if selector == id("add(uint256,uint256)") {
        let a = uint_arg(frame, 0, 2)?;
        let b = uint_arg(frame, 1, 2)?;
        Ok(encode(&[Token::Uint(a.overflowing_add(b).0)]))
    } else if selector == id("fail()") {
        Err(revert_with("Counter: always fails"))
    } else if selector == id("fail_silently()") {
        Err(Vec::new())
    } else if selector == id("broken_count()") {
        Ok(Vec::new())
    } else {
        Err(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calldata(signature: &str, args: &[Token]) -> Bytes {
        let mut data = id(signature).to_vec();
        data.extend(encode(args));
        data.into()
    }

    #[tokio::test]
    async fn simulate_does_not_commit() {
        let emulator = MockEmulator::new();
        let at = Address::repeat_byte(1);
        emulator.deploy(at, counter());

        let inc = calldata("increment(uint256)", &[Token::Uint(U256::from(3))]);
        emulator.simulate(at, U256::zero(), inc.clone()).await.unwrap();
        assert_eq!(emulator.storage(at).unwrap().get(COUNT_SLOT), U256::zero());

        let out = emulator
            .execute(at, U256::zero(), inc, Address::repeat_byte(0xa))
            .await
            .unwrap();
        assert!(out.status.is_success());
        assert_eq!(out.receipt.unwrap().logs.len(), 1);
        assert_eq!(emulator.storage(at).unwrap().get(COUNT_SLOT), U256::from(3));
        assert_eq!(emulator.calls(), 2);
    }

    #[tokio::test]
    async fn reverts_roll_back_and_carry_reason() {
        let emulator = MockEmulator::new();
        let at = Address::repeat_byte(1);
        emulator.deploy(at, counter());

        let out = emulator
            .execute(at, U256::zero(), calldata("fail()", &[]), Address::zero())
            .await
            .unwrap();
        assert!(!out.status.is_success());
        assert_eq!(out.return_data.to_vec(), revert_with("Counter: always fails"));
    }

    #[tokio::test]
    async fn unknown_address_is_a_transport_error() {
        let emulator = MockEmulator::new();
        let err = emulator
            .simulate(Address::zero(), U256::zero(), Bytes::default())
            .await
            .unwrap_err();
        assert_eq!(err, EmulatorError::NoContract(Address::zero()));
    }

    #[tokio::test]
    async fn halting_skips_the_contract() {
        let emulator = MockEmulator::new().with_halt("out of gas");
        let at = Address::repeat_byte(1);
        emulator.deploy(at, counter());

        let inc = calldata("increment(uint256)", &[Token::Uint(U256::from(3))]);
        let out = emulator
            .execute(at, U256::zero(), inc, Address::repeat_byte(0xa))
            .await
            .unwrap();
        assert_eq!(
            out.status,
            emulator_dispatch::ExecutionStatus::Halted {
                reason: "out of gas".into()
            }
        );
        assert_eq!(emulator.storage(at).unwrap().get(COUNT_SLOT), U256::zero());
    }

    #[test]
    fn storage_round_trips_addresses() {
        let mut storage = Storage::default();
        let who = Address::repeat_byte(0x42);
        storage.set_address(7, who);
        assert_eq!(storage.get_address(7), who);
    }
}
