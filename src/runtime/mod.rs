//! Runtime dispatch sub-system.
//!
//! Sub-modules:
//! - [`interface`]: Function descriptors and mutability classification.
//! - [`loader`]: Artifact loading into unwrapped [`ContractHandle`]s.
//! - [`emulator`]: The emulator boundary (`simulate` / `execute`).
//! - [`parser`]: Argument binding, overload selection and JSON parsing.
//! - [`invoker`]: The per-function interception routine.
//! - [`result`]: Return value decoding, normalisation and formatting.
//! - [`executor`]: Public façade; builds the wrapped contract.

pub mod emulator;
pub mod executor;
pub mod interface;
pub mod invoker;
pub mod loader;
pub mod parser;
pub mod result;

pub use emulator::{Emulator, EmulatorError, EmulatorOutcome, ExecutionStatus, LogEntry, Receipt};
pub use executor::{wrap, wrap_with, EmulatedContract, WrapOptions};
pub use interface::{ContractInterface, FunctionDescriptor, Mutability};
pub use invoker::Interceptor;
pub use loader::{load_contract, ArtifactStore, ContractHandle};
pub use parser::{Args, Invocation};
pub use result::ReturnValue;
