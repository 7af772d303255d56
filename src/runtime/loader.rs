//! Compiled artifact loading.
//!
//! This module is responsible for:
//! - Locating the `<name>.abi` / `<name>.bin` pair under the artifacts directory.
//! - Parsing the ABI into a [`ContractInterface`].
//! - Producing a [`ContractHandle`] with native (non-emulated) bindings.
//!
//! It has no knowledge of the emulator, so handles can be inspected and
//! encoded against offline.

use crate::runtime::interface::{ContractInterface, FunctionDescriptor};
use crate::runtime::parser::{bind_arguments, select_overload, Args};
use crate::runtime::result::{decode_return, ReturnValue};
use crate::{DispatchError, Result};
use ethers_core::types::Bytes;
use itertools::Itertools;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// A contract interface bound to its bytecode, not yet routed anywhere.
#[derive(Debug, Clone)]
pub struct ContractHandle {
    name: Arc<str>,
    interface: Arc<ContractInterface>,
    bytecode: Bytes,
}

impl ContractHandle {
    pub fn new(name: impl Into<Arc<str>>, interface: ContractInterface, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            interface: Arc::new(interface),
            bytecode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    pub fn interface(&self) -> &ContractInterface {
        &self.interface
    }

    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    /// Resolve `function` for the given arguments, honouring overloads.
    pub fn function(&self, function: &str, args: &Args) -> Result<&FunctionDescriptor> {
        let overloads = self.interface.overloads(function).ok_or_else(|| {
            DispatchError::UnknownFunction {
                contract: self.name.to_string(),
                function: function.to_string(),
            }
        })?;
        select_overload(overloads, args, |d| d).map_err(|reason| DispatchError::Encoding {
            contract: self.name.to_string(),
            function: function.to_string(),
            reason,
        })
    }

    /// ABI-encode a call to `function`, the way a direct binding would.
    pub fn encode_call(&self, function: &str, args: &Args) -> Result<Bytes> {
        let descriptor = self.function(function, args)?;
        let tokens = bind_arguments(descriptor, args).map_err(|reason| DispatchError::Encoding {
            contract: self.name.to_string(),
            function: function.to_string(),
            reason,
        })?;
        descriptor
            .abi()
            .encode_input(&tokens)
            .map(Bytes::from)
            .map_err(|e| DispatchError::Encoding {
                contract: self.name.to_string(),
                function: function.to_string(),
                reason: e.to_string(),
            })
    }

    /// Decode raw return data of `function`.
    ///
    /// `function` is a name, or a signature such as `add(uint256,uint256)`.
    /// Overloaded names must be given as a signature.
    pub fn decode_output(&self, function: &str, data: &[u8]) -> Result<ReturnValue> {
        let descriptor = self.by_signature(function)?;
        decode_return(descriptor, data).map_err(|reason| DispatchError::Decoding {
            contract: self.name.to_string(),
            function: function.to_string(),
            reason,
        })
    }

    fn by_signature(&self, function: &str) -> Result<&FunctionDescriptor> {
        let unknown = || DispatchError::UnknownFunction {
            contract: self.name.to_string(),
            function: function.to_string(),
        };
        let wanted: String = function.chars().filter(|c| !c.is_whitespace()).collect();
        let name = wanted.split_once('(').map_or(wanted.as_str(), |(name, _)| name);
        let overloads = self.interface.overloads(name).ok_or_else(unknown)?;

        if wanted.contains('(') {
            return overloads
                .iter()
                .find(|d| d.signature() == wanted)
                .ok_or_else(unknown);
        }
        match overloads {
            [only] => Ok(only),
            _ => Err(DispatchError::Decoding {
                contract: self.name.to_string(),
                function: function.to_string(),
                reason: format!(
                    "'{}' is overloaded; name one of {}",
                    function,
                    overloads.iter().map(FunctionDescriptor::signature).join(", ")
                ),
            }),
        }
    }
}

/// Directory of compiled `<name>.abi` / `<name>.bin` pairs.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    abi_extension: String,
    bytecode_extension: String,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            abi_extension: "abi".to_string(),
            bytecode_extension: "bin".to_string(),
        }
    }

    pub fn with_extensions(mut self, abi: impl Into<String>, bytecode: impl Into<String>) -> Self {
        self.abi_extension = abi.into();
        self.bytecode_extension = bytecode.into();
        self
    }

    pub fn abi_path(&self, contract: &str) -> PathBuf {
        self.root.join(format!("{}.{}", contract, self.abi_extension))
    }

    pub fn bytecode_path(&self, contract: &str) -> PathBuf {
        self.root
            .join(format!("{}.{}", contract, self.bytecode_extension))
    }

    /// Load the interface and bytecode of `contract`.
    #[tracing::instrument(skip(self), fields(root = %self.root.display()))]
    pub fn load(&self, contract: &str) -> Result<ContractHandle> {
        info!("Loading contract artifacts");

        let abi_path = self.abi_path(contract);
        let bytecode_path = self.bytecode_path(contract);
        debug!(abi = %abi_path.display(), bin = %bytecode_path.display(), "Resolved artifact paths");

        let abi_json = read_artifact(contract, &abi_path)?;
        let bytecode_hex = read_artifact(contract, &bytecode_path)?;

        let interface =
            ContractInterface::parse(&abi_json).map_err(|e| DispatchError::MalformedInterface {
                contract: contract.to_string(),
                reason: e.to_string(),
            })?;

        let trimmed = bytecode_hex.trim();
        let bytecode = hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed)).map_err(|e| {
            DispatchError::MalformedBytecode {
                contract: contract.to_string(),
                reason: e.to_string(),
            }
        })?;

        info!(
            functions = interface.len(),
            bytecode_len = bytecode.len(),
            "Contract artifacts loaded"
        );

        Ok(ContractHandle::new(contract, interface, bytecode.into()))
    }
}

/// Load `contract` from `dir` using the default `.abi` / `.bin` extensions.
pub fn load_contract(dir: impl AsRef<Path>, contract: &str) -> Result<ContractHandle> {
    ArtifactStore::new(dir.as_ref()).load(contract)
}

fn read_artifact(contract: &str, path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DispatchError::ArtifactNotFound {
            contract: contract.to_string(),
            path: path.to_path_buf(),
        },
        _ => DispatchError::Io(e),
    })
}
