//! Contract interface descriptions.
//!
//! Wraps the `ethers-core` ABI model with the one classification dispatch
//! cares about: whether a function may mutate state.

use ethers_core::abi::{Abi, Function, Param, ParamType, StateMutability};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// How a function is routed through the emulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mutability {
    /// `pure` or `view`: simulated, never committed.
    View,
    /// `nonpayable` or `payable`: executed on behalf of a caller.
    Mutating,
}

impl From<StateMutability> for Mutability {
    fn from(value: StateMutability) -> Self {
        match value {
            StateMutability::Pure | StateMutability::View => Mutability::View,
            StateMutability::NonPayable | StateMutability::Payable => Mutability::Mutating,
        }
    }
}

impl fmt::Display for Mutability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutability::View => write!(f, "view"),
            Mutability::Mutating => write!(f, "mutating"),
        }
    }
}

/// A single ABI function together with its routing class.
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    abi: Function,
    mutability: Mutability,
}

impl FunctionDescriptor {
    pub fn new(abi: Function) -> Self {
        let mutability = abi.state_mutability.into();
        Self { abi, mutability }
    }

    pub fn name(&self) -> &str {
        &self.abi.name
    }

    pub fn mutability(&self) -> Mutability {
        self.mutability
    }

    pub fn is_payable(&self) -> bool {
        self.abi.state_mutability == StateMutability::Payable
    }

    pub fn inputs(&self) -> &[Param] {
        &self.abi.inputs
    }

    pub fn outputs(&self) -> &[Param] {
        &self.abi.outputs
    }

    pub fn input_types(&self) -> Vec<ParamType> {
        self.abi.inputs.iter().map(|p| p.kind.clone()).collect()
    }

    pub fn output_types(&self) -> Vec<ParamType> {
        self.abi.outputs.iter().map(|p| p.kind.clone()).collect()
    }

    /// Canonical signature, e.g. `increment(uint256)`.
    pub fn signature(&self) -> String {
        let inputs: Vec<String> = self.abi.inputs.iter().map(|p| p.kind.to_string()).collect();
        format!("{}({})", self.abi.name, inputs.join(","))
    }

    pub fn selector(&self) -> [u8; 4] {
        self.abi.short_signature()
    }

    /// The underlying ABI function used for encoding and decoding.
    pub fn abi(&self) -> &Function {
        &self.abi
    }
}

impl fmt::Display for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outputs: Vec<String> = self.abi.outputs.iter().map(|p| p.kind.to_string()).collect();
        write!(
            f,
            "{} {} -> ({})",
            self.mutability,
            self.signature(),
            outputs.join(", ")
        )
    }
}

/// Ordered function table of a compiled contract.
#[derive(Debug, Clone, Default)]
pub struct ContractInterface {
    functions: BTreeMap<String, Vec<FunctionDescriptor>>,
}

impl ContractInterface {
    /// Parse a solc-style JSON ABI array.
    pub fn parse(abi_json: &str) -> std::result::Result<Self, serde_json::Error> {
        let abi: Abi = serde_json::from_str(abi_json)?;
        Ok(Self::from(abi))
    }

    /// Every descriptor, ordered by name then declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDescriptor> {
        self.functions.values().flatten()
    }

    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    /// All overloads declared under `name`.
    pub fn overloads(&self, name: &str) -> Option<&[FunctionDescriptor]> {
        self.functions.get(name).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.functions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl From<Abi> for ContractInterface {
    fn from(abi: Abi) -> Self {
        let functions = abi
            .functions
            .into_iter()
            .map(|(name, overloads)| {
                (
                    name,
                    overloads.into_iter().map(FunctionDescriptor::new).collect(),
                )
            })
            .collect();
        Self { functions }
    }
}
