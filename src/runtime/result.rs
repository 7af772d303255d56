//! Return value decoding, normalisation and formatting.
//!
//! The emulator hands back raw bytes. This module turns them into the shape
//! the ABI declares: nothing for zero outputs, a bare value for one output,
//! and an ordered tuple otherwise.

use crate::runtime::interface::FunctionDescriptor;
use crate::Checksummed;
use ethers_core::abi::{ParamType, Token};
use ethers_core::types::{I256, U256};
use itertools::Itertools;
use std::fmt;

/// Selector of Solidity's `Error(string)` revert payload.
const ERROR_STRING_SELECTOR: [u8; 4] = [0x08, 0xc3, 0x79, 0xa0];

/// Decoded result of a contract call, shaped by its output arity.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// The function declares no outputs.
    None,
    /// Exactly one output, returned bare.
    Single(Token),
    /// Two or more outputs, in declaration order.
    Tuple(Vec<Token>),
}

impl ReturnValue {
    pub fn is_none(&self) -> bool {
        matches!(self, ReturnValue::None)
    }

    pub fn single(&self) -> Option<&Token> {
        match self {
            ReturnValue::Single(token) => Some(token),
            _ => None,
        }
    }

    /// The single output as an unsigned integer.
    pub fn as_uint(&self) -> Option<U256> {
        self.single().and_then(|t| t.clone().into_uint())
    }
}

impl fmt::Display for ReturnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnValue::None => write!(f, "()"),
            ReturnValue::Single(token) => write!(f, "{}", DisplayToken(token)),
            ReturnValue::Tuple(tokens) => {
                write!(f, "({})", tokens.iter().map(DisplayToken).join(", "))
            }
        }
    }
}

/// Human-readable rendering of a token: checksummed addresses, decimal
/// integers and `0x`-prefixed bytes.
pub struct DisplayToken<'a>(pub &'a Token);

impl fmt::Display for DisplayToken<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Token::Address(address) => write!(f, "{}", Checksummed(address)),
            Token::Uint(value) => write!(f, "{}", value),
            Token::Int(value) => write!(f, "{}", I256::from_raw(*value)),
            Token::Bool(value) => write!(f, "{}", value),
            Token::String(value) => write!(f, "{:?}", value),
            Token::Bytes(bytes) | Token::FixedBytes(bytes) => {
                write!(f, "0x{}", hex::encode(bytes))
            }
            Token::Array(items) | Token::FixedArray(items) => {
                write!(f, "[{}]", items.iter().map(DisplayToken).join(", "))
            }
            Token::Tuple(items) => write!(f, "({})", items.iter().map(DisplayToken).join(", ")),
        }
    }
}

/// Decode `data` per the outputs of `descriptor` and shape it by arity.
pub fn decode_return(descriptor: &FunctionDescriptor, data: &[u8]) -> Result<ReturnValue, String> {
    let types = descriptor.output_types();
    if types.is_empty() {
        return Ok(ReturnValue::None);
    }
    if data.is_empty() {
        return Err(format!(
            "empty return data, expected ({})",
            types.iter().join(", ")
        ));
    }

    let tokens = descriptor
        .abi()
        .decode_output(data)
        .map_err(|e| format!("{} bytes do not match ({}): {}", data.len(), types.iter().join(", "), e))?;

    let mut normalized: Vec<Token> = types
        .iter()
        .zip(tokens)
        .map(|(kind, token)| normalize(kind, token))
        .collect();

    Ok(if normalized.len() == 1 {
        ReturnValue::Single(normalized.remove(0))
    } else {
        ReturnValue::Tuple(normalized)
    })
}

/// Bring a decoded token into canonical form for its declared type.
pub fn normalize(kind: &ParamType, token: Token) -> Token {
    match (kind, token) {
        (ParamType::FixedBytes(width), Token::FixedBytes(mut bytes)) => {
            bytes.resize(*width, 0);
            Token::FixedBytes(bytes)
        }
        (ParamType::Int(bits), Token::Int(raw)) if *bits < 256 => {
            Token::Int(sign_extend(raw, *bits))
        }
        (ParamType::Array(inner), Token::Array(items)) => {
            Token::Array(items.into_iter().map(|t| normalize(inner, t)).collect())
        }
        (ParamType::FixedArray(inner, _), Token::FixedArray(items)) => {
            Token::FixedArray(items.into_iter().map(|t| normalize(inner, t)).collect())
        }
        (ParamType::Tuple(kinds), Token::Tuple(items)) => Token::Tuple(
            kinds
                .iter()
                .zip(items)
                .map(|(k, t)| normalize(k, t))
                .collect(),
        ),
        (_, token) => token,
    }
}

/// Sign-extend an `intN` held in the low `bits` of a word to 256 bits.
pub(crate) fn sign_extend(raw: U256, bits: usize) -> U256 {
    let mask = (U256::one() << bits) - 1;
    let low = raw & mask;
    if low.bit(bits - 1) {
        low | !mask
    } else {
        low
    }
}

/// Extract the message of a Solidity `Error(string)` revert, if present.
pub fn revert_reason(data: &[u8]) -> Option<String> {
    let payload = data.strip_prefix(&ERROR_STRING_SELECTOR)?;
    let mut tokens = ethers_core::abi::decode(&[ParamType::String], payload).ok()?;
    tokens.pop()?.into_string()
}
