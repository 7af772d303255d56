//! Argument binding, overload selection and JSON argument parsing.
//!
//! Calls arrive as positional and named [`Token`]s. Named `caller` and
//! `value` entries are control parameters for the emulator, never contract
//! arguments; [`Invocation::lift_control`] moves them out before binding.
//!
//! # Key responsibilities
//! - Bind positional/named tokens to the declared inputs, in order.
//! - Pick an overload by arity and type.
//! - Parse raw JSON (CLI `--args`) against the declared input types.

use crate::runtime::interface::FunctionDescriptor;
use crate::runtime::result::sign_extend;
use ethers_core::abi::token::{LenientTokenizer, Tokenizer};
use ethers_core::abi::{ParamType, Token, Tokenizable};
use ethers_core::types::{Address, U256};
use serde_json::Value as JsonValue;

/// Named arguments that steer the emulator instead of reaching the contract.
pub const CALLER_KEYWORD: &str = "caller";
pub const VALUE_KEYWORD: &str = "value";

fn is_reserved(name: &str) -> bool {
    name == CALLER_KEYWORD || name == VALUE_KEYWORD
}

/// Positional and named call arguments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args {
    positional: Vec<Token>,
    named: Vec<(String, Token)>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arg<T: Tokenizable>(self, value: T) -> Self {
        self.token(value.into_token())
    }

    pub fn token(mut self, token: Token) -> Self {
        self.positional.push(token);
        self
    }

    pub fn named<T: Tokenizable>(self, name: impl Into<String>, value: T) -> Self {
        self.named_token(name, value.into_token())
    }

    pub fn named_token(mut self, name: impl Into<String>, token: Token) -> Self {
        self.named.push((name.into(), token));
        self
    }

    pub fn positional(&self) -> &[Token] {
        &self.positional
    }

    pub fn named_args(&self) -> &[(String, Token)] {
        &self.named
    }

    /// Number of arguments destined for the contract.
    pub fn arity(&self) -> usize {
        self.positional.len() + self.named.iter().filter(|(n, _)| !is_reserved(n)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.positional.is_empty() && self.named.is_empty()
    }
}

/// Execution metadata lifted out of an [`Invocation`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Control {
    pub caller: Option<Address>,
    pub value: Option<U256>,
}

/// One call on an emulated contract: arguments plus execution metadata.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    pub args: Args,
    pub caller: Option<Address>,
    pub value: Option<U256>,
}

impl Invocation {
    pub fn new(args: Args) -> Self {
        Self {
            args,
            ..Self::default()
        }
    }

    pub fn caller(mut self, caller: Address) -> Self {
        self.caller = Some(caller);
        self
    }

    pub fn value(mut self, value: impl Into<U256>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Separate control parameters from contract arguments.
    ///
    /// `caller` and `value` may be given either as fields or as named
    /// arguments, but not both.
    pub fn lift_control(self) -> Result<(Args, Control), String> {
        let mut control = Control {
            caller: self.caller,
            value: self.value,
        };
        let mut named = Vec::with_capacity(self.args.named.len());
        for (name, token) in self.args.named {
            match name.as_str() {
                CALLER_KEYWORD => {
                    let caller = match token {
                        Token::Address(caller) => caller,
                        other => return Err(format!("'caller' must be an address, got {other}")),
                    };
                    if control.caller.replace(caller).is_some() {
                        return Err("'caller' supplied more than once".to_string());
                    }
                }
                VALUE_KEYWORD => {
                    let value = match token {
                        Token::Uint(value) => value,
                        other => {
                            return Err(format!("'value' must be an unsigned integer, got {other}"))
                        }
                    };
                    if control.value.replace(value).is_some() {
                        return Err("'value' supplied more than once".to_string());
                    }
                }
                _ => named.push((name, token)),
            }
        }
        let args = Args {
            positional: self.args.positional,
            named,
        };
        Ok((args, control))
    }
}

impl From<Args> for Invocation {
    fn from(args: Args) -> Self {
        Invocation::new(args)
    }
}

/// Bind `args` to the inputs of `descriptor`, in declaration order.
pub fn bind_arguments(descriptor: &FunctionDescriptor, args: &Args) -> Result<Vec<Token>, String> {
    let inputs = descriptor.inputs();
    if args.positional.len() > inputs.len() {
        return Err(format!(
            "{} takes {} arguments but {} positional were given",
            descriptor.signature(),
            inputs.len(),
            args.positional.len()
        ));
    }

    let mut consumed = vec![false; args.named.len()];
    let mut tokens = args.positional.clone();

    for (index, param) in inputs.iter().enumerate() {
        let named = args
            .named
            .iter()
            .enumerate()
            .filter(|(_, (name, _))| !param.name.is_empty() && *name == param.name);
        for (slot, (name, token)) in named {
            if index < args.positional.len() || consumed[slot] || tokens.len() > index {
                return Err(format!("multiple values for argument '{name}'"));
            }
            consumed[slot] = true;
            tokens.push(token.clone());
        }
        if tokens.len() <= index {
            let label = if param.name.is_empty() {
                format!("#{index}")
            } else {
                format!("'{}'", param.name)
            };
            return Err(format!("missing argument {label} ({})", param.kind));
        }
    }

    if let Some(slot) = consumed.iter().position(|used| !used) {
        let name = &args.named[slot].0;
        if is_reserved(name) {
            return Err(format!("'{name}' is a control parameter, not a contract argument"));
        }
        return Err(format!("unexpected keyword argument '{name}'"));
    }

    for (param, token) in inputs.iter().zip(&tokens) {
        if !token.type_check(&param.kind) {
            return Err(format!(
                "argument '{}' expects {}, got {}",
                param.name, param.kind, token
            ));
        }
    }

    Ok(tokens)
}

/// Choose the overload of a function that accepts `args`.
///
/// `descriptor` projects each candidate onto its ABI description, so the
/// same rules apply to bare descriptors and to wrapped functions.
pub fn select_overload<'a, T>(
    candidates: &'a [T],
    args: &Args,
    descriptor: impl Fn(&T) -> &FunctionDescriptor,
) -> Result<&'a T, String> {
    if let [only] = candidates {
        return Ok(only);
    }

    let arity = args.arity();
    let mut matching = candidates
        .iter()
        .filter(|c| descriptor(*c).inputs().len() == arity)
        .peekable();
    let first = matching
        .peek()
        .copied()
        .ok_or_else(|| format!("no overload takes {arity} arguments"))?;

    Ok(matching
        .find(|c| bind_arguments(descriptor(*c), args).is_ok())
        .unwrap_or(first))
}

/// Parse CLI-style JSON arguments against the inputs of `descriptor`.
///
/// Accepts a JSON array (positional) or object (named). Strings are
/// tokenized leniently, so `"1"` and `1` are both valid `uint256` values.
pub fn parse_json_args(descriptor: &FunctionDescriptor, args_json: &str) -> Result<Args, String> {
    let value: JsonValue =
        serde_json::from_str(args_json).map_err(|e| format!("Invalid JSON in --args: {e}"))?;

    match value {
        JsonValue::Null => Ok(Args::new()),
        JsonValue::Array(items) => {
            let inputs = descriptor.inputs();
            if items.len() > inputs.len() {
                return Err(format!(
                    "{} takes {} arguments, got {}",
                    descriptor.signature(),
                    inputs.len(),
                    items.len()
                ));
            }
            items
                .iter()
                .zip(inputs)
                .try_fold(Args::new(), |args, (item, param)| {
                    Ok(args.token(json_to_token(&param.kind, item)?))
                })
        }
        JsonValue::Object(entries) => entries.iter().try_fold(Args::new(), |args, (name, item)| {
            if is_reserved(name) {
                return Err(format!("'{name}' is a control parameter, not a contract argument"));
            }
            let param = descriptor
                .inputs()
                .iter()
                .find(|p| p.name == *name)
                .ok_or_else(|| format!("unexpected keyword argument '{name}'"))?;
            Ok(args.named_token(name.clone(), json_to_token(&param.kind, item)?))
        }),
        other => Err(format!(
            "--args must be a JSON array or object, got {}",
            json_type_name(&other)
        )),
    }
}

fn json_to_token(kind: &ParamType, value: &JsonValue) -> Result<Token, String> {
    match (kind, value) {
        (ParamType::Array(inner), JsonValue::Array(items)) => items
            .iter()
            .map(|item| json_to_token(inner, item))
            .collect::<Result<_, _>>()
            .map(Token::Array),
        (ParamType::FixedArray(inner, len), JsonValue::Array(items)) => {
            if items.len() != *len {
                return Err(format!(
                    "Array length mismatch: expected {}, got {}",
                    len,
                    items.len()
                ));
            }
            items
                .iter()
                .map(|item| json_to_token(inner, item))
                .collect::<Result<_, _>>()
                .map(Token::FixedArray)
        }
        (ParamType::Tuple(types), JsonValue::Array(items)) => {
            if items.len() != types.len() {
                return Err(format!(
                    "Tuple arity mismatch: expected {}, got {}",
                    types.len(),
                    items.len()
                ));
            }
            types
                .iter()
                .zip(items)
                .map(|(t, item)| json_to_token(t, item))
                .collect::<Result<_, _>>()
                .map(Token::Tuple)
        }
        (ParamType::Array(_) | ParamType::FixedArray(..) | ParamType::Tuple(_), other) => Err(
            format!("expected {} as a JSON array, got {}", kind, json_type_name(other)),
        ),
        (_, JsonValue::String(s)) => tokenize_scalar(kind, s),
        (_, JsonValue::Number(n)) => tokenize_scalar(kind, &n.to_string()),
        (_, JsonValue::Bool(b)) => tokenize_scalar(kind, &b.to_string()),
        (_, other) => Err(format!("expected {}, got {}", kind, json_type_name(other))),
    }
}

fn tokenize_scalar(kind: &ParamType, raw: &str) -> Result<Token, String> {
    let raw = raw.trim();
    let token = match kind {
        ParamType::Uint(bits) | ParamType::Int(bits) if raw.starts_with("0x") => {
            let value = U256::from_str_radix(&raw[2..], 16)
                .map_err(|e| format!("invalid {kind} '{raw}': {e}"))?;
            if *bits < 256 && !(value >> *bits).is_zero() {
                return Err(format!("'{raw}' does not fit in {kind}"));
            }
            // Hex is read as the two's-complement bit pattern of the declared width.
            match kind {
                ParamType::Int(bits) if *bits < 256 => Token::Int(sign_extend(value, *bits)),
                ParamType::Int(_) => Token::Int(value),
                _ => Token::Uint(value),
            }
        }
        ParamType::Address | ParamType::Bytes | ParamType::FixedBytes(_) => {
            LenientTokenizer::tokenize(kind, raw.strip_prefix("0x").unwrap_or(raw))
                .map_err(|e| format!("invalid {kind} '{raw}': {e}"))?
        }
        _ => LenientTokenizer::tokenize(kind, raw)
            .map_err(|e| format!("invalid {kind} '{raw}': {e}"))?,
    };
    if !fits_width(kind, &token) {
        return Err(format!("'{raw}' does not fit in {kind}"));
    }
    Ok(token)
}

/// Whether an integer token lies within its declared `uintN`/`intN`.
fn fits_width(kind: &ParamType, token: &Token) -> bool {
    match (kind, token) {
        (ParamType::Uint(bits), Token::Uint(value)) if *bits < 256 => (*value >> *bits).is_zero(),
        (ParamType::Int(bits), Token::Int(value)) if *bits < 256 => {
            sign_extend(*value, *bits) == *value
        }
        _ => true,
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
