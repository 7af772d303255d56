use crate::cli::{DecodeArgs, EncodeArgs, GlobalArgs, InspectArgs, Verbosity};
use crate::config::Config;
use crate::runtime::interface::Mutability;
use crate::runtime::loader::ContractHandle;
use crate::runtime::parser::{parse_json_args, Args};
use crate::DispatchError;
use anyhow::{Context, Result};
use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct FunctionSummary {
    name: String,
    signature: String,
    selector: String,
    mutability: Mutability,
    payable: bool,
    outputs: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ContractSummary {
    contract: String,
    bytecode_len: usize,
    functions: Vec<FunctionSummary>,
}

fn load(global: &GlobalArgs, contract: &str) -> Result<ContractHandle> {
    let mut config = Config::load(global.config.as_deref())?;
    if let Some(dir) = &global.artifacts {
        config.artifacts.dir = dir.clone();
    }
    config
        .artifact_store()
        .load(contract)
        .with_context(|| format!("Failed to load contract '{contract}'"))
}

/// Execute the inspect command.
pub fn inspect(args: InspectArgs, global: GlobalArgs, _verbosity: Verbosity) -> Result<()> {
    let handle = load(&global, &args.contract)?;

    let summary = ContractSummary {
        contract: handle.name().to_string(),
        bytecode_len: handle.bytecode().len(),
        functions: handle
            .interface()
            .functions()
            .map(|f| FunctionSummary {
                name: f.name().to_string(),
                signature: f.signature(),
                selector: format!("0x{}", hex::encode(f.selector())),
                mutability: f.mutability(),
                payable: f.is_payable(),
                outputs: f.output_types().iter().map(ToString::to_string).collect(),
            })
            .collect(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} ({} bytes of bytecode)",
        summary.contract.bold(),
        summary.bytecode_len
    );
    for f in &summary.functions {
        let class = match (f.mutability, f.payable) {
            (Mutability::View, _) => "view".green(),
            (Mutability::Mutating, true) => "payable".red(),
            (Mutability::Mutating, false) => "mutating".yellow(),
        };
        println!(
            "  {} {:<9} {} -> ({})",
            f.selector.dimmed(),
            class,
            f.signature,
            f.outputs.iter().join(", ")
        );
    }
    Ok(())
}

/// Execute the encode command.
pub fn encode(args: EncodeArgs, global: GlobalArgs, _verbosity: Verbosity) -> Result<()> {
    let handle = load(&global, &args.contract)?;

    let overloads = handle.interface().overloads(&args.function).ok_or_else(|| {
        DispatchError::UnknownFunction {
            contract: handle.name().to_string(),
            function: args.function.clone(),
        }
    })?;

    // Try each overload in turn; JSON parsing is type-directed.
    let mut last_error = None;
    for descriptor in overloads {
        let parsed = match &args.args {
            Some(json) => parse_json_args(descriptor, json),
            None => Ok(Args::new()),
        };
        match parsed.map(|call_args| handle.encode_call(&args.function, &call_args)) {
            Ok(Ok(calldata)) => {
                info!(signature = %descriptor.signature(), "Encoded call");
                println!("0x{}", hex::encode(&calldata));
                return Ok(());
            }
            Ok(Err(e)) => last_error = Some(e.to_string()),
            Err(reason) => last_error = Some(reason),
        }
    }

    anyhow::bail!(
        "Could not encode {}.{}: {}",
        args.contract,
        args.function,
        last_error.unwrap_or_default()
    )
}

/// Execute the decode command.
pub fn decode(args: DecodeArgs, global: GlobalArgs, _verbosity: Verbosity) -> Result<()> {
    let handle = load(&global, &args.contract)?;
    let raw = args.data.trim();
    let data = hex::decode(raw.strip_prefix("0x").unwrap_or(raw))
        .with_context(|| format!("'{}' is not valid hex", args.data))?;
    let value = handle.decode_output(&args.function, &data)?;
    println!("{value}");
    Ok(())
}
