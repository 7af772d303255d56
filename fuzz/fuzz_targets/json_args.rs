#![no_main]

use emulator_dispatch::runtime::parser::{bind_arguments, parse_json_args};
use emulator_dispatch::ContractInterface;
use libfuzzer_sys::fuzz_target;

const ABI: &str = r#"[
  {"type":"function","name":"f","stateMutability":"nonpayable","outputs":[],
   "inputs":[
     {"name":"who","type":"address"},
     {"name":"amounts","type":"uint256[]"},
     {"name":"pair","type":"tuple","components":[{"name":"","type":"int8"},{"name":"","type":"bytes4"}]},
     {"name":"memo","type":"string"}
   ]}
]"#;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(interface) = ContractInterface::parse(ABI) else {
        return;
    };
    let Some(descriptor) = interface.overloads("f").and_then(|o| o.first()) else {
        return;
    };
    if let Ok(args) = parse_json_args(descriptor, json) {
        if let Ok(tokens) = bind_arguments(descriptor, &args) {
            let _ = descriptor.abi().encode_input(&tokens);
        }
    }
});
