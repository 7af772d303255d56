#![no_main]

use emulator_dispatch::runtime::result::{decode_return, revert_reason};
use emulator_dispatch::ContractInterface;
use libfuzzer_sys::fuzz_target;

const ABI: &str = r#"[
  {"type":"function","name":"g","stateMutability":"view","inputs":[],
   "outputs":[
     {"name":"","type":"address"},
     {"name":"","type":"int16"},
     {"name":"","type":"bytes"},
     {"name":"","type":"uint8[2]"}
   ]}
]"#;

fuzz_target!(|data: &[u8]| {
    let _ = revert_reason(data);
    let Ok(interface) = ContractInterface::parse(ABI) else {
        return;
    };
    if let Some(descriptor) = interface.overloads("g").and_then(|o| o.first()) {
        if let Ok(value) = decode_return(descriptor, data) {
            let _ = value.to_string();
        }
    }
});
