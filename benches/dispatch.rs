use criterion::{black_box, criterion_group, criterion_main, Criterion};
use emulator_dispatch::runtime::result::decode_return;
use emulator_dispatch::{load_contract, wrap, Args, ContractHandle};
use emulator_dispatch_mock::{counter, MockEmulator};
use ethers_core::abi::{encode, Token};
use ethers_core::types::{Address, U256};
use std::sync::Arc;

const ARTIFACTS: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/artifacts");

fn handle() -> ContractHandle {
    load_contract(ARTIFACTS, "Counter").unwrap()
}

fn bench_load(c: &mut Criterion) {
    c.bench_function("load_counter_artifacts", |b| {
        b.iter(|| black_box(handle()))
    });
}

fn bench_encode(c: &mut Criterion) {
    let handle = handle();
    let args = Args::new().arg(U256::from(7)).arg(U256::from(35));

    c.bench_function("encode_add_call", |b| {
        b.iter(|| handle.encode_call("add", black_box(&args)).unwrap())
    });
}

fn bench_decode(c: &mut Criterion) {
    let handle = handle();
    let descriptor = &handle.interface().overloads("snapshot").unwrap()[0];
    let data = encode(&[Token::Address(Address::repeat_byte(0xa)), Token::Uint(U256::MAX)]);

    c.bench_function("decode_snapshot_tuple", |b| {
        b.iter(|| decode_return(descriptor, black_box(&data)).unwrap())
    });
}

fn bench_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let emulator = Arc::new(MockEmulator::new());
    let at = Address::repeat_byte(0xc0);
    emulator.deploy(at, counter());
    let contract = wrap(handle(), emulator, at);
    let caller = Address::repeat_byte(0xa);

    c.bench_function("view_call_round_trip", |b| {
        b.iter(|| {
            runtime
                .block_on(contract.call("increment_count", Args::new()))
                .unwrap()
        })
    });

    c.bench_function("mutating_call_round_trip", |b| {
        b.iter(|| {
            runtime
                .block_on(contract.send("increment", Args::new().arg(U256::one()), caller))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_load, bench_encode, bench_decode, bench_round_trip);
criterion_main!(benches);
