#![no_main]

use libfuzzer_sys::fuzz_target;

use govsync_ledger::abi::{decode_bool, decode_state, encode_bool, encode_state};

// Return data comes straight from a remote node.
fuzz_target!(|data: &[u8]| {
    if let Ok(state) = decode_state(data) {
        assert_eq!(encode_state(state), data);
    }
    if let Ok(flag) = decode_bool(data) {
        assert_eq!(encode_bool(flag), data);
    }
});
