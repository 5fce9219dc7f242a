#![no_main]

use libfuzzer_sys::fuzz_target;
use std::str::FromStr;

use govsync_types::{Address, Identity, ProposalId};

// Parsing untrusted ids and `?user=` values must never panic, and anything
// that parses must print back to a canonical form that parses to itself.
fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(id) = ProposalId::from_str(text) {
        let canonical = id.to_string();
        assert_eq!(ProposalId::from_str(&canonical).unwrap(), id);
        assert!(!canonical.starts_with('0') || canonical == "0");
    }

    if let Ok(address) = Address::from_str(text) {
        let canonical = address.to_string();
        assert_eq!(canonical, canonical.to_lowercase());
        assert_eq!(Address::from_str(&canonical).unwrap(), address);
    }

    let _ = Identity::from_str(text);
});
