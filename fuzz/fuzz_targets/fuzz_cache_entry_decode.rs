#![no_main]

use libfuzzer_sys::fuzz_target;

use govsync_store::CacheEntry;

// Cache entries are stored as bincode; a corrupted value must decode to an
// error, never a panic or an unbounded allocation.
fuzz_target!(|data: &[u8]| {
    use bincode::Options;
    let options = bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(64 * 1024);
    if let Ok(entry) = options.deserialize::<CacheEntry>(data) {
        let encoded = options.serialize(&entry).unwrap();
        let again: CacheEntry = options.deserialize(&encoded).unwrap();
        assert_eq!(again, entry);
    }
});
