#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parser must not panic on any input.
    if let Ok(tree) = covtree::parsers::pit::parse(data) {
        let _ = tree.aggregate_values(tree.root());
    }
});
