#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parser must not panic on any input, and a parsed tree must survive
    // restructuring and aggregation.
    if let Ok(mut tree) = covtree::parsers::cobertura::parse(data) {
        let _ = tree.aggregate_values(tree.root());
        let _ = tree.split_all_packages();
    }
});
