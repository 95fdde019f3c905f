#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(mut tree) = covtree::parsers::jacoco::parse(data) {
        let _ = tree.aggregate_values(tree.root());
        let _ = tree.split_all_packages();
    }
});
