pub mod cli;
pub mod detect;
pub mod diagnostics;
pub mod error;
pub mod fraction;
pub mod ingest;
pub mod interner;
pub mod metric;
pub mod mutation;
pub mod parsers;
pub mod split;
pub mod tree;
pub mod value;
