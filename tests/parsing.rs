// Parsing test entry point: format detection and the uniform IR.
#[path = "parsing/test_polyglot_tree.rs"]
mod test_polyglot_tree;
#[path = "parsing/test_determinism.rs"]
mod test_determinism;
