//! Graph derivation for trawl: cross-file symbol resolution, module specifier
//! resolution with re-export chasing, data-reference linking, and the builder
//! that composes parser output into the property graph.

pub mod builder;
pub mod datarefs;
pub mod imports;
pub mod symbols;

pub use builder::{BuildOutput, BuildRequest, GraphBuilder};
pub use imports::ImportResolver;
pub use symbols::{ExistingUuid, FileScopes, SymbolResolution, UuidMapping};
