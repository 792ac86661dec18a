// src/lib.rs
pub mod assembler;
pub mod driver;
pub mod error;
pub mod formatters;
pub mod fragment;
pub mod logging;
pub mod pipeline;
pub mod variables;
pub mod where_clause;

pub use error::*;
pub use pipeline::*;

pub use assembler::{assemble, CompositeBuilder, CompositePattern};
pub use driver::{Driver, DriverRegistry};
pub use fragment::{Fragment, Placement};
pub use pipeline::config::{GlossConfig, QueryOptions};
pub use pipeline::context::ScanStats;
pub use pipeline::stream::LineScanner;
pub use variables::{bind, Key, ParsedLine, Scope, VarRef};
pub use where_clause::{Condition, WhereClause};
