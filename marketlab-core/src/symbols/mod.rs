//! Index membership acquisition

pub mod index;
pub mod loader;
pub mod parser;

pub use index::{source, IndexSource};
pub use loader::SymbolListLoader;
pub use parser::{parse_symbol_table, TableSignature};
