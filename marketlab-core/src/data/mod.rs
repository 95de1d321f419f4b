//! Data plumbing: errors, HTTP transport, cache keys, Parquet cache

pub mod cache;
pub mod error;
pub mod frame;
pub mod http;
pub mod key;
pub mod schema;

pub use cache::{CacheEntry, CacheError, CachedTable, LocalCache};
pub use error::DataError;
pub use http::{
    HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, StubTransport, TransportError,
};
pub use key::{CacheKey, Dataset};
pub use schema::{PriceSchema, SchemaError, SymbolSchema};
