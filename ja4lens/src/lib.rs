// ja4lens/src/lib.rs
//
// JA4+ fingerprint index and aggregation engine.
//
// A snapshot of community fingerprint records is loaded once into an
// immutable `FingerprintDb`. Queries never mutate it:
//
//   detect   family of a fingerprint (index first, then shape grammars)
//   search   aggregated profile of every record carrying a fingerprint
//   suggest  case-insensitive prefix completion, first-seen order
//   parse    human translation of a JA4 client fingerprint's first section
//
// Capture uploads are checked in `ingest` and handed to the external ja4
// tool; nothing they produce feeds back into the index.

pub mod classify;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod ingest;
pub mod model;
pub mod query_api;
pub mod report;
pub mod state;

pub use error::{DbError, IngestError};
pub use model::{AggregatedResult, FingerprintFamily, ParsedJa4, Record, Suggestion};
pub use state::db::{DbStats, FingerprintDb, SharedDb};
