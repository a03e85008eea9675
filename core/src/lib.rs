//! In-memory message search: tokenizer, document store, inverted index and
//! the query engine that ties them together into one generation.

pub mod error;
pub mod generation;
pub mod index;
pub mod message;
pub mod search;
pub mod store;
pub mod tokenizer;

pub use error::{Error, Result};
pub use generation::Generation;
pub use index::{Field, InvertedIndex, PostingList, QueryTerm};
pub use message::{DocId, Message};
pub use search::{parse_query, QueryResult, SearchEngine};
pub use store::DocumentStore;
