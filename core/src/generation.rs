use std::time::Instant;

use time::OffsetDateTime;
use tracing::info;

use crate::error::Result;
use crate::{DocumentStore, InvertedIndex, Message, SearchEngine};

/// A store and the index built from it. Created, published and dropped as one unit.
#[derive(Debug)]
pub struct Generation {
    id: u64,
    store: DocumentStore,
    index: InvertedIndex,
    built_at: OffsetDateTime,
}

impl Generation {
    pub fn build(id: u64, messages: Vec<Message>) -> Result<Self> {
        let start = Instant::now();
        let store = DocumentStore::build(messages)?;
        let index = InvertedIndex::build(&store);
        info!(
            generation = id,
            documents = store.len(),
            terms = index.num_terms(),
            took_ms = start.elapsed().as_millis() as u64,
            "generation built"
        );
        Ok(Self { id, store, index, built_at: OffsetDateTime::now_utc() })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn built_at(&self) -> OffsetDateTime {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub fn index(&self) -> &InvertedIndex {
        &self.index
    }

    pub fn engine(&self) -> SearchEngine<'_> {
        SearchEngine::new(&self.store, &self.index)
    }

    pub fn get(&self, id: &str) -> Result<&Message> {
        self.store.get(id)
    }
}
