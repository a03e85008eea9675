use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::{DocId, Message};

/// Immutable id → message cache for one generation.
#[derive(Debug, Default)]
pub struct DocumentStore {
    /// Sorted by message id; the position is the `DocId`.
    docs: Vec<Message>,
    by_id: HashMap<String, DocId>,
}

impl DocumentStore {
    pub fn build(mut messages: Vec<Message>) -> Result<Self> {
        messages.sort_unstable_by(|a, b| a.id.cmp(&b.id));
        if let Some(pair) = messages.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(Error::DuplicateDocument(pair[0].id.clone()));
        }
        if messages.len() > DocId::MAX as usize {
            return Err(Error::invalid(format!("{} documents exceed the DocId range", messages.len())));
        }
        let by_id = messages
            .iter()
            .enumerate()
            .map(|(doc, m)| (m.id.clone(), doc as DocId))
            .collect();
        Ok(Self { docs: messages, by_id })
    }

    pub fn get(&self, id: &str) -> Result<&Message> {
        self.by_id
            .get(id)
            .and_then(|&doc| self.doc(doc))
            .ok_or_else(|| Error::NotFound(id.to_string()))
    }

    pub fn doc(&self, doc: DocId) -> Option<&Message> {
        self.docs.get(doc as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Message)> {
        self.docs.iter().enumerate().map(|(doc, m)| (doc as DocId, m))
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}
