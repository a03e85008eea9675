use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;

use crate::tokenizer::{tokenize, unique_terms};
use crate::{DocId, DocumentStore};

/// Ascending, duplicate-free document ids for one term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostingList {
    ids: Vec<DocId>,
}

impl PostingList {
    pub fn as_slice(&self) -> &[DocId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn finalize(mut ids: Vec<DocId>) -> Self {
        ids.sort_unstable();
        ids.dedup();
        Self { ids }
    }
}

/// Which namespace a query term is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Message text or author.
    Any,
    /// Author only (`@name` in a query).
    Author,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
    pub term: String,
    pub field: Field,
}

impl QueryTerm {
    pub fn any(term: impl Into<String>) -> Self {
        Self { term: term.into(), field: Field::Any }
    }

    pub fn author(term: impl Into<String>) -> Self {
        Self { term: term.into(), field: Field::Author }
    }
}

/// Term → postings, with author terms kept apart from text terms.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvertedIndex {
    text: HashMap<String, PostingList>,
    authors: HashMap<String, PostingList>,
    num_docs: u32,
}

impl InvertedIndex {
    pub fn build(store: &DocumentStore) -> Self {
        let mut text: HashMap<String, Vec<DocId>> = HashMap::new();
        let mut authors: HashMap<String, Vec<DocId>> = HashMap::new();
        for (doc, msg) in store.iter() {
            for term in unique_terms(&msg.text) {
                text.entry(term).or_default().push(doc);
            }
            for term in unique_terms(&msg.author) {
                authors.entry(term).or_default().push(doc);
            }
        }
        let index = Self {
            text: text.into_iter().map(|(t, ids)| (t, PostingList::finalize(ids))).collect(),
            authors: authors.into_iter().map(|(t, ids)| (t, PostingList::finalize(ids))).collect(),
            num_docs: store.len() as u32,
        };
        debug!(
            num_docs = index.num_docs,
            text_terms = index.text.len(),
            author_terms = index.authors.len(),
            "built inverted index"
        );
        index
    }

    /// AND over raw query strings, each normalized and matched against text or author.
    pub fn lookup<S: AsRef<str>>(&self, terms: &[S]) -> Vec<DocId> {
        let terms: Vec<QueryTerm> = terms
            .iter()
            .flat_map(|raw| tokenize(raw.as_ref()))
            .map(QueryTerm::any)
            .collect();
        self.lookup_terms(&terms)
    }

    /// AND over already-normalized terms. No terms means no results.
    pub fn lookup_terms(&self, terms: &[QueryTerm]) -> Vec<DocId> {
        if terms.is_empty() {
            return Vec::new();
        }
        let mut lists: Vec<Cow<'_, [DocId]>> = Vec::with_capacity(terms.len());
        for term in terms {
            let postings = self.postings_for(term);
            if postings.is_empty() {
                return Vec::new();
            }
            lists.push(postings);
        }
        // Smallest first keeps every intermediate result as short as possible.
        lists.sort_by_key(|l| l.len());
        let mut iter = lists.into_iter();
        let mut acc = match iter.next() {
            Some(first) => first.into_owned(),
            None => return Vec::new(),
        };
        for list in iter {
            acc = intersect_sorted(&acc, &list);
            if acc.is_empty() {
                break;
            }
        }
        acc
    }

    pub fn text_postings(&self, term: &str) -> Option<&PostingList> {
        self.text.get(term)
    }

    pub fn author_postings(&self, term: &str) -> Option<&PostingList> {
        self.authors.get(term)
    }

    pub fn num_terms(&self) -> usize {
        self.text.len() + self.authors.len()
    }

    fn postings_for(&self, term: &QueryTerm) -> Cow<'_, [DocId]> {
        let author = self.authors.get(&term.term).map(PostingList::as_slice).unwrap_or(&[]);
        if term.field == Field::Author {
            return Cow::Borrowed(author);
        }
        let text = self.text.get(&term.term).map(PostingList::as_slice).unwrap_or(&[]);
        match (text.is_empty(), author.is_empty()) {
            (_, true) => Cow::Borrowed(text),
            (true, false) => Cow::Borrowed(author),
            (false, false) => Cow::Owned(union_sorted(text, author)),
        }
    }
}

/// Two-pointer intersection of ascending slices.
pub fn intersect_sorted(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out
}

/// Two-pointer union of ascending slices, without duplicates.
pub fn union_sorted(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
