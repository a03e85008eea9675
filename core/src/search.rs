use std::time::{Duration, Instant};

use tracing::{error, trace};

use crate::error::{Error, Result};
use crate::index::{Field, QueryTerm};
use crate::tokenizer::tokenize;
use crate::{DocId, DocumentStore, InvertedIndex, Message};

/// How many resolved documents pass between deadline checks.
const DEADLINE_STRIDE: usize = 1024;

/// One page of ranked matches, borrowed from the generation that produced it.
#[derive(Debug)]
pub struct QueryResult<'g> {
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub items: Vec<&'g Message>,
}

/// Split a query into terms. A whitespace-separated piece starting with `@`
/// matches authors only; everything else matches text or author.
pub fn parse_query(query: &str) -> Vec<QueryTerm> {
    let mut terms = Vec::new();
    for piece in query.split_whitespace() {
        let (field, raw) = match piece.strip_prefix('@') {
            Some(rest) => (Field::Author, rest),
            None => (Field::Any, piece),
        };
        terms.extend(tokenize(raw).into_iter().map(|term| QueryTerm { term, field }));
    }
    terms
}

/// Query side of a generation. Both halves must come from the same generation.
#[derive(Clone, Copy)]
pub struct SearchEngine<'g> {
    store: &'g DocumentStore,
    index: &'g InvertedIndex,
}

impl<'g> SearchEngine<'g> {
    pub fn new(store: &'g DocumentStore, index: &'g InvertedIndex) -> Self {
        Self { store, index }
    }

    /// Ranked search, most recent first, ties by ascending id. `page` is 1-based.
    pub fn search(&self, query: &str, page: usize, page_size: usize) -> Result<QueryResult<'g>> {
        self.run(query, page, page_size, None)
    }

    /// Like [`search`](Self::search) but gives up with `Error::Timeout` once `budget` has elapsed.
    pub fn search_within(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
        budget: Duration,
    ) -> Result<QueryResult<'g>> {
        self.run(query, page, page_size, Some(Deadline::new(budget)))
    }

    pub fn get(&self, id: &str) -> Result<&'g Message> {
        self.store.get(id)
    }

    fn run(
        &self,
        query: &str,
        page: usize,
        page_size: usize,
        deadline: Option<Deadline>,
    ) -> Result<QueryResult<'g>> {
        if page == 0 {
            return Err(Error::invalid("page starts at 1"));
        }
        if page_size == 0 {
            return Err(Error::invalid("page size must be positive"));
        }
        let check = |deadline: &Option<Deadline>| match deadline {
            Some(d) => d.check(),
            None => Ok(()),
        };

        let terms = parse_query(query);
        let ids = self.index.lookup_terms(&terms);
        trace!(terms = terms.len(), candidates = ids.len(), "index lookup");
        check(&deadline)?;

        let mut ranked: Vec<(DocId, &'g Message)> = Vec::with_capacity(ids.len());
        for (n, doc) in ids.into_iter().enumerate() {
            if n % DEADLINE_STRIDE == DEADLINE_STRIDE - 1 {
                check(&deadline)?;
            }
            match self.store.doc(doc) {
                Some(msg) => ranked.push((doc, msg)),
                None => {
                    error!(doc, query, "posting references a document missing from the store");
                    return Err(Error::InternalInconsistency { doc });
                }
            }
        }
        ranked.sort_unstable_by(|a, b| b.1.timestamp.cmp(&a.1.timestamp).then(a.0.cmp(&b.0)));
        check(&deadline)?;

        let total = ranked.len();
        let start = (page - 1).saturating_mul(page_size);
        let items = ranked.into_iter().skip(start).take(page_size).map(|(_, m)| m).collect();
        Ok(QueryResult { total, page, page_size, items })
    }
}

#[derive(Clone, Copy)]
struct Deadline {
    at: Instant,
    budget: Duration,
}

impl Deadline {
    fn new(budget: Duration) -> Self {
        Self { at: Instant::now() + budget, budget }
    }

    fn check(&self) -> Result<()> {
        if Instant::now() >= self.at {
            Err(Error::Timeout(self.budget))
        } else {
            Ok(())
        }
    }
}
