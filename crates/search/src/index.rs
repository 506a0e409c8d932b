use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fmt;

use tantivy::collector::TopDocs;
use tantivy::query::{
    BooleanQuery, ConstScoreQuery, DisjunctionMaxQuery, FuzzyTermQuery, Occur, Query, TermQuery,
};
use tantivy::schema::{FAST, Field, IndexRecordOption, STRING, Schema, TEXT};
use tantivy::{
    DocId, Index, IndexWriter, Score, Searcher, SegmentReader, TantivyDocument, Term,
};

use crate::document::{SearchDocument, normalize, tokenize};
use crate::error::SearchError;

/// Query tokens at least this long also match longer terms by prefix.
const MIN_PREFIX_LEN: usize = 2;

const WRITER_HEAP_BYTES: usize = 50_000_000;

/// Fast field holding a document's position in sort-name order.
const SORT_RANK: &str = "sort_rank";

// Constant scores. A whole-name match outweighs any number of token hits,
// a name token outweighs any number of overview or genre hits.
const EXACT_NAME: Score = 10_000.0;
const NAME_TOKEN: Score = 100.0;
const OTHER_TOKEN: Score = 1.0;
const SHARED_GENRE: Score = 1_000.0;
const SHARED_NAME_TOKEN: Score = 1.0;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "of", "and", "in", "on", "to", "at", "for", "with", "part", "le", "la",
    "de", "der", "die", "das",
];

#[derive(Debug, Clone, Copy)]
struct Fields {
    id: Field,
    kind: Field,
    name: Field,
    name_exact: Field,
    overview: Field,
    genres: Field,
    genre_exact: Field,
    sort_rank: Field,
}

impl Fields {
    fn schema() -> (Schema, Self) {
        let mut builder = Schema::builder();
        let fields = Self {
            id: builder.add_text_field("id", STRING),
            kind: builder.add_text_field("kind", STRING),
            name: builder.add_text_field("name", TEXT),
            name_exact: builder.add_text_field("name_exact", STRING),
            overview: builder.add_text_field("overview", TEXT),
            genres: builder.add_text_field("genres", TEXT),
            genre_exact: builder.add_text_field("genre_exact", STRING),
            sort_rank: builder.add_u64_field(SORT_RANK, FAST),
        };
        (builder.build(), fields)
    }

    /// Text goes in normalized so the index tokens line up with `tokenize`.
    fn document(&self, rank: u64, doc: &SearchDocument) -> TantivyDocument {
        let mut out = TantivyDocument::default();
        out.add_text(self.id, &doc.id);
        out.add_text(self.kind, doc.kind.as_str());
        out.add_text(self.name, normalize(&doc.name));
        out.add_text(self.name_exact, &doc.name_exact);
        out.add_text(self.overview, normalize(&doc.overview));
        for genre in &doc.genres {
            let genre = normalize(genre);
            if genre.is_empty() {
                continue;
            }
            out.add_text(self.genres, &genre);
            out.add_text(self.genre_exact, genre);
        }
        out.add_u64(self.sort_rank, rank);
        out
    }
}

/// A committed in-RAM tantivy index and the searcher over it.
struct Engine {
    searcher: Searcher,
    fields: Fields,
}

impl Engine {
    /// One writer, one commit. Any failure leaves nothing behind.
    fn build(docs: &[SearchDocument]) -> Result<Self, SearchError> {
        let (schema, fields) = Fields::schema();
        let index = Index::create_in_ram(schema);
        let mut writer: IndexWriter = index.writer_with_num_threads(1, WRITER_HEAP_BYTES)?;
        for (rank, doc) in docs.iter().enumerate() {
            writer.add_document(fields.document(rank as u64, doc))?;
        }
        writer.commit()?;
        let reader = index.reader()?;
        Ok(Self {
            searcher: reader.searcher(),
            fields,
        })
    }

    /// Sort ranks of the best `limit` hits. Equal scores go to the lower rank.
    fn top_ranks(&self, query: &dyn Query, limit: usize) -> Vec<usize> {
        let collector = TopDocs::with_limit(limit).tweak_score(|segment: &SegmentReader| {
            let ranks = segment.fast_fields().u64(SORT_RANK).ok();
            move |doc: DocId, score: Score| {
                let rank = ranks.as_ref().and_then(|c| c.first(doc)).unwrap_or(u64::MAX);
                (score, Reverse(rank))
            }
        });
        match self.searcher.search(query, &collector) {
            Ok(hits) => hits
                .into_iter()
                .filter_map(|((_, Reverse(rank)), _)| usize::try_from(rank).ok())
                .collect(),
            Err(e) => {
                tracing::warn!(error = %e, "search query failed");
                Vec::new()
            }
        }
    }
}

fn constant(query: Box<dyn Query>, score: Score) -> Box<dyn Query> {
    Box::new(ConstScoreQuery::new(query, score))
}

fn term_query(field: Field, text: &str) -> Box<dyn Query> {
    Box::new(TermQuery::new(
        Term::from_field_text(field, text),
        IndexRecordOption::Basic,
    ))
}

/// Exact term for short tokens, prefix match otherwise.
fn token_query(field: Field, token: &str) -> Box<dyn Query> {
    if token.chars().count() >= MIN_PREFIX_LEN {
        Box::new(FuzzyTermQuery::new_prefix(
            Term::from_field_text(field, token),
            0,
            true,
        ))
    } else {
        term_query(field, token)
    }
}

/// Immutable full-text index over one batch of documents.
///
/// Built in one go and never modified afterwards; a rebuild produces a new
/// instance. Documents are kept in sort-name order next to the tantivy
/// index so lookups by id never touch stored fields.
#[derive(Default)]
pub struct SearchIndex {
    docs: Vec<SearchDocument>,
    by_id: HashMap<String, usize>,
    engine: Option<Engine>,
}

impl fmt::Debug for SearchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchIndex")
            .field("documents", &self.docs.len())
            .finish_non_exhaustive()
    }
}

impl SearchIndex {
    /// Build an index from a complete batch. Either every document is
    /// indexed or an error is returned and nothing is built.
    pub fn index_batch<I>(documents: I) -> Result<Self, SearchError>
    where
        I: IntoIterator<Item = SearchDocument>,
    {
        let mut docs = Vec::new();
        let mut seen = HashSet::new();
        for doc in documents {
            if doc.id.trim().is_empty() {
                return Err(SearchError::EmptyId);
            }
            if !seen.insert(doc.id.clone()) {
                return Err(SearchError::DuplicateId(doc.id));
            }
            docs.push(doc);
        }
        docs.sort_by(|a, b| a.sort_name.cmp(&b.sort_name).then_with(|| a.id.cmp(&b.id)));

        let engine = if docs.is_empty() {
            None
        } else {
            Some(Engine::build(&docs)?)
        };
        let by_id = docs
            .iter()
            .enumerate()
            .map(|(slot, doc)| (doc.id.clone(), slot))
            .collect();
        tracing::debug!(documents = docs.len(), "search index built");
        Ok(Self {
            docs,
            by_id,
            engine,
        })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&SearchDocument> {
        self.by_id.get(id).map(|&slot| &self.docs[slot])
    }

    /// Every document, in sort-name order.
    pub fn documents(&self) -> impl Iterator<Item = &SearchDocument> {
        self.docs.iter()
    }

    fn ids(&self, ranks: Vec<usize>) -> Vec<String> {
        ranks
            .into_iter()
            .filter_map(|rank| self.docs.get(rank))
            .map(|doc| doc.id.clone())
            .collect()
    }

    /// Ids matching `term`, most relevant first.
    ///
    /// A document whose whole name equals the query ranks first; then
    /// documents by the number of query tokens found in their name, then by
    /// tokens found only in overview or genres. Ties go to the sort name.
    pub fn search(&self, term: &str, limit: usize) -> Vec<String> {
        let tokens = tokenize(term);
        let Some(engine) = &self.engine else {
            return Vec::new();
        };
        if tokens.is_empty() || limit == 0 {
            return Vec::new();
        }
        let f = engine.fields;

        let mut clauses: Vec<(Occur, Box<dyn Query>)> = vec![(
            Occur::Should,
            constant(term_query(f.name_exact, &normalize(term)), EXACT_NAME),
        )];
        for token in &tokens {
            // best field per token, so a name hit is not also counted as overview
            let per_field = DisjunctionMaxQuery::new(vec![
                constant(token_query(f.name, token), NAME_TOKEN),
                constant(token_query(f.overview, token), OTHER_TOKEN),
                constant(token_query(f.genres, token), OTHER_TOKEN),
            ]);
            clauses.push((Occur::Should, Box::new(per_field)));
        }
        self.ids(engine.top_ranks(&BooleanQuery::new(clauses), limit))
    }

    /// Ids of documents of the same kind resembling `reference`, closest first.
    ///
    /// Scored by shared genres, then by shared significant name tokens.
    /// The reference itself and documents sharing nothing are left out.
    pub fn similar(&self, reference: &SearchDocument, limit: usize) -> Vec<String> {
        let Some(engine) = &self.engine else {
            return Vec::new();
        };
        if limit == 0 {
            return Vec::new();
        }
        let f = engine.fields;

        let genres: HashSet<String> = reference
            .genres
            .iter()
            .map(|g| normalize(g))
            .filter(|g| !g.is_empty())
            .collect();
        let names: HashSet<String> = tokenize(&reference.name)
            .into_iter()
            .filter(|t| t.chars().count() >= MIN_PREFIX_LEN && !STOPWORDS.contains(&t.as_str()))
            .collect();

        let mut shared: Vec<(Occur, Box<dyn Query>)> = Vec::new();
        for genre in &genres {
            shared.push((Occur::Should, constant(term_query(f.genre_exact, genre), SHARED_GENRE)));
        }
        for token in &names {
            shared.push((Occur::Should, constant(term_query(f.name, token), SHARED_NAME_TOKEN)));
        }
        if shared.is_empty() {
            return Vec::new();
        }

        let query = BooleanQuery::new(vec![
            (Occur::Must, Box::new(BooleanQuery::new(shared)) as Box<dyn Query>),
            (Occur::Must, constant(term_query(f.kind, reference.kind.as_str()), 0.0)),
            (Occur::MustNot, term_query(f.id, &reference.id)),
        ]);
        self.ids(engine.top_ranks(&query, limit))
    }
}
