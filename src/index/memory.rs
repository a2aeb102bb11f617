//! In-memory search backend.
//!
//! Records are split into a file collection and a line collection. Each
//! collection keeps trigram postings over its paths and contents (raw and
//! case-folded) so phrase predicates can narrow the candidate set before
//! every candidate is verified against the full query.

use super::body::{Field, NeedleProperty, Predicate, SearchQuery, SearchRequest, Sort};
use super::types::{DocId, Domain, Needle, Record, Trigram};
use super::{SearchBackend, SearchHits};
use crate::error::BackendError;
use crate::utils::text::fold_case;
use crate::utils::trigram::{extract_trigrams, MIN_TRIGRAM_LEN};
use anyhow::{Context, Result};
use rayon::prelude::*;
use regex::{Regex, RegexBuilder};
use roaring::RoaringBitmap;
use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::borrow::Cow;
use std::path::Path;

type Postings = FxHashMap<Trigram, RoaringBitmap>;

/// JSON dump accepted by [`MemoryIndex::from_json`]
#[derive(Debug, Default, Deserialize)]
struct RecordDump {
    #[serde(default)]
    files: Vec<Record>,
    #[serde(default)]
    lines: Vec<Record>,
}

#[derive(Default)]
struct Collection {
    records: Vec<Record>,
    path_grams: Postings,
    path_grams_lower: Postings,
    content_grams: Postings,
    content_grams_lower: Postings,
}

impl Collection {
    fn push(&mut self, record: Record) {
        let id = self.records.len() as DocId;
        add_postings(&mut self.path_grams, record.path.as_bytes(), id);
        add_postings(&mut self.path_grams_lower, fold_case(&record.path).as_bytes(), id);
        if let Some(content) = &record.content {
            add_postings(&mut self.content_grams, content.as_bytes(), id);
            add_postings(&mut self.content_grams_lower, fold_case(content).as_bytes(), id);
        }
        self.records.push(record);
    }

    fn postings(&self, field: &Field) -> Option<&Postings> {
        match field {
            Field::PathTrigrams { lower: false } => Some(&self.path_grams),
            Field::PathTrigrams { lower: true } => Some(&self.path_grams_lower),
            Field::ContentTrigrams { lower: false } => Some(&self.content_grams),
            Field::ContentTrigrams { lower: true } => Some(&self.content_grams_lower),
            _ => None,
        }
    }
}

fn add_postings(postings: &mut Postings, bytes: &[u8], id: DocId) {
    for trigram in extract_trigrams(bytes) {
        postings.entry(trigram).or_default().insert(id);
    }
}

/// A [`SearchBackend`] holding every record in memory
#[derive(Default)]
pub struct MemoryIndex {
    files: Collection,
    lines: Collection,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from records of either domain
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut index = Self::new();
        for record in records {
            index.insert(record);
        }
        index
    }

    /// Load a `{"files": [...], "lines": [...]}` record dump
    pub fn from_json(json: &str) -> Result<Self> {
        let dump: RecordDump = serde_json::from_str(json).context("Invalid record dump")?;
        Ok(Self::from_records(dump.files.into_iter().chain(dump.lines)))
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Add one record; records with a line number go to the line collection
    pub fn insert(&mut self, record: Record) {
        match record.domain() {
            Domain::File => self.files.push(record),
            Domain::Line => self.lines.push(record),
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.records.len()
    }

    pub fn line_count(&self) -> usize {
        self.lines.records.len()
    }

    fn collection(&self, domain: Domain) -> &Collection {
        match domain {
            Domain::File => &self.files,
            Domain::Line => &self.lines,
        }
    }
}

impl SearchBackend for MemoryIndex {
    fn search(&self, request: &SearchRequest) -> Result<SearchHits, BackendError> {
        let collection = self.collection(request.domain);
        let regexes = compile_regexes(&request.query)?;
        let evaluator = Evaluator { regexes: &regexes };

        let candidates: Vec<DocId> = match narrow_query(collection, &request.query) {
            Some(bitmap) => bitmap.iter().collect(),
            None => (0..collection.records.len() as DocId).collect(),
        };
        tracing::trace!(
            domain = %request.domain,
            candidates = candidates.len(),
            of = collection.records.len(),
            "verifying candidates"
        );

        let mut scored: Vec<(DocId, f32)> = candidates
            .par_iter()
            .filter_map(|&id| {
                let record = &collection.records[id as usize];
                evaluator.score(&request.query, record).map(|score| (id, score))
            })
            .collect();

        let records = &collection.records;
        match request.sort {
            Sort::Path => scored.sort_by(|a, b| records[a.0 as usize].path.cmp(&records[b.0 as usize].path)),
            Sort::PathThenLine => scored.sort_by(|a, b| {
                let (ra, rb) = (&records[a.0 as usize], &records[b.0 as usize]);
                ra.path.cmp(&rb.path).then(ra.number.cmp(&rb.number))
            }),
            Sort::Score => scored.sort_by(|a, b| {
                b.1.total_cmp(&a.1)
                    .then_with(|| records[a.0 as usize].path.cmp(&records[b.0 as usize].path))
            }),
            Sort::Unsorted => scored.sort_by_key(|&(id, _)| id),
        }

        let total = scored.len() as u64;
        let page = scored
            .into_iter()
            .skip(request.offset)
            .take(request.limit)
            .map(|(id, _)| records[id as usize].clone())
            .collect();

        Ok(SearchHits {
            total,
            records: page,
        })
    }
}

type RegexCache<'q> = FxHashMap<(&'q str, bool), Regex>;

/// Compile every regex in the body once per request
fn compile_regexes(query: &SearchQuery) -> Result<RegexCache<'_>, BackendError> {
    let mut cache = RegexCache::default();
    let mut error = None;
    for predicate in query.predicates() {
        predicate.visit(&mut |node| {
            if let Predicate::Regex {
                pattern,
                case_insensitive,
                ..
            } = node
            {
                let key = (pattern.as_str(), *case_insensitive);
                if error.is_some() || cache.contains_key(&key) {
                    return;
                }
                match RegexBuilder::new(pattern).case_insensitive(*case_insensitive).build() {
                    Ok(re) => {
                        cache.insert(key, re);
                    }
                    Err(e) => error = Some(BackendError::Malformed(format!("invalid regular expression: {}", e))),
                }
            }
        });
    }
    match error {
        Some(e) => Err(e),
        None => Ok(cache),
    }
}

/// Candidate ids for a scored query, `None` when it cannot be narrowed
fn narrow_query(collection: &Collection, query: &SearchQuery) -> Option<RoaringBitmap> {
    match query {
        SearchQuery::MatchAll | SearchQuery::Match { .. } => None,
        SearchQuery::Filtered { query, filter } => {
            intersect(narrow_query(collection, query), narrow_predicate(collection, filter))
        }
        SearchQuery::ConstantScore { query, .. } => narrow_query(collection, query),
        SearchQuery::DisMax { queries } => {
            union_all(queries.iter().map(|q| narrow_query(collection, q)))
        }
    }
}

fn narrow_predicate(collection: &Collection, predicate: &Predicate) -> Option<RoaringBitmap> {
    match predicate {
        Predicate::And(children) => children
            .iter()
            .map(|c| narrow_predicate(collection, c))
            .fold(None, intersect),
        Predicate::Or(children) => union_all(children.iter().map(|c| narrow_predicate(collection, c))),
        Predicate::Phrase { field, text } => {
            let postings = collection.postings(field)?;
            let text: Cow<str> = if is_lower(field) {
                Cow::Owned(fold_case(text))
            } else {
                Cow::Borrowed(text)
            };
            if text.len() < MIN_TRIGRAM_LEN {
                return None;
            }
            let mut result: Option<RoaringBitmap> = None;
            for trigram in extract_trigrams(text.as_bytes()) {
                let Some(ids) = postings.get(&trigram) else {
                    return Some(RoaringBitmap::new());
                };
                result = Some(match result {
                    Some(acc) => acc & ids,
                    None => ids.clone(),
                });
            }
            result
        }
        _ => None,
    }
}

fn intersect(a: Option<RoaringBitmap>, b: Option<RoaringBitmap>) -> Option<RoaringBitmap> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a & b),
        (Some(x), None) | (None, Some(x)) => Some(x),
        (None, None) => None,
    }
}

/// Union of every branch, or `None` if any branch is unconstrained
fn union_all(branches: impl Iterator<Item = Option<RoaringBitmap>>) -> Option<RoaringBitmap> {
    let mut acc = RoaringBitmap::new();
    let mut any = false;
    for branch in branches {
        acc |= branch?;
        any = true;
    }
    any.then_some(acc)
}

fn is_lower(field: &Field) -> bool {
    matches!(
        field,
        Field::PathTrigrams { lower: true }
            | Field::PathSegments { lower: true }
            | Field::ContentTrigrams { lower: true }
            | Field::Needle {
                property: NeedleProperty::NameLower | NeedleProperty::QualnameLower,
                ..
            }
    )
}

/// Value of a scalar field, folded for the `_lower` variants
fn field_text<'r>(field: &Field, record: &'r Record) -> Option<Cow<'r, str>> {
    let raw: Cow<'r, str> = match field {
        Field::Path | Field::PathTrigrams { .. } | Field::PathSegments { .. } => Cow::Borrowed(&record.path),
        Field::Content | Field::ContentTrigrams { .. } => Cow::Borrowed(record.content.as_deref()?),
        Field::Ext => Cow::Owned(record.extension()?),
        Field::Link => Cow::Borrowed(record.link.as_deref()?),
        Field::Needle { .. } => return None,
    };
    if is_lower(field) {
        Some(Cow::Owned(fold_case(&raw)))
    } else {
        Some(raw)
    }
}

fn needle_value(needle: &Needle, property: NeedleProperty) -> Cow<'_, str> {
    match property {
        NeedleProperty::Name => Cow::Borrowed(&needle.name),
        NeedleProperty::NameLower => Cow::Owned(fold_case(&needle.name)),
        NeedleProperty::Qualname => Cow::Borrowed(needle.qualname()),
        NeedleProperty::QualnameLower => Cow::Owned(fold_case(needle.qualname())),
    }
}

struct Evaluator<'a, 'q> {
    regexes: &'a RegexCache<'q>,
}

impl Evaluator<'_, '_> {
    fn score(&self, query: &SearchQuery, record: &Record) -> Option<f32> {
        match query {
            SearchQuery::MatchAll => Some(1.0),
            SearchQuery::Filtered { query, filter } => {
                if self.matches(filter, record) {
                    self.score(query, record)
                } else {
                    None
                }
            }
            SearchQuery::ConstantScore { query, boost } => self.score(query, record).map(|_| *boost),
            SearchQuery::Match { field, text } => {
                let value = field_text(field, record)?;
                let text = if is_lower(field) { fold_case(text) } else { text.clone() };
                let tokens: Vec<&str> = match field {
                    Field::PathSegments { .. } => value.split('/').collect(),
                    _ => value.split_whitespace().collect(),
                };
                text.split(['/', ' ', '\t'])
                    .filter(|t| !t.is_empty())
                    .any(|t| tokens.contains(&t))
                    .then_some(1.0)
            }
            SearchQuery::DisMax { queries } => queries
                .iter()
                .filter_map(|q| self.score(q, record))
                .max_by(f32::total_cmp),
        }
    }

    fn matches(&self, predicate: &Predicate, record: &Record) -> bool {
        match predicate {
            Predicate::And(children) => children.iter().all(|c| self.matches(c, record)),
            Predicate::Or(children) => children.iter().any(|c| self.matches(c, record)),
            Predicate::Not(inner) => !self.matches(inner, record),
            Predicate::Exists { field } => match field {
                Field::Needle { key, .. } => !record.needles(key).is_empty(),
                _ => field_text(field, record).is_some_and(|v| !v.is_empty()),
            },
            Predicate::Term { field, value } => match field {
                Field::Needle { key, property } => record
                    .needles(key)
                    .iter()
                    .any(|n| needle_value(n, *property) == value.as_str()),
                Field::PathSegments { .. } => field_text(field, record)
                    .is_some_and(|v| v.split('/').any(|segment| segment == value.as_str())),
                _ => field_text(field, record).is_some_and(|v| v == value.as_str()),
            },
            Predicate::Phrase { field, text } => {
                let text: Cow<str> = if is_lower(field) {
                    Cow::Owned(fold_case(text))
                } else {
                    Cow::Borrowed(text)
                };
                field_text(field, record).is_some_and(|v| v.contains(text.as_ref()))
            }
            Predicate::Regex {
                field,
                pattern,
                case_insensitive,
            } => {
                let Some(re) = self.regexes.get(&(pattern.as_str(), *case_insensitive)) else {
                    return false;
                };
                let value = match field {
                    // Regexes run against the raw value; the flag handles case
                    Field::PathTrigrams { .. } | Field::PathSegments { .. } => Some(Cow::Borrowed(record.path.as_str())),
                    Field::ContentTrigrams { .. } => record.content.as_deref().map(Cow::Borrowed),
                    _ => field_text(field, record),
                };
                value.is_some_and(|v| re.is_match(&v))
            }
        }
    }
}
