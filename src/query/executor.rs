//! Runs compiled queries against a backend and assembles result rows.

use crate::error::{InvalidExtent, SearchError};
use crate::index::body::{Field, SearchQuery, SearchRequest, Sort};
use crate::index::types::{Domain, Record};
use crate::index::SearchBackend;
use crate::mime;
use crate::plugins::core::PathFilter;
use crate::plugins::{PluginSet, RankedSearcher};
use crate::query::compiler::{build_predicate, compile_terms, compose, FilterGroups};
use crate::query::filters::Filter;
use crate::query::highlight::{highlight, Extent};
use crate::query::parser::Term;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::iter::Peekable;
use std::sync::{Arc, OnceLock};
use std::vec::IntoIter;

/// Boost given to any path containing the promoted term
const SUBSTRING_BOOST: f32 = 0.5;

/// Boost given to paths with a segment equal to the promoted term
const SEGMENT_BOOST: f32 = 2.0;

/// Hits asked for per direct-search probe; two is enough to see ambiguity
const DIRECT_PROBE_SIZE: usize = 2;

/// A highlighted line of a result row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineRow {
    pub number: u32,
    pub line: String,
}

/// One result: a file or folder, with matching lines for line queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRow {
    pub icon: String,
    /// Highlighted path
    pub path: String,
    pub lines: Vec<LineRow>,
}

/// Path rows promoted above the regular results
#[derive(Debug)]
pub struct Promoted {
    pub total: u64,
    pub rows: Rows,
    /// Query that reproduces the promoted rows on its own
    pub query: String,
}

/// Output of [`Query::mixed_results`]
#[derive(Debug)]
pub struct MixedResults {
    pub promoted: Option<Promoted>,
    pub total: u64,
    pub rows: Rows,
}

/// A parsed and compiled query bound to a backend
pub struct Query<'a> {
    backend: &'a dyn SearchBackend,
    plugins: Arc<PluginSet>,
    terms: Vec<Term>,
    filters: FilterGroups,
    single_term: OnceLock<Option<usize>>,
    parallel_direct_search: bool,
}

impl<'a> Query<'a> {
    /// Parse `querystr` with the grammar of `plugins` and instantiate filters
    pub fn new(
        backend: &'a dyn SearchBackend,
        querystr: &str,
        plugins: Arc<PluginSet>,
    ) -> Result<Self, SearchError> {
        let terms = plugins.grammar().parse(querystr)?;
        let filters = compile_terms(&terms, &plugins);
        Ok(Self {
            backend,
            plugins,
            terms,
            filters,
            single_term: OnceLock::new(),
            parallel_direct_search: false,
        })
    }

    /// Probe direct searchers concurrently
    pub fn with_parallel_direct_search(mut self, parallel: bool) -> Self {
        self.parallel_direct_search = parallel;
        self
    }

    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    /// Filters per term, parallel to [`terms`](Self::terms)
    pub fn filters(&self) -> &FilterGroups {
        &self.filters
    }

    pub fn plugins(&self) -> &PluginSet {
        &self.plugins
    }

    /// The one non-negated text term, if there is exactly one
    pub fn single_text_term(&self) -> Option<&Term> {
        let mut text_terms = self.terms.iter().filter(|t| t.is_text() && !t.not);
        match (text_terms.next(), text_terms.next()) {
            (Some(term), None) => Some(term),
            _ => None,
        }
    }

    /// The query's only term, if it is a non-negated text term
    pub fn single_term(&self) -> Option<&Term> {
        let index = self.single_term.get_or_init(|| match self.terms.as_slice() {
            [term] if term.is_text() && !term.not => Some(0),
            _ => None,
        });
        index.map(|i| &self.terms[i])
    }

    /// Run the query; rows are sorted by path, then line number.
    ///
    /// The total counts every match regardless of `offset` and `limit`.
    pub fn results(&self, offset: usize, limit: usize) -> Result<(u64, Rows), SearchError> {
        let (groups, composed) = compose(&self.filters).inspect_err(|e| {
            tracing::warn!(reason = %e.reason, "bad term in query");
        })?;
        tracing::debug!(domain = %composed.domain, terms = self.terms.len(), "running query");

        let sort = match composed.domain {
            Domain::Line => Sort::PathThenLine,
            Domain::File => Sort::Path,
        };
        let request = SearchRequest {
            query: SearchQuery::filtered(composed.predicate),
            domain: composed.domain,
            sort,
            offset,
            limit,
        };
        self.search_rows(&request, &groups)
    }

    /// Paths matching `term`, best matches first.
    ///
    /// Every term's file-domain filters still apply. Paths with a segment
    /// equal to the term rank above paths merely containing it. Also returns
    /// the query string that would produce the same rows.
    pub fn promoted_paths(&self, term: &Term, limit: usize) -> Result<(u64, Rows, String), SearchError> {
        let mut file_filters: FilterGroups = self
            .filters
            .iter()
            .map(|group| {
                group
                    .iter()
                    .filter(|f| f.domain() == Domain::File)
                    .cloned()
                    .collect()
            })
            .collect();
        file_filters.push(vec![Arc::new(PathFilter::new(term)) as Arc<dyn Filter>]);

        let filter = build_predicate(&file_filters, Domain::File)?;
        let substring = SearchQuery::constant_score(SearchQuery::filtered(filter.clone()), SUBSTRING_BOOST);
        let segment_match = SearchQuery::constant_score(
            SearchQuery::Match {
                field: Field::PathSegments {
                    lower: !term.case_sensitive,
                },
                text: term.arg.clone(),
            },
            SEGMENT_BOOST,
        );
        let segment = match filter {
            Some(filter) => SearchQuery::Filtered {
                query: Box::new(segment_match),
                filter,
            },
            None => segment_match,
        };

        let request = SearchRequest {
            query: SearchQuery::DisMax {
                queries: vec![substring, segment],
            },
            domain: Domain::File,
            sort: Sort::Score,
            offset: 0,
            limit,
        };
        let (total, rows) = self.search_rows(&request, &file_filters)?;

        let canonical = file_filters
            .iter()
            .flatten()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(" ");
        Ok((total, rows, canonical))
    }

    /// A single result the query unambiguously names: `(path, line)`.
    ///
    /// Only queries consisting of one non-negated text term qualify. Direct
    /// searchers are consulted in priority order; the first to find exactly
    /// one record wins, and one that finds several ends the search empty.
    pub fn direct_result(&self) -> Result<Option<(String, Option<u32>)>, SearchError> {
        let Some(term) = self.single_text_term() else {
            return Ok(None);
        };
        if self.terms.len() > 1 {
            return Ok(None);
        }

        let searchers = self.plugins.direct_searchers();
        if self.parallel_direct_search {
            let outcomes: Vec<Result<Probe, SearchError>> = searchers
                .par_iter()
                .map(|searcher| self.probe(searcher, term))
                .collect();
            for outcome in outcomes {
                if let Some(found) = outcome?.decided() {
                    return Ok(found);
                }
            }
        } else {
            for searcher in searchers {
                if let Some(found) = self.probe(searcher, term)?.decided() {
                    return Ok(found);
                }
            }
        }
        Ok(None)
    }

    fn probe(&self, ranked: &RankedSearcher, term: &Term) -> Result<Probe, SearchError> {
        let searcher = &ranked.searcher;
        let Some(clause) = searcher.probe(term) else {
            return Ok(Probe::Skipped);
        };
        let request = SearchRequest {
            query: SearchQuery::filtered(Some(clause)),
            domain: searcher.domain,
            sort: Sort::Unsorted,
            offset: 0,
            limit: DIRECT_PROBE_SIZE,
        };
        let hits = self.backend.search(&request)?;
        tracing::trace!(
            plugin = %ranked.plugin,
            searcher = %searcher.name,
            hits = hits.records.len(),
            "direct search probe"
        );

        let mut records = hits.records.into_iter();
        Ok(match (records.next(), records.next()) {
            (None, _) => Probe::Missed,
            (Some(record), None) => {
                let line = match searcher.domain {
                    Domain::Line => record.number,
                    Domain::File => None,
                };
                Probe::Found(record.path, line)
            }
            (Some(_), Some(_)) => Probe::Ambiguous,
        })
    }

    /// Promoted paths (on the first page of single-term queries) and results
    pub fn mixed_results(
        &self,
        offset: usize,
        limit: usize,
        promote_limit: usize,
    ) -> Result<MixedResults, SearchError> {
        let promoted = match self.single_term() {
            Some(term) if offset == 0 && promote_limit > 0 => {
                match self.promoted_paths(term, promote_limit) {
                    Ok((total, rows, query)) => Some(Promoted { total, rows, query }),
                    // Text that is not a valid glob still searches as text
                    Err(SearchError::BadTerm(e)) => {
                        tracing::debug!(reason = %e.reason, "skipping path promotion");
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
            _ => None,
        };

        let (total, rows) = self.results(offset, limit)?;
        Ok(MixedResults { promoted, total, rows })
    }

    fn search_rows(&self, request: &SearchRequest, groups: &FilterGroups) -> Result<(u64, Rows), SearchError> {
        tracing::debug!(body = %request.to_json(), "search request");
        let hits = self.backend.search(request)?;
        let highlighters = groups.iter().flatten().cloned().collect();
        Ok((hits.total, Rows::new(hits.records, highlighters, request.domain)))
    }
}

/// Result of one direct-search probe
enum Probe {
    Skipped,
    Missed,
    Found(String, Option<u32>),
    Ambiguous,
}

impl Probe {
    /// `Some` when this probe settles the direct search
    fn decided(self) -> Option<Option<(String, Option<u32>)>> {
        match self {
            Probe::Skipped | Probe::Missed => None,
            Probe::Found(path, line) => Some(Some((path, line))),
            Probe::Ambiguous => Some(None),
        }
    }
}

/// Lazily highlighted result rows, consumed once
pub struct Rows {
    records: Peekable<IntoIter<Record>>,
    highlighters: Vec<Arc<dyn Filter>>,
    domain: Domain,
}

impl Rows {
    fn new(records: Vec<Record>, highlighters: Vec<Arc<dyn Filter>>, domain: Domain) -> Self {
        Self {
            records: records.into_iter().peekable(),
            highlighters,
            domain,
        }
    }

    fn path_extents(&self, record: &Record) -> Vec<Extent> {
        non_empty(self.highlighters.iter().flat_map(|h| h.highlight_path(record)))
    }

    fn content_extents(&self, record: &Record) -> Vec<Extent> {
        non_empty(self.highlighters.iter().flat_map(|h| h.highlight_content(record)))
    }

    fn line_row(&mut self, first: Record) -> Result<SearchRow, InvalidExtent> {
        let path = highlight(&first.path, self.path_extents(&first))?;
        let icon = mime::icon(&first.path, first.is_binary).to_string();

        let mut lines = Vec::new();
        let mut next = Some(first);
        while let Some(mut record) = next {
            if let Some(content) = record.content.as_mut() {
                let len = content.trim_end_matches(['\r', '\n']).len();
                content.truncate(len);
            }
            let extents = self.content_extents(&record);
            lines.push(LineRow {
                number: record.number.unwrap_or(0),
                line: highlight(record.content.as_deref().unwrap_or(""), extents)?,
            });
            next = self.records.next_if(|r| r.path == record.path);
        }

        Ok(SearchRow { icon, path, lines })
    }

    fn file_row(&self, record: Record) -> Result<SearchRow, InvalidExtent> {
        let icon = if record.is_folder {
            mime::FOLDER
        } else {
            mime::icon(&record.path, record.is_binary)
        };
        Ok(SearchRow {
            icon: icon.to_string(),
            path: highlight(&record.path, self.path_extents(&record))?,
            lines: Vec::new(),
        })
    }
}

impl Iterator for Rows {
    type Item = Result<SearchRow, SearchError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = self.records.next()?;
        let row = match self.domain {
            Domain::Line => self.line_row(record),
            Domain::File => self.file_row(record),
        };
        Some(row.map_err(SearchError::from))
    }
}

impl fmt::Debug for Rows {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rows")
            .field("domain", &self.domain)
            .field("remaining", &self.records.len())
            .finish()
    }
}

/// Drop zero-width extents; inverted ones are left for the highlighter to reject
fn non_empty(extents: impl Iterator<Item = Extent>) -> Vec<Extent> {
    extents.filter(|(start, end)| start != end).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use crate::index::types::Needle;
    use crate::index::{MemoryIndex, SearchHits};
    use crate::plugins::Catalog;
    use std::sync::Mutex;

    fn plugins() -> Arc<PluginSet> {
        Catalog::builtin(4).plugin_set(&["core", "clang", "js"])
    }

    fn index() -> MemoryIndex {
        MemoryIndex::from_records(vec![
            Record::folder("subfolder"),
            Record::file("subfolder/sub"),
            Record::file("subfolder/subfile"),
            Record::file("c.c"),
            Record::file("ac.c"),
            Record::line("subfolder/sub", 1, "Sub\n"),
            Record::line("subfolder/subfile", 1, "Subfile\r\n"),
            Record::line("c.c", 1, "int main(void) {\n"),
            Record::line("c.c", 2, "  return frob(0);\n")
                .with_needle("c_call", Needle::new("frob", Some("frob"), 9, 13)),
            Record::line("ac.c", 7, "int frob(int x) { return x; }\n")
                .with_needle("c_function", Needle::new("frob", Some("frob"), 4, 8)),
        ])
    }

    fn collect(rows: Rows) -> Vec<SearchRow> {
        rows.collect::<Result<_, _>>().unwrap()
    }

    #[test]
    fn test_line_results_grouped_and_highlighted() {
        let index = index();
        let query = Query::new(&index, "sub", plugins()).unwrap();
        let (total, rows) = query.results(0, 100).unwrap();
        assert_eq!(total, 2);
        let rows = collect(rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].path, "subfolder/sub");
        assert_eq!(rows[0].lines, vec![LineRow { number: 1, line: "<b>Sub</b>".into() }]);
        assert_eq!(rows[1].lines[0].line, "<b>Sub</b>file");
    }

    #[test]
    fn test_consecutive_lines_share_a_row() {
        let index = index();
        let query = Query::new(&index, "path:c.c", plugins()).unwrap();
        let (_, rows) = query.results(0, 100).unwrap();
        let rows = collect(rows);
        // File domain: ac.c and c.c both contain "c.c"
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.lines.is_empty()));

        let query = Query::new(&index, "path:c.c int", plugins()).unwrap();
        let (_, rows) = query.results(0, 100).unwrap();
        let rows = collect(rows);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].path, "<b>c.c</b>");
        assert_eq!(rows[1].icon, "c");
    }

    #[test]
    fn test_total_independent_of_paging() {
        let index = index();
        let query = Query::new(&index, "path:*", plugins()).unwrap();
        let (all, _) = query.results(0, 100).unwrap();
        let (paged, rows) = query.results(1, 2).unwrap();
        assert_eq!(all, paged);
        assert_eq!(collect(rows).len(), 2);
    }

    #[test]
    fn test_promoted_paths_rank_segments_first() {
        let index = index();
        let query = Query::new(&index, "sub", plugins()).unwrap();
        let term = query.single_term().unwrap().clone();
        let (total, rows, canonical) = query.promoted_paths(&term, 5).unwrap();
        assert_eq!(total, 3);
        let paths: Vec<_> = collect(rows).into_iter().map(|r| (r.icon, r.path)).collect();
        assert_eq!(
            paths,
            vec![
                ("unknown".to_string(), "<b>sub</b>folder/<b>sub</b>".to_string()),
                ("folder".to_string(), "<b>sub</b>folder".to_string()),
                ("unknown".to_string(), "<b>sub</b>folder/<b>sub</b>file".to_string()),
            ]
        );
        assert_eq!(canonical, "path:sub");
    }

    #[test]
    fn test_promoted_paths_case_insensitive_segment() {
        let index = index();
        let query = Query::new(&index, "@c.C", plugins()).unwrap();
        let mut term = query.single_term().unwrap().clone();
        term.case_sensitive = false;
        let (_, rows, _) = query.promoted_paths(&term, 5).unwrap();
        let icons: Vec<_> = collect(rows).into_iter().map(|r| r.path).collect();
        assert_eq!(icons, vec!["<b>c.c</b>", "a<b>c.c</b>"]);
    }

    #[test]
    fn test_direct_result_identifier() {
        let index = index();
        let query = Query::new(&index, "frob", plugins()).unwrap();
        assert_eq!(query.direct_result().unwrap(), Some(("ac.c".to_string(), Some(7))));

        let parallel = Query::new(&index, "frob", plugins())
            .unwrap()
            .with_parallel_direct_search(true);
        assert_eq!(parallel.direct_result().unwrap(), Some(("ac.c".to_string(), Some(7))));
    }

    #[test]
    fn test_direct_result_exact_path_first() {
        let index = index();
        let query = Query::new(&index, "c.c", plugins()).unwrap();
        assert_eq!(query.direct_result().unwrap(), Some(("c.c".to_string(), None)));
    }

    #[test]
    fn test_direct_result_none_cases() {
        let index = index();
        for q in ["nothing_here", "frob main", "-frob", "path:c.c", ""] {
            let query = Query::new(&index, q, plugins()).unwrap();
            assert_eq!(query.direct_result().unwrap(), None, "{:?}", q);
        }
    }

    #[test]
    fn test_direct_result_ambiguous() {
        let index = MemoryIndex::from_records(vec![
            Record::line("a.c", 1, "int dup;").with_needle("c_var", Needle::new("dup", None, 4, 7)),
            Record::line("b.c", 1, "int dup;").with_needle("c_var", Needle::new("dup", None, 4, 7)),
            Record::line("c.js", 1, "var dup;").with_needle("js_var", Needle::new("dup", None, 4, 7)),
        ]);
        // clang's `var` searcher ranks ahead of js's and finds two hits
        for parallel in [false, true] {
            let query = Query::new(&index, "dup", plugins())
                .unwrap()
                .with_parallel_direct_search(parallel);
            assert_eq!(query.direct_result().unwrap(), None, "parallel: {}", parallel);
        }

        let js_only = MemoryIndex::from_records(vec![
            Record::line("c.js", 1, "var dup;").with_needle("js_var", Needle::new("dup", None, 4, 7)),
        ]);
        for parallel in [false, true] {
            let query = Query::new(&js_only, "dup", plugins())
                .unwrap()
                .with_parallel_direct_search(parallel);
            assert_eq!(query.direct_result().unwrap(), Some(("c.js".to_string(), Some(1))));
        }
    }

    #[test]
    fn test_single_term() {
        let index = index();
        assert!(Query::new(&index, "foo", plugins()).unwrap().single_term().is_some());
        assert!(Query::new(&index, "foo bar", plugins()).unwrap().single_term().is_none());
        assert!(Query::new(&index, "-foo", plugins()).unwrap().single_term().is_none());
        assert!(Query::new(&index, "path:foo", plugins()).unwrap().single_term().is_none());

        let query = Query::new(&index, "path:x foo", plugins()).unwrap();
        assert!(query.single_term().is_none());
        assert_eq!(query.single_text_term().map(|t| t.arg.as_str()), Some("foo"));
    }

    #[test]
    fn test_mixed_results_promote_on_first_page_only() {
        let index = index();
        let query = Query::new(&index, "sub", plugins()).unwrap();
        let first = query.mixed_results(0, 100, 5).unwrap();
        let promoted = first.promoted.unwrap();
        assert_eq!(promoted.query, "path:sub");
        assert_eq!(first.total, 2);

        let second = query.mixed_results(1, 100, 5).unwrap();
        assert!(second.promoted.is_none());
    }

    #[test]
    fn test_mixed_results_skip_invalid_glob_promotion() {
        let index = index();
        let query = Query::new(&index, "x[y", plugins()).unwrap();
        let mixed = query.mixed_results(0, 10, 5).unwrap();
        assert!(mixed.promoted.is_none());
    }

    #[test]
    fn test_bad_term_surfaces_reason() {
        let index = index();
        let query = Query::new(&index, "regexp:(x", plugins()).unwrap();
        let err = query.results(0, 10).unwrap_err();
        assert!(matches!(err, SearchError::BadTerm(_)));
        assert!(err.user_reason().is_some());
    }

    #[test]
    fn test_malformed_query() {
        let index = index();
        let err = Query::new(&index, "foo -", plugins()).err().unwrap();
        assert!(matches!(err, SearchError::MalformedQuery(_)));
    }

    struct FailingBackend {
        error: BackendError,
        requests: Mutex<usize>,
    }

    impl SearchBackend for FailingBackend {
        fn search(&self, _request: &SearchRequest) -> Result<SearchHits, BackendError> {
            if let Ok(mut n) = self.requests.lock() {
                *n += 1;
            }
            Err(self.error.clone())
        }
    }

    #[test]
    fn test_backend_errors_propagate_without_retry() {
        let backend = FailingBackend {
            error: BackendError::Unavailable("down".into()),
            requests: Mutex::new(0),
        };
        let query = Query::new(&backend, "foo", plugins()).unwrap();
        let err = query.results(0, 10).unwrap_err();
        assert!(matches!(err, SearchError::Backend(_)));
        assert_eq!(err.user_reason(), None);
        assert_eq!(*backend.requests.lock().unwrap(), 1);
    }

    #[test]
    fn test_malformed_body_is_bad_term() {
        let backend = FailingBackend {
            error: BackendError::Malformed("bad script".into()),
            requests: Mutex::new(0),
        };
        let query = Query::new(&backend, "foo", plugins()).unwrap();
        let err = query.results(0, 10).unwrap_err();
        assert_eq!(err.user_reason(), Some("bad script"));
    }

    struct BadExtentFilter;

    impl fmt::Display for BadExtentFilter {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("bad")
        }
    }

    impl Filter for BadExtentFilter {
        fn name(&self) -> &str {
            "bad"
        }

        fn domain(&self) -> Domain {
            Domain::File
        }

        fn filter(&self) -> Result<Option<crate::index::body::Predicate>, crate::error::BadTerm> {
            Ok(None)
        }

        fn highlight_path(&self, _record: &Record) -> Vec<Extent> {
            vec![(2, 2), (3, 1)]
        }
    }

    #[test]
    fn test_rows_surface_invalid_extents() {
        let mut rows = Rows::new(
            vec![Record::file("abcdef")],
            vec![Arc::new(BadExtentFilter) as Arc<dyn Filter>],
            Domain::File,
        );
        assert!(matches!(rows.next(), Some(Err(SearchError::InvalidExtent(_)))));
        assert!(rows.next().is_none());
    }
}
