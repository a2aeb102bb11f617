//! End-to-end query tests against a record dump of a small C++/JS tree.

use srcx::error::SearchError;
use srcx::index::build::index_tree;
use srcx::index::MemoryIndex;
use srcx::plugins::{Catalog, PluginSet};
use srcx::query::{LineRow, Query, Rows, SearchRow};
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use tempfile::TempDir;

static INDEX: OnceLock<MemoryIndex> = OnceLock::new();

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/records.json")
}

fn index() -> &'static MemoryIndex {
    INDEX.get_or_init(|| MemoryIndex::from_json_file(&fixture_path()).expect("Failed to load fixture"))
}

fn plugins() -> Arc<PluginSet> {
    Catalog::builtin(4).plugin_set(&["core", "clang", "js"])
}

fn run(querystr: &str) -> (u64, Vec<SearchRow>) {
    let query = Query::new(index(), querystr, plugins()).unwrap();
    let (total, rows) = query.results(0, 100).unwrap();
    (total, collect(rows))
}

fn collect(rows: Rows) -> Vec<SearchRow> {
    rows.collect::<Result<_, _>>().unwrap()
}

fn paths(rows: &[SearchRow]) -> Vec<&str> {
    rows.iter().map(|r| r.path.as_str()).collect()
}

#[test]
fn test_fixture_loaded() {
    assert_eq!(index().file_count(), 8);
    assert_eq!(index().line_count(), 8);
}

#[test]
fn test_empty_query_lists_files_and_folders() {
    let (total, rows) = run("");
    assert_eq!(total, 7);
    assert_eq!(
        paths(&rows),
        vec!["docs", "docs/README.md", "gen", "src", "src/app.js", "src/stack.cpp", "src/stack.h"]
    );
    assert_eq!(rows[0].icon, "folder");
    assert_eq!(rows[5].icon, "cpp");
}

#[test]
fn test_text_search_groups_lines_by_file() {
    let (total, rows) = run("push");
    assert_eq!(total, 4);
    assert_eq!(paths(&rows), vec!["src/app.js", "src/stack.cpp", "src/stack.h"]);
    assert_eq!(rows[0].lines, vec![LineRow { number: 2, line: "stack.<b>push</b>(1);".into() }]);
    assert_eq!(
        rows[1].lines,
        vec![
            LineRow { number: 10, line: "void Stack::<b>Push</b>(int value) {".into() },
            LineRow { number: 11, line: "items_.<b>push</b>_back(value);".into() },
        ]
    );
}

#[test]
fn test_uppercase_text_is_case_sensitive() {
    let (total, rows) = run("Push");
    assert_eq!(total, 2);
    assert_eq!(paths(&rows), vec!["src/stack.cpp", "src/stack.h"]);
}

#[test]
fn test_markup_is_escaped() {
    let (_, rows) = run("queue");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].lines[0].line, "# Stack &amp; <b>Queue</b> &lt;demo&gt;");
    assert_eq!(rows[0].icon, "md");
}

#[test]
fn test_qualified_function_definition() {
    let (total, rows) = run("+function:Stack::Push");
    assert_eq!(total, 1);
    assert_eq!(rows[0].path, "src/stack.cpp");
    assert_eq!(rows[0].lines[0].line, "void Stack::<b>Push</b>(int value) {");
}

#[test]
fn test_function_name_case_folded() {
    let (total, rows) = run("function:push");
    assert_eq!(total, 1);
    assert_eq!(rows[0].lines[0].number, 10);
}

#[test]
fn test_type_references() {
    let (_, rows) = run("type-ref:stack");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].lines[0].line, "void <b>Stack</b>::Push(int value) {");
}

#[test]
fn test_var_spans_languages() {
    let (total, rows) = run("var:stack");
    assert_eq!(total, 1);
    assert_eq!(rows[0].path, "src/app.js");
    assert_eq!(rows[0].lines[0].line, "var <b>stack</b> = new Stack();");
}

#[test]
fn test_ext_filters_are_unioned() {
    let (total, rows) = run("ext:h ext:js");
    assert_eq!(total, 2);
    assert_eq!(paths(&rows), vec!["src/app.<b>js</b>", "src/stack.<b>h</b>"]);
}

#[test]
fn test_link_rows_are_hidden_from_file_queries() {
    let (total, rows) = run("ext:cpp");
    assert_eq!(total, 1);
    assert_eq!(rows[0].path, "src/stack.<b>cpp</b>");
}

#[test]
fn test_negated_path_excludes_lines() {
    let (total, rows) = run("push -path:*.js");
    assert_eq!(total, 3);
    assert_eq!(paths(&rows), vec!["src/stack.cpp", "src/stack.h"]);
}

#[test]
fn test_path_glob() {
    let (_, rows) = run("path:src/*.h");
    assert_eq!(paths(&rows), vec!["<b>src/stack.h</b>"]);
}

#[test]
fn test_explicit_ext_rows_list_without_path_highlight() {
    let index = MemoryIndex::from_json(
        r#"{"files": [{"path": "a", "ext": "cpp"}, {"path": "b.cpp"}, {"path": "x.cc", "ext": "cpp"}]}"#,
    )
    .unwrap();
    let query = Query::new(&index, "ext:cpp", plugins()).unwrap();
    let (total, rows) = query.results(0, 10).unwrap();
    assert_eq!(total, 3);
    assert_eq!(paths(&collect(rows)), vec!["a", "b.<b>cpp</b>", "x.cc"]);
}

#[test]
fn test_regexp_lines() {
    let (total, rows) = run("regexp:^int\\s");
    assert_eq!(total, 1);
    assert_eq!(rows[0].lines[0].line, "<b>int </b>Stack::Size() const {");
}

#[test]
fn test_mixed_results_promote_paths() {
    let query = Query::new(index(), "stack", plugins()).unwrap();
    let mixed = query.mixed_results(0, 100, 5).unwrap();
    assert_eq!(mixed.total, 6);

    let promoted = mixed.promoted.unwrap();
    assert_eq!(promoted.total, 2);
    assert_eq!(promoted.query, "path:stack");
    let rows = collect(promoted.rows);
    assert_eq!(paths(&rows), vec!["src/<b>stack</b>.cpp", "src/<b>stack</b>.h"]);
}

#[test]
fn test_promoted_query_reproduces_promoted_rows() {
    for querystr in ["stack", "@stack", "Stack", "\"app.\""] {
        let query = Query::new(index(), querystr, plugins()).unwrap();
        let term = query.single_term().unwrap().clone();
        let (total, rows, canonical) = query.promoted_paths(&term, 100).unwrap();
        let mut promoted = paths(&collect(rows)).iter().map(|p| p.to_string()).collect::<Vec<_>>();
        promoted.sort();

        let again = Query::new(index(), &canonical, plugins()).unwrap();
        let (again_total, again_rows) = again.results(0, 100).unwrap();
        let again_rows = collect(again_rows);
        assert_eq!(total, again_total, "{:?} -> {:?}", querystr, canonical);
        assert_eq!(promoted, paths(&again_rows), "{:?} -> {:?}", querystr, canonical);
    }
}

#[test]
fn test_direct_result_by_qualified_name() {
    let query = Query::new(index(), "Stack::Push", plugins()).unwrap();
    assert_eq!(query.direct_result().unwrap(), Some(("src/stack.cpp".to_string(), Some(10))));
}

#[test]
fn test_direct_result_by_path() {
    let query = Query::new(index(), "src/stack.h", plugins()).unwrap();
    assert_eq!(query.direct_result().unwrap(), Some(("src/stack.h".to_string(), None)));
}

#[test]
fn test_direct_result_falls_through_to_js() {
    let query = Query::new(index(), "stack", plugins()).unwrap();
    assert_eq!(query.direct_result().unwrap(), Some(("src/app.js".to_string(), Some(1))));
}

#[test]
fn test_disabled_plugin_filters_read_as_text() {
    let core_only = Catalog::builtin(4).plugin_set(&["core"]);
    let query = Query::new(index(), "function:push", core_only).unwrap();
    assert_eq!(query.terms().len(), 1);
    assert!(query.terms()[0].is_text());
    let (total, _) = query.results(0, 10).unwrap();
    assert_eq!(total, 0);
}

#[test]
fn test_user_errors() {
    let err = Query::new(index(), "push -", plugins()).err().unwrap();
    assert!(matches!(err, SearchError::MalformedQuery(_)));

    let query = Query::new(index(), "regexp:[a-", plugins()).unwrap();
    let err = query.results(0, 10).unwrap_err();
    assert!(matches!(err, SearchError::BadTerm(_)));
}

#[test]
fn test_search_walked_tree() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib/hello.c"), "int hello(void);\nint main(void) { return hello(); }\n").unwrap();
    fs::write(dir.path().join("notes.txt"), "say hello\n").unwrap();

    let index = index_tree(dir.path(), true).unwrap();
    let query = Query::new(&index, "path:lib hello", plugins()).unwrap();
    let (total, rows) = query.results(0, 10).unwrap();
    assert_eq!(total, 2);
    let rows = collect(rows);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].path, "<b>lib</b>/hello.c");
    assert_eq!(rows[0].lines[1].line, "int main(void) { return <b>hello</b>(); }");
}
