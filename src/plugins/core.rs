//! Language-agnostic filters: path globs, plain text, regular expressions and
//! filename extensions.

use super::{DirectSearcher, FilterRegistration, Plugin};
use crate::error::BadTerm;
use crate::index::body::{Field, Predicate};
use crate::index::types::{extension_of, Domain, Record};
use crate::query::filters::{write_term, Filter};
use crate::query::highlight::Extent;
use crate::query::parser::{Term, TEXT};
use crate::utils::text::{char_boundaries, char_offset, find_extents, fold_case};
use crate::utils::trigram::glob_literal_runs;
use globset::GlobBuilder;
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::sync::{Arc, OnceLock};

pub const PLUGIN_NAME: &str = "core";

/// Priority of the exact-path direct searcher; runs before identifier lookups
pub const PATH_SEARCHER_PRIORITY: i32 = 100;

pub fn plugin() -> Plugin {
    let mut plugin = Plugin::new(PLUGIN_NAME);
    plugin.filters = vec![
        FilterRegistration::new(
            "path",
            Some("File or directory sub-path to search within. *, ? and [...] act as shell wildcards."),
            |term| Arc::new(PathFilter::new(term)),
        ),
        FilterRegistration::new(TEXT, None, |term| Arc::new(TextFilter::new(term))),
        FilterRegistration::new(
            "regexp",
            Some("Regular expression. Examples: regexp:(?i)\\bs?printf regexp:\"(three|3) mice\""),
            |term| Arc::new(RegexpFilter::new(term)),
        ),
        FilterRegistration::new(
            "ext",
            Some("Filename extension: ext:cpp. Multiple ext filters are OR'ed together."),
            |term| Arc::new(ExtFilter::new(term)),
        ),
    ];
    plugin.direct_searchers = vec![DirectSearcher::new(
        "path",
        PATH_SEARCHER_PRIORITY,
        Domain::File,
        |term| Some(Predicate::term(Field::Path, term.arg.as_str())),
    )];
    plugin
}

fn negate_if(not: bool, predicate: Predicate) -> Predicate {
    if not { Predicate::not(predicate) } else { predicate }
}

/// Codepoint extents of the non-empty matches of `re` in `text`
fn regex_extents(re: &Regex, text: &str) -> Vec<Extent> {
    let boundaries = char_boundaries(text);
    re.find_iter(text)
        .filter(|m| !m.is_empty())
        .map(|m| (char_offset(&boundaries, m.start()), char_offset(&boundaries, m.end())))
        .collect()
}

/// Translate a shell glob into an unanchored regex
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() * 2);
    let mut chars = glob.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '*' => out.push_str(".*"),
            '?' => out.push('.'),
            '[' => {
                out.push('[');
                if chars.next_if(|&c| c == '!' || c == '^').is_some() {
                    out.push('^');
                }
                // A leading ']' is a literal member of the class
                if chars.next_if_eq(&']').is_some() {
                    out.push_str("\\]");
                }
                for inner in chars.by_ref() {
                    match inner {
                        ']' => break,
                        '[' | '\\' | '&' | '~' => {
                            out.push('\\');
                            out.push(inner);
                        }
                        _ => out.push(inner),
                    }
                }
                out.push(']');
            }
            _ => {
                let mut buf = [0u8; 4];
                out.push_str(&regex::escape(ch.encode_utf8(&mut buf)));
            }
        }
    }
    out
}

/// Shell-glob match against the path
pub struct PathFilter {
    term: Term,
    regex: OnceLock<Option<Regex>>,
}

impl PathFilter {
    pub fn new(term: &Term) -> Self {
        Self {
            term: term.clone(),
            regex: OnceLock::new(),
        }
    }

    fn compiled(&self) -> Option<&Regex> {
        self.regex
            .get_or_init(|| {
                RegexBuilder::new(&glob_to_regex(&self.term.arg))
                    .case_insensitive(!self.term.case_sensitive)
                    .build()
                    .ok()
            })
            .as_ref()
    }
}

impl fmt::Display for PathFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, "path", &self.term)
    }
}

impl Filter for PathFilter {
    fn name(&self) -> &str {
        "path"
    }

    fn domain(&self) -> Domain {
        Domain::File
    }

    fn filter(&self) -> Result<Option<Predicate>, BadTerm> {
        let arg = &self.term.arg;
        // Backslash is a literal character, as in the regex translation
        GlobBuilder::new(arg)
            .backslash_escape(false)
            .build()
            .map_err(|e| BadTerm::new(format!("Invalid path pattern {:?}: {}", arg, e.kind())))?;

        let lower = !self.term.case_sensitive;
        let mut clauses: Vec<Predicate> = glob_literal_runs(arg)
            .into_iter()
            .map(|run| {
                let run = if lower { fold_case(&run) } else { run };
                Predicate::phrase(Field::PathTrigrams { lower }, run)
            })
            .collect();
        clauses.push(Predicate::regex(Field::Path, glob_to_regex(arg), lower));

        Ok(Some(negate_if(self.term.not, Predicate::And(clauses))))
    }

    fn highlight_path(&self, record: &Record) -> Vec<Extent> {
        if self.term.not {
            return Vec::new();
        }
        match self.compiled() {
            Some(re) => regex_extents(re, &record.path),
            None => Vec::new(),
        }
    }
}

/// Substring match against line content
pub struct TextFilter {
    term: Term,
}

impl TextFilter {
    pub fn new(term: &Term) -> Self {
        Self { term: term.clone() }
    }
}

impl fmt::Display for TextFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, TEXT, &self.term)
    }
}

impl Filter for TextFilter {
    fn name(&self) -> &str {
        TEXT
    }

    fn domain(&self) -> Domain {
        Domain::Line
    }

    fn filter(&self) -> Result<Option<Predicate>, BadTerm> {
        let arg = &self.term.arg;
        if arg.is_empty() {
            return Ok(None);
        }
        let lower = !self.term.case_sensitive;
        let text = if lower { fold_case(arg) } else { arg.clone() };
        Ok(Some(negate_if(
            self.term.not,
            Predicate::phrase(Field::ContentTrigrams { lower }, text),
        )))
    }

    fn highlight_content(&self, record: &Record) -> Vec<Extent> {
        match (&record.content, self.term.not) {
            (Some(content), false) => find_extents(content, &self.term.arg, self.term.case_sensitive),
            _ => Vec::new(),
        }
    }
}

/// Regular expression match against line content
pub struct RegexpFilter {
    term: Term,
    regex: Result<Regex, BadTerm>,
}

impl RegexpFilter {
    pub fn new(term: &Term) -> Self {
        let regex = RegexBuilder::new(&term.arg)
            .case_insensitive(!term.case_sensitive)
            .build()
            .map_err(|e| BadTerm::new(format!("Invalid regular expression {:?}: {}", term.arg, e)));
        Self {
            term: term.clone(),
            regex,
        }
    }
}

impl fmt::Display for RegexpFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, "regexp", &self.term)
    }
}

impl Filter for RegexpFilter {
    fn name(&self) -> &str {
        "regexp"
    }

    fn domain(&self) -> Domain {
        Domain::Line
    }

    fn filter(&self) -> Result<Option<Predicate>, BadTerm> {
        self.regex.as_ref().map_err(Clone::clone)?;
        Ok(Some(negate_if(
            self.term.not,
            Predicate::regex(Field::Content, self.term.arg.as_str(), !self.term.case_sensitive),
        )))
    }

    fn highlight_content(&self, record: &Record) -> Vec<Extent> {
        match (&self.regex, &record.content) {
            (Ok(re), Some(content)) if !self.term.not => regex_extents(re, content),
            _ => Vec::new(),
        }
    }
}

/// Exact filename extension; several of these are OR'ed together
pub struct ExtFilter {
    term: Term,
    ext: String,
}

impl ExtFilter {
    pub fn new(term: &Term) -> Self {
        Self {
            term: term.clone(),
            ext: term.arg.trim_start_matches('.').to_string(),
        }
    }
}

impl fmt::Display for ExtFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, "ext", &self.term)
    }
}

impl Filter for ExtFilter {
    fn name(&self) -> &str {
        "ext"
    }

    fn domain(&self) -> Domain {
        Domain::File
    }

    fn union_only(&self) -> bool {
        true
    }

    fn filter(&self) -> Result<Option<Predicate>, BadTerm> {
        if self.ext.is_empty() {
            return Ok(None);
        }
        Ok(Some(negate_if(
            self.term.not,
            Predicate::term(Field::Ext, self.ext.as_str()),
        )))
    }

    fn highlight_path(&self, record: &Record) -> Vec<Extent> {
        let wanted = Some(self.ext.as_str());
        // An explicit `ext` may disagree with the path; only a path suffix is marked
        if self.term.not
            || self.ext.is_empty()
            || record.extension().as_deref() != wanted
            || extension_of(&record.path).as_deref() != wanted
        {
            return Vec::new();
        }
        let len = record.path.chars().count();
        vec![(len - self.ext.chars().count(), len)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_term(arg: &str, case_sensitive: bool) -> Term {
        Term {
            case_sensitive,
            ..Term::filter("path", arg)
        }
    }

    #[test]
    fn test_glob_to_regex() {
        assert_eq!(glob_to_regex("*hi*hork*.cp?"), ".*hi.*hork.*\\.cp.");
        assert_eq!(glob_to_regex("fooba[rz]"), "fooba[rz]");
        assert_eq!(glob_to_regex("x[!ab]"), "x[^ab]");
    }

    #[test]
    fn test_path_filter_shape() {
        let pred = PathFilter::new(&path_term("*hi*hork*.cp?", false)).filter().unwrap();
        assert_eq!(
            pred,
            Some(Predicate::And(vec![
                Predicate::phrase(Field::PathTrigrams { lower: true }, "hork"),
                Predicate::phrase(Field::PathTrigrams { lower: true }, ".cp"),
                Predicate::regex(Field::Path, ".*hi.*hork.*\\.cp.", true),
            ]))
        );
    }

    #[test]
    fn test_path_filter_case_sensitive_classes() {
        let pred = PathFilter::new(&path_term("fooba[rz]", true)).filter().unwrap();
        assert_eq!(
            pred,
            Some(Predicate::And(vec![
                Predicate::phrase(Field::PathTrigrams { lower: false }, "fooba"),
                Predicate::regex(Field::Path, "fooba[rz]", false),
            ]))
        );
    }

    #[test]
    fn test_path_filter_negated() {
        let pred = PathFilter::new(&path_term("*.c", false).negated()).filter().unwrap();
        assert!(matches!(pred, Some(Predicate::Not(_))));
    }

    #[test]
    fn test_invalid_glob_is_bad_term() {
        let err = PathFilter::new(&path_term("src/[abc", false)).filter().unwrap_err();
        assert!(err.reason.contains("src/[abc"));
    }

    #[test]
    fn test_path_highlight() {
        let filter = PathFilter::new(&path_term("sub", false));
        let record = Record::file("Subfolder/sub");
        assert_eq!(filter.highlight_path(&record), vec![(0, 3), (10, 13)]);
    }

    #[test]
    fn test_text_filter() {
        let filter = TextFilter::new(&Term::text(""));
        assert_eq!(filter.filter().unwrap(), None);

        let filter = TextFilter::new(&Term::text("Sub"));
        assert_eq!(
            filter.filter().unwrap(),
            Some(Predicate::phrase(Field::ContentTrigrams { lower: false }, "Sub"))
        );
        let record = Record::line("a", 1, "Sub sub Sub");
        assert_eq!(filter.highlight_content(&record), vec![(0, 3), (8, 11)]);

        let insensitive = TextFilter::new(&Term::text("sub"));
        assert_eq!(insensitive.highlight_content(&record).len(), 3);
    }

    #[test]
    fn test_regexp_filter() {
        let filter = RegexpFilter::new(&Term::filter("regexp", "ba+r"));
        assert!(filter.filter().unwrap().is_some());
        let record = Record::line("a", 1, "foo baar bar");
        assert_eq!(filter.highlight_content(&record), vec![(4, 8), (9, 12)]);

        let bad = RegexpFilter::new(&Term::filter("regexp", "(unclosed"));
        assert!(bad.filter().is_err());
        assert!(bad.highlight_content(&record).is_empty());
    }

    #[test]
    fn test_ext_filter() {
        let filter = ExtFilter::new(&Term::filter("ext", ".cpp"));
        assert!(filter.union_only());
        assert_eq!(filter.filter().unwrap(), Some(Predicate::term(Field::Ext, "cpp")));
        assert_eq!(filter.highlight_path(&Record::file("src/main.cpp")), vec![(9, 12)]);
        assert!(filter.highlight_path(&Record::file("src/main.c")).is_empty());
        assert_eq!(filter.to_string(), "ext:.cpp");
    }

    #[test]
    fn test_ext_highlight_ignores_explicit_ext_missing_from_path() {
        let filter = ExtFilter::new(&Term::filter("ext", "cpp"));
        let bare = Record {
            ext: Some("cpp".into()),
            ..Record::file("a")
        };
        assert!(filter.highlight_path(&bare).is_empty());

        let other = Record {
            ext: Some("cpp".into()),
            ..Record::file("x.cc")
        };
        assert!(filter.highlight_path(&other).is_empty());
    }

    #[test]
    fn test_path_backslash_is_literal() {
        let filter = PathFilter::new(&path_term("a\\*b", true));
        assert!(filter.filter().is_ok());
        assert_eq!(glob_to_regex("a\\*b"), "a\\\\.*b");
        assert_eq!(filter.highlight_path(&Record::file("a\\xyz/b")), vec![(0, 7)]);
        assert!(filter.highlight_path(&Record::file("a*b")).is_empty());

        let dangling = PathFilter::new(&path_term("dir\\", true));
        assert!(dangling.filter().is_ok());
    }

    #[test]
    fn test_path_direct_searcher() {
        let plugin = plugin();
        let searcher = &plugin.direct_searchers[0];
        assert_eq!(searcher.priority, PATH_SEARCHER_PRIORITY);
        assert_eq!(
            searcher.probe(&Term::text("src/main.rs")),
            Some(Predicate::term(Field::Path, "src/main.rs"))
        );
    }
}
