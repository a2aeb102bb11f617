//! Query bodies understood by a [`SearchBackend`](super::SearchBackend).
//!
//! Two layers, mirroring a document search engine's filter/query split:
//! [`Predicate`] is a boolean filter tree that either matches a record or not,
//! [`SearchQuery`] wraps predicates into scored queries. Both serialize to
//! JSON for logging and for backends that speak JSON over the wire.

use super::types::Domain;
use serde::{Serialize, Serializer};
use std::fmt;

/// Which property of a needle a predicate looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeedleProperty {
    Name,
    NameLower,
    Qualname,
    QualnameLower,
}

/// An indexed field of a record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Field {
    Path,
    PathTrigrams { lower: bool },
    PathSegments { lower: bool },
    Content,
    ContentTrigrams { lower: bool },
    Ext,
    Link,
    Needle { key: String, property: NeedleProperty },
}

impl Field {
    pub fn needle(key: &str, property: NeedleProperty) -> Self {
        Field::Needle {
            key: key.to_string(),
            property,
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lower = |lower: bool| if lower { "_lower" } else { "" };
        match self {
            Field::Path => f.write_str("path"),
            Field::PathTrigrams { lower: l } => write!(f, "path.trigrams{}", lower(*l)),
            Field::PathSegments { lower: l } => write!(f, "path.segments{}", lower(*l)),
            Field::Content => f.write_str("content"),
            Field::ContentTrigrams { lower: l } => write!(f, "content.trigrams{}", lower(*l)),
            Field::Ext => f.write_str("ext"),
            Field::Link => f.write_str("link"),
            Field::Needle { key, property } => {
                let prop = match property {
                    NeedleProperty::Name => "name",
                    NeedleProperty::NameLower => "name.lower",
                    NeedleProperty::Qualname => "qualname",
                    NeedleProperty::QualnameLower => "qualname.lower",
                };
                write!(f, "{}.{}", key, prop)
            }
        }
    }
}

impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Boolean filter tree evaluated per record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    /// The field is present (and non-empty for multi-valued fields)
    Exists { field: Field },
    /// Exact equality with one of the field's values
    Term { field: Field, value: String },
    /// Substring match on a trigram-analyzed field
    Phrase { field: Field, text: String },
    /// Unanchored regular expression search
    Regex {
        field: Field,
        pattern: String,
        case_insensitive: bool,
    },
}

impl Predicate {
    pub fn not(inner: Predicate) -> Self {
        Predicate::Not(Box::new(inner))
    }

    pub fn term(field: Field, value: impl Into<String>) -> Self {
        Predicate::Term {
            field,
            value: value.into(),
        }
    }

    pub fn phrase(field: Field, text: impl Into<String>) -> Self {
        Predicate::Phrase {
            field,
            text: text.into(),
        }
    }

    pub fn regex(field: Field, pattern: impl Into<String>, case_insensitive: bool) -> Self {
        Predicate::Regex {
            field,
            pattern: pattern.into(),
            case_insensitive,
        }
    }

    /// Walk every node of the tree, parents before children
    pub fn visit<'a>(&'a self, f: &mut impl FnMut(&'a Predicate)) {
        f(self);
        match self {
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.visit(f);
                }
            }
            Predicate::Not(inner) => inner.visit(f),
            _ => {}
        }
    }
}

/// Scored query wrapping predicates
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchQuery {
    MatchAll,
    /// Records matching `filter`, scored by `query`
    Filtered {
        query: Box<SearchQuery>,
        filter: Predicate,
    },
    /// Records matching `query`, all scored `boost`
    ConstantScore { query: Box<SearchQuery>, boost: f32 },
    /// Analyzed match: any token of `text` equals one of the field's tokens
    Match { field: Field, text: String },
    /// Best score among the sub-queries
    DisMax { queries: Vec<SearchQuery> },
}

impl SearchQuery {
    /// Match-all narrowed by an optional predicate; `None` means unconstrained
    pub fn filtered(filter: Option<Predicate>) -> Self {
        match filter {
            Some(filter) => SearchQuery::Filtered {
                query: Box::new(SearchQuery::MatchAll),
                filter,
            },
            None => SearchQuery::MatchAll,
        }
    }

    pub fn constant_score(query: SearchQuery, boost: f32) -> Self {
        SearchQuery::ConstantScore {
            query: Box::new(query),
            boost,
        }
    }

    /// Every predicate reachable from this query
    pub fn predicates(&self) -> Vec<&Predicate> {
        let mut out = Vec::new();
        self.collect_predicates(&mut out);
        out
    }

    fn collect_predicates<'a>(&'a self, out: &mut Vec<&'a Predicate>) {
        match self {
            SearchQuery::MatchAll | SearchQuery::Match { .. } => {}
            SearchQuery::Filtered { query, filter } => {
                out.push(filter);
                query.collect_predicates(out);
            }
            SearchQuery::ConstantScore { query, .. } => query.collect_predicates(out),
            SearchQuery::DisMax { queries } => {
                for q in queries {
                    q.collect_predicates(out);
                }
            }
        }
    }
}

/// Result ordering requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sort {
    /// By path
    Path,
    /// By path, then line number
    PathThenLine,
    /// By descending score
    Score,
    /// Whatever order the backend stores records in
    Unsorted,
}

/// One round trip to the backend
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: SearchQuery,
    pub domain: Domain,
    pub sort: Sort,
    pub offset: usize,
    pub limit: usize,
}

impl SearchRequest {
    /// JSON rendering of the request, for logs
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| format!("<unserializable: {}>", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        assert_eq!(Field::PathTrigrams { lower: true }.to_string(), "path.trigrams_lower");
        assert_eq!(Field::PathSegments { lower: false }.to_string(), "path.segments");
        assert_eq!(
            Field::needle("c_function", NeedleProperty::QualnameLower).to_string(),
            "c_function.qualname.lower"
        );
    }

    #[test]
    fn test_predicate_json_shape() {
        let pred = Predicate::And(vec![
            Predicate::Or(vec![Predicate::phrase(Field::ContentTrigrams { lower: true }, "foo")]),
            Predicate::not(Predicate::Exists { field: Field::Link }),
        ]);
        let json = serde_json::to_value(&pred).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "and": [
                    {"or": [{"phrase": {"field": "content.trigrams_lower", "text": "foo"}}]},
                    {"not": {"exists": {"field": "link"}}}
                ]
            })
        );
    }

    #[test]
    fn test_filtered_none_is_match_all() {
        assert_eq!(SearchQuery::filtered(None), SearchQuery::MatchAll);
    }

    #[test]
    fn test_predicates_collects_nested_filters() {
        let filter = Predicate::term(Field::Path, "a");
        let query = SearchQuery::DisMax {
            queries: vec![
                SearchQuery::constant_score(SearchQuery::filtered(Some(filter.clone())), 0.5),
                SearchQuery::Filtered {
                    query: Box::new(SearchQuery::Match {
                        field: Field::PathSegments { lower: true },
                        text: "a".into(),
                    }),
                    filter: filter.clone(),
                },
            ],
        };
        assert_eq!(query.predicates(), vec![&filter, &filter]);
    }
}
