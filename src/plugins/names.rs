//! Filters over structural needles: definitions, references and
//! declarations recorded by language analyzers on individual lines.
//!
//! Every kind stores its needles under `{lang}_{name}` (dashes become
//! underscores). Plain name kinds match a needle's `name`; qualified kinds
//! match its `qualname` instead when the term carries a `+`.

use super::{DirectSearcher, FilterRegistration, Plugin};
use crate::error::BadTerm;
use crate::index::body::{Field, NeedleProperty, Predicate};
use crate::index::types::{Domain, Needle, Record};
use crate::query::filters::{write_term, Filter};
use crate::query::highlight::Extent;
use crate::query::parser::Term;
use crate::utils::text::fold_case;
use std::fmt;
use std::sync::Arc;

/// Priority of identifier lookups; after exact path matches
pub const IDENTIFIER_SEARCHER_PRIORITY: i32 = 200;

/// Static description of one needle filter kind
#[derive(Debug, Clone, Copy)]
pub struct NeedleKind {
    pub name: &'static str,
    pub description: &'static str,
    /// Supports `+name:Fully::Qualified`
    pub qualified: bool,
    /// Definitions that deserve a direct-result lookup
    pub identifier: bool,
    /// Needle suffix when it differs from the filter name
    pub needle: Option<&'static str>,
}

impl NeedleKind {
    pub const fn name(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            qualified: false,
            identifier: false,
            needle: None,
        }
    }

    pub const fn qualified(name: &'static str, description: &'static str) -> Self {
        Self {
            qualified: true,
            ..Self::name(name, description)
        }
    }

    pub const fn identifier(self) -> Self {
        Self {
            identifier: true,
            ..self
        }
    }

    pub const fn stored_as(self, needle: &'static str) -> Self {
        Self {
            needle: Some(needle),
            ..self
        }
    }

    /// Key the needles of this kind are stored under for `lang`
    pub fn needle_key(&self, lang: &str) -> String {
        format!("{}_{}", lang, self.needle.unwrap_or(self.name)).replace('-', "_")
    }
}

/// Register filters, and direct searchers for identifier kinds, on `plugin`
pub fn register(plugin: &mut Plugin, lang: &str, kinds: &[NeedleKind]) {
    for &kind in kinds {
        let key = kind.needle_key(lang);
        let filter_lang = lang.to_string();
        let filter_key = key.clone();
        plugin.filters.push(
            FilterRegistration::new(kind.name, Some(kind.description), move |term| {
                Arc::new(NeedleFilter::new(term, kind, &filter_lang, &filter_key))
            })
            .with_lang(lang),
        );

        if kind.identifier {
            let property = if kind.qualified {
                NeedleProperty::Qualname
            } else {
                NeedleProperty::Name
            };
            plugin.direct_searchers.push(DirectSearcher::new(
                kind.name,
                IDENTIFIER_SEARCHER_PRIORITY,
                Domain::Line,
                move |term| Some(Predicate::term(Field::needle(&key, property), term.arg.as_str())),
            ));
        }
    }
}

/// A needle filter bound to one term
pub struct NeedleFilter {
    term: Term,
    kind: NeedleKind,
    lang: String,
    key: String,
}

impl NeedleFilter {
    pub fn new(term: &Term, kind: NeedleKind, lang: &str, key: &str) -> Self {
        Self {
            term: term.clone(),
            kind,
            lang: lang.to_string(),
            key: key.to_string(),
        }
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    /// Needle property the term compares against
    fn property(&self) -> NeedleProperty {
        let qualname = self.kind.qualified && self.term.qualified;
        match (qualname, self.term.case_sensitive) {
            (false, true) => NeedleProperty::Name,
            (false, false) => NeedleProperty::NameLower,
            (true, true) => NeedleProperty::Qualname,
            (true, false) => NeedleProperty::QualnameLower,
        }
    }

    fn value(&self) -> String {
        if self.term.case_sensitive {
            self.term.arg.clone()
        } else {
            fold_case(&self.term.arg)
        }
    }

    fn matches(&self, needle: &Needle, value: &str) -> bool {
        match self.property() {
            NeedleProperty::Name => needle.name == value,
            NeedleProperty::NameLower => fold_case(&needle.name) == value,
            NeedleProperty::Qualname => needle.qualname() == value,
            NeedleProperty::QualnameLower => fold_case(needle.qualname()) == value,
        }
    }
}

impl fmt::Display for NeedleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_term(f, self.kind.name, &self.term)
    }
}

impl Filter for NeedleFilter {
    fn name(&self) -> &str {
        self.kind.name
    }

    fn domain(&self) -> Domain {
        Domain::Line
    }

    fn filter(&self) -> Result<Option<Predicate>, BadTerm> {
        let predicate = Predicate::term(Field::needle(&self.key, self.property()), self.value());
        Ok(Some(if self.term.not {
            Predicate::not(predicate)
        } else {
            predicate
        }))
    }

    fn highlight_content(&self, record: &Record) -> Vec<Extent> {
        if self.term.not {
            return Vec::new();
        }
        let value = self.value();
        record
            .needles(&self.key)
            .iter()
            .filter(|needle| self.matches(needle, &value))
            .map(|needle| (needle.start, needle.end))
            .collect()
    }
}
