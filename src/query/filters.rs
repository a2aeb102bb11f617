//! The filter abstraction every registered query filter implements.

use super::highlight::Extent;
use super::parser::{Term, TEXT};
use crate::error::BadTerm;
use crate::index::body::Predicate;
use crate::index::types::{Domain, Record};
use crate::utils::text::has_uppercase;
use std::fmt;

/// A query term bound to one filter implementation.
///
/// Instances are built per term per query and shared between the query and
/// the rows it yields.
pub trait Filter: fmt::Display + Send + Sync {
    /// Name the filter is registered under
    fn name(&self) -> &str;

    fn domain(&self) -> Domain;

    /// OR'ed with other union-only filters across all terms, rather than
    /// AND'ed positionally
    fn union_only(&self) -> bool {
        false
    }

    /// Backend predicate for this term; `Ok(None)` means no constraint
    fn filter(&self) -> Result<Option<Predicate>, BadTerm>;

    /// Codepoint extents to highlight in the record's path
    fn highlight_path(&self, _record: &Record) -> Vec<Extent> {
        Vec::new()
    }

    /// Codepoint extents to highlight in the record's content
    fn highlight_content(&self, _record: &Record) -> Vec<Extent> {
        Vec::new()
    }
}

/// Write `term` in query-language form as the filter `name`.
///
/// The output re-parses to an equivalent term: `[-][+]name:[@]arg`, with text
/// terms written without a name. Quoted text has no escape for a trailing
/// backslash, so such an arg is written bare when it can be, and otherwise
/// with its closing quote left off, which reads to the end of the input.
pub fn write_term(f: &mut fmt::Formatter<'_>, name: &str, term: &Term) -> fmt::Result {
    if term.not {
        f.write_str("-")?;
    }
    let bare = name == TEXT;
    if !bare {
        if term.qualified {
            f.write_str("+")?;
        }
        write!(f, "{}:", name)?;
    }
    if term.case_sensitive && !has_uppercase(&term.arg) {
        f.write_str("@")?;
    }
    let arg = &term.arg;
    if !needs_quotes(arg, bare) || (arg.ends_with('\\') && reads_bare(arg, bare)) {
        return f.write_str(arg);
    }
    write!(f, "\"{}", arg.replace('"', "\\\""))?;
    if arg.ends_with('\\') {
        return Ok(());
    }
    f.write_str("\"")
}

/// Whether the unquoted arg parses back as one term with this exact text
fn reads_bare(arg: &str, bare: bool) -> bool {
    !arg.is_empty()
        && !arg.contains(char::is_whitespace)
        && !arg.starts_with(['"', '\'', '@'])
        && !(bare && (arg.starts_with(['-', '+']) || arg.contains(':')))
}

fn needs_quotes(arg: &str, bare: bool) -> bool {
    if arg.is_empty() || arg.contains([' ', '\t', '"']) || arg.starts_with(['\'', '@']) {
        return true;
    }
    // Bare text could otherwise read as an operator or a filter prefix
    bare && (arg.starts_with(['-', '+']) || arg.contains(':'))
}
