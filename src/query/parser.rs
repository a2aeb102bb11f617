use crate::error::ParseError;
use crate::utils::text::has_uppercase;
use serde::Serialize;

/// Filter name given to bare and quoted runs of text
pub const TEXT: &str = "text";

/// One whitespace-separated unit of a query
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Term {
    /// Filter name, or [`TEXT`] for bare/quoted text
    pub name: String,
    pub arg: String,
    /// Prefixed with `-`
    pub not: bool,
    /// Prefixed with `+`
    pub qualified: bool,
    /// Forced with `@`, or guessed from an uppercase character in `arg`
    pub case_sensitive: bool,
}

impl Term {
    /// A plain text term with the case sensitivity guessed from `arg`
    pub fn text(arg: &str) -> Self {
        Self {
            name: TEXT.to_string(),
            arg: arg.to_string(),
            not: false,
            qualified: false,
            case_sensitive: has_uppercase(arg),
        }
    }

    /// A filter term with the case sensitivity guessed from `arg`
    pub fn filter(name: &str, arg: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::text(arg)
        }
    }

    pub fn negated(mut self) -> Self {
        self.not = true;
        self
    }

    pub fn is_text(&self) -> bool {
        self.name == TEXT
    }
}

/// Query grammar for one set of filter names.
///
/// Only filters with a description should be passed in; anything else is
/// never recognized as a `name:` prefix.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    /// Longest first, so no name is tried before a longer name it prefixes
    names: Vec<String>,
}

impl Grammar {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names.dedup();
        Self { names }
    }

    pub fn filter_names(&self) -> &[String] {
        &self.names
    }

    /// Parse a raw query string into terms, in order
    pub fn parse(&self, input: &str) -> Result<Vec<Term>, ParseError> {
        TermScanner::new(input, &self.names).parse()
    }
}

/// Parse a query string with the given grammar
pub fn parse_query(input: &str, grammar: &Grammar) -> Result<Vec<Term>, ParseError> {
    grammar.parse(input)
}

fn is_separator(ch: char) -> bool {
    ch == ' ' || ch == '\t'
}

/// Single pass scanner over a query string
struct TermScanner<'a> {
    input: &'a str,
    pos: usize,
    names: &'a [String],
}

impl<'a> TermScanner<'a> {
    fn new(input: &'a str, names: &'a [String]) -> Self {
        Self { input, pos: 0, names }
    }

    fn parse(&mut self) -> Result<Vec<Term>, ParseError> {
        let mut terms = Vec::new();

        loop {
            self.skip_separators();
            if self.is_eof() {
                break;
            }
            terms.push(self.parse_term()?);
        }

        Ok(terms)
    }

    fn parse_term(&mut self) -> Result<Term, ParseError> {
        let start = self.pos;
        let not = self.consume_char('-');
        if not && self.at_term_end() {
            return Err(ParseError::new("'-' must be followed by a term", start));
        }

        let mut term = self.parse_positive_term()?;
        term.not = not;
        Ok(term)
    }

    fn parse_positive_term(&mut self) -> Result<Term, ParseError> {
        let start = self.pos;

        if let Some(term) = self.try_filtered_term() {
            return Ok(term);
        }
        self.pos = start;

        if self.peek_char() == Some('+') && self.remaining()[1..].starts_with(is_separator)
            || self.remaining() == "+"
        {
            return Err(ParseError::new("'+' must be followed by a filter", start));
        }

        Ok(self.parse_cased_or_plain_text())
    }

    /// `+`? name `:` text, or `None` with the position left unspecified
    fn try_filtered_term(&mut self) -> Option<Term> {
        let qualified = self.consume_char('+');
        let rest = self.remaining();
        let name = self.names.iter().find(|name| rest.starts_with(name.as_str()))?;
        self.pos += name.len();
        if !self.consume_char(':') || self.at_term_end() {
            return None;
        }

        let mut term = self.parse_cased_or_plain_text();
        term.name = name.clone();
        term.qualified = qualified;
        Some(term)
    }

    /// `@` text, falling back to plain text when nothing follows the `@`
    fn parse_cased_or_plain_text(&mut self) -> Term {
        let start = self.pos;
        if self.consume_char('@') && !self.at_term_end() {
            let mut term = self.parse_text();
            term.case_sensitive = true;
            return term;
        }
        self.pos = start;
        self.parse_text()
    }

    fn parse_text(&mut self) -> Term {
        let arg = match self.peek_char() {
            Some(quote @ ('"' | '\'')) => self.parse_quoted(quote),
            _ => self.parse_bare(),
        };
        Term::text(&arg)
    }

    fn parse_bare(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek_char() {
            if is_separator(ch) {
                break;
            }
            self.advance();
        }
        self.input[start..self.pos].to_string()
    }

    /// Quoted text ends at a quote followed by a separator, a quote at the end
    /// of input, or the end of input itself. Anything else is content, so a
    /// half-typed query still means something.
    fn parse_quoted(&mut self, quote: char) -> String {
        self.advance();
        let start = self.pos;
        let mut end = None;

        while let Some(ch) = self.peek_char() {
            if ch == '\\' {
                self.advance();
                if self.peek_char() == Some(quote) {
                    self.advance();
                }
            } else if ch == quote {
                let after = self.remaining()[ch.len_utf8()..].chars().next();
                match after {
                    None => {
                        end = Some(self.pos);
                        self.advance();
                        break;
                    }
                    Some(next) if is_separator(next) => {
                        end = Some(self.pos);
                        self.advance();
                        break;
                    }
                    Some(_) => {
                        self.advance();
                        self.advance();
                    }
                }
            } else {
                self.advance();
            }
        }

        let content = &self.input[start..end.unwrap_or(self.pos)];
        let escaped = format!("\\{}", quote);
        content.replace(&escaped, &quote.to_string())
    }

    fn skip_separators(&mut self) {
        while self.peek_char().is_some_and(is_separator) {
            self.advance();
        }
    }

    fn at_term_end(&self) -> bool {
        self.peek_char().is_none_or(is_separator)
    }

    fn is_eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn consume_char(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) {
        if let Some(ch) = self.peek_char() {
            self.pos += ch.len_utf8();
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }
}
