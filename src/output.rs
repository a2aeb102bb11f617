//! Output formatting for search results

use crate::mime;
use crate::plugins::MenuItem;
use crate::query::SearchRow;
use serde::Serialize;
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Promoted rows as rendered in JSON output
#[derive(Debug, Clone, Serialize)]
pub struct PromotedPage {
    pub total: u64,
    pub query: String,
    pub rows: Vec<SearchRow>,
}

/// One page of results as rendered in JSON output
#[derive(Debug, Clone, Serialize)]
pub struct ResultsPage {
    pub query: String,
    pub offset: usize,
    pub limit: usize,
    pub total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direct: Option<DirectHit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promoted: Option<PromotedPage>,
    pub rows: Vec<SearchRow>,
}

/// Location a query names unambiguously
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectHit {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
}

fn stdout(color: bool) -> StandardStream {
    StandardStream::stdout(if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    })
}

/// Print a results page the way a terminal user wants to read it
pub fn print_page(page: &ResultsPage, color: bool, heading: bool) -> io::Result<()> {
    let mut out = stdout(color);
    write_page(&mut out, page, heading)
}

pub fn write_page<W: WriteColor>(out: &mut W, page: &ResultsPage, heading: bool) -> io::Result<()> {
    if let Some(direct) = &page.direct {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true))?;
        write!(out, "direct: ")?;
        out.reset()?;
        match direct.line {
            Some(line) => writeln!(out, "{}:{}", direct.path, line)?,
            None => writeln!(out, "{}", direct.path)?,
        }
        writeln!(out)?;
    }

    if let Some(promoted) = &page.promoted
        && !promoted.rows.is_empty()
    {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)))?;
        writeln!(out, "{} paths ({})", promoted.total, promoted.query)?;
        out.reset()?;
        write_rows(out, &promoted.rows, heading)?;
        writeln!(out)?;
    }

    write_rows(out, &page.rows, heading)?;

    out.set_color(ColorSpec::new().set_dimmed(true))?;
    writeln!(out, "{} total", page.total)?;
    out.reset()?;
    Ok(())
}

/// Write rows; line rows list their lines under the path or prefixed by it
pub fn write_rows<W: WriteColor>(out: &mut W, rows: &[SearchRow], heading: bool) -> io::Result<()> {
    for (i, row) in rows.iter().enumerate() {
        if row.lines.is_empty() {
            write_path(out, row, false)?;
            writeln!(out)?;
            continue;
        }

        if heading {
            if i > 0 {
                // Add blank line between files
                writeln!(out)?;
            }
            write_path(out, row, true)?;
            writeln!(out)?;
        }

        for line in &row.lines {
            if !heading {
                write_path(out, row, false)?;
                write!(out, ":")?;
            }
            out.set_color(ColorSpec::new().set_fg(Some(Color::Green)))?;
            write!(out, "{}", line.number)?;
            out.reset()?;
            write!(out, ":")?;
            write_highlighted(out, &line.line)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_path<W: WriteColor>(out: &mut W, row: &SearchRow, bold: bool) -> io::Result<()> {
    let mut base = ColorSpec::new();
    base.set_fg(Some(Color::Magenta)).set_bold(bold);
    for (matched, text) in segments(&row.path) {
        if matched {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
        } else {
            out.set_color(&base)?;
        }
        write!(out, "{}", text)?;
    }
    out.reset()?;
    if row.icon == mime::FOLDER {
        write!(out, "/")?;
    }
    Ok(())
}

/// Write highlighted markup with matched spans in bold red
pub fn write_highlighted<W: WriteColor>(out: &mut W, markup: &str) -> io::Result<()> {
    for (matched, text) in segments(markup) {
        if matched {
            out.set_color(ColorSpec::new().set_fg(Some(Color::Red)).set_bold(true))?;
            write!(out, "{}", text)?;
            out.reset()?;
        } else {
            write!(out, "{}", text)?;
        }
    }
    Ok(())
}

/// Split highlighter output into `(matched, text)` runs with entities decoded
pub fn segments(markup: &str) -> Vec<(bool, String)> {
    let mut runs = Vec::new();
    let mut bold = false;
    let mut rest = markup;
    while !rest.is_empty() {
        let tag = if bold { "</b>" } else { "<b>" };
        match rest.find(tag) {
            Some(i) => {
                if i > 0 {
                    runs.push((bold, unescape_html(&rest[..i])));
                }
                rest = &rest[i + tag.len()..];
                bold = !bold;
            }
            None => {
                runs.push((bold, unescape_html(rest)));
                break;
            }
        }
    }
    runs
}

fn unescape_html(s: &str) -> String {
    s.replace("&lt;", "<").replace("&gt;", ">").replace("&amp;", "&")
}

/// Print the filter menu, one `name: description` per line
pub fn print_menu(items: &[MenuItem], color: bool) -> io::Result<()> {
    let mut out = stdout(color);
    let width = items.iter().map(|i| i.name.len()).max().unwrap_or(0);
    for item in items {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Green)).set_bold(true))?;
        write!(out, "{:>width$}", item.name, width = width)?;
        out.reset()?;
        writeln!(out, "  {}", item.description)?;
    }
    Ok(())
}

/// Print a user-facing warning to stderr
pub fn print_warning(message: &str, color: bool) -> io::Result<()> {
    let mut err = StandardStream::stderr(if color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    });
    err.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)).set_bold(true))?;
    write!(err, "warning:")?;
    err.reset()?;
    writeln!(err, " {}", message)?;
    Ok(())
}

/// Serialize any page to pretty JSON
pub fn to_json<T: Serialize>(value: &T) -> serde_json::Result<String> {
    serde_json::to_string_pretty(value)
}
