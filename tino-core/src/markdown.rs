//! Content formatting: front matter parsing and markdown rendering.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;
use thiserror::Error;

use crate::output::logical_url;
use crate::record::{self, ContentRecord, Value};
use crate::tree::TreePath;

pub const FRONT_MATTER_DELIMITER: &str = "---";

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

const HIGHLIGHT_THEME: &str = "base16-ocean.dark";

#[derive(Error, Debug)]
pub enum FormatError {
    #[error("{file}:{line}: front matter entry `{text}` has no `:` separator")]
    MissingSeparator {
        file: TreePath,
        line: usize,
        text: String,
    },
    #[error("{file}:{line}: weight `{text}` is not an integer")]
    InvalidWeight {
        file: TreePath,
        line: usize,
        text: String,
    },
    #[error("{file}: front matter opened on line 1 is never closed")]
    UnclosedFrontMatter { file: TreePath },
}

/// Turn the lines of one content file into a [`ContentRecord`].
///
/// `path` is relative to the content root and is used for the computed `url`
/// and for error messages.
pub fn format_record(path: &TreePath, lines: &[String]) -> Result<ContentRecord, FormatError> {
    let (front_matter, body) = split_front_matter(path, lines)?;

    let mut record = ContentRecord::new(path.clone());
    let mut weights = BTreeMap::new();
    for (line, text) in front_matter {
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        let Some((key, value)) = text.split_once(':') else {
            return Err(FormatError::MissingSeparator {
                file: path.clone(),
                line,
                text: text.to_string(),
            });
        };
        let (key, value) = (key.trim(), value.trim());

        if key == record::TAGS {
            record.set(key, Value::Lines(parse_list(value)));
        } else if key.starts_with("weight") {
            for entry in parse_list(value) {
                let (tag, weight) = entry.split_once(':').unwrap_or(("", entry.as_str()));
                let weight = weight.trim();
                if weight.parse::<i64>().is_err() {
                    return Err(FormatError::InvalidWeight {
                        file: path.clone(),
                        line,
                        text: entry.clone(),
                    });
                }
                weights.insert(tag.trim().to_string(), Value::Scalar(weight.to_string()));
            }
        } else {
            record.set(key, Value::Scalar(unquote(value).to_string()));
        }
    }
    if !weights.is_empty() {
        record.set(record::WEIGHTS, Value::Record(weights));
    }

    let source = body.join("\n");
    let rendered = render_markdown(&source);
    record.set(
        record::BODY,
        Value::Lines(rendered.lines().map(str::to_string).collect()),
    );
    record.set(record::URL, Value::Scalar(logical_url(&record.output_path())));

    if let Some(intro) = first_prose_line(&source) {
        record.set(record::INTRO, Value::Scalar(render_markdown(intro).trim().to_string()));
    }
    if let Some(image) = first_image(&source) {
        record.set(record::IMAGE, Value::Scalar(image));
    }
    if !record.contains(record::TITLE) {
        if let Some(title) = first_heading(&source) {
            record.set(record::TITLE, Value::Scalar(title));
        }
    }

    Ok(record)
}

type NumberedLines<'a> = Vec<(usize, &'a String)>;

/// Split into numbered front matter lines and body lines.
fn split_front_matter<'a>(
    path: &TreePath,
    lines: &'a [String],
) -> Result<(NumberedLines<'a>, &'a [String]), FormatError> {
    let is_delimiter = |line: &String| line.trim_end() == FRONT_MATTER_DELIMITER;

    let (start, end) = match lines.first() {
        Some(first) if is_delimiter(first) => {
            let close = lines[1..]
                .iter()
                .position(is_delimiter)
                .ok_or_else(|| FormatError::UnclosedFrontMatter { file: path.clone() })?;
            (1, close + 1)
        }
        _ => match lines.iter().position(is_delimiter) {
            Some(close) => (0, close),
            None => return Ok((Vec::new(), lines)),
        },
    };

    let front_matter = lines[start..end]
        .iter()
        .enumerate()
        .map(|(offset, line)| (start + offset + 1, line))
        .collect();
    Ok((front_matter, &lines[end + 1..]))
}

/// `[a, "b", c]` → `["a", "b", "c"]`. No escaping: commas always split.
fn parse_list(value: &str) -> Vec<String> {
    let value = value.trim();
    let value = value
        .strip_prefix('[')
        .and_then(|v| v.strip_suffix(']'))
        .unwrap_or(value);
    value
        .split(',')
        .map(|entry| unquote(entry.trim()).to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(inner) = value
            .strip_prefix(quote)
            .and_then(|v| v.strip_suffix(quote))
        {
            return inner;
        }
    }
    value
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_HEADING_ATTRIBUTES
}

/// Render markdown to HTML, highlighting fenced code blocks that name a
/// language syntect knows.
pub fn render_markdown(source: &str) -> String {
    let events: Vec<Event> = Parser::new_ext(source, options()).collect();
    let mut processed_events = Vec::with_capacity(events.len());
    let mut i = 0;

    while i < events.len() {
        match &events[i] {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) if !lang.is_empty() => {
                let mut code = String::new();
                i += 1;
                while i < events.len() {
                    match &events[i] {
                        Event::End(TagEnd::CodeBlock) => break,
                        Event::Text(text) => code.push_str(text),
                        _ => {}
                    }
                    i += 1;
                }
                processed_events.push(Event::Html(highlight(lang, &code).into()));
            }
            event => processed_events.push(event.clone()),
        }
        i += 1;
    }

    let mut out = String::new();
    html::push_html(&mut out, processed_events.into_iter());
    out
}

fn highlight(lang: &str, code: &str) -> String {
    let plain = || format!("<pre><code>{}</code></pre>\n", html_escape::encode_text(code));
    let Some(syntax) = SYNTAX_SET.find_syntax_by_token(lang) else {
        return plain();
    };
    let Some(theme) = THEME_SET.themes.get(HIGHLIGHT_THEME) else {
        return plain();
    };
    highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).unwrap_or_else(|_| plain())
}

/// First line of the first top-level paragraph that is not just an image.
fn first_prose_line(source: &str) -> Option<&str> {
    let mut depth = 0usize;
    for (event, range) in Parser::new_ext(source, options()).into_offset_iter() {
        match event {
            Event::Start(Tag::Paragraph) if depth == 0 => {
                let line = source[range]
                    .lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty());
                if let Some(line) = line {
                    if !line.starts_with("![") {
                        return Some(line);
                    }
                }
                depth += 1;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

fn first_image(source: &str) -> Option<String> {
    Parser::new_ext(source, options()).find_map(|event| match event {
        Event::Start(Tag::Image { dest_url, .. }) => Some(dest_url.to_string()),
        _ => None,
    })
}

fn first_heading(source: &str) -> Option<String> {
    let mut in_heading = false;
    let mut text = String::new();
    for event in Parser::new_ext(source, options()) {
        match event {
            Event::Start(Tag::Heading { .. }) => in_heading = true,
            Event::End(TagEnd::Heading(_)) if in_heading => {
                return Some(text.trim().to_string());
            }
            Event::Text(t) | Event::Code(t) if in_heading => text.push_str(&t),
            _ => {}
        }
    }
    None
}
