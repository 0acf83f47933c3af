//! Lenient HTML/XHTML loader for [`MemoryDocument`].
//!
//! Tokenizes with `quick-xml` in a forgiving configuration: mismatched and
//! unmatched end tags are tolerated, HTML void elements never open a scope,
//! and an unclosed `<p>`/`<li>` is closed implicitly by the next block. Script
//! and style bodies are dropped before tokenizing since their content is not
//! markup.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::{debug, warn};

use super::{DocumentTree, Element, MemoryDocument, NodeId};
use crate::error::{ReaderError, ReaderResult};
use crate::text::cleanup::{collapse_whitespace, strip_tag_block_pair};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Opening one of these closes a `<p>` left open at the top of the stack.
const CLOSES_PARAGRAPH: &[&str] = &[
    "p", "div", "section", "article", "main", "aside", "header", "footer", "nav", "ul", "ol",
    "table", "blockquote", "pre", "h1", "h2", "h3", "h4", "h5", "h6", "form", "figure", "hr",
];

/// HTML named references outside the five XML ones.
const HTML_ENTITIES: &[(&str, char)] = &[
    ("nbsp", '\u{a0}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
    ("hellip", '\u{2026}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("ldquo", '\u{201c}'),
    ("rdquo", '\u{201d}'),
    ("laquo", '\u{ab}'),
    ("raquo", '\u{bb}'),
    ("middot", '\u{b7}'),
    ("bull", '\u{2022}'),
    ("copy", '\u{a9}'),
    ("reg", '\u{ae}'),
    ("trade", '\u{2122}'),
];

impl MemoryDocument {
    /// Build a document from HTML or XHTML source.
    ///
    /// A tokenizer error after some text has been read keeps the partial
    /// tree; an error before any text is returned as [`ReaderError::Markup`].
    /// The first `<title>` element becomes the document title.
    pub fn from_markup(markup: &str) -> ReaderResult<Self> {
        let cleaned = strip_tag_block_pair(markup, "<script", "</script>");
        let cleaned = strip_tag_block_pair(&cleaned, "<style", "</style>");

        let mut reader = Reader::from_str(&cleaned);
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut builder = TreeBuilder::default();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let element = element_from_start(&reader, &e);
                    let scoped = !VOID_ELEMENTS.contains(&element.tag.as_str());
                    builder.open(element, scoped);
                }
                Ok(Event::Empty(e)) => {
                    let element = element_from_start(&reader, &e);
                    builder.open(element, false);
                }
                Ok(Event::End(e)) => {
                    builder.close(&decode_tag_name(&reader, e.name().as_ref()));
                }
                Ok(Event::Text(e)) => {
                    let text = e.decode().map_err(|err| ReaderError::Markup {
                        message: format!("text decode: {err}"),
                    })?;
                    builder.push_text(&text);
                }
                Ok(Event::CData(e)) => {
                    let text = reader.decoder().decode(&e).map_err(|err| ReaderError::Markup {
                        message: format!("cdata decode: {err}"),
                    })?;
                    builder.push_text(&text);
                }
                Ok(Event::GeneralRef(e)) => {
                    let name = e.decode().map_err(|err| ReaderError::Markup {
                        message: format!("entity decode: {err}"),
                    })?;
                    builder.push_text(&resolve_entity(&name));
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(err) => {
                    let position = reader.error_position();
                    if builder.saw_text {
                        warn!(%err, position, "Markup error, keeping partial document");
                        break;
                    }
                    return Err(ReaderError::Markup {
                        message: format!("{err} at byte {position}"),
                    });
                }
            }
        }

        Ok(builder.finish())
    }
}

#[derive(Default)]
struct TreeBuilder {
    doc: MemoryDocument,
    stack: Vec<(NodeId, String)>,
    pending: String,
    saw_text: bool,
}

impl TreeBuilder {
    fn parent(&self) -> NodeId {
        self.stack.last().map_or(self.doc.root(), |(id, _)| *id)
    }

    fn top_is(&self, tag: &str) -> bool {
        self.stack.last().is_some_and(|(_, top)| top == tag)
    }

    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let parent = self.parent();
        self.doc.append_text(parent, &self.pending);
        self.pending.clear();
    }

    fn open(&mut self, element: Element, scoped: bool) {
        self.flush();

        let tag = element.tag.clone();
        if (CLOSES_PARAGRAPH.contains(&tag.as_str()) && self.top_is("p"))
            || (tag == "li" && self.top_is("li"))
        {
            self.stack.pop();
        }

        let parent = self.parent();
        let id = self.doc.append_element(parent, element);
        if scoped {
            self.stack.push((id, tag));
        }
    }

    fn close(&mut self, tag: &str) {
        self.flush();
        if let Some(pos) = self.stack.iter().rposition(|(_, open)| open == tag) {
            self.stack.truncate(pos);
        }
    }

    fn push_text(&mut self, text: &str) {
        if !text.trim().is_empty() {
            self.saw_text = true;
        }
        self.pending.push_str(text);
    }

    fn finish(mut self) -> MemoryDocument {
        self.flush();
        let mut doc = self.doc;

        let title = doc
            .descendants(doc.root())
            .into_iter()
            .find(|&id| doc.element(id).is_some_and(|el| el.is("title")))
            .map(|id| collapse_whitespace(&doc.text_content(id)))
            .filter(|title| !title.is_empty());
        if let Some(title) = title {
            debug!(%title, "Document title from markup");
            doc.set_title(&title);
        }
        doc
    }
}

fn decode_tag_name(reader: &Reader<&[u8]>, raw: &[u8]) -> String {
    let decoded = reader
        .decoder()
        .decode(raw)
        .map_or_else(|_| String::from_utf8_lossy(raw).into_owned(), |name| name.into_owned());
    let local = decoded.rsplit(':').next().unwrap_or(&decoded);
    local.to_ascii_lowercase()
}

fn element_from_start(reader: &Reader<&[u8]>, start: &BytesStart<'_>) -> Element {
    let mut element = Element::new(&decode_tag_name(reader, start.name().as_ref()));
    for attr in start.html_attributes().flatten() {
        let Ok(key) = reader.decoder().decode(attr.key.as_ref()) else {
            continue;
        };
        let Ok(value) = reader.decoder().decode(&attr.value) else {
            continue;
        };
        element = element.with_attr(&key, &decode_entities(&value));
    }
    element
}

/// Resolve a named or numeric reference (without `&`/`;`).
///
/// Unknown names are kept literally.
fn resolve_entity(name: &str) -> String {
    if let Some((_, c)) = HTML_ENTITIES.iter().find(|(entity, _)| *entity == name) {
        return c.to_string();
    }
    let reference = format!("&{name};");
    match quick_xml::escape::unescape(&reference) {
        Ok(resolved) => resolved.into_owned(),
        Err(_) => reference,
    }
}

/// Resolve references inside an attribute value.
fn decode_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let after = &rest[amp + 1..];
        match after.find(';').filter(|&end| end > 0 && end <= 10) {
            Some(end) => {
                out.push_str(&resolve_entity(&after[..end]));
                rest = &after[end + 1..];
            }
            None => {
                out.push('&');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}
