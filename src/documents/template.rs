//! `{TAG}` template rendering for `.docx` files.
//!
//! Templates use single-brace tags: `{NAME}` substitutes a value,
//! `{#NAME}...{/NAME}` repeats a section once per element of an array (or
//! once for a truthy scalar) and `{^NAME}...{/NAME}` renders only when the
//! value is empty. Rendering runs in three passes over each XML part:
//!
//! 1. text split by Word across several runs is moved back so every tag
//!    sits inside a single `w:t`;
//! 2. tags are cut out of the text and loops are resolved to the range of
//!    sibling elements they repeat (a whole table row when the open and
//!    close tags sit in different cells of that row, otherwise the
//!    children of their closest common ancestor);
//! 3. the resulting item tree is evaluated against a scope stack.
//!
//! A paragraph that holds nothing but a loop tag is dropped from the output.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::Value;
use thiserror::Error;

use super::common::escape_xml;
use super::ooxml::{drawing_run_xml, write_package, ImageData, EMU_PER_CM, REL_IMAGE};
use super::placeholders::PlaceholderMap;
use super::DocumentError;

const DOCUMENT_PART: &str = "word/document.xml";
const RELS_PART: &str = "word/_rels/document.xml.rels";
const CONTENT_TYPES_PART: &str = "[Content_Types].xml";
const CONTEXT_CHARS: usize = 20;
const DATA_URL_IMAGE_PREFIX: &str = "data:image/";

/// Display size of an injected data-URL image, in centimetres.
const INJECTED_IMAGE_WIDTH_CM: f64 = 4.5;
const INJECTED_IMAGE_HEIGHT_CM: f64 = 1.8;

/// Errors found in a template's tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("not a valid docx archive: {0}")]
    InvalidArchive(String),
    #[error("word/document.xml is missing")]
    MissingDocument,
    #[error("malformed XML in {part}: {message}")]
    Xml { part: String, message: String },
    #[error("unclosed tag {tag} near \"{context}\"")]
    Unclosed { tag: String, context: String },
    #[error("tag {tag} contains another opening brace near \"{context}\"")]
    Nested { tag: String, context: String },
    #[error("empty tag near \"{context}\"")]
    Empty { context: String },
    #[error("section {{#{tag}}} is never closed near \"{context}\"")]
    UnmatchedOpen { tag: String, context: String },
    #[error("closing tag {{/{tag}}} has no matching opening tag near \"{context}\"")]
    UnmatchedClose { tag: String, context: String },
    #[error("section {{#{expected}}} closed by {{/{found}}} near \"{context}\"")]
    Mismatched {
        expected: String,
        found: String,
        context: String,
    },
    #[error("section {tag} overlaps another section near \"{context}\"")]
    Overlapping { tag: String, context: String },
    #[error("unknown tag {tag} near \"{context}\"")]
    Unknown { tag: String, context: String },
}

#[derive(Debug, Clone, PartialEq)]
enum TagKind {
    Var(String),
    Open { name: String, inverted: bool },
    Close(String),
}

#[derive(Debug, Clone)]
struct Tag {
    kind: TagKind,
    context: String,
}

#[derive(Debug, Clone)]
enum Token {
    Start { name: String, attrs: Vec<(String, String)> },
    Empty { name: String, attrs: Vec<(String, String)> },
    End { name: String },
    /// Character data; `in_t` when the direct parent is a `w:t`.
    Text { value: String, in_t: bool },
    Raw(String),
    Tag(Tag),
}

impl Token {
    fn element_name(&self) -> Option<&str> {
        match self {
            Token::Start { name, .. } | Token::Empty { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Item {
    Token(usize),
    Var(String),
    Loop {
        name: String,
        inverted: bool,
        body: Vec<Item>,
    },
}

#[derive(Debug, Clone)]
struct LoopSpan {
    name: String,
    inverted: bool,
    context: String,
    /// Half-open token range replaced by the loop output.
    range: (usize, usize),
    /// Half-open token range repeated for every element.
    body: (usize, usize),
}

fn xml_error(part: &str, err: impl std::fmt::Display) -> TemplateError {
    TemplateError::Xml {
        part: part.to_string(),
        message: err.to_string(),
    }
}

fn read_element(part: &str, e: &BytesStart<'_>) -> Result<(String, Vec<(String, String)>), TemplateError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attrs = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| xml_error(part, err))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| xml_error(part, err))?
            .into_owned();
        attrs.push((key, value));
    }
    Ok((name, attrs))
}

fn tokenize(part: &str, xml: &str) -> Result<Vec<Token>, TemplateError> {
    let mut reader = Reader::from_str(xml);
    let mut tokens = Vec::new();
    let mut open: Vec<String> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let (name, attrs) = read_element(part, &e)?;
                open.push(name.clone());
                tokens.push(Token::Start { name, attrs });
            }
            Ok(Event::Empty(e)) => {
                let (name, attrs) = read_element(part, &e)?;
                tokens.push(Token::Empty { name, attrs });
            }
            Ok(Event::End(e)) => {
                open.pop();
                tokens.push(Token::End {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                });
            }
            Ok(Event::Text(e)) => {
                let value = e.unescape().map_err(|err| xml_error(part, err))?.into_owned();
                let in_t = open.last().map(|n| n == "w:t").unwrap_or(false);
                tokens.push(Token::Text { value, in_t });
            }
            Ok(Event::CData(e)) => {
                tokens.push(Token::Raw(format!("<![CDATA[{}]]>", String::from_utf8_lossy(&e))))
            }
            Ok(Event::Comment(e)) => {
                tokens.push(Token::Raw(format!("<!--{}-->", String::from_utf8_lossy(&e))))
            }
            Ok(Event::PI(e)) => tokens.push(Token::Raw(format!("<?{}?>", String::from_utf8_lossy(&e)))),
            Ok(Event::DocType(e)) => {
                tokens.push(Token::Raw(format!("<!DOCTYPE {}>", String::from_utf8_lossy(&e))))
            }
            Ok(Event::Decl(_)) => {}
            Ok(Event::Eof) => break,
            Err(err) => return Err(xml_error(part, err)),
        }
    }
    Ok(tokens)
}

/// Byte offset of an opening brace that has no closing brace after it.
fn unclosed_open(text: &str) -> Option<usize> {
    let pos = text.rfind('{')?;
    if text[pos..].contains('}') {
        None
    } else {
        Some(pos)
    }
}

/// Move the tail of tags split across several `w:t` into the segment
/// where the tag starts.
fn merge_split_tags(texts: &mut [String]) {
    let mut i = 0;
    while i < texts.len() {
        if unclosed_open(&texts[i]).is_none() {
            i += 1;
            continue;
        }
        let mut closed = false;
        for j in i + 1..texts.len() {
            if let Some(close) = texts[j].find('}') {
                let moved: String = texts[j][..=close].to_string();
                texts[j] = texts[j][close + 1..].to_string();
                texts[i].push_str(&moved);
                closed = true;
                break;
            }
            let moved = std::mem::take(&mut texts[j]);
            texts[i].push_str(&moved);
        }
        if !closed {
            i += 1;
        }
    }
}

/// Normalize every paragraph so each tag lies inside one `w:t`.
fn normalize_runs(tokens: &mut [Token]) {
    let mut paragraphs: Vec<Vec<usize>> = Vec::new();
    for idx in 0..tokens.len() {
        let closes_paragraph = match &tokens[idx] {
            Token::Start { name, .. } if name == "w:p" => {
                paragraphs.push(Vec::new());
                false
            }
            Token::Text { in_t: true, .. } => {
                if let Some(current) = paragraphs.last_mut() {
                    current.push(idx);
                }
                false
            }
            Token::End { name } => name == "w:p",
            _ => false,
        };
        if !closes_paragraph {
            continue;
        }

        let Some(indexes) = paragraphs.pop() else {
            continue;
        };
        if indexes.len() < 2 {
            continue;
        }
        let mut texts: Vec<String> = indexes
            .iter()
            .map(|i| match &tokens[*i] {
                Token::Text { value, .. } => value.clone(),
                _ => String::new(),
            })
            .collect();
        merge_split_tags(&mut texts);
        for (i, text) in indexes.iter().zip(texts) {
            tokens[*i] = Token::Text { value: text, in_t: true };
        }
    }
}

fn context_around(text: &str, start: usize, end: usize) -> String {
    let before: Vec<char> = text[..start].chars().collect();
    let skip = before.len().saturating_sub(CONTEXT_CHARS);
    let before: String = before[skip..].iter().collect();
    let after: String = text[end..].chars().take(CONTEXT_CHARS).collect();
    format!("{}{}{}", before, &text[start..end], after)
}

fn parse_tag(inner: &str, context: String) -> Result<Tag, TemplateError> {
    let inner = inner.trim();
    let (kind, name) = match inner.chars().next() {
        Some('#') => ("open", inner[1..].trim()),
        Some('^') => ("inverted", inner[1..].trim()),
        Some('/') => ("close", inner[1..].trim()),
        _ => ("var", inner),
    };
    if name.is_empty() {
        return Err(TemplateError::Empty { context });
    }
    let name = name.to_string();
    let kind = match kind {
        "open" => TagKind::Open { name, inverted: false },
        "inverted" => TagKind::Open { name, inverted: true },
        "close" => TagKind::Close(name),
        _ => TagKind::Var(name),
    };
    Ok(Tag { kind, context })
}

/// Cut tags out of `w:t` text into their own tokens.
fn split_tags(tokens: Vec<Token>, errors: &mut Vec<TemplateError>) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        let value = match token {
            Token::Text { value, in_t: true } if value.contains('{') => value,
            other => {
                out.push(other);
                continue;
            }
        };

        let mut pos = 0;
        let mut literal_start = 0;
        while let Some(rel) = value[pos..].find('{') {
            let open = pos + rel;
            let Some(close_rel) = value[open + 1..].find('}') else {
                errors.push(TemplateError::Unclosed {
                    tag: value[open..].to_string(),
                    context: context_around(&value, open, value.len()),
                });
                break;
            };
            let close = open + 1 + close_rel;
            let end = close + 1;
            let inner = &value[open + 1..close];
            let context = context_around(&value, open, end);
            pos = end;

            if inner.contains('{') {
                errors.push(TemplateError::Nested {
                    tag: value[open..end].to_string(),
                    context,
                });
                continue;
            }
            match parse_tag(inner, context) {
                Ok(tag) => {
                    if open > literal_start {
                        out.push(Token::Text {
                            value: value[literal_start..open].to_string(),
                            in_t: true,
                        });
                    }
                    out.push(Token::Tag(tag));
                    literal_start = end;
                }
                Err(err) => errors.push(err),
            }
        }
        if literal_start < value.len() {
            out.push(Token::Text {
                value: value[literal_start..].to_string(),
                in_t: true,
            });
        }
    }
    out
}

/// Parent links and element extents of a token stream.
struct Tree {
    parent: Vec<Option<usize>>,
    end_of: HashMap<usize, usize>,
}

impl Tree {
    fn new(tokens: &[Token]) -> Self {
        let mut parent = vec![None; tokens.len()];
        let mut end_of = HashMap::new();
        let mut stack: Vec<usize> = Vec::new();
        for (idx, token) in tokens.iter().enumerate() {
            parent[idx] = stack.last().copied();
            match token {
                Token::Start { .. } => stack.push(idx),
                Token::End { .. } => {
                    if let Some(start) = stack.pop() {
                        end_of.insert(start, idx);
                        parent[idx] = parent[start];
                    }
                }
                _ => {}
            }
        }
        Self { parent, end_of }
    }

    fn ancestors(&self, idx: usize) -> Vec<usize> {
        let mut chain = Vec::new();
        let mut current = self.parent[idx];
        while let Some(p) = current {
            chain.push(p);
            current = self.parent[p];
        }
        chain
    }

    fn lowest_common_ancestor(&self, a: usize, b: usize) -> Option<usize> {
        let other: HashSet<usize> = self.ancestors(b).into_iter().collect();
        self.ancestors(a).into_iter().find(|p| other.contains(p))
    }

    /// The child of `ancestor` that contains `idx`.
    fn child_of(&self, ancestor: usize, idx: usize) -> Option<usize> {
        let mut current = idx;
        loop {
            let parent = self.parent[current]?;
            if parent == ancestor {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Last token index of the node starting at `idx`.
    fn last(&self, idx: usize) -> usize {
        self.end_of.get(&idx).copied().unwrap_or(idx)
    }
}

fn is_element(tokens: &[Token], idx: usize, expected: &str) -> bool {
    matches!(&tokens[idx], Token::Start { name, .. } if name == expected)
}

/// Whether a paragraph holds nothing but the given tag.
fn paragraph_only_holds(tokens: &[Token], tree: &Tree, paragraph: usize, tag: usize) -> bool {
    (paragraph + 1..tree.last(paragraph)).all(|idx| match &tokens[idx] {
        Token::Text { value, in_t: true } => value.trim().is_empty(),
        Token::Tag(_) => idx == tag,
        token => !matches!(token.element_name(), Some("w:drawing" | "w:pict" | "w:object")),
    })
}

fn loop_span(
    tokens: &[Token],
    tree: &Tree,
    open: usize,
    close: usize,
    name: String,
    inverted: bool,
    context: String,
) -> LoopSpan {
    let inline = LoopSpan {
        name,
        inverted,
        context,
        range: (open, close + 1),
        body: (open, close + 1),
    };
    let Some(lca) = tree.lowest_common_ancestor(open, close) else {
        return inline;
    };
    if is_element(tokens, lca, "w:tr") {
        let range = (lca, tree.last(lca) + 1);
        return LoopSpan {
            range,
            body: range,
            ..inline
        };
    }
    let (Some(first), Some(last)) = (tree.child_of(lca, open), tree.child_of(lca, close)) else {
        return inline;
    };
    let range = (first, tree.last(last) + 1);
    let mut body = range;
    let inside_paragraph = matches!(tokens[lca].element_name(), Some("w:p" | "w:r" | "w:t"));
    if !inside_paragraph {
        if is_element(tokens, first, "w:p") && paragraph_only_holds(tokens, tree, first, open) {
            body.0 = tree.last(first) + 1;
        }
        if is_element(tokens, last, "w:p") && paragraph_only_holds(tokens, tree, last, close) {
            body.1 = last;
        }
    }
    LoopSpan {
        range,
        body,
        ..inline
    }
}

fn loop_spans(tokens: &[Token], tree: &Tree, errors: &mut Vec<TemplateError>) -> Vec<LoopSpan> {
    let mut spans = Vec::new();
    let mut stack: Vec<(usize, String, bool)> = Vec::new();

    for (idx, token) in tokens.iter().enumerate() {
        let Token::Tag(tag) = token else {
            continue;
        };
        match &tag.kind {
            TagKind::Open { name, inverted } => stack.push((idx, name.clone(), *inverted)),
            TagKind::Close(name) => match stack.pop() {
                None => errors.push(TemplateError::UnmatchedClose {
                    tag: name.clone(),
                    context: tag.context.clone(),
                }),
                Some((open, open_name, inverted)) => {
                    if open_name != *name {
                        errors.push(TemplateError::Mismatched {
                            expected: open_name,
                            found: name.clone(),
                            context: tag.context.clone(),
                        });
                        continue;
                    }
                    let context = match &tokens[open] {
                        Token::Tag(t) => t.context.clone(),
                        _ => String::new(),
                    };
                    spans.push(loop_span(tokens, tree, open, idx, open_name, inverted, context));
                }
            },
            TagKind::Var(_) => {}
        }
    }
    for (idx, name, _) in stack {
        let context = match &tokens[idx] {
            Token::Tag(t) => t.context.clone(),
            _ => String::new(),
        };
        errors.push(TemplateError::UnmatchedOpen { tag: name, context });
    }
    spans
}

fn build_items(
    tokens: &[Token],
    spans: &[LoopSpan],
    used: &mut [bool],
    lo: usize,
    hi: usize,
) -> Result<Vec<Item>, TemplateError> {
    let mut items = Vec::new();
    let mut idx = lo;
    while idx < hi {
        let candidate = spans
            .iter()
            .enumerate()
            .filter(|(i, span)| !used[*i] && span.range.0 == idx)
            .max_by_key(|(_, span)| span.range.1);

        if let Some((span_idx, span)) = candidate {
            if span.range.1 > hi {
                return Err(TemplateError::Overlapping {
                    tag: span.name.clone(),
                    context: span.context.clone(),
                });
            }
            used[span_idx] = true;
            let body = build_items(tokens, spans, used, span.body.0, span.body.1)?;
            items.push(Item::Loop {
                name: span.name.clone(),
                inverted: span.inverted,
                body,
            });
            idx = span.range.1;
            continue;
        }

        match &tokens[idx] {
            Token::Tag(Tag {
                kind: TagKind::Var(name),
                ..
            }) => items.push(Item::Var(name.clone())),
            Token::Tag(_) => {}
            _ => items.push(Item::Token(idx)),
        }
        idx += 1;
    }
    Ok(items)
}

/// One XML part parsed into tokens and an item tree.
struct CompiledPart {
    tokens: Vec<Token>,
    items: Vec<Item>,
    errors: Vec<TemplateError>,
}

impl CompiledPart {
    fn compile(part: &str, xml: &str) -> Result<Self, TemplateError> {
        let mut tokens = tokenize(part, xml)?;
        normalize_runs(&mut tokens);

        let mut errors = Vec::new();
        let tokens = split_tags(tokens, &mut errors);
        let tree = Tree::new(&tokens);
        let spans = loop_spans(&tokens, &tree, &mut errors);

        let mut used = vec![false; spans.len()];
        let items = match build_items(&tokens, &spans, &mut used, 0, tokens.len()) {
            Ok(items) => items,
            Err(err) => {
                errors.push(err);
                Vec::new()
            }
        };
        Ok(Self { tokens, items, errors })
    }

    fn tags(&self) -> impl Iterator<Item = &Tag> {
        self.tokens.iter().filter_map(|t| match t {
            Token::Tag(tag) => Some(tag),
            _ => None,
        })
    }
}

fn write_element(out: &mut String, name: &str, attrs: &[(String, String)], empty: bool) {
    out.push('<');
    out.push_str(name);
    for (key, value) in attrs {
        out.push_str(&format!(" {}=\"{}\"", key, escape_xml(value)));
    }
    if name == "w:t" && !attrs.iter().any(|(k, _)| k == "xml:space") {
        out.push_str(" xml:space=\"preserve\"");
    }
    out.push_str(if empty { "/>" } else { ">" });
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "Sì".to_string(),
        Value::Bool(false) => "No".to_string(),
        _ => String::new(),
    }
}

fn lookup<'v>(scopes: &[&'v Value], name: &str) -> Option<&'v Value> {
    scopes.iter().rev().find_map(|scope| scope.get(name))
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        _ => true,
    }
}

struct Renderer<'a> {
    tokens: &'a [Token],
    out: String,
    allow_images: bool,
    media: &'a mut Vec<ImageData>,
}

impl<'a> Renderer<'a> {
    fn render<'v>(&mut self, items: &[Item], scopes: &mut Vec<&'v Value>) {
        for item in items {
            match item {
                Item::Token(idx) => self.emit(*idx),
                Item::Var(name) => {
                    let text = lookup(scopes, name).map(value_text).unwrap_or_default();
                    if text.starts_with(DATA_URL_IMAGE_PREFIX) {
                        self.inject_image(name, &text);
                    } else {
                        self.out.push_str(&escape_xml(&text));
                    }
                }
                Item::Loop {
                    name,
                    inverted,
                    body,
                } => {
                    let value = lookup(scopes, name);
                    if *inverted {
                        if !is_truthy(value) {
                            self.render(body, scopes);
                        }
                        continue;
                    }
                    match value {
                        Some(Value::Array(elements)) => {
                            for element in elements {
                                scopes.push(element);
                                self.render(body, scopes);
                                scopes.pop();
                            }
                        }
                        Some(object) if object.is_object() => {
                            scopes.push(object);
                            self.render(body, scopes);
                            scopes.pop();
                        }
                        other if is_truthy(other) => self.render(body, scopes),
                        _ => {}
                    }
                }
            }
        }
    }

    fn emit(&mut self, idx: usize) {
        match &self.tokens[idx] {
            Token::Start { name, attrs } => write_element(&mut self.out, name, attrs, false),
            Token::Empty { name, attrs } => write_element(&mut self.out, name, attrs, true),
            Token::End { name } => {
                self.out.push_str("</");
                self.out.push_str(name);
                self.out.push('>');
            }
            Token::Text { value, .. } => self.out.push_str(&escape_xml(value)),
            Token::Raw(raw) => self.out.push_str(raw),
            Token::Tag(_) => {}
        }
    }

    fn inject_image(&mut self, name: &str, data_url: &str) {
        if !self.allow_images {
            log::warn!("Image tag {} is only supported in the document body; skipped", name);
            return;
        }
        match ImageData::from_data_url(data_url) {
            Ok(image) => {
                self.media.push(image);
                let number = self.media.len();
                let cx = (INJECTED_IMAGE_WIDTH_CM * EMU_PER_CM as f64) as u64;
                let cy = (INJECTED_IMAGE_HEIGHT_CM * EMU_PER_CM as f64) as u64;
                self.out.push_str("</w:t></w:r>");
                self.out.push_str(&drawing_run_xml(
                    &injected_rel_id(number),
                    1000 + number as u32,
                    cx,
                    cy,
                ));
                self.out.push_str("<w:r><w:t xml:space=\"preserve\">");
            }
            Err(err) => log::warn!("Cannot embed image for tag {}: {}", name, err),
        }
    }
}

fn injected_rel_id(number: usize) -> String {
    format!("rIdFirma{}", number)
}

fn injected_media_name(number: usize, image: &ImageData) -> String {
    format!("firma_{}.{}", number, image.format.extension())
}

fn is_renderable_part(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    if file.contains('/') || !file.ends_with(".xml") {
        return false;
    }
    file == "document.xml" || file.starts_with("header") || file.starts_with("footer")
}

fn read_entries(template: &[u8]) -> Result<Vec<(String, Vec<u8>)>, DocumentError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(template)).map_err(DocumentError::TemplateArchive)?;
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(DocumentError::TemplateArchive)?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)?;
        entries.push((file.name().to_string(), data));
    }
    Ok(entries)
}

fn insert_before(xml: &str, closing: &str, addition: &str) -> String {
    match xml.rfind(closing) {
        Some(pos) => format!("{}{}{}", &xml[..pos], addition, &xml[pos..]),
        None => format!("{}{}", xml, addition),
    }
}

/// Add image parts, their relationships and content types to a package.
fn register_media(entries: &mut Vec<(String, Vec<u8>)>, media: &[ImageData]) {
    let mut relationships = String::new();
    for (idx, image) in media.iter().enumerate() {
        let number = idx + 1;
        let file = injected_media_name(number, image);
        relationships.push_str(&format!(
            "<Relationship Id=\"{}\" Type=\"{}\" Target=\"media/{}\"/>",
            injected_rel_id(number),
            REL_IMAGE,
            file
        ));
        entries.push((format!("word/media/{}", file), image.bytes.clone()));
    }

    match entries.iter_mut().find(|(name, _)| name == RELS_PART) {
        Some((_, data)) => {
            let xml = String::from_utf8_lossy(data).into_owned();
            *data = insert_before(&xml, "</Relationships>", &relationships).into_bytes();
        }
        None => entries.push((
            RELS_PART.to_string(),
            format!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?><Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">{}</Relationships>",
                relationships
            )
            .into_bytes(),
        )),
    }

    if let Some((_, data)) = entries.iter_mut().find(|(name, _)| name == CONTENT_TYPES_PART) {
        let mut xml = String::from_utf8_lossy(data).into_owned();
        for image in media {
            let ext = image.format.extension();
            let marker = format!("extension=\"{}\"", ext);
            if !xml.to_lowercase().contains(&marker) {
                xml = insert_before(
                    &xml,
                    "</Types>",
                    &format!(
                        "<Default Extension=\"{}\" ContentType=\"{}\"/>",
                        ext,
                        image.format.mime_type()
                    ),
                );
            }
        }
        *data = xml.into_bytes();
    }
}

fn into_document_error(err: TemplateError) -> DocumentError {
    match err {
        TemplateError::Xml { part, message } => DocumentError::Xml { part, message },
        other => DocumentError::Template(other),
    }
}

/// Render a `.docx` template against a placeholder map.
///
/// Missing keys render as empty text. A malformed tag fails the whole
/// document with the offending tag and its surrounding text.
pub fn render_template(template: &[u8], map: &PlaceholderMap) -> Result<Vec<u8>, DocumentError> {
    render_value(template, &map.to_value())
}

/// Render a `.docx` template against an arbitrary JSON object.
pub fn render_value(template: &[u8], data: &Value) -> Result<Vec<u8>, DocumentError> {
    let entries = read_entries(template)?;
    if !entries.iter().any(|(name, _)| name == DOCUMENT_PART) {
        return Err(DocumentError::MissingPart(DOCUMENT_PART.to_string()));
    }

    let mut media = Vec::new();
    let mut rendered = Vec::with_capacity(entries.len());
    for (name, data_bytes) in entries {
        if !is_renderable_part(&name) {
            rendered.push((name, data_bytes));
            continue;
        }
        let xml = String::from_utf8(data_bytes).map_err(|e| DocumentError::Xml {
            part: name.clone(),
            message: e.to_string(),
        })?;
        let compiled = CompiledPart::compile(&name, &xml).map_err(into_document_error)?;
        if let Some(err) = compiled.errors.into_iter().next() {
            return Err(into_document_error(err));
        }

        let mut renderer = Renderer {
            tokens: &compiled.tokens,
            out: String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n"),
            allow_images: name == DOCUMENT_PART,
            media: &mut media,
        };
        let mut scopes = vec![data];
        renderer.render(&compiled.items, &mut scopes);
        let out = renderer.out;
        rendered.push((name, out.into_bytes()));
    }

    if !media.is_empty() {
        register_media(&mut rendered, &media);
    }
    write_package(&rendered)
}

/// Upload-time check of a template: the archive opens, the main document
/// exists, every tag is well formed, sections are balanced and every tag
/// name belongs to the placeholder schema.
pub fn validate_template(template: &[u8]) -> Result<(), Vec<TemplateError>> {
    let entries = read_entries(template).map_err(|e| vec![TemplateError::InvalidArchive(e.to_string())])?;
    if !entries.iter().any(|(name, _)| name == DOCUMENT_PART) {
        return Err(vec![TemplateError::MissingDocument]);
    }

    let mut errors = Vec::new();
    for (name, data) in &entries {
        if !is_renderable_part(name) {
            continue;
        }
        let xml = match std::str::from_utf8(data) {
            Ok(xml) => xml,
            Err(e) => {
                errors.push(xml_error(name, e));
                continue;
            }
        };
        let compiled = match CompiledPart::compile(name, xml) {
            Ok(compiled) => compiled,
            Err(err) => {
                errors.push(err);
                continue;
            }
        };
        for tag in compiled.tags() {
            let name = match &tag.kind {
                TagKind::Var(name) | TagKind::Open { name, .. } => name,
                TagKind::Close(_) => continue,
            };
            if !PlaceholderMap::is_known_tag(name) {
                errors.push(TemplateError::Unknown {
                    tag: name.clone(),
                    context: tag.context.clone(),
                });
            }
        }
        errors.extend(compiled.errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use serde_json::json;

    const NS: &str = "xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"";

    fn docx_with(body: &str, header: Option<&str>) -> Vec<u8> {
        let mut parts = vec![
            (
                CONTENT_TYPES_PART.to_string(),
                b"<?xml version=\"1.0\"?><Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"><Default Extension=\"xml\" ContentType=\"application/xml\"/></Types>".to_vec(),
            ),
            (
                DOCUMENT_PART.to_string(),
                format!("<?xml version=\"1.0\"?><w:document {}><w:body>{}</w:body></w:document>", NS, body)
                    .into_bytes(),
            ),
            (
                RELS_PART.to_string(),
                b"<?xml version=\"1.0\"?><Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\"></Relationships>".to_vec(),
            ),
        ];
        if let Some(header) = header {
            parts.push((
                "word/header1.xml".to_string(),
                format!("<?xml version=\"1.0\"?><w:hdr {}>{}</w:hdr>", NS, header).into_bytes(),
            ));
        }
        write_package(&parts).unwrap()
    }

    fn docx(body: &str) -> Vec<u8> {
        docx_with(body, None)
    }

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut content = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    fn para(text: &str) -> String {
        format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
    }

    fn data() -> Value {
        json!({
            "CORSO_TITOLO": "Sicurezza & salute",
            "CORSO_ID": "4521",
            "STUDENTI": [
                { "NUMERO": "1", "NOME_COMPLETO": "Anna Verdi" },
                { "NUMERO": "2", "NOME_COMPLETO": "Bruno Rossi" }
            ],
            "PARTECIPANTI": [
                { "nome": "Anna", "cognome": "Verdi" },
                { "nome": "Bruno", "cognome": "Rossi" },
                { "nome": "Carla", "cognome": "Bianchi" }
            ],
            "SESSIONI_FAD": []
        })
    }

    #[test]
    fn test_substitutes_tag_split_across_runs() {
        let body = "<w:p><w:r><w:t>Corso {CORSO_</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>TITO</w:t></w:r><w:r><w:t>LO} fine</w:t></w:r></w:p>";
        let out = render_value(&docx(body), &data()).unwrap();
        let xml = part(&out, DOCUMENT_PART);
        assert!(xml.contains("Corso Sicurezza &amp; salute"));
        assert!(xml.contains(" fine"));
        assert!(!xml.contains('{'));
    }

    #[test]
    fn test_paragraph_loop_drops_tag_paragraphs() {
        let body = format!(
            "{}{}{}",
            para("{#STUDENTI}"),
            para("{NUMERO}. {NOME_COMPLETO}"),
            para("{/STUDENTI}")
        );
        let xml = part(&render_value(&docx(&body), &data()).unwrap(), DOCUMENT_PART);
        assert!(xml.contains("1. Anna Verdi"));
        assert!(xml.contains("2. Bruno Rossi"));
        assert_eq!(xml.matches("<w:p>").count(), 2);
    }

    #[test]
    fn test_row_loop_repeats_whole_row() {
        let body = concat!(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>Nome</w:t></w:r></w:p></w:tc></w:tr>",
            "<w:tr><w:tc><w:p><w:r><w:t>{#PARTECIPANTI}{nome}</w:t></w:r></w:p></w:tc>",
            "<w:tc><w:p><w:r><w:t>{cognome}{/PARTECIPANTI}</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"
        );
        let xml = part(&render_value(&docx(body), &data()).unwrap(), DOCUMENT_PART);
        assert_eq!(xml.matches("<w:tr>").count(), 4);
        assert!(xml.contains(">Carla<"));
        assert!(xml.contains(">Bianchi<"));
    }

    #[test]
    fn test_inverted_and_inline_sections() {
        let body = format!(
            "{}{}",
            para("{^SESSIONI_FAD}Nessuna sessione FAD{/SESSIONI_FAD}"),
            para("Iscritti: {#PARTECIPANTI}{nome} {/PARTECIPANTI}")
        );
        let xml = part(&render_value(&docx(&body), &data()).unwrap(), DOCUMENT_PART);
        assert!(xml.contains("Nessuna sessione FAD"));
        assert!(xml.contains("Iscritti: Anna Bruno Carla "));
    }

    #[test]
    fn test_headers_are_rendered() {
        let bytes = docx_with(&para("x"), Some(&para("Corso {CORSO_ID} {SCONOSCIUTO}")));
        let xml = part(&render_value(&bytes, &data()).unwrap(), "word/header1.xml");
        assert!(xml.contains("Corso 4521 "));
    }

    #[test]
    fn test_data_url_becomes_embedded_image() {
        let png: [u8; 10] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        );
        let out = render_value(&docx(&para("Firma: {FIRMA_TRAINER}")), &json!({ "FIRMA_TRAINER": url })).unwrap();

        assert!(part(&out, DOCUMENT_PART).contains("r:embed=\"rIdFirma1\""));
        assert!(part(&out, RELS_PART).contains("media/firma_1.png"));
        assert!(part(&out, CONTENT_TYPES_PART).contains("Extension=\"png\""));
        let mut archive = zip::ZipArchive::new(Cursor::new(out.as_slice())).unwrap();
        assert_eq!(archive.by_name("word/media/firma_1.png").unwrap().size(), 10);
    }

    #[test]
    fn test_embedded_image_binds_every_prefix() {
        use quick_xml::name::ResolveResult;
        use quick_xml::NsReader;

        let png: [u8; 10] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];
        let url = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        );
        // The template root only declares `w`.
        let out = render_value(&docx(&para("{FIRMA_TRAINER}")), &json!({ "FIRMA_TRAINER": url })).unwrap();
        let xml = part(&out, DOCUMENT_PART);
        assert!(xml.contains("<wp:inline"));

        let mut reader = NsReader::from_str(&xml);
        let mut elements = 0;
        loop {
            let (ns, event) = reader.read_resolved_event().unwrap();
            let unbound = matches!(ns, ResolveResult::Unknown(_));
            match event {
                Event::Start(e) | Event::Empty(e) => {
                    elements += 1;
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    assert!(!unbound, "unbound element {}", name);
                    for attr in e.attributes() {
                        let attr = attr.unwrap();
                        if attr.key.as_ref().starts_with(b"xml") {
                            continue;
                        }
                        let (attr_ns, _) = reader.resolve_attribute(attr.key);
                        assert!(
                            !matches!(attr_ns, ResolveResult::Unknown(_)),
                            "unbound attribute {:?} on {}",
                            String::from_utf8_lossy(attr.key.as_ref()),
                            name
                        );
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }
        assert!(elements > 10);
    }

    #[test]
    fn test_malformed_tag_fails_with_context() {
        let err = render_value(&docx(&para("Titolo {CORSO_TITOLO senza chiusura")), &data()).unwrap_err();
        match err {
            DocumentError::Template(TemplateError::Unclosed { tag, context }) => {
                assert!(tag.starts_with("{CORSO_TITOLO"));
                assert!(context.contains("Titolo "));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_schema_tags() {
        let body = format!(
            "{}{}{}",
            para("{CORSO_TITOLO} {PARTECIPANTE_3_CF}"),
            para("{#STUDENTI}{NOME_COMPLETO}"),
            para("{/STUDENTI}")
        );
        assert_eq!(validate_template(&docx(&body)), Ok(()));
    }

    #[test]
    fn test_validate_reports_every_problem() {
        let body = format!(
            "{}{}{}",
            para("{CORSO_INVENTATO}"),
            para("{#STUDENTI}{NOME}"),
            para("{}")
        );
        let errors = validate_template(&docx(&body)).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, TemplateError::Unknown { tag, .. } if tag == "CORSO_INVENTATO")));
        assert!(errors
            .iter()
            .any(|e| matches!(e, TemplateError::UnmatchedOpen { tag, .. } if tag == "STUDENTI")));
        assert!(errors.iter().any(|e| matches!(e, TemplateError::Empty { .. })));
    }

    #[test]
    fn test_validate_rejects_non_docx() {
        assert_eq!(
            validate_template(b"not a zip").unwrap_err().len(),
            1
        );
        let only_styles = write_package(&[("word/styles.xml".to_string(), b"<x/>".to_vec())]).unwrap();
        assert_eq!(validate_template(&only_styles), Err(vec![TemplateError::MissingDocument]));
    }
}
