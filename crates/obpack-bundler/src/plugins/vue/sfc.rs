//! Block extraction for single-file components.
//!
//! Finds top-level `<script>`, `<template>` and `<style>` blocks with memchr
//! searches instead of a full HTML parser. Nested `<template>` tags inside
//! the root template are balanced.

use memchr::memmem;
use thiserror::Error;

/// Maximum accepted component size (10 MB).
pub const MAX_FILE_SIZE: usize = 10 * 1024 * 1024;

/// Maximum number of `<script>` blocks in one component.
pub const MAX_SCRIPT_TAGS: usize = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SfcError {
    #[error("component is {size} bytes, limit is {max}")]
    FileTooLarge { size: usize, max: usize },

    #[error("component has {count} script blocks, limit is {max}")]
    TooManyScriptTags { count: usize, max: usize },

    #[error("unclosed <{tag}> starting at byte {position}")]
    Unclosed { tag: &'static str, position: usize },
}

/// One `<script>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptBlock<'a> {
    pub content: &'a str,
    pub lang: &'a str,
    pub setup: bool,
}

/// One `<style>` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleBlock<'a> {
    pub content: &'a str,
    pub lang: &'a str,
    pub scoped: bool,
}

/// Everything extracted from one component.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SfcDescriptor<'a> {
    pub scripts: Vec<ScriptBlock<'a>>,
    pub template: Option<&'a str>,
    pub styles: Vec<StyleBlock<'a>>,
}

/// Split a component into its blocks.
pub fn parse(source: &str) -> Result<SfcDescriptor<'_>, SfcError> {
    if source.len() > MAX_FILE_SIZE {
        return Err(SfcError::FileTooLarge {
            size: source.len(),
            max: MAX_FILE_SIZE,
        });
    }

    let mut descriptor = SfcDescriptor::default();
    let mut pointer = 0;

    while let Some(open) = next_open_tag(source, pointer) {
        let tag = open.tag;
        let attrs = &source[open.attrs_start..open.attrs_end];

        if open.self_closing {
            pointer = open.body_start;
            continue;
        }

        let close = match tag {
            "template" => find_balanced_template_end(source, open.body_start),
            _ => find_close(source, open.body_start, tag),
        }
        .ok_or(SfcError::Unclosed {
            tag,
            position: open.start,
        })?;

        let content = &source[open.body_start..close];
        pointer = close + tag.len() + 3;

        match tag {
            "script" => {
                descriptor.scripts.push(ScriptBlock {
                    content,
                    lang: attribute(attrs, "lang").unwrap_or("js"),
                    setup: has_flag(attrs, "setup"),
                });
                if descriptor.scripts.len() > MAX_SCRIPT_TAGS {
                    return Err(SfcError::TooManyScriptTags {
                        count: descriptor.scripts.len(),
                        max: MAX_SCRIPT_TAGS,
                    });
                }
            }
            "template" => {
                if descriptor.template.is_none() {
                    descriptor.template = Some(content);
                }
            }
            _ => descriptor.styles.push(StyleBlock {
                content,
                lang: attribute(attrs, "lang").unwrap_or("css"),
                scoped: has_flag(attrs, "scoped"),
            }),
        }
    }

    Ok(descriptor)
}

struct OpenTag {
    tag: &'static str,
    start: usize,
    attrs_start: usize,
    attrs_end: usize,
    body_start: usize,
    self_closing: bool,
}

const BLOCK_TAGS: [&str; 3] = ["script", "template", "style"];

/// Earliest top-level block opening tag at or after `from`.
fn next_open_tag(source: &str, from: usize) -> Option<OpenTag> {
    let bytes = source.as_bytes();
    let mut pointer = from;

    while pointer < bytes.len() {
        let lt = pointer + memchr::memchr(b'<', &bytes[pointer..])?;
        let rest = &bytes[lt + 1..];

        let tag = BLOCK_TAGS.into_iter().find(|tag| {
            rest.starts_with(tag.as_bytes())
                && rest
                    .get(tag.len())
                    .is_some_and(|b| matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'>' | b'/'))
        });

        let Some(tag) = tag else {
            pointer = lt + 1;
            continue;
        };

        let attrs_start = lt + 1 + tag.len();
        let gt = find_closing_angle(bytes, attrs_start)?;
        let self_closing = gt > attrs_start && bytes[gt - 1] == b'/';
        let attrs_end = if self_closing { gt - 1 } else { gt };

        return Some(OpenTag {
            tag,
            start: lt,
            attrs_start,
            attrs_end,
            body_start: gt + 1,
            self_closing,
        });
    }

    None
}

/// Closing `>` of a tag, skipping quoted attribute values.
fn find_closing_angle(bytes: &[u8], start: usize) -> Option<usize> {
    let mut quote: Option<u8> = None;

    for (i, &byte) in bytes[start..].iter().enumerate() {
        match (quote, byte) {
            (None, b'"' | b'\'') => quote = Some(byte),
            (Some(q), b) if b == q => quote = None,
            (None, b'>') => return Some(start + i),
            _ => {}
        }
    }

    None
}

fn find_close(source: &str, from: usize, tag: &str) -> Option<usize> {
    let needle = format!("</{tag}>");
    memmem::find(&source.as_bytes()[from..], needle.as_bytes()).map(|pos| from + pos)
}

/// End of the root template, accounting for nested `<template>` tags.
fn find_balanced_template_end(source: &str, from: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let open = memmem::Finder::new(b"<template");
    let close = memmem::Finder::new(b"</template>");
    let mut depth = 1usize;
    let mut pointer = from;

    loop {
        let next_close = pointer + close.find(&bytes[pointer..])?;
        match open.find(&bytes[pointer..next_close]) {
            Some(pos) => {
                let nested = pointer + pos;
                let after = nested + "<template".len();
                let gt = find_closing_angle(bytes, after)?;
                if bytes[gt - 1] != b'/' {
                    depth += 1;
                }
                pointer = gt + 1;
            }
            None => {
                depth -= 1;
                if depth == 0 {
                    return Some(next_close);
                }
                pointer = next_close + "</template>".len();
            }
        }
    }
}

/// Value of `name="..."` (or single-quoted / bare) inside a tag's attributes.
fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let mut search = attrs;
    loop {
        let pos = search.find(name)?;
        let preceded_ok = pos == 0
            || search[..pos]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        let after = search[pos + name.len()..].trim_start();
        let assigned = if preceded_ok { after.strip_prefix('=') } else { None };

        if let Some(value) = assigned {
            let value = value.trim_start();
            let mut chars = value.chars();
            return match chars.next() {
                Some(q @ ('"' | '\'')) => {
                    let inner = &value[1..];
                    inner.find(q).map(|end| &inner[..end])
                }
                Some(_) => {
                    let end = value
                        .find(|c: char| c.is_whitespace() || c == '>' || c == '/')
                        .unwrap_or(value.len());
                    Some(&value[..end])
                }
                None => None,
            };
        }

        search = &search[pos + name.len()..];
    }
}

/// Whether a boolean attribute such as `setup` or `scoped` is present.
fn has_flag(attrs: &str, name: &str) -> bool {
    attrs
        .split(|c: char| c.is_whitespace() || c == '/')
        .any(|token| token == name || token.starts_with(&format!("{name}=")))
}
