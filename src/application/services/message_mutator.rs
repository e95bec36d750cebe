use std::collections::HashMap;

use rand::Rng;

/// Zero-width code points used to diversify message fingerprints. Stripping
/// every character in this set recovers the resolved text exactly.
pub const INVISIBLE_CHARS: [char; 4] = ['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}'];

/// Placeholder fallback when lead data has no value for a template variable,
/// so an outgoing message never carries an unresolved `{...}`.
const VAR_FALLBACK: &str = "cliente";

/// Turns a stored template into the text actually sent: resolves spintax
/// groups, substitutes lead variables and injects one invisible character.
/// Pure string work, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageMutator;

impl MessageMutator {
    pub fn new() -> Self {
        Self
    }

    pub fn transform(&self, template: &str, vars: &HashMap<String, String>) -> String {
        let resolved = resolve_spintax(template);
        let substituted = substitute_vars(&resolved, vars);
        inject_invisible(&substituted)
    }
}

/// Removes every character of [`INVISIBLE_CHARS`] from `text`.
pub fn strip_invisible(text: &str) -> String {
    text.chars().filter(|c| !INVISIBLE_CHARS.contains(c)).collect()
}

/// Replaces each top-level `{a|b|c}` group with one option chosen uniformly
/// at random. Groups never nest; a braced group without `|` is not spintax
/// and is left for variable substitution. Unclosed braces pass through.
fn resolve_spintax(template: &str) -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let group_start = &rest[open..];
        let Some(close) = group_start.find('}') else {
            out.push_str(group_start);
            return out;
        };
        let group = &group_start[1..close];
        if group.contains('|') {
            let options: Vec<&str> = group.split('|').collect();
            out.push_str(options[rng.gen_range(0..options.len())]);
        } else {
            out.push_str(&group_start[..=close]);
        }
        rest = &group_start[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Replaces each `{varName}` placeholder with the lead's value, falling back
/// to [`VAR_FALLBACK`] when the variable is unknown.
fn substitute_vars(text: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let group_start = &rest[open..];
        let Some(close) = group_start.find('}') else {
            out.push_str(group_start);
            return out;
        };
        let name = group_start[1..close].trim();
        match vars.get(name) {
            Some(value) => out.push_str(value),
            None => out.push_str(VAR_FALLBACK),
        }
        rest = &group_start[close + 1..];
    }
    out.push_str(rest);
    out
}

/// Inserts one invisible character at the start, the end, or right after the
/// first sentence boundary. Always exactly one character longer than `text`.
fn inject_invisible(text: &str) -> String {
    let mut rng = rand::thread_rng();
    let marker = INVISIBLE_CHARS[rng.gen_range(0..INVISIBLE_CHARS.len())];
    let position = match rng.gen_range(0..3u8) {
        0 => 0,
        1 => text.len(),
        _ => sentence_boundary(text).unwrap_or(text.len()),
    };
    let mut out = String::with_capacity(text.len() + marker.len_utf8());
    out.push_str(&text[..position]);
    out.push(marker);
    out.push_str(&text[position..]);
    out
}

/// Byte offset just past the first `.`, `!` or `?`, if any.
fn sentence_boundary(text: &str) -> Option<usize> {
    text.char_indices()
        .find(|(_, c)| matches!(c, '.' | '!' | '?'))
        .map(|(idx, c)| idx + c.len_utf8())
}
