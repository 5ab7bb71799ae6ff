// ── Type-name transforms ──
//
// DeviceHub names a resource three ways: the type form (`devices:Snapshot`),
// the resource form (`devices_snapshot`, `events`), and a human form
// (`Erase basic`). Only types in the "changing number" set pluralize in
// resource form.

use std::collections::BTreeSet;

/// Separator between prefix and name in type form.
pub const TYPE_PREFIX: char = ':';
/// Separator between prefix and name in resource form.
pub const RESOURCE_PREFIX: char = '_';

/// Singular resource names that pluralize in resource form.
pub const DEFAULT_CHANGING_NUMBER: &[&str] = &[
    "device",
    "event",
    "lot",
    "tag",
    "user",
    "place",
    "package",
    "pallet",
    "account",
    "inventory",
    "proof",
    "deliverynote",
];

/// Words `titleize` keeps lowercase unless they open the string.
const MINOR_WORDS: &[&str] = &[
    "and", "or", "nor", "a", "an", "the", "so", "but", "to", "of", "at", "by", "from", "into",
    "on", "onto", "off", "out", "in", "over", "with", "for",
];

/// Converts between type, resource and human forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    changing_number: BTreeSet<String>,
}

impl Default for Naming {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGING_NUMBER.iter().copied())
    }
}

impl Naming {
    /// Build with a custom "changing number" set (singular, dasherized).
    pub fn new<I, S>(changing_number: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            changing_number: changing_number.into_iter().map(Into::into).collect(),
        }
    }

    /// Resource form: `devices:Snapshot` → `devices_snapshot`, `Event` → `events`.
    pub fn resource(&self, s: &str) -> String {
        let (prefix, name) = match Self::pop_prefix(s) {
            Some((prefix, name)) => (format!("{prefix}{RESOURCE_PREFIX}"), name),
            None => (String::new(), s),
        };
        let name = dasherize(&underscore(name));
        let name = if self.changing_number.contains(&name) {
            pluralize(&name)
        } else {
            name
        };
        format!("{prefix}{name}")
    }

    /// Type form: `devices_snapshot` → `devices:Snapshot`, `events` → `Event`.
    pub fn type_name(&self, s: &str) -> String {
        let (prefix, name) = match Self::pop_prefix(s) {
            Some((prefix, name)) => (format!("{prefix}{TYPE_PREFIX}"), name),
            None => (String::new(), s),
        };
        let name = if self.changes_number(name) {
            singularize(name)
        } else {
            name.to_owned()
        };
        format!("{prefix}{}", camelize(&name))
    }

    fn changes_number(&self, s: &str) -> bool {
        let value = dasherize(&underscore(s));
        self.changing_number.contains(&value) || self.changing_number.contains(&singularize(&value))
    }

    /// Split off the prefix of either form. `None` when there is no prefix.
    pub fn pop_prefix(s: &str) -> Option<(&str, &str)> {
        s.split_once(TYPE_PREFIX)
            .or_else(|| s.split_once(RESOURCE_PREFIX))
    }

    /// Human form: `EraseBasic` → `Erase basic`.
    ///
    /// Acronyms come back untouched: `SAI` stays `SAI` rather than `S a i`.
    pub fn humanize(s: &str) -> String {
        let name = Self::pop_prefix(s).map_or(s, |(_, name)| name);
        let converted = capitalize(&underscore(name).replace('_', " "));

        let chars: Vec<char> = converted.chars().take(4).collect();
        let spelled_out = matches!(
            chars.as_slice(),
            [first, ' ', _, ' '] if *first != ' '
        );
        if spelled_out { s.to_owned() } else { converted }
    }

    /// Lowercase, then capitalize every word and every `-` part, keeping
    /// minor words lowercase. Idempotent.
    pub fn titleize(s: &str) -> String {
        let lower = s.to_lowercase().replace('_', " ");
        lower
            .split(' ')
            .enumerate()
            .map(|(i, word)| {
                word.split('-')
                    .enumerate()
                    .map(|(j, part)| {
                        if (i > 0 || j > 0) && MINOR_WORDS.contains(&part) {
                            part.to_owned()
                        } else {
                            capitalize(part)
                        }
                    })
                    .collect::<Vec<_>>()
                    .join("-")
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ── Inflection helpers ───────────────────────────────────────────────

/// `EraseBasic` → `erase_basic`, `SAI` → `s_a_i`.
fn underscore(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    let mut prev: Option<char> = None;
    for c in s.chars() {
        if c.is_uppercase() && prev.is_some_and(|p| !p.is_whitespace() && p != '_' && p != '-') {
            out.push('_');
        }
        out.extend(c.to_lowercase());
        prev = Some(c);
    }
    out
}

fn dasherize(s: &str) -> String {
    s.replace('_', "-")
}

/// `erase-basic` / `erase_basic` → `EraseBasic`.
fn camelize(s: &str) -> String {
    s.split(['_', '-']).map(capitalize).collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn pluralize(s: &str) -> String {
    if let Some(stem) = s.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) {
            return format!("{stem}ies");
        }
    }
    if s.ends_with(['s', 'x', 'z']) || s.ends_with("ch") || s.ends_with("sh") {
        return format!("{s}es");
    }
    format!("{s}s")
}

fn singularize(s: &str) -> String {
    if let Some(stem) = s.strip_suffix("ies") {
        return format!("{stem}y");
    }
    for suffix in ["ses", "xes", "zes", "ches", "shes"] {
        if let Some(stem) = s.strip_suffix(suffix) {
            return format!("{stem}{}", &suffix[..suffix.len() - 2]);
        }
    }
    match s.strip_suffix('s') {
        Some(stem) if !stem.ends_with('s') => stem.to_owned(),
        _ => s.to_owned(),
    }
}
