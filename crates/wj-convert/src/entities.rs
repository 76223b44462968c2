//! Entity handling for storage-format bodies.
//!
//! Storage bodies use HTML named entities that an XML reader rejects, so
//! they are replaced with characters before parsing. The five XML entities
//! and numeric references are left for the reader.

use std::sync::LazyLock;

use regex::Regex;

static NAMED_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// HTML entities seen in exported pages.
const HTML_ENTITIES: &[(&str, char)] = &[
    ("nbsp", '\u{00a0}'),
    ("ensp", '\u{2002}'),
    ("emsp", '\u{2003}'),
    ("thinsp", '\u{2009}'),
    ("zwnj", '\u{200c}'),
    ("zwj", '\u{200d}'),
    ("shy", '\u{00ad}'),
    ("mdash", '\u{2014}'),
    ("ndash", '\u{2013}'),
    ("ldquo", '\u{201c}'),
    ("rdquo", '\u{201d}'),
    ("bdquo", '\u{201e}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("sbquo", '\u{201a}'),
    ("laquo", '\u{00ab}'),
    ("raquo", '\u{00bb}'),
    ("bull", '\u{2022}'),
    ("hellip", '\u{2026}'),
    ("middot", '\u{00b7}'),
    ("rarr", '\u{2192}'),
    ("larr", '\u{2190}'),
    ("harr", '\u{2194}'),
    ("uarr", '\u{2191}'),
    ("darr", '\u{2193}'),
    ("rArr", '\u{21d2}'),
    ("lArr", '\u{21d0}'),
    ("le", '\u{2264}'),
    ("ge", '\u{2265}'),
    ("ne", '\u{2260}'),
    ("plusmn", '\u{00b1}'),
    ("times", '\u{00d7}'),
    ("divide", '\u{00f7}'),
    ("minus", '\u{2212}'),
    ("infin", '\u{221e}'),
    ("copy", '\u{00a9}'),
    ("reg", '\u{00ae}'),
    ("trade", '\u{2122}'),
    ("euro", '\u{20ac}'),
    ("pound", '\u{00a3}'),
    ("yen", '\u{00a5}'),
    ("cent", '\u{00a2}'),
    ("deg", '\u{00b0}'),
    ("para", '\u{00b6}'),
    ("sect", '\u{00a7}'),
    ("dagger", '\u{2020}'),
    ("Dagger", '\u{2021}'),
    ("iexcl", '\u{00a1}'),
    ("iquest", '\u{00bf}'),
    ("frac14", '\u{00bc}'),
    ("frac12", '\u{00bd}'),
    ("frac34", '\u{00be}'),
    ("sup1", '\u{00b9}'),
    ("sup2", '\u{00b2}'),
    ("sup3", '\u{00b3}'),
    ("micro", '\u{00b5}'),
    ("auml", 'ä'),
    ("ouml", 'ö'),
    ("uuml", 'ü'),
    ("Auml", 'Ä'),
    ("Ouml", 'Ö'),
    ("Uuml", 'Ü'),
    ("szlig", 'ß'),
    ("eacute", 'é'),
    ("egrave", 'è'),
    ("agrave", 'à'),
    ("ccedil", 'ç'),
];

fn html_entity(name: &str) -> Option<char> {
    HTML_ENTITIES
        .iter()
        .find(|(entity, _)| *entity == name)
        .map(|(_, ch)| *ch)
}

/// Replace HTML named entities with characters.
///
/// Unknown names and the XML entities (`amp`, `lt`, `gt`, `quot`, `apos`)
/// are kept verbatim.
pub(crate) fn replace_html_entities(body: &str) -> String {
    NAMED_ENTITY
        .replace_all(body, |caps: &regex::Captures| {
            html_entity(&caps[1]).map_or_else(|| caps[0].to_owned(), String::from)
        })
        .into_owned()
}

/// Resolve an entity reference reported by the XML reader (`lt`, `#160`, `#xA0`).
///
/// Unresolvable references are returned as written.
pub(crate) fn resolve_reference(name: &str) -> String {
    let resolved = match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => name.strip_prefix('#').and_then(|num| {
            let code = match num.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok(),
                None => num.parse::<u32>().ok(),
            };
            code.and_then(char::from_u32)
        }),
    };
    resolved.map_or_else(|| format!("&{name};"), String::from)
}
