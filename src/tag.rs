//! Parser for the per-field constraint tag grammar.
//!
//! A tag is a comma-separated list of `name` or `name=param` directives.
//! `dive` switches subsequent directives from the field itself to the
//! collection's elements; `keys` ... `endkeys` bracket map-key
//! directives; `exclude:a|b` names output contexts the field is hidden
//! from. Alias names are substituted with their registered expansion and
//! re-parsed once — expansions are not themselves alias-expanded.

use crate::registry;

/// One raw directive, before constraint building.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Directive {
    pub name: String,
    pub param: Option<String>,
}

/// The parsed shape of a tag string.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParsedTag {
    /// Directives applying to the field itself.
    pub pre: Vec<Directive>,
    /// Whether a `dive` marker was present.
    pub dive: bool,
    /// Directives applying to collection elements (after `dive`).
    pub post: Vec<Directive>,
    /// Directives applying to map keys (between `keys` and `endkeys`).
    pub keys: Vec<Directive>,
    pub required: bool,
    /// Output contexts this field is excluded from.
    pub excluded: Vec<String>,
}

#[derive(PartialEq)]
enum Mode {
    Pre,
    Post,
    Keys,
}

pub(crate) fn parse(raw: &str) -> ParsedTag {
    let mut tokens: Vec<String> = Vec::new();
    for piece in raw.split(',') {
        let piece = piece.trim();
        if piece.is_empty() {
            continue;
        }
        // Alias expansion: a bare name with a registered expansion is
        // spliced in literally; spliced tokens are not expanded again.
        if !piece.contains('=') && !piece.contains(':') {
            if let Some(expansion) = registry::lookup_alias(piece) {
                for sub in expansion.split(',') {
                    let sub = sub.trim();
                    if !sub.is_empty() {
                        tokens.push(sub.to_string());
                    }
                }
                continue;
            }
        }
        tokens.push(piece.to_string());
    }

    let mut tag = ParsedTag::default();
    let mut mode = Mode::Pre;

    for token in tokens {
        match token.as_str() {
            "dive" => {
                tag.dive = true;
                mode = Mode::Post;
                continue;
            }
            "keys" => {
                mode = Mode::Keys;
                continue;
            }
            "endkeys" => {
                mode = if tag.dive { Mode::Post } else { Mode::Pre };
                continue;
            }
            "required" if mode == Mode::Pre => {
                tag.required = true;
                continue;
            }
            _ => {}
        }

        if let Some(contexts) = token.strip_prefix("exclude:") {
            tag.excluded
                .extend(contexts.split('|').map(|c| c.trim().to_string()));
            continue;
        }

        let directive = match token.split_once('=') {
            Some((name, param)) => Directive {
                name: name.trim().to_string(),
                param: Some(param.to_string()),
            },
            None => Directive {
                name: token,
                param: None,
            },
        };
        match mode {
            Mode::Pre => tag.pre.push(directive),
            Mode::Post => tag.post.push(directive),
            Mode::Keys => tag.keys.push(directive),
        }
    }

    tag
}
