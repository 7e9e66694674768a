//! CSS selector subset
//!
//! Selector lists of descendant chains made of compound selectors:
//! `tag`, `*`, `.class`, `#id`, `[attr]`, `[attr=value]` and `:not(compound)`.

use crate::{DomTree, NodeId, SelectorError};

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    alternatives: Vec<Complex>,
}

/// Descendant chain; the last compound is the subject
#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    compounds: Vec<Compound>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    ids: Vec<String>,
    classes: Vec<String>,
    attrs: Vec<AttrMatch>,
    negations: Vec<Compound>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrMatch {
    Exists(String),
    Equals(String, String),
}

impl Selector {
    /// Parse a selector list
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let alternatives = split_top_level(selector, ',')
            .into_iter()
            .map(|part| parse_complex(selector, part))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { alternatives })
    }

    /// Check if an element matches any alternative
    pub fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        tree.is_element(node) && self.alternatives.iter().any(|c| c.matches(tree, node))
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Complex {
    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some((subject, rest)) = self.compounds.split_last() else {
            return false;
        };
        if !subject.matches(tree, node) {
            return false;
        }
        // Descendant-only chains match greedily right to left
        let mut ancestors = tree.ancestors(node);
        rest.iter()
            .rev()
            .all(|compound| ancestors.any(|a| compound.matches(tree, a)))
    }
}

impl Compound {
    fn is_empty(&self) -> bool {
        self.tag.is_none()
            && self.ids.is_empty()
            && self.classes.is_empty()
            && self.attrs.is_empty()
            && self.negations.is_empty()
    }

    fn matches(&self, tree: &DomTree, node: NodeId) -> bool {
        let Some(tag) = tree.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if expected != "*" && !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if !self
            .ids
            .iter()
            .all(|id| tree.get_attribute(node, "id") == Some(id.as_str()))
        {
            return false;
        }
        if !self.classes.is_empty() {
            let classes = tree.class_list(node);
            if !self.classes.iter().all(|c| classes.contains(c)) {
                return false;
            }
        }
        let attrs_match = self.attrs.iter().all(|attr| match attr {
            AttrMatch::Exists(name) => tree.has_attribute(node, name),
            AttrMatch::Equals(name, value) => {
                tree.get_attribute(node, name) == Some(value.as_str())
            }
        });
        attrs_match && !self.negations.iter().any(|n| n.matches(tree, node))
    }
}

/// Split on `sep` outside brackets, parentheses and quotes
fn split_top_level(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

fn split_whitespace_top_level(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start: Option<usize> = None;

    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, c) if c.is_whitespace() && depth == 0 => {
                if let Some(s) = start.take() {
                    parts.push(&input[s..i]);
                }
                continue;
            }
            _ => {}
        }
        if start.is_none() {
            start = Some(i);
        }
    }
    if let Some(s) = start {
        parts.push(&input[s..]);
    }
    parts
}

fn parse_complex(full: &str, part: &str) -> Result<Complex, SelectorError> {
    let compounds = split_whitespace_top_level(part)
        .into_iter()
        .map(|c| parse_compound(full, c))
        .collect::<Result<Vec<_>, _>>()?;
    if compounds.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(Complex { compounds })
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_compound(full: &str, input: &str) -> Result<Compound, SelectorError> {
    let mut compound = Compound::default();
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let mut i = 0;

    let unexpected = |offset: usize, found: char| SelectorError::Unexpected {
        selector: full.to_string(),
        found,
        offset,
    };
    let unterminated = |what: &'static str| SelectorError::Unterminated {
        selector: full.to_string(),
        what,
    };
    let read_ident = |i: &mut usize| -> String {
        let mut ident = String::new();
        while *i < chars.len() && is_ident_char(chars[*i].1) {
            ident.push(chars[*i].1);
            *i += 1;
        }
        ident
    };

    while i < chars.len() {
        let (offset, c) = chars[i];
        match c {
            '*' if i == 0 => {
                compound.tag = Some("*".to_string());
                i += 1;
            }
            c if i == 0 && is_ident_char(c) => {
                compound.tag = Some(read_ident(&mut i).to_ascii_lowercase());
            }
            '.' | '#' => {
                i += 1;
                let ident = read_ident(&mut i);
                if ident.is_empty() {
                    return Err(unexpected(offset, c));
                }
                if c == '.' {
                    compound.classes.push(ident);
                } else {
                    compound.ids.push(ident);
                }
            }
            '[' => {
                let inner = &input[offset + 1..];
                let close = closing(inner, '[', ']').ok_or_else(|| unterminated("attribute selector"))?;
                compound.attrs.push(parse_attr(&inner[..close]).ok_or_else(|| unexpected(offset, c))?);
                i += inner[..close].chars().count() + 2;
            }
            ':' => {
                let Some(inner_start) = input[offset..].strip_prefix(":not(") else {
                    return Err(unexpected(offset, c));
                };
                let end = closing(inner_start, '(', ')').ok_or_else(|| unterminated(":not()"))?;
                let negated = parse_compound(full, inner_start[..end].trim())?;
                compound.negations.push(negated);
                i += ":not(".len() + inner_start[..end].chars().count() + 1;
            }
            _ => return Err(unexpected(offset, c)),
        }
    }

    if compound.is_empty() {
        return Err(SelectorError::Empty);
    }
    Ok(compound)
}

/// Byte offset of the `close` matching an already consumed `open`, skipping quoted text
fn closing(input: &str, open: char, close: char) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, c) if c == open => depth += 1,
            (None, c) if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_attr(body: &str) -> Option<AttrMatch> {
    let (name, value) = match body.split_once('=') {
        Some((name, value)) => (name.trim(), Some(value.trim())),
        None => (body.trim(), None),
    };
    if name.is_empty() || !name.chars().all(is_ident_char) {
        return None;
    }
    let name = name.to_ascii_lowercase();
    match value {
        None => Some(AttrMatch::Exists(name)),
        Some(value) => {
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
                .unwrap_or(value);
            Some(AttrMatch::Equals(name, unquoted.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> (DomTree, NodeId, NodeId, NodeId) {
        let mut tree = DomTree::new();
        let picture = tree.create_element_with("picture", &[("class", "hero wide")]);
        let source = tree.create_element_with("source", &[("data-srcset", "a.webp")]);
        let img = tree.create_element_with(
            "img",
            &[("data-lazy-img", ""), ("data-lazyimg-init", "true"), ("id", "main")],
        );
        tree.append_child(tree.root(), picture).unwrap();
        tree.append_child(picture, source).unwrap();
        tree.append_child(picture, img).unwrap();
        (tree, picture, source, img)
    }

    #[test]
    fn test_attribute_and_negation() {
        let (tree, picture, source, img) = tree();
        let fresh = Selector::parse("[data-lazy-img]:not([data-lazyimg-init])").unwrap();
        assert!(!fresh.matches(&tree, img));

        let any_src = Selector::parse("img[data-lazy-img], source[data-srcset]").unwrap();
        assert_eq!(tree.query_selector_all(picture, &any_src), vec![source, img]);
    }

    #[test]
    fn test_compound_and_descendant() {
        let (tree, picture, _, img) = tree();
        assert!(Selector::parse(".hero.wide").unwrap().matches(&tree, picture));
        assert!(Selector::parse("picture img#main").unwrap().matches(&tree, img));
        assert!(!Selector::parse("div img").unwrap().matches(&tree, img));
        assert!(Selector::parse("iframe[data-lazysrc='x'], *").unwrap().matches(&tree, img));
    }

    #[test]
    fn test_attribute_value() {
        let (tree, _, source, _) = tree();
        assert!(Selector::parse("[data-srcset=\"a.webp\"]").unwrap().matches(&tree, source));
        assert!(!Selector::parse("[data-srcset=b.webp]").unwrap().matches(&tree, source));
    }

    #[test]
    fn test_brackets_inside_quoted_values() {
        let mut tree = DomTree::new();
        let node = tree.create_element_with("div", &[("data-x", "a]b"), ("data-y", "f(x)")]);
        tree.append_child(tree.root(), node).unwrap();

        assert!(Selector::parse(r#"[data-x="a]b"]"#).unwrap().matches(&tree, node));
        assert!(Selector::parse("div[data-x='a]b'][data-y]").unwrap().matches(&tree, node));
        assert!(!Selector::parse(r#"div:not([data-y="f(x)"])"#).unwrap().matches(&tree, node));
        assert!(matches!(
            Selector::parse(r#"[data-x="a]"#),
            Err(SelectorError::Unterminated { .. })
        ));
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(Selector::parse(""), Err(SelectorError::Empty)));
        assert!(matches!(Selector::parse("a,"), Err(SelectorError::Empty)));
        assert!(matches!(
            Selector::parse("[data-x"),
            Err(SelectorError::Unterminated { .. })
        ));
        assert!(matches!(
            Selector::parse("div > p"),
            Err(SelectorError::Unexpected { found: '>', .. })
        ));
    }
}
