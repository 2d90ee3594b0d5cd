// ABOUTME: Declarative node selectors: Pattern, Selector (AND of predicates) and SelectorSet (OR of selectors).
// ABOUTME: Deserializes the JSON rule dictionaries used by recipes and evaluates them against tree nodes.

//! Rule matching.
//!
//! A rule dictionary such as
//!
//! ```json
//! {"name": "sec", "id": {"regex": "s\\d[A-Z]$"}, "class": ["figure", "fig"], "href": true}
//! ```
//!
//! becomes a [`Selector`]: every field must hold (logical AND), and a field
//! that is absent does not constrain the match. A list of dictionaries
//! becomes a [`SelectorSet`], which matches when any member does.
//!
//! Pattern semantics:
//! - a string matches an attribute when it equals the whole value or any
//!   item of a list-valued attribute (`class="figure wide"` matches `"figure"`);
//! - a list matches when any of its strings would;
//! - `{"regex": ...}` searches (unanchored) each item and the whole value;
//! - `true` / `false` test for presence / absence of the attribute.

use std::collections::BTreeMap;
use std::fmt;

use ego_tree::NodeRef;
use regex::Regex;
use serde::Deserialize;

use crate::dom::{AttrValue, Element, Node};

/// A predicate over a tag name or an attribute value.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "RawPattern")]
pub enum Pattern {
    Exact(String),
    AnyOf(Vec<String>),
    Regex(Regex),
    Present(bool),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPattern {
    Flag(bool),
    Exact(String),
    AnyOf(Vec<String>),
    Regex { regex: String },
}

impl TryFrom<RawPattern> for Pattern {
    type Error = regex::Error;

    fn try_from(raw: RawPattern) -> Result<Self, Self::Error> {
        Ok(match raw {
            RawPattern::Flag(present) => Pattern::Present(present),
            RawPattern::Exact(s) => Pattern::Exact(s),
            RawPattern::AnyOf(list) => Pattern::AnyOf(list),
            RawPattern::Regex { regex } => Pattern::Regex(Regex::new(&regex)?),
        })
    }
}

impl Pattern {
    pub fn exact(s: impl Into<String>) -> Self {
        Pattern::Exact(s.into())
    }

    pub fn any_of<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Pattern::AnyOf(items.into_iter().map(Into::into).collect())
    }

    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Pattern::Regex(Regex::new(pattern)?))
    }

    pub fn present() -> Self {
        Pattern::Present(true)
    }

    pub fn absent() -> Self {
        Pattern::Present(false)
    }

    /// Evaluates the pattern against a tag name. `Present(true)` accepts any
    /// name; `Present(false)` accepts none.
    pub fn matches_name(&self, name: &str) -> bool {
        match self {
            Pattern::Exact(s) => s == name,
            Pattern::AnyOf(list) => list.iter().any(|s| s == name),
            Pattern::Regex(re) => re.is_match(name),
            Pattern::Present(present) => *present,
        }
    }

    /// Evaluates the pattern against an attribute value (`None` when the
    /// attribute is missing).
    pub fn matches_attr(&self, value: Option<&AttrValue>) -> bool {
        match (self, value) {
            (Pattern::Present(present), v) => v.is_some() == *present,
            (_, None) => false,
            (Pattern::Exact(s), Some(v)) => equals(v, s),
            (Pattern::AnyOf(list), Some(v)) => list.iter().any(|s| equals(v, s)),
            (Pattern::Regex(re), Some(v)) => {
                v.items().iter().any(|item| re.is_match(item)) || re.is_match(&v.joined())
            }
        }
    }
}

fn equals(value: &AttrValue, s: &str) -> bool {
    value.items().iter().any(|item| item == s) || value.joined() == s
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::Exact(s.to_string())
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Pattern::Exact(s)
    }
}

impl From<bool> for Pattern {
    fn from(present: bool) -> Self {
        Pattern::Present(present)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(s) => write!(f, "{}", s),
            Pattern::AnyOf(list) => write!(f, "[{}]", list.join("|")),
            Pattern::Regex(re) => write!(f, "/{}/", re.as_str()),
            Pattern::Present(true) => write!(f, "*"),
            Pattern::Present(false) => write!(f, "!"),
        }
    }
}

/// A regex written as a plain JSON string, used where a pattern is always a
/// regex (substitutions, capture groups, section names).
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "String")]
pub struct TextRegex(Regex);

impl TryFrom<String> for TextRegex {
    type Error = regex::Error;

    fn try_from(pattern: String) -> Result<Self, Self::Error> {
        Ok(TextRegex(Regex::new(&pattern)?))
    }
}

impl TextRegex {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(TextRegex(Regex::new(pattern)?))
    }

    pub fn as_regex(&self) -> &Regex {
        &self.0
    }
}

impl std::ops::Deref for TextRegex {
    type Target = Regex;

    fn deref(&self) -> &Regex {
        &self.0
    }
}

/// A conjunction of predicates over one element.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, Pattern>")]
pub struct Selector {
    pub name: Option<Pattern>,
    pub attrs: Vec<(String, Pattern)>,
}

impl TryFrom<BTreeMap<String, Pattern>> for Selector {
    type Error = String;

    fn try_from(mut fields: BTreeMap<String, Pattern>) -> Result<Self, Self::Error> {
        if fields.is_empty() {
            return Err("selector must constrain the name or at least one attribute".to_string());
        }
        let name = fields.remove("name");
        Ok(Selector {
            name,
            attrs: fields.into_iter().collect(),
        })
    }
}

impl Selector {
    /// Selector on tag name only.
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            name: Some(Pattern::Exact(name.into())),
            attrs: Vec::new(),
        }
    }

    pub fn with_name(mut self, pattern: impl Into<Pattern>) -> Self {
        self.name = Some(pattern.into());
        self
    }

    pub fn with_attr(mut self, attr: impl Into<String>, pattern: impl Into<Pattern>) -> Self {
        self.attrs.push((attr.into(), pattern.into()));
        self
    }

    pub fn matches_element(&self, el: &Element) -> bool {
        if let Some(ref name) = self.name {
            if !name.matches_name(&el.name) {
                return false;
            }
        }
        self.attrs
            .iter()
            .all(|(attr, pattern)| pattern.matches_attr(el.attr(attr)))
    }

    /// Only element nodes can match.
    pub fn matches(&self, node: NodeRef<'_, Node>) -> bool {
        node.value()
            .as_element()
            .is_some_and(|el| self.matches_element(el))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref name) = self.name {
            parts.push(format!("name={}", name));
        }
        for (attr, pattern) in &self.attrs {
            parts.push(format!("{}={}", attr, pattern));
        }
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// A disjunction of selectors. The empty set matches nothing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(from = "RawSet")]
pub struct SelectorSet(Vec<Selector>);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSet {
    One(Selector),
    Many(Vec<Selector>),
}

impl From<RawSet> for SelectorSet {
    fn from(raw: RawSet) -> Self {
        match raw {
            RawSet::One(selector) => SelectorSet(vec![selector]),
            RawSet::Many(selectors) => SelectorSet(selectors),
        }
    }
}

impl SelectorSet {
    pub fn new(selectors: Vec<Selector>) -> Self {
        SelectorSet(selectors)
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, node: NodeRef<'_, Node>) -> bool {
        self.0.iter().any(|s| s.matches(node))
    }

    pub fn matches_element(&self, el: &Element) -> bool {
        self.0.iter().any(|s| s.matches_element(el))
    }
}

impl From<Selector> for SelectorSet {
    fn from(selector: Selector) -> Self {
        SelectorSet(vec![selector])
    }
}

impl From<Vec<Selector>> for SelectorSet {
    fn from(selectors: Vec<Selector>) -> Self {
        SelectorSet(selectors)
    }
}

impl FromIterator<Selector> for SelectorSet {
    fn from_iter<I: IntoIterator<Item = Selector>>(iter: I) -> Self {
        SelectorSet(iter.into_iter().collect())
    }
}

impl fmt::Display for SelectorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn div_with_class(classes: &[&str]) -> Element {
        Element {
            name: "div".into(),
            attrs: vec![(
                "class".into(),
                AttrValue::List(classes.iter().map(|c| c.to_string()).collect()),
            )],
        }
    }

    #[test]
    fn exact_matches_list_item_or_whole_value() {
        let el = div_with_class(&["figure", "wide"]);
        assert!(Selector::tag("div").with_attr("class", "figure").matches_element(&el));
        assert!(Selector::tag("div").with_attr("class", "figure wide").matches_element(&el));
        assert!(!Selector::tag("div").with_attr("class", "fig").matches_element(&el));
    }

    #[test]
    fn any_of_matches_membership() {
        let el = div_with_class(&["figure-image-content"]);
        let sel = Selector::tag("div")
            .with_attr("class", Pattern::any_of(["figure", "figure-image-content"]));
        assert!(sel.matches_element(&el));
        let other = div_with_class(&["table"]);
        assert!(!sel.matches_element(&other));
    }

    #[test]
    fn regex_is_unanchored() {
        let sec = Element::new("sec").with_attr("id", "s1A");
        let nested = Element::new("sec").with_attr("id", "s1A2");
        let sel = Selector::tag("sec").with_attr("id", Pattern::regex(r"s\d[A-Z]$").unwrap());
        assert!(sel.matches_element(&sec));
        assert!(!sel.matches_element(&nested));
        let prefix = Selector::default().with_name(Pattern::regex("^mml:").unwrap());
        assert!(prefix.matches_element(&Element::new("mml:mrow")));
        assert!(!prefix.matches_element(&Element::new("math")));
    }

    #[test]
    fn missing_attribute_fails_except_absence() {
        let el = Element::new("a");
        assert!(!Selector::tag("a").with_attr("href", Pattern::present()).matches_element(&el));
        assert!(Selector::tag("a").with_attr("href", Pattern::absent()).matches_element(&el));
        assert!(!Selector::tag("a").with_attr("href", "x").matches_element(&el));
    }

    #[test]
    fn fields_combine_with_and() {
        let el = Element::new("xref").with_attr("ref-type", "bibr");
        assert!(Selector::tag("xref").with_attr("ref-type", "bibr").matches_element(&el));
        assert!(!Selector::tag("xref").with_attr("ref-type", "fig").matches_element(&el));
        assert!(!Selector::tag("span").with_attr("ref-type", "bibr").matches_element(&el));
        // no name constraint
        assert!(Selector::default().with_attr("ref-type", "bibr").matches_element(&el));
    }

    #[test]
    fn set_is_a_disjunction() {
        let set: SelectorSet = vec![Selector::tag("b"), Selector::tag("i")].into();
        assert!(set.matches_element(&Element::new("i")));
        assert!(!set.matches_element(&Element::new("u")));
        assert!(!SelectorSet::default().matches_element(&Element::new("i")));
    }

    #[test]
    fn deserializes_rule_dictionaries() {
        let set: SelectorSet = serde_json::from_str(
            r#"[
                {"name": "div", "class": ["figure", "figure-image-content"]},
                {"name": "sec", "id": {"regex": "s\\d[A-Z]$"}},
                {"name": "a", "href": true},
                {"data-track-action": "reference anchor"}
            ]"#,
        )
        .unwrap();
        assert_eq!(set.selectors().len(), 4);
        assert!(matches!(set.selectors()[0].attrs[0].1, Pattern::AnyOf(ref l) if l.len() == 2));
        assert!(matches!(set.selectors()[1].attrs[0].1, Pattern::Regex(_)));
        assert!(matches!(set.selectors()[2].attrs[0].1, Pattern::Present(true)));
        assert!(set.selectors()[3].name.is_none());
    }

    #[test]
    fn deserializes_single_dictionary_as_set() {
        let set: SelectorSet = serde_json::from_str(r#"{"name": "title"}"#).unwrap();
        assert_eq!(set.selectors().len(), 1);
        assert!(set.matches_element(&Element::new("title")));
    }

    #[test]
    fn rejects_empty_selector_and_bad_regex() {
        assert!(serde_json::from_str::<Selector>("{}").is_err());
        assert!(serde_json::from_str::<Selector>(r#"{"id": {"regex": "("}}"#).is_err());
    }

    #[test]
    fn display_is_readable() {
        let sel = Selector::tag("sec").with_attr("id", Pattern::regex("s1$").unwrap());
        assert_eq!(sel.to_string(), "{name=sec, id=/s1$/}");
        let set: SelectorSet = vec![Selector::tag("b"), Selector::tag("i")].into();
        assert_eq!(set.to_string(), "{name=b} | {name=i}");
    }
}
