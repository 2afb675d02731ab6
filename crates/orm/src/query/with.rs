//! Relationship paths - what to load together with the root entities
//!
//! Text form: `Posts`, `Posts.Comments`, `Posts[PublishedDate > 2025-01-01]`,
//! `Posts[PublishedDate > 2025-01-01 && Title != 'Draft'].Comments`.
//!
//! Quoted literals may contain `&&`, `.` and brackets.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use super::types::{Predicate, QueryOperator};
use crate::error::LoaderError;

/// One relationship step of a path, optionally filtered
#[derive(Debug, Clone, PartialEq)]
pub struct PathSegment {
    pub relationship: String,
    pub filter: Option<Predicate>,
}

impl PathSegment {
    pub fn new(relationship: impl Into<String>) -> Self {
        Self {
            relationship: relationship.into(),
            filter: None,
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.filter {
            Some(filter) => write!(f, "{}[{}]", self.relationship, filter),
            None => write!(f, "{}", self.relationship),
        }
    }
}

/// A dot-separated traversal from the root entity through named relationships
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipPath {
    segments: Vec<PathSegment>,
}

impl RelationshipPath {
    /// Start a path at a top-level relationship
    pub fn new(relationship: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::new(relationship)],
        }
    }

    /// Extend the path by one nested relationship
    pub fn then(mut self, relationship: impl Into<String>) -> Self {
        self.segments.push(PathSegment::new(relationship));
        self
    }

    /// Filter the last segment of the path
    pub fn filter(mut self, predicate: Predicate) -> Self {
        if let Some(last) = self.segments.last_mut() {
            last.filter = Some(Predicate::combine(last.filter.take(), predicate));
        }
        self
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Relationship names only, without filters
    pub fn names(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.relationship.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for RelationshipPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.segments.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for RelationshipPath {
    type Err = LoaderError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| LoaderError::InvalidPath(format!("'{}': {}", text, reason));

        let mut segments = Vec::new();
        let mut current = String::new();
        let mut depth = 0usize;
        let mut quote: Option<char> = None;

        for ch in text.chars() {
            if let Some(open) = quote {
                if ch == open {
                    quote = None;
                }
                current.push(ch);
                continue;
            }
            match ch {
                '\'' | '"' => {
                    quote = Some(ch);
                    current.push(ch);
                }
                '[' => {
                    depth += 1;
                    current.push(ch);
                }
                ']' => {
                    if depth == 0 {
                        return Err(invalid("unbalanced ']'"));
                    }
                    depth -= 1;
                    current.push(ch);
                }
                '.' if depth == 0 => {
                    segments.push(parse_segment(&current).map_err(|r| invalid(&r))?);
                    current.clear();
                }
                _ => current.push(ch),
            }
        }
        if quote.is_some() {
            return Err(invalid("unterminated quote"));
        }
        if depth != 0 {
            return Err(invalid("unclosed '['"));
        }
        segments.push(parse_segment(&current).map_err(|r| invalid(&r))?);

        Ok(Self { segments })
    }
}

fn parse_segment(text: &str) -> Result<PathSegment, String> {
    let text = text.trim();
    let (name, filter) = match text.find('[') {
        Some(open) => {
            if !text.ends_with(']') {
                return Err("filter must close the segment".to_string());
            }
            let body = &text[open + 1..text.len() - 1];
            (text[..open].trim(), Some(parse_filter(body)?))
        }
        None => (text, None),
    };

    if name.is_empty() {
        return Err("empty relationship name".to_string());
    }
    if !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(format!("invalid relationship name '{}'", name));
    }

    Ok(PathSegment {
        relationship: name.to_string(),
        filter,
    })
}

fn parse_filter(body: &str) -> Result<Predicate, String> {
    let mut conditions = split_conjunction(body)
        .into_iter()
        .map(parse_condition)
        .collect::<Result<Vec<_>, _>>()?;

    match conditions.len() {
        0 => Err("empty filter".to_string()),
        1 => Ok(conditions.remove(0)),
        _ => Ok(Predicate::And(conditions)),
    }
}

/// Split on `&&` outside quoted literals
fn split_conjunction(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    let mut chars = body.char_indices().peekable();

    while let Some((i, ch)) = chars.next() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => {}
            None if ch == '\'' || ch == '"' => quote = Some(ch),
            None if ch == '&' && matches!(chars.peek(), Some((_, '&'))) => {
                parts.push(&body[start..i]);
                chars.next();
                start = i + 2;
            }
            None => {}
        }
    }
    parts.push(&body[start..]);
    parts
}

fn parse_condition(text: &str) -> Result<Predicate, String> {
    let text = text.trim();
    if text.is_empty() {
        return Err("empty condition".to_string());
    }

    // Leftmost operator position, longest token on ties
    let mut found: Option<(usize, &str, QueryOperator)> = None;
    for (token, operator) in QueryOperator::TOKENS {
        if let Some(pos) = text.find(token) {
            let better = match found {
                Some((best, best_token, _)) => pos < best || (pos == best && token.len() > best_token.len()),
                None => true,
            };
            if better {
                found = Some((pos, token, operator));
            }
        }
    }

    let (pos, token, operator) = found.ok_or_else(|| format!("no operator in '{}'", text))?;
    let attribute = text[..pos].trim();
    let literal = text[pos + token.len()..].trim();

    if attribute.is_empty() {
        return Err(format!("missing attribute in '{}'", text));
    }
    if literal.is_empty() {
        return Err(format!("missing value in '{}'", text));
    }

    Ok(Predicate::Compare {
        attribute: attribute.to_string(),
        operator,
        value: parse_literal(literal),
    })
}

fn parse_literal(text: &str) -> Value {
    let quoted = (text.starts_with('\'') && text.ends_with('\''))
        || (text.starts_with('"') && text.ends_with('"'));
    if quoted && text.len() >= 2 {
        return Value::String(text[1..text.len() - 1].to_string());
    }

    match text {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }

    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = text.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_simple_and_nested() {
        let path: RelationshipPath = "Posts".parse().unwrap();
        assert_eq!(path.depth(), 1);
        assert_eq!(path.segments()[0].relationship, "Posts");
        assert!(path.segments()[0].filter.is_none());

        let nested: RelationshipPath = "Posts.Comments".parse().unwrap();
        assert_eq!(nested, RelationshipPath::new("Posts").then("Comments"));
        assert_eq!(nested.names(), "Posts.Comments");
    }

    #[test]
    fn test_parse_filtered_segment() {
        let path: RelationshipPath = "Posts[PublishedDate > 2025-01-01T00:00:00.5Z].Comments"
            .parse()
            .unwrap();
        assert_eq!(path.depth(), 2);
        assert_eq!(
            path.segments()[0].filter,
            Some(Predicate::gt("PublishedDate", "2025-01-01T00:00:00.5Z"))
        );
        assert_eq!(path.names(), "Posts.Comments");
    }

    #[test]
    fn test_parse_conjunction_and_literals() {
        let path: RelationshipPath = "Comments[Author = 'Jane' && PostId >= 2 && Score < 1.5 && Hidden != true]"
            .parse()
            .unwrap();
        let expected = Predicate::And(vec![
            Predicate::eq("Author", "Jane"),
            Predicate::gte("PostId", 2),
            Predicate::lt("Score", json!(1.5)),
            Predicate::ne("Hidden", true),
        ]);
        assert_eq!(path.segments()[0].filter, Some(expected));
    }

    #[test]
    fn test_builder_filter_matches_parsed() {
        let built = RelationshipPath::new("Posts").filter(Predicate::gt("PublishedDate", "2025-01-01"));
        let parsed: RelationshipPath = "Posts[PublishedDate > 2025-01-01]".parse().unwrap();
        assert_eq!(built, parsed);
        assert_eq!(built.to_string(), "Posts[PublishedDate > '2025-01-01']");
    }

    #[test]
    fn test_quoted_literal_keeps_separators() {
        let path: RelationshipPath = "Comments[Content = 'Salt && Pepper']".parse().unwrap();
        assert_eq!(path.depth(), 1);
        assert_eq!(path.segments()[0].filter, Some(Predicate::eq("Content", "Salt && Pepper")));

        let path: RelationshipPath = "Posts[Title = \"v1.2 [draft]\"].Comments".parse().unwrap();
        assert_eq!(path.names(), "Posts.Comments");
        assert_eq!(path.segments()[0].filter, Some(Predicate::eq("Title", "v1.2 [draft]")));

        let both: RelationshipPath = "Comments[Content = 'a && b' && Author = 'Jane']".parse().unwrap();
        assert_eq!(
            both.segments()[0].filter,
            Some(Predicate::And(vec![
                Predicate::eq("Content", "a && b"),
                Predicate::eq("Author", "Jane"),
            ]))
        );
    }

    #[test]
    fn test_display_parses_back_to_the_same_path() {
        let paths = [
            RelationshipPath::new("Posts").filter(Predicate::eq("Title", "42")),
            RelationshipPath::new("Posts").filter(Predicate::eq("Title", "it's")),
            RelationshipPath::new("Posts")
                .filter(Predicate::gt("PublishedDate", "2025-01-01"))
                .then("Comments")
                .filter(Predicate::eq("Content", "Salt && Pepper").and(Predicate::gte("Id", 2))),
        ];
        for path in paths {
            let text = path.to_string();
            let parsed: RelationshipPath = text.parse().unwrap();
            assert_eq!(parsed, path, "{}", text);
        }
        assert_eq!(
            RelationshipPath::new("Posts").filter(Predicate::eq("Title", "42")).to_string(),
            "Posts[Title = '42']"
        );
    }

    #[test]
    fn test_invalid_paths() {
        for text in ["", "Posts.", ".Posts", "Posts[", "Posts]", "Posts[]", "Posts[Title]", "Posts[> 3]", "Po sts", "Posts[Title = 'open]"] {
            let result = text.parse::<RelationshipPath>();
            assert!(
                matches!(result, Err(LoaderError::InvalidPath(_))),
                "expected '{}' to be rejected",
                text
            );
        }
    }
}
