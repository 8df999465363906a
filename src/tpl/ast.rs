use serde::Serialize;

/// A sequence of statements plus the block parameters (`as |a b|`) it introduces.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Program {
    pub body: Vec<Statement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub block_params: Vec<String>,
}

impl Program {
    pub fn new(body: Vec<Statement>) -> Self {
        Self {
            body,
            block_params: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Statement {
    Content(String),
    Mustache(Mustache),
    Comment(String),
    Block(Block),
    Partial(Partial),
}

/// `{{path params hash}}`, or the triple-stash form when `escaped` is false.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Mustache {
    pub path: Expression,
    pub params: Vec<Expression>,
    pub hash: Vec<HashPair>,
    pub escaped: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub path: PathExpression,
    pub params: Vec<Expression>,
    pub hash: Vec<HashPair>,
    pub program: Program,
    pub inverse: Option<Program>,
}

impl Block {
    pub fn helper(&self) -> &str {
        &self.path.original
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partial {
    pub name: Expression,
    pub params: Vec<Expression>,
    pub hash: Vec<HashPair>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HashPair {
    pub key: String,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubExpression {
    pub path: PathExpression,
    pub params: Vec<Expression>,
    pub hash: Vec<HashPair>,
}

impl SubExpression {
    pub fn helper(&self) -> &str {
        &self.path.original
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value")]
pub enum Expression {
    Path(PathExpression),
    SubExpression(SubExpression),
    String(String),
    Number(String),
    Boolean(bool),
    Undefined,
    Null,
}

impl Expression {
    pub fn is_literal(&self) -> bool {
        !matches!(self, Expression::Path(_) | Expression::SubExpression(_))
    }

    /// The raw value of a literal, e.g. `==` for the string literal `"=="`.
    pub fn literal_text(&self) -> String {
        match self {
            Expression::String(s) | Expression::Number(s) => s.clone(),
            Expression::Boolean(b) => b.to_string(),
            Expression::Undefined => "undefined".to_string(),
            Expression::Null => "null".to_string(),
            other => other.as_written(),
        }
    }

    /// The expression the way it would appear in a template.
    pub fn as_written(&self) -> String {
        match self {
            Expression::Path(p) => p.original.clone(),
            Expression::SubExpression(sub) => {
                let mut out = format!("({}", sub.path.original);
                for param in &sub.params {
                    out.push(' ');
                    out.push_str(&param.as_written());
                }
                for pair in &sub.hash {
                    out.push_str(&format!(" {}={}", pair.key, pair.value.as_written()));
                }
                out.push(')');
                out
            }
            Expression::String(s) => format!("\"{}\"", s),
            Expression::Number(n) => n.clone(),
            Expression::Boolean(b) => b.to_string(),
            Expression::Undefined => "undefined".to_string(),
            Expression::Null => "null".to_string(),
        }
    }
}

/// A variable reference such as `../item.name`, `this` or `@key`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PathExpression {
    pub original: String,
    /// Number of `../` hops.
    pub depth: usize,
    pub parts: Vec<String>,
    /// Prefixed with `@`.
    pub data: bool,
}

impl PathExpression {
    pub fn new(original: &str, depth: usize, parts: Vec<String>, data: bool) -> Self {
        Self {
            original: original.to_string(),
            depth,
            parts,
            data,
        }
    }

    /// Parses the textual form of a path.
    pub fn parse(original: &str) -> Self {
        let mut rest = original;
        let data = match rest.strip_prefix('@') {
            Some(r) => {
                rest = r;
                true
            }
            None => false,
        };

        let mut depth = 0;
        let mut parts = Vec::new();
        for segment in rest.split('/') {
            match segment {
                ".." => depth += 1,
                "" | "." => {}
                _ => {
                    for part in segment.split('.') {
                        if part.is_empty() || (part == "this" && parts.is_empty()) {
                            continue;
                        }
                        parts.push(part.to_string());
                    }
                }
            }
        }

        Self::new(original, depth, parts, data)
    }

    pub fn is_key_reference(&self) -> bool {
        self.original == "@key"
    }

    pub fn is_current_value_reference(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn joined(&self) -> String {
        self.parts.join(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        let p = PathExpression::parse("user.name");
        assert_eq!(p.depth, 0);
        assert_eq!(p.parts, vec!["user", "name"]);
        assert!(!p.data);
    }

    #[test]
    fn test_parse_parent_path() {
        let p = PathExpression::parse("../../item/label");
        assert_eq!(p.depth, 2);
        assert_eq!(p.parts, vec!["item", "label"]);
    }

    #[test]
    fn test_parse_this() {
        assert!(PathExpression::parse("this").is_current_value_reference());
        assert!(PathExpression::parse(".").is_current_value_reference());
        assert_eq!(PathExpression::parse("this.name").parts, vec!["name"]);
        assert_eq!(PathExpression::parse("./name").parts, vec!["name"]);
        let up = PathExpression::parse("../this");
        assert_eq!(up.depth, 1);
        assert!(up.is_current_value_reference());
    }

    #[test]
    fn test_parse_data_path() {
        let p = PathExpression::parse("@key");
        assert!(p.data);
        assert!(p.is_key_reference());
        assert_eq!(p.parts, vec!["key"]);
        assert!(!PathExpression::parse("key").is_key_reference());
    }

    #[test]
    fn test_as_written() {
        let sub = Expression::SubExpression(SubExpression {
            path: PathExpression::parse("lookup"),
            params: vec![
                Expression::Path(PathExpression::parse("map")),
                Expression::String("k".into()),
            ],
            hash: vec![],
        });
        assert_eq!(sub.as_written(), "(lookup map \"k\")");
        assert_eq!(Expression::String("a".into()).literal_text(), "a");
        assert_eq!(Expression::Number("3".into()).as_written(), "3");
    }
}
