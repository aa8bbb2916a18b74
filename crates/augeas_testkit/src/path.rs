//! Parser for the path subset understood by [`MemoryEngine`](crate::MemoryEngine).
//!
//! Supported:
//!
//! - absolute paths (`/files/etc/hosts`), variable paths (`$hosts/1`) and
//!   relative paths, resolved against `/files`
//! - `*` for any label, `//label` and `**` for descendants
//! - positional predicates `[N]` and `[last()+1]`

use std::fmt;

/// Where evaluation starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Start {
    /// The tree root.
    Root,
    /// The nodes held by a variable.
    Variable(String),
    /// The context node, `/files`.
    Context,
}

/// How a step selects nodes relative to its context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Children of the context.
    Child,
    /// Children of the context or of any of its descendants.
    Descendant,
}

/// Label test of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Test {
    /// Nodes with exactly this label.
    Label(String),
    /// Any node.
    Any,
}

/// Positional predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    /// The N-th candidate, counting from 1.
    Index(usize),
    /// One past the last candidate; never matches, only creates.
    Append,
}

/// One location step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Axis of the step.
    pub axis: Axis,
    /// Label test.
    pub test: Test,
    /// Predicates applied in order.
    pub predicates: Vec<Predicate>,
}

impl Step {
    /// Returns the label a node created for this step gets, if the step
    /// can create one.
    pub fn creatable_label(&self) -> Option<&str> {
        match (&self.axis, &self.test) {
            (Axis::Child, Test::Label(label)) => Some(label),
            _ => None,
        }
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    /// Starting point.
    pub start: Start,
    /// Steps applied in order.
    pub steps: Vec<Step>,
}

/// Why an expression was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// What is wrong.
    pub reason: &'static str,
    /// Byte offset of the problem.
    pub position: usize,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at position {}", self.reason, self.position)
    }
}

fn fail<T>(reason: &'static str, position: usize) -> Result<T, ParseError> {
    Err(ParseError { reason, position })
}

/// Parses an expression evaluated from the root, a variable or `/files`.
pub fn parse(expr: &str) -> Result<PathExpr, ParseError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return fail("empty path expression", 0);
    }

    if let Some(rest) = trimmed.strip_prefix('$') {
        let end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .unwrap_or(rest.len());
        if end == 0 {
            return fail("expected variable name", 1);
        }
        let steps = parse_steps(&rest[end..], end + 1)?;
        return Ok(PathExpr {
            start: Start::Variable(rest[..end].to_string()),
            steps,
        });
    }

    if trimmed.starts_with('/') {
        let steps = if trimmed == "/" {
            Vec::new()
        } else {
            parse_steps(trimmed, 0)?
        };
        return Ok(PathExpr {
            start: Start::Root,
            steps,
        });
    }

    parse_relative(trimmed).map(|steps| PathExpr {
        start: Start::Context,
        steps,
    })
}

/// Parses a relative expression such as `alias[2]` or `*/ipaddr`.
pub fn parse_relative(expr: &str) -> Result<Vec<Step>, ParseError> {
    let trimmed = expr.trim();
    if trimmed.is_empty() {
        return fail("empty path expression", 0);
    }
    if trimmed.starts_with('/') {
        return fail("expected relative path", 0);
    }
    parse_steps(&format!("/{trimmed}"), 0)
}

/// Parses `(/step | //step)*`; `offset` is the position of `text` in the
/// original expression.
fn parse_steps(text: &str, offset: usize) -> Result<Vec<Step>, ParseError> {
    let bytes = text.as_bytes();
    let mut steps = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        if bytes[pos] != b'/' {
            return fail("expected '/'", offset + pos);
        }
        pos += 1;
        let mut axis = Axis::Child;
        if pos < bytes.len() && bytes[pos] == b'/' {
            axis = Axis::Descendant;
            pos += 1;
        }

        let start = pos;
        let mut depth = 0usize;
        while pos < bytes.len() {
            match bytes[pos] {
                b'[' => depth += 1,
                b']' => {
                    if depth == 0 {
                        return fail("unbalanced ']'", offset + pos);
                    }
                    depth -= 1;
                }
                b'/' if depth == 0 => break,
                _ => {}
            }
            pos += 1;
        }
        if depth != 0 {
            return fail("unterminated predicate", offset + pos);
        }
        steps.push(parse_step(&text[start..pos], axis, offset + start)?);
    }
    Ok(steps)
}

fn parse_step(text: &str, axis: Axis, offset: usize) -> Result<Step, ParseError> {
    let (name, mut rest) = match text.find('[') {
        Some(i) => (&text[..i], &text[i..]),
        None => (text, ""),
    };
    let name = name.trim();

    let (axis, test) = match name {
        "" => return fail("expected label", offset),
        "*" => (axis, Test::Any),
        "**" => (Axis::Descendant, Test::Any),
        label if label.contains(']') => return fail("unbalanced ']'", offset),
        label => (axis, Test::Label(label.to_string())),
    };

    let mut predicates = Vec::new();
    let mut position = offset + text.len() - rest.len();
    while !rest.is_empty() {
        let Some(close) = rest.find(']') else {
            return fail("unterminated predicate", position);
        };
        let body: String = rest[1..close].chars().filter(|c| !c.is_whitespace()).collect();
        let predicate = match body.as_str() {
            "last()+1" => Predicate::Append,
            digits => match digits.parse::<usize>() {
                Ok(index) if index >= 1 => Predicate::Index(index),
                Ok(_) => return fail("position must be at least 1", position),
                Err(_) => return fail("unsupported predicate", position),
            },
        };
        predicates.push(predicate);
        rest = &rest[close + 1..];
        position += close + 1;
        if !rest.is_empty() && !rest.starts_with('[') {
            return fail("unexpected text after predicate", position);
        }
    }

    Ok(Step {
        axis,
        test,
        predicates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(name: &str) -> Step {
        Step {
            axis: Axis::Child,
            test: Test::Label(name.into()),
            predicates: Vec::new(),
        }
    }

    #[test]
    fn absolute_path() {
        let expr = parse("/files/etc/hosts").unwrap();
        assert_eq!(expr.start, Start::Root);
        assert_eq!(expr.steps, vec![label("files"), label("etc"), label("hosts")]);
    }

    #[test]
    fn root_only() {
        let expr = parse("/").unwrap();
        assert!(expr.steps.is_empty());
    }

    #[test]
    fn labels_keep_dots() {
        let expr = parse("/files/etc/mke2fs.conf").unwrap();
        assert_eq!(expr.steps[2], label("mke2fs.conf"));
    }

    #[test]
    fn predicates() {
        let expr = parse("/a/b[2]/c[ last() + 1 ]").unwrap();
        assert_eq!(expr.steps[1].predicates, vec![Predicate::Index(2)]);
        assert_eq!(expr.steps[2].predicates, vec![Predicate::Append]);
    }

    #[test]
    fn descendants_and_wildcards() {
        let expr = parse("/files//error").unwrap();
        assert_eq!(expr.steps[1].axis, Axis::Descendant);

        let expr = parse("/nonexistent/**").unwrap();
        assert_eq!(expr.steps[1].axis, Axis::Descendant);
        assert_eq!(expr.steps[1].test, Test::Any);

        let expr = parse("/files/*/ipaddr").unwrap();
        assert_eq!(expr.steps[1].test, Test::Any);
    }

    #[test]
    fn variables() {
        let expr = parse("$hosts/1/ipaddr").unwrap();
        assert_eq!(expr.start, Start::Variable("hosts".into()));
        assert_eq!(expr.steps.len(), 2);

        let expr = parse("$x").unwrap();
        assert!(expr.steps.is_empty());

        assert!(parse("$/a").is_err());
    }

    #[test]
    fn relative_paths_use_context() {
        let expr = parse("etc/hosts").unwrap();
        assert_eq!(expr.start, Start::Context);
        assert_eq!(parse_relative("alias[2]").unwrap()[0].predicates, vec![Predicate::Index(2)]);
        assert!(parse_relative("/abs").is_err());
    }

    #[test]
    fn malformed_expressions() {
        for bad in ["", "/a/", "/a[", "/a]", "/a[0]", "/a[x]", "/a[last()]", "/a[1]b", "/a//"] {
            assert!(parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn creatable_steps() {
        let expr = parse("/a/*//b").unwrap();
        assert_eq!(expr.steps[0].creatable_label(), Some("a"));
        assert_eq!(expr.steps[1].creatable_label(), None);
        assert_eq!(expr.steps[2].creatable_label(), None);
    }
}
