//! Placeholder path expressions
//!
//! ```text
//! path    := root segment*
//! root    := "result" | "results"
//! segment := "." ident | "[" (quoted | digits) "]"
//! quoted  := "'" chars "'" | '"' chars '"'
//! ```
//!
//! `result.tokens[0]`, `results['get_token_prices']['SUI'].current` and
//! `results.0.apr` are all valid.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    /// The first action's result
    Result,
    /// All results, keyed
    Results,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    /// The segment as an object key
    pub fn as_key(&self) -> String {
        match self {
            Segment::Key(key) => key.clone(),
            Segment::Index(index) => index.to_string(),
        }
    }

    /// The segment as an array index
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Key(key) => key.parse().ok(),
            Segment::Index(index) => Some(*index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    pub root: Root,
    pub segments: Vec<Segment>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("unknown root '{0}'")]
    UnknownRoot(String),

    #[error("unexpected '{found}' at offset {offset}")]
    Unexpected { found: char, offset: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,
}

pub fn parse(expr: &str) -> Result<PathExpr, PathError> {
    Parser::new(expr.trim()).path()
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn expect(&mut self, expected: char) -> Result<(), PathError> {
        match self.bump() {
            Some(c) if c == expected => Ok(()),
            Some(found) => Err(PathError::Unexpected {
                found,
                offset: self.pos - found.len_utf8(),
            }),
            None => Err(PathError::UnexpectedEnd),
        }
    }

    fn unexpected(&self) -> PathError {
        match self.peek() {
            Some(found) => PathError::Unexpected {
                found,
                offset: self.pos,
            },
            None => PathError::UnexpectedEnd,
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn path(&mut self) -> Result<PathExpr, PathError> {
        let root = match self.ident()?.as_str() {
            "result" => Root::Result,
            "results" => Root::Results,
            other => return Err(PathError::UnknownRoot(other.to_string())),
        };

        let mut segments = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.bump();
                    segments.push(Segment::Key(self.ident()?));
                }
                '[' => segments.push(self.bracket()?),
                _ => return Err(self.unexpected()),
            }
        }
        Ok(PathExpr { root, segments })
    }

    fn ident(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.input[start..self.pos].to_string())
    }

    fn bracket(&mut self) -> Result<Segment, PathError> {
        self.expect('[')?;
        self.skip_whitespace();
        let segment = match self.peek() {
            Some(quote @ ('\'' | '"')) => {
                self.bump();
                let start = self.pos;
                loop {
                    match self.bump() {
                        Some(c) if c == quote => break,
                        Some(_) => {}
                        None => return Err(PathError::UnexpectedEnd),
                    }
                }
                Segment::Key(self.input[start..self.pos - 1].to_string())
            }
            Some(c) if c.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
                let digits = &self.input[start..self.pos];
                let index = digits.parse().map_err(|_| PathError::Unexpected {
                    found: c,
                    offset: start,
                })?;
                Segment::Index(index)
            }
            _ => return Err(self.unexpected()),
        };
        self.skip_whitespace();
        self.expect(']')?;
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(k: &str) -> Segment {
        Segment::Key(k.to_string())
    }

    #[test]
    fn test_dotted_path() {
        assert_eq!(
            parse("result.current").unwrap(),
            PathExpr {
                root: Root::Result,
                segments: vec![key("current")],
            }
        );
    }

    #[test]
    fn test_bracketed_keys_and_indexes() {
        let path = parse(r#"results['get_token_prices']["SUI"].current"#).unwrap();
        assert_eq!(path.root, Root::Results);
        assert_eq!(
            path.segments,
            vec![key("get_token_prices"), key("SUI"), key("current")]
        );

        let path = parse("result.tokens[ 1 ]").unwrap();
        assert_eq!(path.segments, vec![key("tokens"), Segment::Index(1)]);
    }

    #[test]
    fn test_quoted_key_may_contain_separators() {
        let path = parse("results['0x2::sui::SUI'].current").unwrap();
        assert_eq!(path.segments[0], key("0x2::sui::SUI"));
    }

    #[test]
    fn test_bare_root() {
        assert!(parse(" results ").unwrap().segments.is_empty());
    }

    #[test]
    fn test_rejects_bad_expressions() {
        assert_eq!(
            parse("price.current"),
            Err(PathError::UnknownRoot("price".to_string()))
        );
        assert_eq!(parse("result."), Err(PathError::UnexpectedEnd));
        assert_eq!(parse("result['SUI"), Err(PathError::UnexpectedEnd));
        assert!(matches!(
            parse("result.current * 100"),
            Err(PathError::Unexpected { found: ' ', .. })
        ));
        assert!(parse("").is_err());
    }

    #[test]
    fn test_segment_conversions() {
        assert_eq!(key("2").as_index(), Some(2));
        assert_eq!(key("apr").as_index(), None);
        assert_eq!(Segment::Index(3).as_key(), "3");
    }
}
