//! A small parser for WKT1 coordinate system descriptors.
//!
//! WKT1 is a tree of `KEYWORD[arg, arg, ...]` nodes whose arguments are
//! quoted strings, numbers, bare identifiers (authority codes, axis
//! directions) or nested nodes. Both `[]` and `()` brackets are accepted.
//! Doubled quotes inside a string (`""`) stand for a literal quote.

use std::fmt;

use thiserror::Error;

/// Errors raised while parsing WKT text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WktParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,

    #[error("unexpected character '{found}' at byte {pos}, expected {expected}")]
    UnexpectedChar {
        found: char,
        expected: &'static str,
        pos: usize,
    },

    #[error("unterminated string starting at byte {0}")]
    UnterminatedString(usize),

    #[error("mismatched bracket at byte {0}")]
    MismatchedBracket(usize),

    #[error("trailing input at byte {0}")]
    TrailingInput(usize),
}

/// A single WKT argument.
#[derive(Debug, Clone, PartialEq)]
pub enum WktValue {
    Text(String),
    Number(f64),
    Identifier(String),
    Node(WktNode),
}

impl WktValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            WktValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            WktValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&WktNode> {
        match self {
            WktValue::Node(n) => Some(n),
            _ => None,
        }
    }
}

/// A `KEYWORD[...]` node.
#[derive(Debug, Clone, PartialEq)]
pub struct WktNode {
    pub keyword: String,
    pub args: Vec<WktValue>,
}

impl WktNode {
    /// Keyword comparison is case-insensitive.
    pub fn is(&self, keyword: &str) -> bool {
        self.keyword.eq_ignore_ascii_case(keyword)
    }

    /// First direct child node with the given keyword.
    pub fn child(&self, keyword: &str) -> Option<&WktNode> {
        self.args
            .iter()
            .filter_map(WktValue::as_node)
            .find(|node| node.is(keyword))
    }

    /// All direct child nodes with the given keyword.
    pub fn children<'a>(&'a self, keyword: &'a str) -> impl Iterator<Item = &'a WktNode> + 'a {
        self.args
            .iter()
            .filter_map(WktValue::as_node)
            .filter(move |node| node.is(keyword))
    }

    /// The leading quoted name (`PROJCS["name", ...]`).
    pub fn name(&self) -> Option<&str> {
        self.args.first().and_then(WktValue::as_text)
    }

    /// Numeric argument at `index`.
    pub fn number(&self, index: usize) -> Option<f64> {
        self.args.get(index).and_then(WktValue::as_number)
    }
}

impl fmt::Display for WktValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WktValue::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            WktValue::Number(n) => write!(f, "{n}"),
            WktValue::Identifier(s) => f.write_str(s),
            WktValue::Node(node) => write!(f, "{node}"),
        }
    }
}

impl fmt::Display for WktNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.keyword)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{arg}")?;
        }
        f.write_str("]")
    }
}

/// Parser for WKT text.
pub struct Parser<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            chars: input.char_indices().peekable(),
            current_pos: 0,
        }
    }

    /// Parse exactly one root node and reject anything after it.
    pub fn parse(&mut self) -> Result<WktNode, WktParseError> {
        self.skip_whitespace();
        let node = self.parse_node()?;
        self.skip_whitespace();
        if !self.is_at_end() {
            return Err(WktParseError::TrailingInput(self.current_pos));
        }
        Ok(node)
    }

    fn parse_node(&mut self) -> Result<WktNode, WktParseError> {
        let keyword = self.parse_word();
        if keyword.is_empty() {
            return match self.peek_char() {
                Some(ch) => Err(WktParseError::UnexpectedChar {
                    found: ch,
                    expected: "keyword",
                    pos: self.current_pos,
                }),
                None => Err(WktParseError::UnexpectedEof),
            };
        }

        self.skip_whitespace();
        self.parse_node_body(keyword)
    }

    fn parse_node_body(&mut self, keyword: String) -> Result<WktNode, WktParseError> {
        let close = match self.peek_char() {
            Some('[') => ']',
            Some('(') => ')',
            Some(ch) => {
                return Err(WktParseError::UnexpectedChar {
                    found: ch,
                    expected: "'[' or '('",
                    pos: self.current_pos,
                })
            }
            None => return Err(WktParseError::UnexpectedEof),
        };
        self.advance();

        let mut args = Vec::new();
        loop {
            self.skip_whitespace();
            args.push(self.parse_value()?);
            self.skip_whitespace();

            match self.peek_char() {
                Some(',') => self.advance(),
                Some(ch) if ch == close => {
                    self.advance();
                    break;
                }
                Some(']') | Some(')') => {
                    return Err(WktParseError::MismatchedBracket(self.current_pos))
                }
                Some(ch) => {
                    return Err(WktParseError::UnexpectedChar {
                        found: ch,
                        expected: "',' or closing bracket",
                        pos: self.current_pos,
                    })
                }
                None => return Err(WktParseError::UnexpectedEof),
            }
        }

        Ok(WktNode { keyword, args })
    }

    fn parse_value(&mut self) -> Result<WktValue, WktParseError> {
        match self.peek_char() {
            Some('"') => self.parse_string().map(WktValue::Text),
            Some(ch) if ch.is_ascii_digit() || ch == '-' || ch == '+' || ch == '.' => {
                self.parse_number()
            }
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                let word = self.parse_word();
                self.skip_whitespace();
                if matches!(self.peek_char(), Some('[') | Some('(')) {
                    self.parse_node_body(word).map(WktValue::Node)
                } else {
                    Ok(WktValue::Identifier(word))
                }
            }
            Some(ch) => Err(WktParseError::UnexpectedChar {
                found: ch,
                expected: "value",
                pos: self.current_pos,
            }),
            None => Err(WktParseError::UnexpectedEof),
        }
    }

    fn parse_number(&mut self) -> Result<WktValue, WktParseError> {
        let start = self.current_pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_digit() || matches!(ch, '-' | '+' | '.' | 'e' | 'E') {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.input[start..self.current_pos];
        text.parse::<f64>()
            .map(WktValue::Number)
            .map_err(|_| WktParseError::UnexpectedChar {
                found: text.chars().next().unwrap_or('?'),
                expected: "number",
                pos: start,
            })
    }

    fn parse_string(&mut self) -> Result<String, WktParseError> {
        let start = self.current_pos;
        self.advance();
        let mut result = String::new();

        loop {
            match self.peek_char() {
                None => return Err(WktParseError::UnterminatedString(start)),
                Some('"') => {
                    self.advance();
                    if self.peek_char() == Some('"') {
                        result.push('"');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(ch) => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Ok(result)
    }

    fn parse_word(&mut self) -> String {
        let start = self.current_pos;
        while let Some(ch) = self.peek_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        self.input[start..self.current_pos].to_string()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn advance(&mut self) {
        if let Some((pos, ch)) = self.chars.next() {
            self.current_pos = pos + ch.len_utf8();
        }
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }
}

/// Parse WKT text into its root node.
pub fn parse(input: &str) -> Result<WktNode, WktParseError> {
    log::trace!("Parsing WKT from {} bytes of input", input.len());
    Parser::new(input).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_node() {
        let node = parse(r#"UNIT["Meter",1.0]"#).unwrap();
        assert!(node.is("unit"));
        assert_eq!(node.name(), Some("Meter"));
        assert_eq!(node.number(1), Some(1.0));
    }

    #[test]
    fn test_parse_nested_with_whitespace() {
        let node = parse(
            "GEOGCS[\"GCS_WGS_1984\",\n    DATUM[\"D_WGS_1984\",\n        SPHEROID[\"WGS_1984\",6378137.0,298.257223563]],\n    PRIMEM[\"Greenwich\",0.0]]",
        )
        .unwrap();

        let spheroid = node.child("DATUM").and_then(|d| d.child("SPHEROID")).unwrap();
        assert_eq!(spheroid.number(1), Some(6378137.0));
        assert_eq!(spheroid.number(2), Some(298.257223563));
    }

    #[test]
    fn test_child_outlives_keyword() {
        let node = parse(r#"PROJCS["x",UNIT["m",1],PARAMETER["a",1],PARAMETER["b",2]]"#).unwrap();

        let found = {
            let keyword = String::from("unit");
            node.child(&keyword)
        };
        assert_eq!(found.and_then(WktNode::name), Some("m"));
        assert_eq!(node.children("PARAMETER").count(), 2);
        assert!(node.child("DATUM").is_none());
    }

    #[test]
    fn test_parse_parentheses_and_identifiers() {
        let node = parse(r#"AXIS("Easting", EAST)"#).unwrap();
        assert_eq!(node.args[1], WktValue::Identifier("EAST".to_string()));
    }

    #[test]
    fn test_parse_exponent_numbers() {
        let node = parse(r#"TOWGS84[0,0,0,-1.5e-3,+2E2,0,0]"#).unwrap();
        assert_eq!(node.number(3), Some(-0.0015));
        assert_eq!(node.number(4), Some(200.0));
    }

    #[test]
    fn test_doubled_quote_escape() {
        let node = parse(r#"PROJCS["a ""quoted"" name",UNIT["m",1]]"#).unwrap();
        assert_eq!(node.name(), Some(r#"a "quoted" name"#));
        assert_eq!(node.to_string(), r#"PROJCS["a ""quoted"" name",UNIT["m",1]]"#);
    }

    #[test]
    fn test_children_filter() {
        let node =
            parse(r#"PROJCS["x",PARAMETER["a",1],PARAMETER["b",2],UNIT["m",1]]"#).unwrap();
        assert_eq!(node.children("parameter").count(), 2);
    }

    #[test]
    fn test_display_is_compact() {
        let node = parse("UNIT[ \"Degree\" , 0.0174532925199433 ]").unwrap();
        assert_eq!(node.to_string(), r#"UNIT["Degree",0.0174532925199433]"#);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(""), Err(WktParseError::UnexpectedEof));
        assert!(matches!(
            parse(r#"UNIT["Meter",1.0"#),
            Err(WktParseError::UnexpectedEof)
        ));
        assert!(matches!(
            parse(r#"UNIT["Meter,1.0]"#),
            Err(WktParseError::UnterminatedString(5))
        ));
        assert!(matches!(
            parse(r#"UNIT["Meter",1.0)"#),
            Err(WktParseError::MismatchedBracket(_))
        ));
        assert!(matches!(
            parse(r#"UNIT["Meter",1.0] extra"#),
            Err(WktParseError::TrailingInput(_))
        ));
        assert!(matches!(
            parse("not wkt at all"),
            Err(WktParseError::UnexpectedChar { .. })
        ));
    }
}
