//! Partial-response field mask parser
//!
//! Parses a field-selection expression into a flat, ordered list of field
//! paths. A path is a `/`-separated list of segments; parenthesized groups
//! distribute their prefix over every contained path, and commas separate
//! sibling selections:
//!
//! ```text
//! items(title,author/uri),fields
//!   -> [items,title] [items,author,uri] [fields]
//! ```
//!
//! Quoted segments keep characters that would otherwise split a path
//! (`labels/"techaid.tech/uuid"` selects the `techaid.tech/uuid` key under
//! `labels`). Spaces are insignificant and removed from segment text; `*` is
//! an ordinary segment.

use crate::error::SquillError;
use crate::scan::Scanner;
use crate::Result;

/// Characters allowed in an unquoted path segment. Spaces are allowed here
/// and stripped from the finished segment.
fn is_segment_char(ch: char) -> bool {
    !matches!(ch, ':' | '\t' | '\r' | '\n' | ')' | '(' | '/' | ',')
}

/// Parse a field mask into its list of field paths, in source order
pub fn parse_masks(input: &str) -> Result<Vec<Vec<String>>> {
    let mut parser = MaskParser {
        scanner: Scanner::new(input),
    };
    parser.scanner.skip_whitespace();
    if parser.scanner.is_eof() {
        return Err(SquillError::InvalidQuery);
    }
    let paths = parser.parse_list()?;
    parser.scanner.skip_whitespace();
    if !parser.scanner.is_eof() {
        return Err(SquillError::Parse {
            position: parser.scanner.position(),
            message: "unexpected trailing input".to_string(),
        });
    }
    Ok(paths)
}

struct MaskParser {
    scanner: Scanner,
}

impl MaskParser {
    /// `list := item (',' item)*`
    fn parse_list(&mut self) -> Result<Vec<Vec<String>>> {
        let mut paths = self.parse_item()?;
        loop {
            self.scanner.skip_whitespace();
            if self.scanner.eat(',') {
                paths.extend(self.parse_item()?);
            } else {
                break;
            }
        }
        Ok(paths)
    }

    /// `item := path ('(' list ')')?`; a group distributes its prefix over
    /// every contained path
    fn parse_item(&mut self) -> Result<Vec<Vec<String>>> {
        let prefix = self.parse_path()?;
        self.scanner.skip_whitespace();
        if self.scanner.eat('(') {
            let children = self.parse_list()?;
            self.scanner.skip_whitespace();
            if !self.scanner.eat(')') {
                return Err(SquillError::Parse {
                    position: self.scanner.position(),
                    message: "expected `)`".to_string(),
                });
            }
            return Ok(children
                .into_iter()
                .map(|child| {
                    let mut path = prefix.clone();
                    path.extend(child);
                    path
                })
                .collect());
        }
        Ok(vec![prefix])
    }

    /// `path := segment ('/' segment)*`
    fn parse_path(&mut self) -> Result<Vec<String>> {
        let mut segments = vec![self.parse_segment()?];
        loop {
            let mark = self.scanner.mark();
            self.scanner.skip_whitespace();
            if self.scanner.eat('/') {
                segments.push(self.parse_segment()?);
            } else {
                self.scanner.rewind(mark);
                break;
            }
        }
        Ok(segments)
    }

    fn parse_segment(&mut self) -> Result<String> {
        self.scanner.skip_whitespace();
        let text = if self.scanner.peek() == Some('"') {
            self.scanner.read_quoted()?
        } else {
            self.scanner.read_while(is_segment_char)
        };
        let segment: String = text.chars().filter(|ch| *ch != ' ').collect();
        if segment.is_empty() {
            return Err(SquillError::Parse {
                position: self.scanner.position(),
                message: "empty path segment".to_string(),
            });
        }
        Ok(segment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(input: &str) -> Vec<Vec<String>> {
        parse_masks(input).unwrap()
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_path() {
        assert_eq!(paths("etag"), vec![path(&["etag"])]);
        assert_eq!(
            paths("context/facets/label"),
            vec![path(&["context", "facets", "label"])]
        );
    }

    #[test]
    fn test_quoted_segment_keeps_slashes() {
        assert_eq!(
            paths("labels/\"techaid.tech/uuid\""),
            vec![path(&["labels", "techaid.tech/uuid"])]
        );
    }

    #[test]
    fn test_spaces_are_insignificant() {
        assert_eq!(paths("items ( id )"), vec![path(&["items", "id"])]);
        assert_eq!(
            paths("  links /* / href "),
            vec![path(&["links", "*", "href"])]
        );
    }

    #[test]
    fn test_group_distributes_prefix() {
        assert_eq!(
            paths("items(title,author/uri),fields"),
            vec![
                path(&["items", "title"]),
                path(&["items", "author", "uri"]),
                path(&["fields"]),
            ]
        );
    }

    #[test]
    fn test_empty_mask() {
        assert_eq!(parse_masks("").unwrap_err(), SquillError::InvalidQuery);
        assert_eq!(parse_masks("  ").unwrap_err(), SquillError::InvalidQuery);
    }

    #[test]
    fn test_empty_segment() {
        assert!(parse_masks("items//id").is_err());
        assert!(parse_masks("items(id").is_err());
    }
}
