//! Push tokenizer for the markup subset level files use.
//!
//! Bytes go in through [`Tokenizer::feed`] in chunks of any size; tokens come out through a
//! callback as soon as they are recognised. Attribute values and text content may arrive split
//! over several [`Token::AttrValue`] / [`Token::Content`] tokens. Entities are decoded,
//! comments, processing instructions and the doctype are skipped, CDATA is reported as content.

use thiserror::Error;

/// One markup event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'a> {
    ElemStart(&'a str),
    AttrStart(&'a str),
    AttrValue(&'a [u8]),
    AttrEnd,
    Content(&'a [u8]),
    ElemEnd(&'a str),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MarkupErrorKind {
    #[error("unexpected {}", describe(*.0))]
    Unexpected(u8),
    #[error("NUL byte in markup")]
    NulByte,
    #[error("text outside the root element")]
    ContentOutsideRoot,
    #[error("more than one root element")]
    MultipleRoots,
    #[error("closing tag </{found}> does not match <{expected}>")]
    MismatchedTag { expected: String, found: String },
    #[error("closing tag </{0}> without an open element")]
    UnexpectedEndTag(String),
    #[error("unknown entity &{0};")]
    UnknownEntity(String),
    #[error("name is not valid UTF-8")]
    InvalidName,
    #[error("element <{0}> is never closed")]
    UnclosedElement(String),
    #[error("markup ends inside a tag")]
    UnexpectedEof,
    #[error("document has no root element")]
    NoRoot,
}

/// A markup error with the 1-based position of the offending byte.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{kind} at line {line}, column {column}")]
pub struct MarkupError {
    pub kind: MarkupErrorKind,
    pub line: u32,
    pub column: u32,
}

fn describe(b: u8) -> String {
    if b.is_ascii_graphic() {
        format!("'{}'", b as char)
    } else {
        format!("byte 0x{b:02x}")
    }
}

fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

fn is_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':' || b >= 0x80
}

fn is_name_byte(b: u8) -> bool {
    is_name_start(b) || b.is_ascii_digit() || b == b'-' || b == b'.'
}

const MAX_ENTITY_LEN: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Text,
    TagOpen,
    Decl,
    Comment { dashes: u8 },
    CData { brackets: u8 },
    Doctype { depth: u32 },
    Pi { question: bool },
    StartName,
    InTag,
    AttrName,
    AfterAttrName,
    BeforeValue,
    AttrValue { quote: u8 },
    SelfClose,
    EndName,
    EndTrail,
    /// `quote` is set when the entity sits inside an attribute value.
    Entity { quote: Option<u8> },
}

/// Streaming markup tokenizer. Fails on the first malformed byte and stays failed.
#[derive(Debug)]
pub struct Tokenizer {
    state: State,
    stack: Vec<String>,
    name: Vec<u8>,
    text: Vec<u8>,
    entity: Vec<u8>,
    decl: Vec<u8>,
    line: u32,
    column: u32,
    root_seen: bool,
    root_closed: bool,
    failed: Option<MarkupError>,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Self {
            state: State::Text,
            stack: Vec::new(),
            name: Vec::new(),
            text: Vec::new(),
            entity: Vec::new(),
            decl: Vec::new(),
            line: 1,
            column: 1,
            root_seen: false,
            root_closed: false,
            failed: None,
        }
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Tokenize `input`, calling `emit` for every token it completes.
    pub fn feed<F>(&mut self, input: &[u8], mut emit: F) -> Result<(), MarkupError>
    where
        F: FnMut(Token<'_>),
    {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }

        for &b in input {
            let (line, column) = (self.line, self.column);
            if b == b'\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }

            if let Err(kind) = self.step(b, &mut emit) {
                let err = MarkupError { kind, line, column };
                self.failed = Some(err.clone());
                return Err(err);
            }
        }

        // Hand over partial text so consumers see content as it streams in.
        match self.state {
            State::Text | State::CData { .. } => self.flush_content(&mut emit),
            State::AttrValue { .. } => self.flush_attr_value(&mut emit),
            _ => {}
        }
        Ok(())
    }

    /// Signal end of input. Fails if the document is incomplete.
    pub fn finish(&mut self) -> Result<(), MarkupError> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        let kind = if self.state != State::Text {
            Some(MarkupErrorKind::UnexpectedEof)
        } else if let Some(open) = self.stack.last() {
            Some(MarkupErrorKind::UnclosedElement(open.clone()))
        } else if !self.root_seen {
            Some(MarkupErrorKind::NoRoot)
        } else {
            None
        };

        match kind {
            Some(kind) => {
                let err = MarkupError {
                    kind,
                    line: self.line,
                    column: self.column,
                };
                self.failed = Some(err.clone());
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn flush_content<F: FnMut(Token<'_>)>(&mut self, emit: &mut F) {
        if !self.text.is_empty() {
            emit(Token::Content(&self.text));
            self.text.clear();
        }
    }

    fn flush_attr_value<F: FnMut(Token<'_>)>(&mut self, emit: &mut F) {
        if !self.text.is_empty() {
            emit(Token::AttrValue(&self.text));
            self.text.clear();
        }
    }

    fn step<F: FnMut(Token<'_>)>(&mut self, b: u8, emit: &mut F) -> Result<(), MarkupErrorKind> {
        if b == 0 {
            return Err(MarkupErrorKind::NulByte);
        }

        match self.state {
            State::Text => match b {
                b'<' => {
                    self.flush_content(emit);
                    self.state = State::TagOpen;
                }
                b'&' if !self.stack.is_empty() => {
                    self.entity.clear();
                    self.state = State::Entity { quote: None };
                }
                _ if self.stack.is_empty() => {
                    if !is_space(b) {
                        return Err(MarkupErrorKind::ContentOutsideRoot);
                    }
                }
                _ => self.text.push(b),
            },

            State::TagOpen => match b {
                b'/' => {
                    self.name.clear();
                    self.state = State::EndName;
                }
                b'!' => {
                    self.decl.clear();
                    self.state = State::Decl;
                }
                b'?' => self.state = State::Pi { question: false },
                _ if is_name_start(b) => {
                    if self.root_closed {
                        return Err(MarkupErrorKind::MultipleRoots);
                    }
                    self.name.clear();
                    self.name.push(b);
                    self.state = State::StartName;
                }
                _ => return Err(MarkupErrorKind::Unexpected(b)),
            },

            State::Decl => {
                self.decl.push(b);
                if self.decl == b"--" {
                    self.state = State::Comment { dashes: 0 };
                } else if self.decl == b"[CDATA[" {
                    if self.stack.is_empty() {
                        return Err(MarkupErrorKind::ContentOutsideRoot);
                    }
                    self.state = State::CData { brackets: 0 };
                } else if self.decl[0].is_ascii_alphabetic() {
                    self.state = State::Doctype { depth: 0 };
                } else if !b"--".starts_with(&self.decl) && !b"[CDATA[".starts_with(&self.decl) {
                    return Err(MarkupErrorKind::Unexpected(b));
                }
            }

            State::Comment { dashes } => {
                self.state = match b {
                    b'-' => State::Comment {
                        dashes: (dashes + 1).min(2),
                    },
                    b'>' if dashes >= 2 => State::Text,
                    _ => State::Comment { dashes: 0 },
                };
            }

            State::CData { brackets } => match b {
                b']' if brackets == 2 => self.text.push(b']'),
                b']' => self.state = State::CData { brackets: brackets + 1 },
                b'>' if brackets == 2 => {
                    self.flush_content(emit);
                    self.state = State::Text;
                }
                _ => {
                    self.text.extend(std::iter::repeat_n(b']', brackets as usize));
                    self.text.push(b);
                    self.state = State::CData { brackets: 0 };
                }
            },

            State::Doctype { depth } => match b {
                b'[' => self.state = State::Doctype { depth: depth + 1 },
                b']' => {
                    self.state = State::Doctype {
                        depth: depth.saturating_sub(1),
                    }
                }
                b'>' if depth == 0 => self.state = State::Text,
                _ => {}
            },

            State::Pi { question } => {
                self.state = match b {
                    b'?' => State::Pi { question: true },
                    b'>' if question => State::Text,
                    _ => State::Pi { question: false },
                };
            }

            State::StartName => {
                if is_name_byte(b) {
                    self.name.push(b);
                    return Ok(());
                }
                let name = std::str::from_utf8(&self.name)
                    .map_err(|_| MarkupErrorKind::InvalidName)?
                    .to_owned();
                emit(Token::ElemStart(&name));
                self.stack.push(name);
                self.root_seen = true;
                self.state = State::InTag;
                return self.in_tag(b);
            }

            State::InTag => return self.in_tag(b),

            State::AttrName => {
                if is_name_byte(b) {
                    self.name.push(b);
                    return Ok(());
                }
                let name =
                    std::str::from_utf8(&self.name).map_err(|_| MarkupErrorKind::InvalidName)?;
                emit(Token::AttrStart(name));
                self.state = match b {
                    b'=' => State::BeforeValue,
                    _ if is_space(b) => State::AfterAttrName,
                    _ => return Err(MarkupErrorKind::Unexpected(b)),
                };
            }

            State::AfterAttrName => match b {
                b'=' => self.state = State::BeforeValue,
                _ if is_space(b) => {}
                _ => return Err(MarkupErrorKind::Unexpected(b)),
            },

            State::BeforeValue => match b {
                b'"' | b'\'' => {
                    self.text.clear();
                    self.state = State::AttrValue { quote: b };
                }
                _ if is_space(b) => {}
                _ => return Err(MarkupErrorKind::Unexpected(b)),
            },

            State::AttrValue { quote } => match b {
                _ if b == quote => {
                    self.flush_attr_value(emit);
                    emit(Token::AttrEnd);
                    self.state = State::InTag;
                }
                b'&' => {
                    self.entity.clear();
                    self.state = State::Entity { quote: Some(quote) };
                }
                b'<' => return Err(MarkupErrorKind::Unexpected(b)),
                _ => self.text.push(b),
            },

            State::SelfClose => match b {
                b'>' => {
                    if let Some(name) = self.stack.pop() {
                        emit(Token::ElemEnd(&name));
                    }
                    self.root_closed = self.stack.is_empty();
                    self.state = State::Text;
                }
                _ => return Err(MarkupErrorKind::Unexpected(b)),
            },

            State::EndName => match b {
                b'>' if !self.name.is_empty() => return self.close_tag(emit),
                _ if is_space(b) && !self.name.is_empty() => self.state = State::EndTrail,
                _ if is_name_byte(b) && (!self.name.is_empty() || is_name_start(b)) => {
                    self.name.push(b)
                }
                _ => return Err(MarkupErrorKind::Unexpected(b)),
            },

            State::EndTrail => match b {
                b'>' => return self.close_tag(emit),
                _ if is_space(b) => {}
                _ => return Err(MarkupErrorKind::Unexpected(b)),
            },

            State::Entity { quote } => {
                if b == b';' {
                    let decoded = decode_entity(&self.entity)?;
                    let mut buf = [0u8; 4];
                    self.text
                        .extend_from_slice(decoded.encode_utf8(&mut buf).as_bytes());
                    self.state = match quote {
                        Some(quote) => State::AttrValue { quote },
                        None => State::Text,
                    };
                } else if self.entity.len() >= MAX_ENTITY_LEN || is_space(b) || b == b'<' {
                    self.entity.push(b);
                    return Err(MarkupErrorKind::UnknownEntity(
                        String::from_utf8_lossy(&self.entity).into_owned(),
                    ));
                } else {
                    self.entity.push(b);
                }
            }
        }
        Ok(())
    }

    fn in_tag(&mut self, b: u8) -> Result<(), MarkupErrorKind> {
        match b {
            b'/' => self.state = State::SelfClose,
            b'>' => self.state = State::Text,
            _ if is_space(b) => {}
            _ if is_name_start(b) => {
                self.name.clear();
                self.name.push(b);
                self.state = State::AttrName;
            }
            _ => return Err(MarkupErrorKind::Unexpected(b)),
        }
        Ok(())
    }

    fn close_tag<F: FnMut(Token<'_>)>(&mut self, emit: &mut F) -> Result<(), MarkupErrorKind> {
        let found = std::str::from_utf8(&self.name).map_err(|_| MarkupErrorKind::InvalidName)?;
        match self.stack.last() {
            None => return Err(MarkupErrorKind::UnexpectedEndTag(found.to_owned())),
            Some(open) if open != found => {
                return Err(MarkupErrorKind::MismatchedTag {
                    expected: open.clone(),
                    found: found.to_owned(),
                });
            }
            Some(_) => {}
        }
        emit(Token::ElemEnd(found));
        self.stack.pop();
        self.root_closed = self.stack.is_empty();
        self.state = State::Text;
        Ok(())
    }
}

fn decode_entity(name: &[u8]) -> Result<char, MarkupErrorKind> {
    let unknown = || MarkupErrorKind::UnknownEntity(String::from_utf8_lossy(name).into_owned());
    let decoded = match name {
        b"lt" => '<',
        b"gt" => '>',
        b"amp" => '&',
        b"quot" => '"',
        b"apos" => '\'',
        [b'#', b'x' | b'X', hex @ ..] => std::str::from_utf8(hex)
            .ok()
            .and_then(|s| u32::from_str_radix(s, 16).ok())
            .and_then(char::from_u32)
            .ok_or_else(unknown)?,
        [b'#', dec @ ..] => std::str::from_utf8(dec)
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .and_then(char::from_u32)
            .ok_or_else(unknown)?,
        _ => return Err(unknown()),
    };
    if decoded == '\0' {
        return Err(MarkupErrorKind::NulByte);
    }
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Owned {
        Start(String),
        Attr(String),
        Value(String),
        AttrEnd,
        Text(String),
        End(String),
    }

    fn tokenize_chunks(chunks: &[&[u8]]) -> Result<Vec<Owned>, MarkupError> {
        let mut out = Vec::new();
        let mut tok = Tokenizer::new();
        for chunk in chunks {
            tok.feed(chunk, |t| {
                out.push(match t {
                    Token::ElemStart(n) => Owned::Start(n.into()),
                    Token::AttrStart(n) => Owned::Attr(n.into()),
                    Token::AttrValue(v) => Owned::Value(String::from_utf8_lossy(v).into()),
                    Token::AttrEnd => Owned::AttrEnd,
                    Token::Content(c) => Owned::Text(String::from_utf8_lossy(c).into()),
                    Token::ElemEnd(n) => Owned::End(n.into()),
                })
            })?;
        }
        tok.finish()?;
        Ok(out)
    }

    fn tokenize(src: &str) -> Result<Vec<Owned>, MarkupError> {
        tokenize_chunks(&[src.as_bytes()])
    }

    /// Join adjacent text/value fragments so assertions don't depend on chunking.
    fn merged(tokens: Vec<Owned>) -> Vec<Owned> {
        let mut out: Vec<Owned> = Vec::new();
        for t in tokens {
            match (out.last_mut(), t) {
                (Some(Owned::Text(a)), Owned::Text(b)) => a.push_str(&b),
                (Some(Owned::Value(a)), Owned::Value(b)) => a.push_str(&b),
                (_, t) => out.push(t),
            }
        }
        out
    }

    use Owned::*;

    #[test]
    fn elements_attributes_and_content() {
        let tokens = tokenize(r#"<?xml version="1.0"?><map><layer width="2" name='a'>x</layer></map>"#)
            .unwrap();
        assert_eq!(
            merged(tokens),
            vec![
                Start("map".into()),
                Start("layer".into()),
                Attr("width".into()),
                Value("2".into()),
                AttrEnd,
                Attr("name".into()),
                Value("a".into()),
                AttrEnd,
                Text("x".into()),
                End("layer".into()),
                End("map".into()),
            ]
        );
    }

    #[test]
    fn self_closing_and_empty_values() {
        let tokens = tokenize(r#"<a><b k=""/></a>"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Start("a".into()),
                Start("b".into()),
                Attr("k".into()),
                AttrEnd,
                End("b".into()),
                End("a".into()),
            ]
        );
    }

    #[test]
    fn entities_are_decoded() {
        let tokens = tokenize(r#"<a v="&lt;&amp;&#65;&#x42;">&quot;&apos;&gt;</a>"#).unwrap();
        let tokens = merged(tokens);
        assert!(tokens.contains(&Value("<&AB".into())));
        assert!(tokens.contains(&Text("\"'>".into())));
    }

    #[test]
    fn comments_doctype_and_cdata() {
        let src = "<!DOCTYPE map [<!ENTITY x \"y\">]>\n<!-- lead -->\n<m><!-- a - b --><![CDATA[1,<2>]]]></m>";
        let tokens = merged(tokenize(src).unwrap());
        assert_eq!(
            tokens,
            vec![Start("m".into()), Text("1,<2>]".into()), End("m".into())]
        );
    }

    #[test]
    fn byte_at_a_time_matches_whole() {
        let src = r#"<map><object type="door" x="16"><property name="i1" value="3"/></object></map>"#;
        let chunks: Vec<&[u8]> = src.as_bytes().chunks(1).collect();
        assert_eq!(
            merged(tokenize_chunks(&chunks).unwrap()),
            merged(tokenize(src).unwrap())
        );
    }

    #[test]
    fn mismatched_tag_reports_position() {
        let err = tokenize("<a>\n  <b></c></a>").unwrap_err();
        assert_eq!(
            err.kind,
            MarkupErrorKind::MismatchedTag {
                expected: "b".into(),
                found: "c".into()
            }
        );
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 9);
    }

    #[test]
    fn truncated_document_fails_on_finish() {
        let err = tokenize("<a><b>").unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::UnclosedElement("b".into()));

        let err = tokenize("<a attr=\"x").unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::UnexpectedEof);

        let err = tokenize("  ").unwrap_err();
        assert_eq!(err.kind, MarkupErrorKind::NoRoot);
    }

    #[test]
    fn structural_errors() {
        assert_eq!(
            tokenize("<a/><b/>").unwrap_err().kind,
            MarkupErrorKind::MultipleRoots
        );
        assert_eq!(
            tokenize("hello<a/>").unwrap_err().kind,
            MarkupErrorKind::ContentOutsideRoot
        );
        assert_eq!(
            tokenize("<a>&bogus;</a>").unwrap_err().kind,
            MarkupErrorKind::UnknownEntity("bogus".into())
        );
        assert_eq!(
            tokenize("<a>\0</a>").unwrap_err().kind,
            MarkupErrorKind::NulByte
        );
        assert_eq!(
            tokenize("</a>").unwrap_err().kind,
            MarkupErrorKind::UnexpectedEndTag("a".into())
        );
        assert_eq!(
            tokenize("<a b=c/>").unwrap_err().kind,
            MarkupErrorKind::Unexpected(b'c')
        );
    }

    #[test]
    fn failure_is_sticky() {
        let mut tok = Tokenizer::new();
        assert!(tok.feed(b"<a></b>", |_| {}).is_err());
        assert!(tok.feed(b"</a>", |_| {}).is_err());
        assert!(tok.finish().is_err());
    }

    #[test]
    fn depth_tracks_open_elements() {
        let mut tok = Tokenizer::new();
        tok.feed(b"<a><b>", |_| {}).unwrap();
        assert_eq!(tok.depth(), 2);
    }
}
