//! Byte-level HTML tokenizer.
//!
//! Tolerant by construction: malformed markup degrades to text tokens instead of
//! failing, so every input produces some token stream.

use figdex_dom::Attribute;
use markup5ever::data::NAMED_ENTITIES;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Doctype(String),
    Declaration(String),
    Start {
        name: String,
        attrs: Vec<Attribute>,
        self_closing: bool,
    },
    End {
        name: String,
    },
    Text(String),
    RawText(String),
    Comment(String),
}

pub(crate) fn tokenize(source: &str) -> Vec<Token> {
    let mut out = Vec::new();
    let bytes = source.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if starts_with(bytes, i, b"<!--") {
            let (comment, next) = parse_comment(bytes, i);
            out.push(Token::Comment(comment));
            i = next;
            continue;
        }

        if bytes[i] == b'<' {
            if starts_with(bytes, i, b"</") {
                if let Some((tok, next)) = parse_end_tag(bytes, i) {
                    out.push(tok);
                    i = next;
                    continue;
                }
            } else if starts_with(bytes, i, b"<!") || starts_with(bytes, i, b"<?") {
                let (decl, next) = parse_decl(bytes, i);
                match doctype_name(&decl) {
                    Some(name) => out.push(Token::Doctype(name)),
                    None => out.push(Token::Declaration(decl)),
                }
                i = next;
                continue;
            } else if let Some((tok, next)) = parse_start_tag(bytes, i) {
                let mut raw_text_tag: Option<String> = None;
                if let Token::Start {
                    name, self_closing, ..
                } = &tok
                {
                    if !*self_closing && is_raw_text_tag(name) {
                        raw_text_tag = Some(name.clone());
                    }
                }

                out.push(tok);
                i = next;

                if let Some(tag_name) = raw_text_tag {
                    let (raw_text, closing_end) = parse_raw_text_until_end_tag(bytes, i, &tag_name);
                    if !raw_text.is_empty() {
                        out.push(Token::RawText(raw_text));
                    }

                    if let Some(closing_end) = closing_end {
                        out.push(Token::End { name: tag_name });
                        i = closing_end;
                    } else {
                        i = bytes.len();
                    }
                }

                continue;
            }
        }

        let (txt, next) = parse_text(bytes, i);
        if !txt.is_empty() {
            out.push(Token::Text(decode_entities(&txt)));
        }
        i = next;
    }

    out
}

pub(crate) fn is_raw_text_tag(tag: &str) -> bool {
    matches!(tag, "script" | "style")
}

pub(crate) fn is_void(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

pub(crate) fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut cursor = 0_usize;

    while let Some(rel_amp) = input[cursor..].find('&') {
        let amp = cursor + rel_amp;
        out.push_str(&input[cursor..amp]);

        let rest = &input[(amp + 1)..];
        let Some(rel_semi) = rest.find(';') else {
            out.push('&');
            cursor = amp + 1;
            continue;
        };

        let semi = amp + 1 + rel_semi;
        let entity = &input[(amp + 1)..semi];
        if let Some(decoded) = decode_entity(entity) {
            out.push_str(&decoded);
            cursor = semi + 1;
        } else {
            out.push('&');
            cursor = amp + 1;
        }
    }

    out.push_str(&input[cursor..]);
    out
}

fn decode_entity(entity: &str) -> Option<String> {
    if let Some(hex) = entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
    {
        return char::from_u32(u32::from_str_radix(hex, 16).ok()?).map(String::from);
    }
    if let Some(dec) = entity.strip_prefix('#') {
        return char::from_u32(dec.parse::<u32>().ok()?).map(String::from);
    }

    // The table is keyed without the leading `&`. Prefixes of longer names
    // are stored too, mapped to `(0, 0)`.
    let (first, second) = *NAMED_ENTITIES.get(format!("{entity};").as_str())?;
    let mut decoded = String::new();
    decoded.push(char::from_u32(first).filter(|_| first != 0)?);
    if second != 0 {
        decoded.push(char::from_u32(second)?);
    }
    Some(decoded)
}

fn doctype_name(decl: &str) -> Option<String> {
    let body = decl.strip_prefix("<!")?;
    let body = body.strip_suffix('>').unwrap_or(body).trim();
    let keyword = body.get(..7)?;
    if !keyword.eq_ignore_ascii_case("doctype") {
        return None;
    }
    Some(body[7..].trim().to_owned())
}

fn starts_with(bytes: &[u8], i: usize, pat: &[u8]) -> bool {
    let end = i.saturating_add(pat.len());
    end <= bytes.len() && &bytes[i..end] == pat
}

fn parse_comment(bytes: &[u8], start: usize) -> (String, usize) {
    let body_start = start.saturating_add(4);
    let mut i = body_start;
    while i + 2 < bytes.len() {
        if bytes[i] == b'-' && bytes[i + 1] == b'-' && bytes[i + 2] == b'>' {
            return (lossy(&bytes[body_start..i]), i + 3);
        }
        i += 1;
    }
    (lossy(&bytes[body_start.min(bytes.len())..]), bytes.len())
}

fn parse_decl(bytes: &[u8], start: usize) -> (String, usize) {
    let terminator: &[u8] = if starts_with(bytes, start, b"<![CDATA[") {
        b"]]>"
    } else if starts_with(bytes, start, b"<?") {
        b"?>"
    } else {
        b">"
    };

    let mut i = start + 2;
    while i < bytes.len() {
        if starts_with(bytes, i, terminator) {
            let end = i + terminator.len();
            return (lossy(&bytes[start..end]), end);
        }
        i += 1;
    }

    // A processing instruction without `?>` still ends at the first `>`.
    if terminator == b"?>" {
        if let Some(rel) = bytes[start..].iter().position(|b| *b == b'>') {
            let end = start + rel + 1;
            return (lossy(&bytes[start..end]), end);
        }
    }
    (lossy(&bytes[start..]), bytes.len())
}

fn parse_text(bytes: &[u8], start: usize) -> (String, usize) {
    // A stray `<` that did not open a tag is kept as text.
    let mut i = start + 1;
    while i < bytes.len() && bytes[i] != b'<' {
        i += 1;
    }
    (lossy(&bytes[start..i]), i)
}

fn parse_raw_text_until_end_tag(
    bytes: &[u8],
    start: usize,
    tag_name: &str,
) -> (String, Option<usize>) {
    let tag_bytes = tag_name.as_bytes();
    let mut i = start;

    while i < bytes.len() {
        if bytes[i] != b'<' || i + 2 + tag_bytes.len() > bytes.len() {
            i = i.saturating_add(1);
            continue;
        }
        if bytes[i + 1] != b'/' {
            i = i.saturating_add(1);
            continue;
        }

        let name_start = i + 2;
        let name_end = name_start + tag_bytes.len();
        if !bytes[name_start..name_end].eq_ignore_ascii_case(tag_bytes) {
            i = i.saturating_add(1);
            continue;
        }

        let mut close = name_end;
        while close < bytes.len() && bytes[close].is_ascii_whitespace() {
            close = close.saturating_add(1);
        }

        if close < bytes.len() && bytes[close] == b'>' {
            return (lossy(&bytes[start..i]), Some(close + 1));
        }

        i = i.saturating_add(1);
    }

    (lossy(&bytes[start..]), None)
}

fn parse_end_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut i = start + 2;
    skip_spaces(bytes, &mut i);
    let begin = i;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    if i == begin {
        return None;
    }

    let name = lossy(&bytes[begin..i]).to_ascii_lowercase();
    while i < bytes.len() && bytes[i] != b'>' {
        i += 1;
    }
    if i >= bytes.len() {
        return None;
    }

    Some((Token::End { name }, i + 1))
}

fn parse_start_tag(bytes: &[u8], start: usize) -> Option<(Token, usize)> {
    let mut i = start + 1;
    let begin = i;
    while i < bytes.len() && is_name_char(bytes[i]) {
        i += 1;
    }
    if i == begin || !bytes[begin].is_ascii_alphabetic() {
        return None;
    }

    let name = lossy(&bytes[begin..i]).to_ascii_lowercase();
    let mut attrs: Vec<Attribute> = Vec::new();
    let mut self_closing = false;

    loop {
        skip_spaces(bytes, &mut i);
        if i >= bytes.len() {
            return None;
        }

        if bytes[i] == b'>' {
            i += 1;
            break;
        }

        if bytes[i] == b'/' {
            i += 1;
            skip_spaces(bytes, &mut i);
            if i < bytes.len() && bytes[i] == b'>' {
                self_closing = true;
                i += 1;
                break;
            }
            continue;
        }

        // A leading `=` belongs to the name, so every iteration consumes input.
        let a_start = i;
        if bytes[i] == b'=' {
            i += 1;
        }
        while i < bytes.len() && is_attr_name_char(bytes[i]) {
            i += 1;
        }

        let a_name = lossy(&bytes[a_start..i]).to_ascii_lowercase();
        skip_spaces(bytes, &mut i);

        let mut val = String::new();
        if i < bytes.len() && bytes[i] == b'=' {
            i += 1;
            skip_spaces(bytes, &mut i);
            if i < bytes.len() && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let q = bytes[i];
                i += 1;
                let v_start = i;
                while i < bytes.len() && bytes[i] != q {
                    i += 1;
                }
                val = lossy(&bytes[v_start..i]);
                if i < bytes.len() && bytes[i] == q {
                    i += 1;
                }
            } else {
                let v_start = i;
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>' {
                    i += 1;
                }
                val = lossy(&bytes[v_start..i]);
            }
        }

        // First occurrence wins, as in the HTML tree construction rules.
        if !attrs.iter().any(|attr| attr.name == a_name) {
            attrs.push(Attribute::new(a_name, decode_entities(&val)));
        }
    }

    Some((
        Token::Start {
            name,
            attrs,
            self_closing,
        },
        i,
    ))
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn skip_spaces(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && bytes[*i].is_ascii_whitespace() {
        *i += 1;
    }
}

fn is_name_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':')
}

/// Anything up to whitespace, `/`, `>` or `=`, so framework attributes like
/// `#slot`, `[x]` or `@click` survive.
fn is_attr_name_char(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'/' | b'>' | b'=')
}
