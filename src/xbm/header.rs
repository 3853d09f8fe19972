//! Line-oriented scan of the `#define` macros and the array declaration.

use log::{debug, trace};

use super::data::{DataStart, XbmFormat};
use super::literal::is_c_space;

/// Split the file into its non-empty lines.
pub(crate) fn split_lines(buf: &[u8]) -> Vec<&[u8]> {
    buf.split(|b| *b == b'\n')
        .filter(|line| !line.is_empty())
        .collect()
}

/// Skip leading spaces and tabs.
pub(crate) fn eat_white(line: &[u8]) -> &[u8] {
    let n = line
        .iter()
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    &line[n..]
}

fn skip_space(s: &[u8]) -> &[u8] {
    let n = s.iter().take_while(|b| is_c_space(**b)).count();
    &s[n..]
}

/// Split off the next whitespace-delimited token, skipping leading whitespace.
fn next_token(s: &[u8]) -> Option<(&[u8], &[u8])> {
    let s = skip_space(s);
    let n = s.iter().take_while(|b| !is_c_space(**b)).count();
    if n == 0 {
        return None;
    }
    Some(s.split_at(n))
}

/// Parse a signed decimal integer after optional whitespace. Trailing text is ignored.
fn next_decimal(s: &[u8]) -> Option<i32> {
    let s = skip_space(s);
    let (negative, s) = match s.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, s),
    };
    let n = s.iter().take_while(|b| b.is_ascii_digit()).count();
    if n == 0 {
        return None;
    }
    let mut x: i64 = 0;
    for c in &s[..n] {
        x = x.checked_mul(10)?.checked_add(i64::from(*c - b'0'))?;
    }
    if negative {
        x = -x;
    }
    x.try_into().ok()
}

/// Which piece of metadata a `#define` sets, judged by the `_`-separated
/// tokens at the end of its identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HeaderField {
    Width,
    Height,
    XHot,
    YHot,
    Unrecognized,
}

impl HeaderField {
    fn from_identifier(ident: &[u8]) -> HeaderField {
        let mut tokens = ident.rsplit(|b| *b == b'_').filter(|t| !t.is_empty());
        match (tokens.next(), tokens.next()) {
            (Some(b"width"), _) => HeaderField::Width,
            (Some(b"height"), _) => HeaderField::Height,
            (Some(b"hot"), Some(b"x")) => HeaderField::XHot,
            (Some(b"hot"), Some(b"y")) => HeaderField::YHot,
            _ => HeaderField::Unrecognized,
        }
    }
}

/// Match `#define <identifier> <integer>`.
fn match_define(line: &[u8]) -> Option<(&[u8], i32)> {
    let rest = line.strip_prefix(b"#define")?;
    let (ident, rest) = next_token(rest)?;
    Some((ident, next_decimal(rest)?))
}

/// Match `static unsigned <type> <name>` or `static <type> <name>`, returning the type and name.
fn match_declaration(line: &[u8]) -> Option<(&[u8], &[u8])> {
    let rest = skip_space(line.strip_prefix(b"static")?);
    let rest = rest.strip_prefix(b"unsigned").unwrap_or(rest);
    let (element_type, rest) = next_token(rest)?;
    let (name, _) = next_token(rest)?;
    Some((element_type, name))
}

/// The array holding the pixels is the one whose name ends in `_bits[]`.
fn is_bits_array(name: &[u8]) -> bool {
    let suffix = match name.iter().rposition(|b| *b == b'_') {
        Some(p) => &name[p + 1..],
        None => name,
    };
    suffix == b"bits[]"
}

/// Everything the header scan found. Later macros overwrite earlier ones.
#[derive(Debug, Default)]
pub(crate) struct Header<'a> {
    pub(crate) width: Option<i32>,
    pub(crate) height: Option<i32>,
    pub(crate) x_hot: Option<i32>,
    pub(crate) y_hot: Option<i32>,
    pub(crate) format: Option<XbmFormat>,
    pub(crate) data: Option<DataStart<'a>>,
}

/// Scan lines forward until the `_bits[]` declaration, collecting geometry,
/// hotspot and element type on the way.
pub(crate) fn scan_header<'a>(lines: &[&'a [u8]]) -> Header<'a> {
    let mut header = Header::default();

    for (i, &line) in lines.iter().enumerate() {
        let line = eat_white(line);

        if let Some((ident, value)) = match_define(line) {
            match HeaderField::from_identifier(ident) {
                HeaderField::Width => header.width = Some(value),
                HeaderField::Height => header.height = Some(value),
                HeaderField::XHot => header.x_hot = Some(value),
                HeaderField::YHot => header.y_hot = Some(value),
                HeaderField::Unrecognized => {
                    trace!("Ignoring #define {}", String::from_utf8_lossy(ident));
                }
            }
            continue;
        }

        if let Some((element_type, name)) = match_declaration(line) {
            match element_type {
                b"short" => header.format = Some(XbmFormat::Word),
                b"char" => header.format = Some(XbmFormat::Byte),
                _ => trace!(
                    "Unknown element type {}",
                    String::from_utf8_lossy(element_type)
                ),
            }
            if !is_bits_array(name) {
                trace!("Skipping array {}", String::from_utf8_lossy(name));
                continue;
            }

            debug!(
                "Found {} on line {}, format {:?}",
                String::from_utf8_lossy(name),
                i + 1,
                header.format
            );
            let first = match line.iter().position(|b| *b == b'{') {
                Some(p) => &line[p + 1..],
                None => &[],
            };
            header.data = Some(DataStart {
                first,
                next_line: i + 1,
            });
            break;
        }
    }

    header
}
