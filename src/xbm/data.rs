//! The pixel data array: buffer layout and the literal scan that fills it.

use std::iter;

use log::{debug, trace};

use super::literal::{parse_literal, Literal};
use super::{BitmapError, FormatError};

/// Element type of the `_bits[]` array, which determines how each literal is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XbmFormat {
    /// X10 bitmaps: `short` elements, each literal is a little-endian 16-bit word.
    Word,
    /// X11 bitmaps: `char` elements, each literal is a single byte.
    Byte,
}

impl XbmFormat {
    /// Number of bytes a single array element contributes to the bitmap.
    pub fn bytes_per_literal(self) -> usize {
        match self {
            XbmFormat::Word => 2,
            XbmFormat::Byte => 1,
        }
    }

    /// Padding bytes at the end of each row.
    ///
    /// A row of X10 words that ends in the low half of its last word keeps one
    /// extra byte for the unused high half.
    pub fn padding(self, width: u32) -> usize {
        match self {
            XbmFormat::Word if width % 16 != 0 && width % 16 < 9 => 1,
            _ => 0,
        }
    }

    /// Length of one row in the packed bitmap, padding included.
    pub fn bytes_per_line(self, width: u32) -> usize {
        (width as usize).div_ceil(8) + self.padding(width)
    }

    /// Whether the high byte of a literal is stored, given that the low byte
    /// has just been stored and `written` bytes are now in the buffer.
    ///
    /// The padding byte takes the slot of the high byte at a row boundary.
    pub fn emits_high_byte(self, padding: usize, written: usize, bytes_per_line: usize) -> bool {
        match self {
            XbmFormat::Byte => false,
            XbmFormat::Word => padding == 0 || (written + 2) % bytes_per_line != 0,
        }
    }
}

/// Geometry of the packed bitmap buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub(crate) format: XbmFormat,
    pub(crate) padding: usize,
    pub(crate) bytes_per_line: usize,
    pub(crate) length: usize,
}

impl Layout {
    /// Returns `None` if the buffer size does not fit in `usize`.
    pub(crate) fn new(format: XbmFormat, width: u32, height: u32) -> Option<Layout> {
        let bytes_per_line = format.bytes_per_line(width);
        let length = bytes_per_line.checked_mul(usize::try_from(height).ok()?)?;
        Some(Layout {
            format,
            padding: format.padding(width),
            bytes_per_line,
            length,
        })
    }
}

/// Where the array contents begin: the rest of the declaration line after its
/// opening brace, then every line from `next_line` onwards.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DataStart<'a> {
    pub(crate) first: &'a [u8],
    pub(crate) next_line: usize,
}

struct DataScanner<'a> {
    layout: Layout,
    out: &'a mut [u8],
    written: usize,
}

impl DataScanner<'_> {
    fn is_full(&self) -> bool {
        self.written >= self.layout.length
    }

    fn push(&mut self, b: u8) {
        if let Some(slot) = self.out.get_mut(self.written) {
            *slot = b;
            self.written += 1;
        }
    }

    fn emit(&mut self, value: u64) {
        self.push(value as u8);
        let Layout {
            format,
            padding,
            bytes_per_line,
            ..
        } = self.layout;
        if format.emits_high_byte(padding, self.written, bytes_per_line) {
            self.push((value >> 8) as u8);
        }
    }

    /// Read every literal on the line. Returns false once the scan is over:
    /// the buffer is full, the array was closed, or a literal overflowed.
    fn scan_line(&mut self, line: &[u8]) -> bool {
        let mut rest = line;
        while let Some(&b) = rest.first() {
            if self.is_full() {
                return false;
            }
            match parse_literal(rest) {
                Literal::Value { value, len } => {
                    self.emit(value);
                    rest = &rest[len..];
                    if let Some((b',', tail)) = rest.split_first() {
                        rest = tail;
                    }
                }
                Literal::Empty if b == b'}' => {
                    trace!("End of array after {} bytes", self.written);
                    return false;
                }
                Literal::Empty => rest = &rest[1..],
                Literal::Overflow => {
                    debug!("Array element out of range after {} bytes", self.written);
                    return false;
                }
            }
        }
        !self.is_full()
    }
}

/// Fill a buffer of `layout.length` bytes from the array contents.
///
/// Fails if the array holds fewer bytes than the buffer; any surplus is ignored.
pub(crate) fn scan_data(
    layout: Layout,
    start: DataStart<'_>,
    lines: &[&[u8]],
) -> Result<Vec<u8>, BitmapError> {
    let mut data = Vec::new();
    data.try_reserve_exact(layout.length)?;
    data.resize(layout.length, 0);

    let mut scanner = DataScanner {
        layout,
        out: &mut data,
        written: 0,
    };
    let rest = lines.get(start.next_line..).unwrap_or_default();
    for line in iter::once(start.first).chain(rest.iter().copied()) {
        if !scanner.scan_line(super::header::eat_white(line)) {
            break;
        }
    }

    let written = scanner.written;
    if written < layout.length {
        debug!("Array holds {} of {} bytes", written, layout.length);
        return Err(FormatError::Truncated {
            expected: layout.length,
            found: written,
        }
        .into());
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(
        format: XbmFormat,
        width: u32,
        height: u32,
        text: &[u8],
    ) -> Result<Vec<u8>, BitmapError> {
        let lines: Vec<&[u8]> = text.split(|b| *b == b'\n').collect();
        let layout = Layout::new(format, width, height).unwrap();
        scan_data(
            layout,
            DataStart {
                first: b"",
                next_line: 0,
            },
            &lines,
        )
    }

    #[test]
    fn padding_only_applies_to_words() {
        for width in [1, 5, 8, 17, 24, 33] {
            assert_eq!(XbmFormat::Word.padding(width), 1, "width {width}");
            assert_eq!(XbmFormat::Byte.padding(width), 0, "width {width}");
        }
        for width in [9, 15, 16, 25, 32] {
            assert_eq!(XbmFormat::Word.padding(width), 0, "width {width}");
        }
    }

    #[test]
    fn bytes_per_line() {
        assert_eq!(XbmFormat::Byte.bytes_per_line(1), 1);
        assert_eq!(XbmFormat::Byte.bytes_per_line(17), 3);
        assert_eq!(XbmFormat::Word.bytes_per_line(17), 4);
        assert_eq!(XbmFormat::Word.bytes_per_line(16), 2);
        assert_eq!(XbmFormat::Word.bytes_per_line(12), 2);
        assert_eq!(XbmFormat::Word.bytes_per_line(8), 2);
    }

    #[test]
    fn high_byte_rule() {
        assert!(!XbmFormat::Byte.emits_high_byte(0, 1, 2));
        assert!(XbmFormat::Word.emits_high_byte(0, 1, 2));
        assert!(XbmFormat::Word.emits_high_byte(1, 1, 4));
        assert!(!XbmFormat::Word.emits_high_byte(1, 2, 4));
        assert!(XbmFormat::Word.emits_high_byte(1, 3, 4));
    }

    #[test]
    fn words_are_little_endian() {
        let data = scan(XbmFormat::Word, 16, 2, b"0x1234, 0xabcd\n").unwrap();
        assert_eq!(data, [0x34, 0x12, 0xcd, 0xab]);
    }

    #[test]
    fn padded_word_rows() {
        // 17 pixels: ceil(17/8) = 3 plus one padding byte
        let data = scan(XbmFormat::Word, 17, 1, b"0x0001, 0x0000,\n").unwrap();
        assert_eq!(data, [0x01, 0x00, 0x00, 0x00]);

        let err = scan(XbmFormat::Word, 17, 1, b"0x0001,\n").unwrap_err();
        assert!(matches!(
            err,
            BitmapError::InvalidFormat(FormatError::Truncated {
                expected: 4,
                found: 2
            })
        ));
    }

    #[test]
    fn stray_characters_are_skipped() {
        let data = scan(XbmFormat::Byte, 24, 1, b"{ 0x01 ;; 0x02 ,, 0x03\n").unwrap();
        assert_eq!(data, [1, 2, 3]);
    }

    #[test]
    fn closing_brace_ends_scan() {
        let data = scan(XbmFormat::Byte, 16, 1, b"0x01, 0x02};\n0x03\n").unwrap();
        assert_eq!(data, [1, 2]);

        let err = scan(XbmFormat::Byte, 24, 1, b"0x01, 0x02\n};\n0x03\n").unwrap_err();
        assert!(matches!(
            err,
            BitmapError::InvalidFormat(FormatError::Truncated { found: 2, .. })
        ));
    }

    #[test]
    fn overflow_ends_scan() {
        let text = b"0x01, 0x10000000000000000, 0x02, 0x03\n";
        let err = scan(XbmFormat::Byte, 24, 1, text).unwrap_err();
        assert!(matches!(
            err,
            BitmapError::InvalidFormat(FormatError::Truncated { found: 1, .. })
        ));
    }

    #[test]
    fn surplus_is_ignored() {
        let data = scan(XbmFormat::Byte, 8, 2, b"1, 2, 3, 4, 5\n").unwrap();
        assert_eq!(data, [1, 2]);
    }
}
