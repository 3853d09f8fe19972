//! Decoding of X BitMap (.xbm) source files
//!
//! XBM (X BitMap) Format is a plain text image format, used to store cursor and
//! icon data. XBM images are fragments of C source: a few `#define` macros for
//! the geometry and hotspot, followed by an array initializer with the pixels.
//!
//! Two historical variants exist. X10 bitmaps declare the array as `short` and
//! store 16 pixels per element; X11 bitmaps declare it as `char` and store 8.
//! The variant is inferred from the declared element type.
//!
//! The scanner is deliberately lenient, in the manner of the classic X client
//! loaders: it ignores macros it does not understand, skips stray characters in
//! the array body, and accepts decimal, octal and hexadecimal array elements.
//!
//! Within each row, pixel `i` is bit `i % 8` (least significant first) of byte
//! `i / 8`. A set bit is foreground (black).
//!
//! # Related Links
//! * <https://www.x.org/releases/X11R7.7/doc/libX11/libX11/libX11.html#Manipulating_Bitmaps> - The XBM format specification
//! * <https://en.wikipedia.org/wiki/X_BitMap> - The XBM format on wikipedia

mod data;
mod header;
mod literal;

pub use data::XbmFormat;

use std::collections::TryReserveError;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use image::error::{DecodingError, ImageFormatHint, LimitError, LimitErrorKind};
use image::{
    ColorType, ExtendedColorType, ImageDecoder, ImageError, ImageResult, LimitSupport, Limits,
};
use log::debug;

/// Size of the chunks in which input is read.
const READ_CHUNK_SIZE: usize = 4096;

/// Hotspot coordinate that marks the hotspot as absent.
const NO_HOTSPOT: i32 = -1;

/// Most bitmap bytes a single byte of source text can produce: an element
/// takes at least one digit and stores at most two bytes.
const MAX_BYTES_PER_TEXT_BYTE: usize = 2;

/// Reason a file was read successfully but is not a usable bitmap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatError {
    /// No positive `#define <name>_width`
    MissingWidth,
    /// No positive `#define <name>_height`
    MissingHeight,
    /// The array element type was never `short` or `char`
    MissingFormat,
    /// No `static ... <name>_bits[]` declaration
    MissingBitsArray,
    /// The array holds fewer bytes than the declared geometry needs.
    ///
    /// `found` is 0 when the file is too short to hold the array at all.
    Truncated { expected: usize, found: usize },
}

/// Error that can occur while reading an XBM file
#[derive(Debug)]
pub enum BitmapError {
    /// The file could not be opened for reading
    OpenFailed(io::Error),
    /// An I/O error occurred while reading the file
    ReadFailed(io::Error),
    /// The file contents are not a valid bitmap
    InvalidFormat(FormatError),
    /// The bitmap is too large to be held in memory
    InsufficientMemory,
}

impl BitmapError {
    /// The status code the classic `read_bitmap_data_from_file` loader used for this error.
    pub fn status(&self) -> i32 {
        match self {
            BitmapError::OpenFailed(_) => 1,
            BitmapError::ReadFailed(_) | BitmapError::InsufficientMemory => 2,
            BitmapError::InvalidFormat(_) => 3,
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::MissingWidth => f.write_str("missing or zero #define for image width"),
            FormatError::MissingHeight => f.write_str("missing or zero #define for image height"),
            FormatError::MissingFormat => {
                f.write_str("array element type is neither `short` nor `char`")
            }
            FormatError::MissingBitsArray => f.write_str("no `_bits[]` array definition"),
            FormatError::Truncated { expected, found } => f.write_fmt(format_args!(
                "array content too short: expected {} bytes, found {}",
                expected, found
            )),
        }
    }
}

impl fmt::Display for BitmapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BitmapError::OpenFailed(e) => f.write_fmt(format_args!("can't open file: {}", e)),
            BitmapError::ReadFailed(e) => f.write_fmt(format_args!("error reading file: {}", e)),
            BitmapError::InvalidFormat(e) => {
                f.write_fmt(format_args!("bad bitmap format file: {}", e))
            }
            BitmapError::InsufficientMemory => f.write_str("not enough memory to hold bitmap"),
        }
    }
}

impl std::error::Error for FormatError {}

impl std::error::Error for BitmapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BitmapError::OpenFailed(e) | BitmapError::ReadFailed(e) => Some(e),
            BitmapError::InvalidFormat(e) => Some(e),
            BitmapError::InsufficientMemory => None,
        }
    }
}

impl From<FormatError> for BitmapError {
    fn from(e: FormatError) -> BitmapError {
        BitmapError::InvalidFormat(e)
    }
}

impl From<TryReserveError> for BitmapError {
    fn from(_: TryReserveError) -> BitmapError {
        BitmapError::InsufficientMemory
    }
}

impl From<BitmapError> for ImageError {
    fn from(e: BitmapError) -> ImageError {
        match e {
            BitmapError::OpenFailed(e) | BitmapError::ReadFailed(e) => ImageError::IoError(e),
            BitmapError::InvalidFormat(e) => {
                ImageError::Decoding(DecodingError::new(ImageFormatHint::Name("XBM".into()), e))
            }
            BitmapError::InsufficientMemory => ImageError::Limits(LimitError::from_kind(
                LimitErrorKind::InsufficientMemory,
            )),
        }
    }
}

/// A decoded bitmap: the packed pixel rows plus the declared metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XbmBitmap {
    data: Vec<u8>,
    width: u32,
    height: u32,
    x_hot: Option<i32>,
    y_hot: Option<i32>,
    format: XbmFormat,
}

impl XbmBitmap {
    /// The packed rows, `bytes_per_line()` bytes each.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn x_hot(&self) -> Option<i32> {
        self.x_hot
    }

    pub fn y_hot(&self) -> Option<i32> {
        self.y_hot
    }

    /// Returns the (x,y) hotspot coordinates, if the file declares both of them.
    pub fn hotspot(&self) -> Option<(i32, i32)> {
        Some((self.x_hot?, self.y_hot?))
    }

    /// The variant the file was written in.
    pub fn format(&self) -> XbmFormat {
        self.format
    }

    /// Row stride of `data()`, including the X10 padding byte if any.
    pub fn bytes_per_line(&self) -> usize {
        self.format.bytes_per_line(self.width)
    }

    /// Whether the pixel at (x, y) is set. Out of range coordinates are unset.
    pub fn is_set(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let offset = y as usize * self.bytes_per_line() + x as usize / 8;
        self.data[offset] & (1 << (x % 8)) != 0
    }
}

/// Read an XBM file from `path`.
pub fn read_bitmap_file<P: AsRef<Path>>(path: P) -> Result<XbmBitmap, BitmapError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(BitmapError::OpenFailed)?;
    debug!("Reading bitmap {}", path.display());
    read_bitmap(file)
}

/// Read an XBM file from a stream. The stream is read to its end and dropped before decoding.
pub fn read_bitmap<R: Read>(reader: R) -> Result<XbmBitmap, BitmapError> {
    let buf = read_to_buffer(reader)?;
    parse_bitmap(&buf)
}

/// Read all of `reader` in fixed-size chunks, retrying reads that were interrupted
/// or would block.
fn read_to_buffer<R: Read>(mut reader: R) -> Result<Vec<u8>, BitmapError> {
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    let mut buf = Vec::new();
    loop {
        let n = match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::yield_now();
                continue;
            }
            Err(e) => return Err(BitmapError::ReadFailed(e)),
        };
        buf.try_reserve(n)?;
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(buf)
}

/// Decode the contents of an XBM file held in memory.
pub fn parse_bitmap(buf: &[u8]) -> Result<XbmBitmap, BitmapError> {
    let lines = header::split_lines(buf);
    let header = header::scan_header(&lines);

    let positive = |v: Option<i32>| v.and_then(|v| u32::try_from(v).ok()).filter(|v| *v > 0);
    let width = positive(header.width).ok_or(FormatError::MissingWidth)?;
    let height = positive(header.height).ok_or(FormatError::MissingHeight)?;
    let format = header.format.ok_or(FormatError::MissingFormat)?;
    let start = header.data.ok_or(FormatError::MissingBitsArray)?;

    let layout =
        data::Layout::new(format, width, height).ok_or(BitmapError::InsufficientMemory)?;
    if layout.length > buf.len().saturating_mul(MAX_BYTES_PER_TEXT_BYTE) {
        debug!(
            "{} bytes of text cannot hold a {} byte bitmap",
            buf.len(),
            layout.length
        );
        return Err(FormatError::Truncated {
            expected: layout.length,
            found: 0,
        }
        .into());
    }
    debug!(
        "Width: {}, height: {}, format: {:?} ({} bytes per element)",
        width,
        height,
        format,
        format.bytes_per_literal()
    );
    debug!(
        "Bytes per line: {}, padding: {}",
        layout.bytes_per_line, layout.padding
    );

    let data = data::scan_data(layout, start, &lines)?;

    Ok(XbmBitmap {
        data,
        width,
        height,
        x_hot: header.x_hot.filter(|v| *v != NO_HOTSPOT),
        y_hot: header.y_hot.filter(|v| *v != NO_HOTSPOT),
        format,
    })
}

/// XBM decoder for the image crate
pub struct XbmDecoder {
    bitmap: XbmBitmap,
}

impl XbmDecoder {
    /// Create a new `XbmDecoder`. The whole input is decoded up front.
    pub fn new<R: Read>(reader: R) -> Result<XbmDecoder, ImageError> {
        Ok(XbmDecoder {
            bitmap: read_bitmap(reader)?,
        })
    }

    /// Returns the (x,y) hotspot coordinates of the image, if the image provides them.
    pub fn hotspot(&self) -> Option<(i32, i32)> {
        self.bitmap.hotspot()
    }

    /// The packed bitmap behind this decoder.
    pub fn into_bitmap(self) -> XbmBitmap {
        self.bitmap
    }
}

impl ImageDecoder for XbmDecoder {
    fn dimensions(&self) -> (u32, u32) {
        (self.bitmap.width, self.bitmap.height)
    }
    fn color_type(&self) -> ColorType {
        ColorType::L8
    }
    fn original_color_type(&self) -> ExtendedColorType {
        ExtendedColorType::L1
    }
    fn read_image(self, buf: &mut [u8]) -> ImageResult<()>
    where
        Self: Sized,
    {
        assert_eq!(u64::try_from(buf.len()), Ok(self.total_bytes()));

        let width = self.bitmap.width as usize;
        let stride = self.bitmap.bytes_per_line();
        for (row, line) in buf
            .chunks_exact_mut(width)
            .zip(self.bitmap.data.chunks_exact(stride))
        {
            // Bits past `width` and the padding byte are not part of the image
            for (chunk, val) in row.chunks_mut(8).zip(line) {
                for (i, p) in chunk.iter_mut().enumerate() {
                    // Set bits correspond to black, unset bits to white
                    *p = if val & (1 << i) == 0 { 0xff } else { 0 };
                }
            }
        }
        Ok(())
    }
    fn read_image_boxed(self: Box<Self>, buf: &mut [u8]) -> ImageResult<()> {
        (*self).read_image(buf)
    }

    fn set_limits(&mut self, limits: Limits) -> ImageResult<()> {
        limits.check_support(&LimitSupport::default())?;
        let (width, height) = self.dimensions();
        limits.check_dimensions(width, height)?;

        let max_alloc = limits.max_alloc.unwrap_or(u64::MAX);
        if max_alloc < self.total_bytes() {
            return Err(ImageError::Limits(LimitError::from_kind(
                LimitErrorKind::InsufficientMemory,
            )));
        }
        Ok(())
    }
}
