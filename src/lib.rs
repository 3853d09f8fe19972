//! This crate decodes legacy X BitMap (XBM) source files, both the X10 `short`
//! layout and the X11 `char` layout.
//!
//! The packed bitmap can be read directly:
//!
//! ```rust,no_run
//! let bitmap = xbm_source::xbm::read_bitmap_file("path/to/cursor.xbm").unwrap();
//! println!("{}x{} hotspot={:?}", bitmap.width(), bitmap.height(), bitmap.hotspot());
//! ```
//!
//! Or, after calling the `register` function at program startup, through the image crate:
//!
//!  ```rust,no_run
//! xbm_source::register();
//!
//! // Now you can use the image crate as normal
//! let img = image::open("path/to/image.xbm").unwrap();
//! ```

#![forbid(unsafe_code)]

#[cfg(feature = "xbm")]
pub mod xbm;

#[allow(unused_imports)]
use image::hooks::register_decoding_hook;

static REGISTER: std::sync::Once = std::sync::Once::new();

/// Register all enabled formats with the image crate.
pub fn register() {
    REGISTER.call_once(|| {
        // XBM files are C source text and have no signature to detect them by
        #[cfg(feature = "xbm")]
        {
            register_decoding_hook(
                "xbm".into(),
                Box::new(|r| Ok(Box::new(xbm::XbmDecoder::new(r)?))),
            );
            register_decoding_hook(
                "bm".into(),
                Box::new(|r| Ok(Box::new(xbm::XbmDecoder::new(r)?))),
            );
        }
    });
}
