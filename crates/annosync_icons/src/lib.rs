//! Icon template recoloring and rasterization.
//!
//! Marker icons arrive from the backend as raw SVG text. Before display the
//! template is tinted to the marker's color by rewriting the `fill` of the root
//! `<svg>` element, then rasterized with resvg/tiny-skia.
//!
//! The entry point is [`IconStyle`]: a `{template, color}` pair exposing a single
//! [`IconStyle::produce_visual`] operation.

use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

/// Errors that can occur while producing an icon visual.
#[derive(Debug, thiserror::Error)]
pub enum IconError {
    /// The template is not well-formed XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The rewritten template is not valid UTF-8
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// The template has no `<svg>` root element
    #[error("Template has no <svg> root element")]
    MissingRoot,

    /// resvg rejected the template
    #[error("SVG error: {0}")]
    Svg(String),

    /// Requested raster size is zero or the template has no extent
    #[error("Cannot rasterize icon at {width}x{height}")]
    EmptyPixmap {
        /// Requested pixel width
        width: u32,
        /// Requested pixel height
        height: u32,
    },
}

/// Straight-alpha RGBA pixels of a rasterized icon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Row-major RGBA bytes, `width * height * 4` long
    pub rgba: Vec<u8>,
}

impl Raster {
    /// Get the RGBA value of a single pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) * 4) as usize;
        let px = self.rgba.get(i..i + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    /// Number of pixels with non-zero alpha.
    pub fn opaque_pixels(&self) -> usize {
        self.rgba.chunks(4).filter(|c| c[3] > 0).count()
    }
}

/// Strategy object that turns an icon template into a tinted visual.
#[derive(Debug, Clone)]
pub struct IconStyle {
    template: Arc<str>,
    color: [u8; 3],
}

impl IconStyle {
    /// Create a style from a shared template and an RGB tint.
    pub fn new(template: Arc<str>, color: [u8; 3]) -> Self {
        Self { template, color }
    }

    /// The tint as `#rrggbb`.
    pub fn hex_color(&self) -> String {
        format!(
            "#{:02x}{:02x}{:02x}",
            self.color[0], self.color[1], self.color[2]
        )
    }

    /// Recolor the template and rasterize it into a square of `size` pixels.
    pub fn produce_visual(&self, size: u32) -> Result<Raster, IconError> {
        let tinted = recolor_svg(&self.template, &self.hex_color())?;
        rasterize_svg(&tinted, size)
    }
}

/// Rewrite an SVG document so its root element is filled with `hex`.
///
/// Any existing root `fill` attribute is replaced and `currentColor`
/// references are resolved to the same color.
pub fn recolor_svg(svg: &str, hex: &str) -> Result<String, IconError> {
    let source = svg.replace("currentColor", hex);
    let mut reader = Reader::from_str(&source);
    let mut writer = Writer::new(Vec::new());
    let mut root_seen = false;

    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(e) if !root_seen && e.name().as_ref() == b"svg" => {
                root_seen = true;
                writer.write_event(Event::Start(tinted_root(&e, hex)))?;
            }
            Event::Empty(e) if !root_seen && e.name().as_ref() == b"svg" => {
                root_seen = true;
                writer.write_event(Event::Empty(tinted_root(&e, hex)))?;
            }
            event => writer.write_event(event)?,
        }
    }

    if !root_seen {
        return Err(IconError::MissingRoot);
    }

    Ok(String::from_utf8(writer.into_inner())?)
}

fn tinted_root(element: &BytesStart<'_>, hex: &str) -> BytesStart<'static> {
    let mut root = BytesStart::new("svg");
    root.extend_attributes(
        element
            .attributes()
            .filter_map(Result::ok)
            .filter(|attr| attr.key.as_ref() != b"fill"),
    );
    root.push_attribute(("fill", hex));
    root
}

/// Rasterize an SVG document to fit a `size` x `size` square.
pub fn rasterize_svg(svg: &str, size: u32) -> Result<Raster, IconError> {
    let tree = resvg::usvg::Tree::from_str(svg, &resvg::usvg::Options::default())
        .map_err(|e| IconError::Svg(e.to_string()))?;

    let svg_size = tree.size();
    let longest = svg_size.width().max(svg_size.height());
    if size == 0 || longest <= 0.0 {
        return Err(IconError::EmptyPixmap {
            width: size,
            height: size,
        });
    }

    let scale = size as f32 / longest;
    let width = (svg_size.width() * scale).ceil() as u32;
    let height = (svg_size.height() * scale).ceil() as u32;

    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(IconError::EmptyPixmap { width, height })?;
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    // tiny-skia stores premultiplied pixels
    let rgba = pixmap
        .pixels()
        .iter()
        .flat_map(|p| {
            let c = p.demultiply();
            [c.red(), c.green(), c.blue(), c.alpha()]
        })
        .collect();

    log::debug!("Rasterized icon at {}x{}", width, height);

    Ok(Raster {
        width,
        height,
        rgba,
    })
}
