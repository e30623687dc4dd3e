use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::Rgba;
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut, text_size, Canvas};
use imageproc::rect::Rect;
use tracing::warn;

use crate::errors::{DetectError, Result};
use crate::postprocess::Annotation;

const BOX_COLOR: [u8; 4] = [255, 0, 0, 255];
const TEXT_COLOR: [u8; 4] = [255, 255, 255, 255];
const STROKE_WIDTH: u32 = 2;
const LABEL_FONT_SIZE: f32 = 32.0;

/// DejaVu Sans, used when no `--font` is given.
const EMBEDDED_FONT: &[u8] = include_bytes!("../assets/DejaVuSans.ttf");

/// Colors and sizes used for every box and label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    pub box_color: Rgba<u8>,
    pub text_color: Rgba<u8>,
    /// Stroke width in pixels for both rectangles and text.
    pub stroke_width: u32,
    pub font_size: f32,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            box_color: Rgba(BOX_COLOR),
            text_color: Rgba(TEXT_COLOR),
            stroke_width: STROKE_WIDTH,
            font_size: LABEL_FONT_SIZE,
        }
    }
}

/// Draws annotations onto original-resolution images.
///
/// Any `GenericImage` with `Rgba<u8>` pixels can be drawn on, `DynamicImage`
/// included, so the image keeps its color type and bit depth. Without a font
/// only the rectangles are drawn.
pub struct Renderer {
    style: DrawStyle,
    font: Option<FontArc>,
}

impl Renderer {
    pub const fn new(style: DrawStyle, font: Option<FontArc>) -> Self {
        Self { style, font }
    }

    /// Uses the DejaVu Sans font compiled into the binary.
    pub fn with_embedded_font(style: DrawStyle) -> Result<Self> {
        let font = FontArc::try_from_slice(EMBEDDED_FONT).map_err(|e| {
            DetectError::Configuration {
                message: format!("invalid embedded font: {e}"),
            }
        })?;
        Ok(Self::new(style, Some(font)))
    }

    /// Loads a TrueType/OpenType font for the label text.
    pub fn with_font_file(style: DrawStyle, font_path: &Path) -> Result<Self> {
        let data = std::fs::read(font_path).map_err(|e| DetectError::FileSystem {
            path: font_path.to_path_buf(),
            operation: "read font".to_string(),
            source: e,
        })?;
        let font = FontArc::try_from_vec(data).map_err(|e| DetectError::Configuration {
            message: format!("invalid font {}: {e}", font_path.display()),
        })?;
        Ok(Self::new(style, Some(font)))
    }

    pub const fn style(&self) -> &DrawStyle {
        &self.style
    }

    pub const fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Draws every annotation in order. An empty slice leaves `image` untouched.
    pub fn draw<C>(&self, image: &mut C, annotations: &[Annotation])
    where
        C: Canvas<Pixel = Rgba<u8>>,
    {
        if !annotations.is_empty() && self.font.is_none() {
            warn!("no font loaded, drawing boxes without labels");
        }
        for annotation in annotations {
            self.draw_box(image, annotation);
            if let Some(font) = &self.font {
                self.draw_label(image, annotation, font);
            }
        }
    }

    fn draw_box<C>(&self, image: &mut C, annotation: &Annotation)
    where
        C: Canvas<Pixel = Rgba<u8>>,
    {
        let stroke = i64::from(self.style.stroke_width);
        // edges further out than the stroke never reach the image, so pull
        // them in to keep line lengths bounded by the image size
        let margin = stroke + 1;
        let (image_width, image_height) = image.dimensions();
        let clamp_x = |x: i32| i64::from(x).clamp(-margin, i64::from(image_width) - 1 + margin);
        let clamp_y = |y: i32| i64::from(y).clamp(-margin, i64::from(image_height) - 1 + margin);

        let (x0, y0) = annotation.top_left;
        let (x1, y1) = annotation.bottom_right;
        let (left, right) = (clamp_x(x0.min(x1)), clamp_x(x0.max(x1)));
        let (top, bottom) = (clamp_y(y0.min(y1)), clamp_y(y0.max(y1)));

        // each stroke pixel is one more rectangle, shrinking inwards
        for inset in 0..stroke {
            let width = right - left - 2 * inset + 1;
            let height = bottom - top - 2 * inset + 1;
            if width <= 0 || height <= 0 {
                break;
            }
            let rect = Rect::at((left + inset) as i32, (top + inset) as i32)
                .of_size(width as u32, height as u32);
            draw_hollow_rect_mut(image, rect, self.style.box_color);
        }
    }

    fn draw_label<C>(&self, image: &mut C, annotation: &Annotation, font: &FontArc)
    where
        C: Canvas<Pixel = Rgba<u8>>,
    {
        let scale = PxScale::from(self.style.font_size);
        let (text_width, text_height) = text_size(scale, font, &annotation.label);
        // glyphs never reach further than this from the anchor
        let reach = i64::from(text_width.max(text_height))
            + 2 * self.style.font_size.ceil() as i64
            + i64::from(self.style.stroke_width);
        let (image_width, image_height) = image.dimensions();
        let (x, y) = annotation.top_left;
        let x = i64::from(x).clamp(-reach, i64::from(image_width) + reach);
        // baseline on the box corner, text reads above the box
        let y = (i64::from(y) - i64::from(text_height))
            .clamp(-reach, i64::from(image_height) + reach);

        for offset in 0..i64::from(self.style.stroke_width.max(1)) {
            draw_text_mut(
                image,
                self.style.text_color,
                (x + offset) as i32,
                y as i32,
                scale,
                font,
                &annotation.label,
            );
        }
    }
}
