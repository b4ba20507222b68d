//! CAPTCHA image rendering.
//!
//! With a TrueType font available the text is rasterised to PNG with noise
//! lines, noise rings and per-glyph jitter. Without one, a noisy SVG is
//! produced instead so the service still runs on a bare host.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use rand::Rng;
use rusttype::{Font, Scale, point};
use std::io::Cursor;
use std::path::Path;
use thiserror::Error;

const WIDTH: u32 = 160;
const HEIGHT: u32 = 60;
const NOISE_LINES: usize = 6;
const NOISE_RINGS: usize = 12;
const GLYPH_SIZE: f32 = 42.0;

#[derive(Debug, Error)]
enum RenderError {
    #[error("image encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Encoded image plus its MIME type
#[derive(Debug, Clone)]
pub struct RenderedImage {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
}

pub enum CaptchaRenderer {
    Raster(Box<Font<'static>>),
    Svg,
}

impl CaptchaRenderer {
    /// Load the font at `font_path`, falling back to SVG output if it is
    /// missing or unreadable.
    pub fn from_font_path(font_path: Option<&str>) -> Self {
        let Some(path) = font_path else {
            return Self::Svg;
        };

        match std::fs::read(Path::new(path)) {
            Ok(bytes) => match Font::try_from_vec(bytes) {
                Some(font) => {
                    tracing::info!(font = %path, "CAPTCHA font loaded");
                    Self::Raster(Box::new(font))
                }
                None => {
                    tracing::warn!(font = %path, "Not a usable TrueType font, rendering SVG");
                    Self::Svg
                }
            },
            Err(e) => {
                tracing::warn!(font = %path, error = %e, "CAPTCHA font unreadable, rendering SVG");
                Self::Svg
            }
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Raster(_) => "image/png",
            Self::Svg => "image/svg+xml",
        }
    }

    /// Render `text`. A PNG encoding failure degrades to SVG.
    pub fn render(&self, text: &str) -> RenderedImage {
        if let Self::Raster(font) = self {
            match render_png(font, text) {
                Ok(bytes) => {
                    return RenderedImage {
                        bytes,
                        content_type: self.content_type(),
                    };
                }
                Err(e) => tracing::error!(error = %e, "PNG rendering failed, rendering SVG"),
            }
        }

        RenderedImage {
            bytes: render_svg(text).into_bytes(),
            content_type: Self::Svg.content_type(),
        }
    }
}

fn random_color(rng: &mut impl Rng, lo: u8, hi: u8) -> Rgb<u8> {
    Rgb([
        rng.random_range(lo..hi),
        rng.random_range(lo..hi),
        rng.random_range(lo..hi),
    ])
}

fn blend(bg: Rgb<u8>, fg: Rgb<u8>, coverage: f32) -> Rgb<u8> {
    let mix = |b: u8, f: u8| (b as f32 * (1.0 - coverage) + f as f32 * coverage).round() as u8;
    Rgb([mix(bg[0], fg[0]), mix(bg[1], fg[1]), mix(bg[2], fg[2])])
}

fn render_png(font: &Font<'static>, text: &str) -> Result<Vec<u8>, RenderError> {
    let mut rng = rand::rng();
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([245, 245, 240]));

    for _ in 0..NOISE_RINGS {
        let center = (
            rng.random_range(0..WIDTH as i32),
            rng.random_range(0..HEIGHT as i32),
        );
        let radius = rng.random_range(2..8);
        let color = random_color(&mut rng, 150, 230);
        draw_hollow_circle_mut(&mut img, center, radius, color);
    }

    let scale = Scale::uniform(GLYPH_SIZE);
    let v_metrics = font.v_metrics(scale);
    let glyph_height = v_metrics.ascent - v_metrics.descent;
    let baseline = (HEIGHT as f32 - glyph_height) / 2.0 + v_metrics.ascent;
    let advance = WIDTH as f32 / (text.chars().count() as f32 + 0.5);

    for (i, c) in text.chars().enumerate() {
        let x = advance * (i as f32 + 0.25) + rng.random_range(-3.0..3.0);
        let y = baseline + rng.random_range(-6.0..6.0);
        let color = random_color(&mut rng, 20, 120);

        let glyph = font.glyph(c).scaled(scale).positioned(point(x, y));
        let Some(bb) = glyph.pixel_bounding_box() else {
            continue;
        };

        glyph.draw(|gx, gy, coverage| {
            let px = gx as i32 + bb.min.x;
            let py = gy as i32 + bb.min.y;
            if px < 0 || py < 0 || px >= WIDTH as i32 || py >= HEIGHT as i32 {
                return;
            }
            let bg = *img.get_pixel(px as u32, py as u32);
            img.put_pixel(px as u32, py as u32, blend(bg, color, coverage));
        });
    }

    // Lines go over the glyphs so they cut through the strokes.
    for _ in 0..NOISE_LINES {
        let start = (
            rng.random_range(0.0..WIDTH as f32),
            rng.random_range(0.0..HEIGHT as f32),
        );
        let end = (
            rng.random_range(0.0..WIDTH as f32),
            rng.random_range(0.0..HEIGHT as f32),
        );
        let color = random_color(&mut rng, 60, 180);
        draw_line_segment_mut(&mut img, start, end, color);
    }

    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img).write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

fn render_svg(text: &str) -> String {
    let mut rng = rand::rng();

    let width = WIDTH as i32;
    let height = HEIGHT as i32;

    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}">"#,
        width, height
    );

    svg.push_str(r##"<rect width="100%" height="100%" fill="#f5f5f0"/>"##);

    for _ in 0..NOISE_LINES * 3 {
        let x1 = rng.random_range(0..width);
        let y1 = rng.random_range(0..height);
        let x2 = rng.random_range(0..width);
        let y2 = rng.random_range(0..height);
        let opacity = rng.random_range(20..50);
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="rgba(60,60,60,0.{})" stroke-width="1"/>"#,
            x1, y1, x2, y2, opacity
        ));
    }

    let char_width = width as f32 / (text.chars().count() as f32 + 1.0);
    for (i, c) in text.chars().enumerate() {
        let x = char_width * (i as f32 + 0.8);
        let y = 40 + rng.random_range(-8..8);
        let rotation = rng.random_range(-15..15);
        let color = format!(
            "rgb({},{},{})",
            rng.random_range(20..120),
            rng.random_range(20..120),
            rng.random_range(20..120)
        );

        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="monospace" font-size="32" font-weight="bold" fill="{}" transform="rotate({} {} {})">{}</text>"#,
            x, y, color, rotation, x, y, c
        ));
    }

    svg.push_str("</svg>");
    svg
}
