//! Poster compositing.
//!
//! Portrait: the caption is drawn below the artwork in white with a black
//! outline. Landscape: the artwork is centre-cropped to 16:9 and the caption
//! sits in a translucent black band across the bottom.

use image::codecs::jpeg::JpegEncoder;
use image::{Rgb, RgbImage};

use marquee_core::Orientation;

use crate::RenderError;
use crate::font::{CaptionFont, FontSet};
use crate::layout::{line_height, wrap_text};

pub const PADDING: u32 = 20;
pub const BAND_HEIGHT: u32 = 100;
pub const BAND_ALPHA: u8 = 180;
pub const OUTLINE_WIDTH: i32 = 2;
pub const JPEG_QUALITY: u8 = 95;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

/// Decode `artwork`, lay the caption out for `orientation` and encode the
/// result as JPEG.
pub fn compose(
    artwork: &[u8],
    caption: &str,
    orientation: Orientation,
    fonts: &FontSet,
) -> Result<Vec<u8>, RenderError> {
    let art = image::load_from_memory(artwork)
        .map_err(|e| RenderError::Decode(e.to_string()))?
        .to_rgb8();

    let canvas = match orientation {
        Orientation::Portrait => compose_portrait(&art, caption, fonts.regular.as_ref()),
        Orientation::Landscape => compose_landscape(&art, caption, fonts.bold.as_ref()),
    };

    encode_jpeg(&canvas)
}

pub fn compose_portrait(art: &RgbImage, caption: &str, font: &dyn CaptionFont) -> RgbImage {
    let (width, height) = art.dimensions();
    let max_width = width.saturating_sub(2 * PADDING) as f32;
    let lines = wrap_text(font, caption, max_width);
    let pitch = line_height(font);
    let caption_height = lines.len() as u32 * pitch + 2 * PADDING;

    let mut canvas = RgbImage::from_pixel(width, height + caption_height, BLACK);
    image::imageops::replace(&mut canvas, art, 0, 0);

    let mut y = (height + PADDING) as i64;
    for line in &lines {
        draw_outlined(&mut canvas, font, PADDING as i64, y, line);
        y += pitch as i64;
    }
    canvas
}

pub fn compose_landscape(art: &RgbImage, caption: &str, font: &dyn CaptionFont) -> RgbImage {
    let mut canvas = crop_to_landscape(art);
    let (width, height) = canvas.dimensions();

    let band_top = height.saturating_sub(BAND_HEIGHT);
    darken_rows(&mut canvas, band_top, BAND_ALPHA);

    let max_width = width.saturating_sub(2 * PADDING) as f32;
    let lines = wrap_text(font, caption, max_width);
    let pitch = line_height(font) as i64;
    let band = (height - band_top) as i64;
    let text_height = lines.len() as i64 * pitch;
    let start_y = band_top as i64 + (band - text_height) / 2;

    for (i, line) in lines.iter().enumerate() {
        draw_text(&mut canvas, font, PADDING as i64, start_y + i as i64 * pitch, line, WHITE);
    }
    canvas
}

/// Centre-crop to 16:9 along the longer dimension. Never scales.
pub fn crop_to_landscape(art: &RgbImage) -> RgbImage {
    let (w, h) = art.dimensions();
    let (w64, h64) = (w as u64, h as u64);
    if w64 * 9 == h64 * 16 || w == 0 || h == 0 {
        return art.clone();
    }

    let (x, y, cw, ch) = if w64 * 9 < h64 * 16 {
        // Too tall: keep the width.
        let ch = ((w64 * 9 / 16) as u32).max(1);
        (0, (h - ch) / 2, w, ch)
    } else {
        let cw = ((h64 * 16 / 9) as u32).max(1);
        ((w - cw) / 2, 0, cw, h)
    };

    image::imageops::crop_imm(art, x, y, cw, ch).to_image()
}

/// Blend black over every row from `top` down at `alpha`/255 opacity.
fn darken_rows(canvas: &mut RgbImage, top: u32, alpha: u8) {
    let keep = 255 - alpha as u32;
    for (_, y, px) in canvas.enumerate_pixels_mut() {
        if y < top {
            continue;
        }
        for channel in px.0.iter_mut() {
            *channel = ((*channel as u32 * keep + 127) / 255) as u8;
        }
    }
}

fn draw_outlined(canvas: &mut RgbImage, font: &dyn CaptionFont, x: i64, y: i64, text: &str) {
    for dx in -OUTLINE_WIDTH..=OUTLINE_WIDTH {
        for dy in -OUTLINE_WIDTH..=OUTLINE_WIDTH {
            if dx != 0 || dy != 0 {
                draw_text(canvas, font, x + dx as i64, y + dy as i64, text, BLACK);
            }
        }
    }
    draw_text(canvas, font, x, y, text, WHITE);
}

/// Draw one line with its top edge at `y`. Pixels outside the canvas are
/// clipped.
fn draw_text(
    canvas: &mut RgbImage,
    font: &dyn CaptionFont,
    x: i64,
    y: i64,
    text: &str,
    color: Rgb<u8>,
) {
    let (cw, ch) = (canvas.width() as i64, canvas.height() as i64);
    let baseline = y + font.ascent().round() as i64;
    let mut pen = x as f32;

    for c in text.chars() {
        let glyph = font.rasterize(c);
        let gx = pen.round() as i64 + glyph.xmin as i64;
        let gy = baseline - (glyph.ymin as i64 + glyph.height as i64);

        for row in 0..glyph.height {
            let py = gy + row as i64;
            if py < 0 || py >= ch {
                continue;
            }
            for col in 0..glyph.width {
                let px = gx + col as i64;
                if px < 0 || px >= cw {
                    continue;
                }
                let cov = glyph.coverage[row * glyph.width + col] as u32;
                if cov == 0 {
                    continue;
                }
                let dst = canvas.get_pixel_mut(px as u32, py as u32);
                for (d, s) in dst.0.iter_mut().zip(color.0) {
                    *d = ((s as u32 * cov + *d as u32 * (255 - cov) + 127) / 255) as u8;
                }
            }
        }

        pen += glyph.advance;
    }
}

pub fn encode_jpeg(canvas: &RgbImage) -> Result<Vec<u8>, RenderError> {
    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode_image(canvas)
        .map_err(|e| RenderError::Encode(e.to_string()))?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::font::block::{BLOCK_H, BlockFont, fonts};
    use crate::layout::LEADING;
    use image::GenericImageView;

    fn jpeg(width: u32, height: u32) -> Vec<u8> {
        encode_jpeg(&RgbImage::from_pixel(width, height, Rgb([90, 140, 210]))).unwrap()
    }

    #[test]
    fn landscape_output_is_sixteen_by_nine() {
        let out = compose(&jpeg(1000, 1500), "The Matrix | 1999 | 8.2", Orientation::Landscape, &fonts())
            .unwrap();
        let (w, h) = image::load_from_memory(&out).unwrap().dimensions();
        let ratio = w as f64 / h as f64;
        assert!((ratio - 16.0 / 9.0).abs() < 0.01, "got {w}x{h}");
        assert_eq!(w, 1000);
    }

    #[test]
    fn wide_artwork_is_cropped_horizontally() {
        let cropped = crop_to_landscape(&RgbImage::new(2000, 900));
        assert_eq!(cropped.dimensions(), (1600, 900));
        let exact = crop_to_landscape(&RgbImage::new(1280, 720));
        assert_eq!(exact.dimensions(), (1280, 720));
    }

    #[test]
    fn portrait_grows_by_caption_block() {
        let art = RgbImage::from_pixel(300, 450, Rgb([200, 0, 0]));
        let canvas = compose_portrait(&art, "One\nTwo", &BlockFont);
        let pitch = BLOCK_H as u32 + LEADING;
        assert_eq!(canvas.dimensions(), (300, 450 + 2 * pitch + 2 * PADDING));
        // Artwork is untouched and the caption area starts black.
        assert_eq!(*canvas.get_pixel(10, 10), Rgb([200, 0, 0]));
        assert_eq!(*canvas.get_pixel(299, 451), BLACK);
        // First glyph of "One" is filled white at the padding offset.
        assert_eq!(*canvas.get_pixel(PADDING + 2, 450 + PADDING + 2), WHITE);
    }

    #[test]
    fn landscape_band_darkens_bottom_only() {
        let art = RgbImage::from_pixel(1600, 900, Rgb([255, 255, 255]));
        let canvas = compose_landscape(&art, "", &BlockFont);
        assert_eq!(*canvas.get_pixel(5, 5), Rgb([255, 255, 255]));
        assert_eq!(*canvas.get_pixel(5, 899), Rgb([75, 75, 75]));
        assert_eq!(*canvas.get_pixel(5, 900 - BAND_HEIGHT), Rgb([75, 75, 75]));
        assert_eq!(*canvas.get_pixel(5, 900 - BAND_HEIGHT - 1), Rgb([255, 255, 255]));
    }

    #[test]
    fn landscape_caption_is_centred_in_band() {
        let art = RgbImage::from_pixel(1600, 900, Rgb([0, 0, 0]));
        let canvas = compose_landscape(&art, "A", &BlockFont);
        let pitch = (BLOCK_H as u32 + LEADING) as i64;
        let top = (900 - BAND_HEIGHT) as i64 + (BAND_HEIGHT as i64 - pitch) / 2;
        assert_eq!(*canvas.get_pixel(PADDING, top as u32), WHITE);
        assert_eq!(*canvas.get_pixel(PADDING, top as u32 - 1), BLACK);
    }

    #[test]
    fn undecodable_artwork_is_an_error() {
        let err = compose(b"not an image", "x", Orientation::Portrait, &fonts()).unwrap_err();
        assert!(matches!(err, RenderError::Decode(_)));
    }
}
