//! Stacks the images of one weekday into a single tall image.

use std::{io::Cursor, path::Path};

use image::{imageops, ImageFormat, Rgba, RgbaImage};
use tracing::warn;

use crate::error::Result;

/// A vertical stack of images on a transparent canvas.
#[derive(Debug, Clone)]
pub struct CompositeImage {
    canvas: RgbaImage,
    skipped: Vec<usize>,
}

impl CompositeImage {
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    pub fn height(&self) -> u32 {
        self.canvas.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Indices of the input images that could not be decoded and are not part of the stack.
    pub fn skipped(&self) -> &[usize] {
        &self.skipped
    }

    pub fn encode_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.canvas
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }

    /// Scale to the given size and flatten onto white as packed RGB.
    pub fn to_rgb_on_white(&self, width: u32, height: u32) -> Vec<u8> {
        let scaled = if (width, height) == self.canvas.dimensions() {
            self.canvas.clone()
        } else {
            imageops::resize(&self.canvas, width, height, imageops::FilterType::Triangle)
        };
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for Rgba([r, g, b, a]) in scaled.pixels() {
            let alpha = *a as u32;
            for channel in [r, g, b] {
                rgb.push(((*channel as u32 * alpha + 255 * (255 - alpha)) / 255) as u8);
            }
        }
        rgb
    }
}

/// Decode the images and stack them, with the optional header on top and footer below.
///
/// An image that cannot be decoded is left out with a warning, its index is reported by
/// [`CompositeImage::skipped`]. Returns `None` when nothing is left to stack.
pub fn stack_vertical<P: AsRef<Path>>(
    paths: &[P],
    top: Option<&Path>,
    bottom: Option<&Path>,
) -> Option<CompositeImage> {
    let mut rasters = Vec::with_capacity(paths.len() + 2);
    let mut skipped = vec![];
    if let Some(raster) = top.and_then(open_raster) {
        rasters.push(raster);
    }
    for (index, path) in paths.iter().enumerate() {
        match open_raster(path.as_ref()) {
            Some(raster) => rasters.push(raster),
            None => skipped.push(index),
        }
    }
    if let Some(raster) = bottom.and_then(open_raster) {
        rasters.push(raster);
    }
    let mut composite = stack_rasters(&rasters)?;
    composite.skipped = skipped;
    Some(composite)
}

fn open_raster(path: &Path) -> Option<RgbaImage> {
    match image::open(path) {
        Ok(image) => Some(image.to_rgba8()),
        Err(err) => {
            warn!(path = %path.display(), error = %err, "leaving out undecodable image");
            None
        }
    }
}

/// Stack rasters top to bottom, each centered horizontally.
pub fn stack_rasters(rasters: &[RgbaImage]) -> Option<CompositeImage> {
    if rasters.is_empty() {
        return None;
    }
    let width = rasters.iter().map(RgbaImage::width).max().unwrap_or(0);
    let height = rasters.iter().map(RgbaImage::height).sum();
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 0]));
    let mut y = 0;
    for raster in rasters {
        let x = (width - raster.width()) / 2;
        paste_with_alpha(&mut canvas, raster, x, y);
        y += raster.height();
    }
    Some(CompositeImage {
        canvas,
        skipped: vec![],
    })
}

/// Paste `raster` at `(x, y)` using its own alpha as the mask.
///
/// Every channel, alpha included, is mixed as `src * a + dst * (1 - a)`, so fully transparent
/// pixels leave the canvas untouched and fully opaque ones replace it.
fn paste_with_alpha(canvas: &mut RgbaImage, raster: &RgbaImage, x: u32, y: u32) {
    for (raster_x, raster_y, source) in raster.enumerate_pixels() {
        let mask = source[3] as u32;
        let target = canvas.get_pixel_mut(x + raster_x, y + raster_y);
        for channel in 0..4 {
            let mixed = source[channel] as u32 * mask + target[channel] as u32 * (255 - mask);
            target[channel] = ((mixed + 127) / 255) as u8;
        }
    }
}
