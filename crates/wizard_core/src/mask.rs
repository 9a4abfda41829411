use std::io::Cursor;

use image::{imageops::FilterType, DynamicImage, ImageFormat, Rgba, RgbaImage};

use crate::{error::ClientError, record::AssetRef};

pub const CANVAS_WIDTH: u32 = 600;
pub const CANVAS_HEIGHT: u32 = 400;
/// `rgba(59, 130, 246, 0.5)`
pub const BRUSH_COLOR: [u8; 4] = [59, 130, 246, 128];
/// `#f3f4f6`, shown when the source image cannot be decoded.
pub const BLANK_FILL: [u8; 4] = [243, 244, 246, 255];
pub const MIN_BRUSH_SIZE: u32 = 1;
pub const MAX_BRUSH_SIZE: u32 = 50;
pub const DEFAULT_BRUSH_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    #[default]
    Brush,
    Eraser,
}

/// Fixed-size paint surface over a copy of the loaded image.
#[derive(Debug, Clone)]
pub struct MaskCanvas {
    base: RgbaImage,
    surface: RgbaImage,
}

impl MaskCanvas {
    pub fn blank() -> Self {
        let base = RgbaImage::from_pixel(CANVAS_WIDTH, CANVAS_HEIGHT, Rgba(BLANK_FILL));
        Self {
            surface: base.clone(),
            base,
        }
    }

    /// Decodes PNG/JPEG bytes and stretches them over the whole surface.
    pub fn from_image_bytes(bytes: &[u8]) -> Result<Self, ClientError> {
        let decoded = image::load_from_memory(bytes)?;
        let base = decoded
            .resize_exact(CANVAS_WIDTH, CANVAS_HEIGHT, FilterType::Triangle)
            .to_rgba8();
        Ok(Self {
            surface: base.clone(),
            base,
        })
    }

    pub fn width(&self) -> u32 {
        self.surface.width()
    }

    pub fn height(&self) -> u32 {
        self.surface.height()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        (x < self.width() && y < self.height()).then(|| self.surface.get_pixel(x, y).0)
    }

    /// Paints one circular dab centred on `(cx, cy)`. A pixel is covered when
    /// its centre lies inside the circle.
    pub fn dab(&mut self, tool: Tool, cx: f32, cy: f32, brush_size: u32) {
        let radius = clamp_brush_size(brush_size) as f32 / 2.0;
        let r_sq = radius * radius;
        let w = self.width() as f32;
        let h = self.height() as f32;

        let min_x = (cx - radius).floor().max(0.0);
        let max_x = (cx + radius).ceil().min(w - 1.0);
        let min_y = (cy - radius).floor().max(0.0);
        let max_y = (cy + radius).ceil().min(h - 1.0);
        if min_x > max_x || min_y > max_y {
            return;
        }

        for y in min_y as u32..=max_y as u32 {
            for x in min_x as u32..=max_x as u32 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                if dx * dx + dy * dy > r_sq {
                    continue;
                }
                let pixel = self.surface.get_pixel_mut(x, y);
                match tool {
                    Tool::Brush => pixel.0 = blend_over(BRUSH_COLOR, pixel.0),
                    Tool::Eraser => pixel.0 = [0, 0, 0, 0],
                }
            }
        }
    }

    /// Dabs every point and fills the gaps between consecutive points.
    pub fn stroke(&mut self, tool: Tool, points: &[(f32, f32)], brush_size: u32) {
        let spacing = (clamp_brush_size(brush_size) as f32 / 4.0).max(1.0);
        let mut previous: Option<(f32, f32)> = None;
        for &(x, y) in points {
            if let Some((px, py)) = previous {
                let distance = ((x - px).powi(2) + (y - py).powi(2)).sqrt();
                let steps = (distance / spacing).ceil() as u32;
                for step in 1..steps {
                    let t = step as f32 / steps as f32;
                    self.dab(tool, px + (x - px) * t, py + (y - py) * t, brush_size);
                }
            }
            self.dab(tool, x, y, brush_size);
            previous = Some((x, y));
        }
    }

    /// Drops every edit and shows the loaded image again.
    pub fn clear(&mut self) {
        self.surface.clone_from(&self.base);
    }

    pub fn is_pristine(&self) -> bool {
        self.surface == self.base
    }

    pub fn to_png(&self) -> Result<Vec<u8>, ClientError> {
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(self.surface.clone()).write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }

    pub fn to_data_url(&self) -> Result<AssetRef, ClientError> {
        Ok(AssetRef::png_data_url(&self.to_png()?))
    }
}

pub fn clamp_brush_size(size: u32) -> u32 {
    size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
}

/// Straight-alpha source-over compositing of `src` onto `dst`.
fn blend_over(src: [u8; 4], dst: [u8; 4]) -> [u8; 4] {
    let sa = src[3] as f32 / 255.0;
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return [0, 0, 0, 0];
    }
    let channel = |s: u8, d: u8| {
        let value = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    [
        channel(src[0], dst[0]),
        channel(src[1], dst[1]),
        channel(src[2], dst[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}

#[cfg(test)]
#[path = "tests/mask_tests.rs"]
mod tests;
