//! Pixel surface the decoded image is painted onto

use std::path::PathBuf;
use tracing::debug;

/// A fixed-geometry panel addressed in RGB565.
pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Fill the whole surface with the blank background
    fn clear(&mut self);
    /// Write `pixels` starting at column `x` of row `y`. Callers keep the
    /// span inside the surface.
    fn blit_row(&mut self, x: u32, y: u32, pixels: &[u16]);
    /// Push the finished frame out, if the backend needs it
    fn present(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

pub const BACKGROUND: u16 = 0x0000;

/// Pack 8-bit RGB into RGB565
pub fn rgb565(r: u8, g: u8, b: u8) -> u16 {
    ((r as u16 & 0xF8) << 8) | ((g as u16 & 0xFC) << 3) | (b as u16 >> 3)
}

/// Expand RGB565 back to 8-bit RGB, replicating high bits into the low ones
pub fn rgb888(pixel: u16) -> [u8; 3] {
    let r = ((pixel >> 11) & 0x1F) as u8;
    let g = ((pixel >> 5) & 0x3F) as u8;
    let b = (pixel & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2)]
}

/// In-memory panel. `present` writes the frame out as a PNG snapshot.
pub struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u16>,
    snapshot_path: Option<PathBuf>,
}

impl FrameBuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![BACKGROUND; width as usize * height as usize],
            snapshot_path: None,
        }
    }

    pub fn with_snapshot(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = Some(path.into());
        self
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<u16> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels
            .get(y as usize * self.width as usize + x as usize)
            .copied()
    }

    pub fn to_rgb_image(&self) -> image::RgbImage {
        image::RgbImage::from_fn(self.width, self.height, |x, y| {
            image::Rgb(rgb888(self.pixel(x, y).unwrap_or(BACKGROUND)))
        })
    }
}

impl Surface for FrameBuffer {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.pixels.fill(BACKGROUND);
    }

    fn blit_row(&mut self, x: u32, y: u32, pixels: &[u16]) {
        if y >= self.height || x >= self.width {
            return;
        }
        let start = y as usize * self.width as usize + x as usize;
        let len = pixels.len().min((self.width - x) as usize);
        self.pixels[start..start + len].copy_from_slice(&pixels[..len]);
    }

    fn present(&mut self) -> std::io::Result<()> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };
        self.to_rgb_image()
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(std::io::Error::other)?;
        debug!(path = %path.display(), "Frame snapshot written");
        Ok(())
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;

    /// Records every blit and panics on any write outside the panel.
    pub struct RecordingSurface {
        pub frame: FrameBuffer,
        pub blits: Vec<(u32, u32, usize)>,
        pub clears: usize,
        pub presents: usize,
    }

    impl RecordingSurface {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                frame: FrameBuffer::new(width, height),
                blits: Vec::new(),
                clears: 0,
                presents: 0,
            }
        }
    }

    impl Surface for RecordingSurface {
        fn width(&self) -> u32 {
            self.frame.width
        }

        fn height(&self) -> u32 {
            self.frame.height
        }

        fn clear(&mut self) {
            self.clears += 1;
            self.frame.clear();
        }

        fn blit_row(&mut self, x: u32, y: u32, pixels: &[u16]) {
            assert!(y < self.frame.height, "row {} outside panel", y);
            assert!(
                x as usize + pixels.len() <= self.frame.width as usize,
                "span {}+{} outside panel",
                x,
                pixels.len()
            );
            self.blits.push((x, y, pixels.len()));
            self.frame.blit_row(x, y, pixels);
        }

        fn present(&mut self) -> std::io::Result<()> {
            self.presents += 1;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn rgb565_packs_primaries() {
        assert_eq!(rgb565(255, 0, 0), 0xF800);
        assert_eq!(rgb565(0, 255, 0), 0x07E0);
        assert_eq!(rgb565(0, 0, 255), 0x001F);
        assert_eq!(rgb565(255, 255, 255), 0xFFFF);
        assert_eq!(rgb888(0xFFFF), [255, 255, 255]);
        assert_eq!(rgb888(0xF800), [255, 0, 0]);
    }

    #[test]
    fn blit_row_clips_at_right_edge() {
        let mut fb = FrameBuffer::new(4, 2);
        fb.blit_row(2, 1, &[1, 2, 3, 4]);
        assert_eq!(fb.pixel(2, 1), Some(1));
        assert_eq!(fb.pixel(3, 1), Some(2));
        assert_eq!(fb.pixel(0, 1), Some(BACKGROUND));
        fb.blit_row(0, 5, &[9]);
        fb.clear();
        assert_eq!(fb.pixel(2, 1), Some(BACKGROUND));
    }

    #[test]
    fn tall_narrow_panel_addresses_every_row() {
        let mut fb = FrameBuffer::new(1, 70_000);
        fb.blit_row(0, 69_999, &[0xABCD]);
        assert_eq!(fb.pixel(0, 69_999), Some(0xABCD));
        assert_eq!(fb.pixel(0, 70_000), None);
    }

    #[test]
    fn present_writes_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("display.png");
        let mut fb = FrameBuffer::new(3, 3).with_snapshot(&path);
        fb.blit_row(0, 0, &[rgb565(255, 0, 0)]);
        fb.present().unwrap();
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (3, 3));
        assert_eq!(img.get_pixel(0, 0).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0]);
    }
}
