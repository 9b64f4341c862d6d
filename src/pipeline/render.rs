//! Scanline decode of the stored PNG and blit onto the surface

use crate::display::{rgb565, Surface};
use crate::error::{PipelineError, Result};
use crate::storage::AssetSlot;
use crate::types::RenderReport;
use png::{BitDepth, ColorType, Transformations};
use std::fs::File;
use std::io::BufReader;
use std::time::Instant;

/// One decoded row, already converted to RGB565
pub struct Scanline<'a> {
    pub y: u32,
    pub pixels: &'a [u16],
}

/// Pulls rows out of a PNG stream one at a time. The stream is read through
/// a buffered file handle, so only one row is resident at once. Once
/// exhausted it cannot be restarted.
pub struct ScanlineDecoder {
    reader: png::Reader<BufReader<File>>,
    color: ColorType,
    width: u32,
    height: u32,
    next_y: u32,
    line: Vec<u16>,
}

impl ScanlineDecoder {
    pub fn open(slot: &AssetSlot) -> Result<Self> {
        let file = slot
            .open()
            .map_err(|e| PipelineError::Decode(e.to_string()))?;
        let mut decoder = png::Decoder::new(BufReader::new(file));
        decoder.set_transformations(Transformations::EXPAND | Transformations::STRIP_16);
        let reader = decoder.read_info()?;

        let info = reader.info();
        if info.interlaced {
            return Err(PipelineError::Decode(
                "interlaced PNG streams are not supported".into(),
            ));
        }
        let (width, height) = (info.width, info.height);

        let (color, depth) = reader.output_color_type();
        if depth != BitDepth::Eight || color == ColorType::Indexed {
            return Err(PipelineError::Decode(format!(
                "unexpected output format {:?}/{:?}",
                color, depth
            )));
        }

        Ok(Self {
            reader,
            color,
            width,
            height,
            next_y: 0,
            line: Vec::with_capacity(width as usize),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn next_line(&mut self) -> Result<Option<Scanline<'_>>> {
        let Some(row) = self.reader.next_row()? else {
            return Ok(None);
        };
        convert_row(self.color, row.data(), &mut self.line);
        let y = self.next_y;
        self.next_y += 1;
        Ok(Some(Scanline {
            y,
            pixels: &self.line,
        }))
    }
}

/// Convert one 8-bit row to RGB565, compositing alpha over black
fn convert_row(color: ColorType, data: &[u8], out: &mut Vec<u16>) {
    fn over_black(c: u8, a: u8) -> u8 {
        (c as u16 * a as u16 / 255) as u8
    }

    out.clear();
    match color {
        ColorType::Rgb => out.extend(data.chunks_exact(3).map(|p| rgb565(p[0], p[1], p[2]))),
        ColorType::Rgba => out.extend(data.chunks_exact(4).map(|p| {
            rgb565(
                over_black(p[0], p[3]),
                over_black(p[1], p[3]),
                over_black(p[2], p[3]),
            )
        })),
        ColorType::Grayscale => out.extend(data.iter().map(|&v| rgb565(v, v, v))),
        ColorType::GrayscaleAlpha => out.extend(data.chunks_exact(2).map(|p| {
            let v = over_black(p[0], p[1]);
            rgb565(v, v, v)
        })),
        // indexed input is expanded by the decoder
        _ => {}
    }
}

/// Clear `surface`, then decode the asset row by row and blit each row
/// horizontally centred. Rows wider than the surface are cut on the right;
/// rows below the bottom edge are decoded but not drawn. Anything drawn
/// before a decode error stays on the surface.
pub fn render_asset(slot: &AssetSlot, surface: &mut dyn Surface) -> Result<RenderReport> {
    let started = Instant::now();
    surface.clear();

    let mut decoder = ScanlineDecoder::open(slot)?;
    let (image_width, image_height) = (decoder.width(), decoder.height());
    let surface_width = surface.width();
    let surface_height = surface.height();

    let mut rows_drawn = 0;
    while let Some(line) = decoder.next_line()? {
        if line.y >= surface_height {
            continue;
        }
        let width = (line.pixels.len() as u32).min(surface_width);
        let offset = (surface_width - width) / 2;
        surface.blit_row(offset, line.y, &line.pixels[..width as usize]);
        rows_drawn += 1;
    }

    Ok(RenderReport {
        image_width,
        image_height,
        rows_drawn,
        elapsed: started.elapsed(),
    })
}
