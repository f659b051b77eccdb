//! Raster output: the framebuffer and the frame renderer.
//!
//! The canvas is a fixed 768×272 window onto the monitor, wide enough for a
//! full-width mode 2 screen plus border. The CRTC's displayed area is placed
//! inside it from the sync position registers, so screens that move R2/R7
//! shift on the canvas the way they shift on a real monitor. Everything
//! outside the displayed area shows the border ink.
//!
//! One character is two bytes of video RAM, 16 canvas pixels wide: a mode 2
//! pixel is one canvas pixel, mode 1 two and mode 0 four.

#![allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use amstrad_gate_array::{BORDER, GateArray, Monitor, decode_byte, rgb};
use motorola_6845::{Crtc6845, cpc_video_address};

use crate::memory::CpcMemory;

pub const SCREEN_WIDTH: usize = 768;
pub const SCREEN_HEIGHT: usize = 272;

/// Canvas position of the displayed area for the firmware's default
/// R2 = 46 and R7 = 30.
const LEFT_EDGE: isize = 64;
const TOP_EDGE: isize = 36;
const DEFAULT_HSYNC: isize = 46;
const DEFAULT_VSYNC: isize = 30;

/// Pixel encoding of the framebuffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// One byte per pixel: the hardware colour number (0-31).
    Indexed8,
    /// 16-bit little-endian RGB 5:6:5.
    Rgb565,
    /// 32-bit little-endian 0x00RRGGBB.
    #[default]
    Xrgb8888,
}

impl PixelFormat {
    #[must_use]
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Indexed8 => 1,
            PixelFormat::Rgb565 => 2,
            PixelFormat::Xrgb8888 => 4,
        }
    }

    /// Encode a hardware colour for this format.
    fn encode(self, hardware: u8, palette: &[u32; 32]) -> u32 {
        let colour = palette[usize::from(hardware & 0x1F)];
        match self {
            PixelFormat::Indexed8 => u32::from(hardware & 0x1F),
            PixelFormat::Rgb565 => {
                let r = (colour >> 16) & 0xFF;
                let g = (colour >> 8) & 0xFF;
                let b = colour & 0xFF;
                ((r >> 3) << 11) | ((g >> 2) << 5) | (b >> 3)
            }
            PixelFormat::Xrgb8888 => colour,
        }
    }
}

/// Host-visible frame: raw pixel bytes plus their layout.
pub struct Framebuffer {
    data: Vec<u8>,
    format: PixelFormat,
    width: usize,
    height: usize,
    /// Bytes per row.
    stride: usize,
    monitor: Monitor,
    /// 0x00RRGGBB for each hardware colour on the current monitor.
    palette: [u32; 32],
}

impl Framebuffer {
    #[must_use]
    pub fn new(format: PixelFormat, monitor: Monitor) -> Self {
        let stride = SCREEN_WIDTH * format.bytes_per_pixel();
        Self {
            data: vec![0; stride * SCREEN_HEIGHT],
            format,
            width: SCREEN_WIDTH,
            height: SCREEN_HEIGHT,
            stride,
            monitor,
            palette: build_palette(monitor),
        }
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    #[must_use]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[must_use]
    pub fn monitor(&self) -> Monitor {
        self.monitor
    }

    /// RGB for each hardware colour on the current monitor, for hosts
    /// presenting `Indexed8` frames.
    #[must_use]
    pub fn palette(&self) -> &[u32; 32] {
        &self.palette
    }

    /// Switch monitor. Takes effect from the next rendered frame.
    pub fn set_monitor(&mut self, monitor: Monitor) {
        self.monitor = monitor;
        self.palette = build_palette(monitor);
    }

    /// Switch pixel format. The buffer is reallocated and cleared.
    pub fn set_format(&mut self, format: PixelFormat) {
        if format != self.format {
            *self = Self::new(format, self.monitor);
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// 0x00RRGGBB colour of one pixel.
    #[must_use]
    pub fn pixel_rgb(&self, x: usize, y: usize) -> u32 {
        let at = y * self.stride + x * self.format.bytes_per_pixel();
        match self.format {
            PixelFormat::Indexed8 => self.palette[usize::from(self.data[at] & 0x1F)],
            PixelFormat::Rgb565 => {
                let v = u32::from(u16::from_le_bytes([self.data[at], self.data[at + 1]]));
                let r = (v >> 11) & 0x1F;
                let g = (v >> 5) & 0x3F;
                let b = v & 0x1F;
                ((r << 3 | r >> 2) << 16) | ((g << 2 | g >> 4) << 8) | (b << 3 | b >> 2)
            }
            PixelFormat::Xrgb8888 => u32::from_le_bytes([
                self.data[at],
                self.data[at + 1],
                self.data[at + 2],
                self.data[at + 3],
            ]),
        }
    }

    /// The whole frame as packed RGB bytes, row by row.
    #[must_use]
    pub fn to_rgb24(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.width * self.height * 3);
        for y in 0..self.height {
            for x in 0..self.width {
                let c = self.pixel_rgb(x, y);
                out.push((c >> 16) as u8);
                out.push((c >> 8) as u8);
                out.push(c as u8);
            }
        }
        out
    }

    fn put_span(&mut self, x: usize, y: usize, len: usize, code: u32) {
        let bpp = self.format.bytes_per_pixel();
        let start = y * self.stride + x * bpp;
        let span = &mut self.data[start..start + len * bpp];
        match self.format {
            PixelFormat::Indexed8 => span.fill(code as u8),
            PixelFormat::Rgb565 => {
                let bytes = (code as u16).to_le_bytes();
                for px in span.chunks_exact_mut(2) {
                    px.copy_from_slice(&bytes);
                }
            }
            PixelFormat::Xrgb8888 => {
                let bytes = code.to_le_bytes();
                for px in span.chunks_exact_mut(4) {
                    px.copy_from_slice(&bytes);
                }
            }
        }
    }
}

fn build_palette(monitor: Monitor) -> [u32; 32] {
    let mut palette = [0; 32];
    for (hw, slot) in palette.iter_mut().enumerate() {
        *slot = rgb(hw as u8, monitor);
    }
    palette
}

/// Draw one frame from the current CRTC registers, Gate Array inks and
/// video RAM.
pub fn render(fb: &mut Framebuffer, crtc: &Crtc6845, ga: &GateArray, memory: &CpcMemory) {
    let mut codes = [0u32; 17];
    for (pen, code) in codes.iter_mut().enumerate() {
        *code = fb.format.encode(ga.ink(pen), &fb.palette);
    }

    for y in 0..fb.height {
        fb.put_span(0, y, fb.width, codes[BORDER]);
    }

    let chars = usize::from(crtc.horizontal_displayed());
    let rows = usize::from(crtc.vertical_displayed());
    let lines_per_row = usize::from(crtc.scanlines_per_row());
    let mode = ga.mode();

    let left = LEFT_EDGE + (DEFAULT_HSYNC - crtc.register(2) as isize) * 16;
    let top = TOP_EDGE + (DEFAULT_VSYNC - crtc.register(7) as isize) * lines_per_row as isize;

    let mut pens = [0u8; 8];
    for line in 0..rows * lines_per_row {
        let y = top + line as isize;
        if y < 0 {
            continue;
        }
        let y = y as usize;
        if y >= fb.height {
            break;
        }
        let row = (line / lines_per_row) as u16;
        let ra = (line % lines_per_row) as u8;

        for col in 0..chars {
            let ma = crtc.character_address(row, col as u16);
            let addr = cpc_video_address(ma, ra);
            for (half, byte_addr) in [addr, addr.wrapping_add(1)].into_iter().enumerate() {
                let count = decode_byte(mode, memory.video_read(byte_addr), &mut pens);
                let width = 8 / count;
                let byte_x = left + (col * 16 + half * 8) as isize;
                for (i, &pen) in pens[..count].iter().enumerate() {
                    let x = byte_x + (i * width) as isize;
                    if x < 0 || x as usize + width > fb.width {
                        continue;
                    }
                    fb.put_span(x as usize, y, width, codes[usize::from(pen)]);
                }
            }
        }
    }
}
