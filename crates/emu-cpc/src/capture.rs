//! Headless capture: PNG screenshots.

#![allow(clippy::cast_possible_truncation)]

use std::error::Error;
use std::fs;
use std::path::Path;

use crate::Cpc;

/// Save the current framebuffer as a PNG file.
///
/// Works for every pixel format; the frame is converted to 8-bit RGB
/// through the current monitor palette.
pub fn save_screenshot(cpc: &Cpc, path: &Path) -> Result<(), Box<dyn Error>> {
    let fb = cpc.framebuffer();

    let file = fs::File::create(path)?;
    let w = std::io::BufWriter::new(file);
    let mut encoder = png::Encoder::new(w, fb.width() as u32, fb.height() as u32);
    encoder.set_color(png::ColorType::Rgb);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(&fb.to_rgb24())?;
    Ok(())
}

/// Save a sequence of frames as numbered PNGs in a directory.
///
/// Creates `dir/000001.png`, `dir/000002.png`, etc.
pub fn save_frame_sequence(cpc: &mut Cpc, dir: &Path, num_frames: u32) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;

    for i in 1..=num_frames {
        cpc.tick();
        let filename = dir.join(format!("{i:06}.png"));
        save_screenshot(cpc, &filename)?;
    }

    Ok(())
}
