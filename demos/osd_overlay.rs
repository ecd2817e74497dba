//! Composites a 600x48 RGBA on-screen display over a 1080p NV12 video frame and dumps the result.
//!
//! ## Usage
//!
//! ```bash
//! # Synthetic layers, EGL if available:
//! cargo run --example osd_overlay
//!
//! # Raw layers from disk (headerless, tightly packed), dumps into /tmp:
//! cargo run --example osd_overlay -- osd_600x48.abgr video_1920x1080.nv12 /tmp
//! ```
//!
//! Without a working DRM node and EGL driver the CPU backend is used instead.

use planes_and_pixels::bindings::{Surface, SurfaceConfig, SurfaceUsage};
use planes_and_pixels::images::vertex_algorithms::Geometry;
use planes_and_pixels::images::{CompositorConfig, Engine};
use planes_and_pixels::pixel_formats::Fourcc;
use std::error::Error;
use std::path::PathBuf;

const OSD: (u32, u32) = (600, 48);
const VIDEO: (u32, u32) = (1920, 1080);
const OSD_POSITION: (u32, u32) = (100, 200);

#[cfg(feature = "backend_egl")]
fn engine() -> Engine {
    use planes_and_pixels::images::EngineConfig;
    Engine::egl(EngineConfig::default()).unwrap_or_else(|e| {
        eprintln!("EGL unavailable ({e}), compositing on the CPU");
        Engine::software()
    })
}

#[cfg(not(feature = "backend_egl"))]
fn engine() -> Engine {
    Engine::software()
}

/// Translucent bar with a brighter left half, so the blend is visible in the dump.
fn paint_osd(surface: &mut Surface) -> Result<(), Box<dyn Error>> {
    let (w, h) = (surface.width() as usize, surface.height() as usize);
    let pitch = surface.pitch() as usize;
    let px = surface.pixels_mut()?;
    for y in 0..h {
        for x in 0..w {
            let texel = if x < w / 2 { [240, 240, 240, 200] } else { [20, 90, 200, 128] };
            px[y * pitch + x * 4..y * pitch + x * 4 + 4].copy_from_slice(&texel);
        }
    }
    Ok(())
}

/// Mid-grey luma ramp with neutral chroma.
fn paint_video(surface: &mut Surface) -> Result<(), Box<dyn Error>> {
    let (w, h) = (surface.width() as usize, surface.height() as usize);
    let pitch = surface.pitch() as usize;
    let px = surface.pixels_mut()?;
    for y in 0..h {
        for x in 0..w {
            px[y * pitch + x] = (64 + x * 128 / w) as u8;
        }
    }
    px[pitch * h..pitch * h + pitch * h / 2].fill(128);
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let osd_file = args.next().map(PathBuf::from);
    let video_file = args.next().map(PathBuf::from);
    let out_dir = args.next().map_or_else(std::env::temp_dir, PathBuf::from);

    let engine = engine();
    println!("compositing with the {} backend", engine.backend_name());

    let mut osd = Surface::new(SurfaceConfig::new(OSD.0, OSD.1, Fourcc::ABGR8888).with_debug_name("osd"))?;
    let mut video = Surface::new(
        SurfaceConfig::new(VIDEO.0, VIDEO.1, Fourcc::NV12)
            .with_usage(SurfaceUsage::RenderTarget)
            .with_debug_name("video"),
    )?;
    osd.allocate(engine.allocator())?;
    video.allocate(engine.allocator())?;

    match osd_file {
        Some(path) => osd.load_raw(path)?,
        None => paint_osd(&mut osd)?,
    }
    match video_file {
        Some(path) => video.load_raw(path)?,
        None => paint_video(&mut video)?,
    }

    engine.import(&mut osd)?;
    engine.import(&mut video)?;

    let compositor = engine.compositor(CompositorConfig::default())?;
    let geometry = Geometry::overlay_at(VIDEO.0, VIDEO.1, OSD.0, OSD.1, OSD_POSITION.0, OSD_POSITION.1);
    compositor.render(&osd, &mut video, &geometry)?;
    engine.finish();

    let osd_dump = osd.dump(&out_dir, 0)?;
    let video_dump = video.dump(&out_dir, 1)?;
    osd.dump_png(out_dir.join("dumplayer_0.png"))?;
    println!("wrote {} and {}", osd_dump.display(), video_dump.display());

    osd.release();
    video.release();
    Ok(())
}
