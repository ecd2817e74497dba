//! End-to-end compositing through the CPU backend.

use planes_and_pixels::bindings::{Surface, SurfaceConfig, SurfaceError, SurfaceUsage};
use planes_and_pixels::images::shader::YuvStandard;
use planes_and_pixels::images::vertex_algorithms::Geometry;
use planes_and_pixels::images::{CompositorConfig, Engine, RenderError};
use planes_and_pixels::pixel_formats::Fourcc;

const BG_W: u32 = 64;
const BG_H: u32 = 32;
const OSD_W: u32 = 16;
const OSD_H: u32 = 8;
const OSD_X: u32 = 8;
const OSD_Y: u32 = 4;

fn unorm8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Luma gradient plus a chroma pattern, so every background pixel is distinguishable.
fn fill_background(surface: &mut Surface) {
    let pitch = surface.pitch() as usize;
    let chroma = pitch * BG_H as usize;
    let px = surface.pixels_mut().unwrap();
    for y in 0..BG_H as usize {
        for x in 0..BG_W as usize {
            px[y * pitch + x] = (x * 3 + y * 5) as u8;
        }
    }
    for y in 0..(BG_H / 2) as usize {
        for x in 0..(BG_W / 2) as usize {
            px[chroma + y * pitch + x * 2] = (100 + x) as u8;
            px[chroma + y * pitch + x * 2 + 1] = (200 - y) as u8;
        }
    }
}

fn fill_overlay(surface: &mut Surface, rgba: [u8; 4]) {
    let pitch = surface.pitch() as usize;
    let px = surface.pixels_mut().unwrap();
    for y in 0..OSD_H as usize {
        for x in 0..OSD_W as usize {
            px[y * pitch + x * 4..y * pitch + x * 4 + 4].copy_from_slice(&rgba);
        }
    }
}

struct Scene {
    engine: Engine,
    overlay: Surface,
    background: Surface,
}

fn scene(rgba: [u8; 4]) -> Scene {
    let engine = Engine::software();
    let mut overlay = Surface::new(SurfaceConfig::new(OSD_W, OSD_H, Fourcc::ABGR8888).with_debug_name("osd")).unwrap();
    let mut background = Surface::new(
        SurfaceConfig::new(BG_W, BG_H, Fourcc::NV12)
            .with_usage(SurfaceUsage::RenderTarget)
            .with_debug_name("video"),
    )
    .unwrap();
    overlay.allocate(engine.allocator()).unwrap();
    background.allocate(engine.allocator()).unwrap();
    fill_overlay(&mut overlay, rgba);
    fill_background(&mut background);
    engine.import(&mut overlay).unwrap();
    engine.import(&mut background).unwrap();
    Scene {
        engine,
        overlay,
        background,
    }
}

fn frame(surface: &Surface) -> Vec<u8> {
    let pitch = surface.pitch() as usize;
    let px = surface.pixels().unwrap();
    px[..pitch * (BG_H as usize + BG_H as usize / 2)].to_vec()
}

fn inside(x: u32, y: u32) -> bool {
    (OSD_X..OSD_X + OSD_W).contains(&x) && (OSD_Y..OSD_Y + OSD_H).contains(&y)
}

#[test]
fn transparent_overlay_leaves_background_untouched() {
    let mut s = scene([255, 0, 0, 0]);
    let before = frame(&s.background);
    let compositor = s.engine.compositor(CompositorConfig::default()).unwrap();
    let geometry = Geometry::overlay_at(BG_W, BG_H, OSD_W, OSD_H, OSD_X, OSD_Y);
    compositor.render(&s.overlay, &mut s.background, &geometry).unwrap();
    s.engine.finish();
    assert_eq!(frame(&s.background), before);
}

#[test]
fn opaque_overlay_replaces_the_rectangle() {
    let rgba = [200, 40, 90, 255];
    let mut s = scene(rgba);
    let before = frame(&s.background);
    let compositor = s.engine.compositor(CompositorConfig::default()).unwrap();
    let geometry = Geometry::overlay_at(BG_W, BG_H, OSD_W, OSD_H, OSD_X, OSD_Y);
    compositor.render(&s.overlay, &mut s.background, &geometry).unwrap();
    s.engine.finish();

    let rgb = [rgba[0] as f32 / 255.0, rgba[1] as f32 / 255.0, rgba[2] as f32 / 255.0];
    let [y, u, v] = YuvStandard::Itu601.rgb_to_yuv(rgb);
    let (y, u, v) = (unorm8(y), unorm8(u), unorm8(v));

    let pitch = s.background.pitch() as usize;
    let chroma = pitch * BG_H as usize;
    let after = frame(&s.background);
    for row in 0..BG_H {
        for col in 0..BG_W {
            let i = row as usize * pitch + col as usize;
            if inside(col, row) {
                assert_eq!(after[i], y, "luma at {col},{row}");
            } else {
                assert_eq!(after[i], before[i], "luma at {col},{row}");
            }
        }
    }
    //chroma pairs fully covered by the rectangle
    for row in OSD_Y / 2..(OSD_Y + OSD_H) / 2 {
        for col in OSD_X / 2..(OSD_X + OSD_W) / 2 {
            let i = chroma + row as usize * pitch + col as usize * 2;
            assert_eq!((after[i], after[i + 1]), (u, v), "chroma at {col},{row}");
        }
    }
    assert_eq!(after[chroma], before[chroma]);
}

#[test]
fn half_alpha_mixes() {
    let mut s = scene([255, 255, 255, 128]);
    let before = frame(&s.background);
    let compositor = s
        .engine
        .compositor(CompositorConfig {
            standard: YuvStandard::Itu601FullRange,
        })
        .unwrap();
    let geometry = Geometry::overlay_at(BG_W, BG_H, OSD_W, OSD_H, OSD_X, OSD_Y);
    compositor.render(&s.overlay, &mut s.background, &geometry).unwrap();
    let pitch = s.background.pitch() as usize;
    let i = OSD_Y as usize * pitch + OSD_X as usize;
    let a = 128.0 / 255.0;
    let expected = unorm8(before[i] as f32 / 255.0 * (1.0 - a) + a);
    let got = frame(&s.background)[i];
    assert!(got.abs_diff(expected) <= 1, "{got} vs {expected}");
}

#[test]
fn repeated_renders_are_stable_for_opaque_overlays() {
    let mut s = scene([10, 220, 30, 255]);
    let compositor = s.engine.compositor(CompositorConfig::default()).unwrap();
    let geometry = Geometry::overlay_at(BG_W, BG_H, OSD_W, OSD_H, OSD_X, OSD_Y);
    compositor.render(&s.overlay, &mut s.background, &geometry).unwrap();
    let once = frame(&s.background);
    compositor.render(&s.overlay, &mut s.background, &geometry).unwrap();
    assert_eq!(frame(&s.background), once);
}

#[test]
fn cpu_writes_after_import_are_sampled() {
    let mut s = scene([0, 0, 0, 0]);
    let compositor = s.engine.compositor(CompositorConfig::default()).unwrap();
    let geometry = Geometry::overlay_at(BG_W, BG_H, OSD_W, OSD_H, OSD_X, OSD_Y);
    //the texture aliases the surface memory
    fill_overlay(&mut s.overlay, [0, 0, 0, 255]);
    compositor.render(&s.overlay, &mut s.background, &geometry).unwrap();
    let pitch = s.background.pitch() as usize;
    let [y, _, _] = YuvStandard::Itu601.rgb_to_yuv([0.0, 0.0, 0.0]);
    assert_eq!(frame(&s.background)[OSD_Y as usize * pitch + OSD_X as usize], unorm8(y));
}

#[test]
fn render_preconditions() {
    let engine = Engine::software();
    let compositor = engine.compositor(CompositorConfig::default()).unwrap();
    let geometry = Geometry::overlay_at(BG_W, BG_H, OSD_W, OSD_H, OSD_X, OSD_Y);

    let mut overlay = Surface::new(SurfaceConfig::new(OSD_W, OSD_H, Fourcc::ABGR8888)).unwrap();
    let mut sampled_bg = Surface::new(SurfaceConfig::new(BG_W, BG_H, Fourcc::NV12)).unwrap();
    assert_eq!(
        compositor.render(&overlay, &mut sampled_bg, &geometry),
        Err(RenderError::NotImported("overlay"))
    );

    overlay.allocate(engine.allocator()).unwrap();
    engine.import(&mut overlay).unwrap();
    assert_eq!(
        compositor.render(&overlay, &mut sampled_bg, &geometry),
        Err(RenderError::NotImported("background"))
    );

    sampled_bg.allocate(engine.allocator()).unwrap();
    engine.import(&mut sampled_bg).unwrap();
    assert_eq!(
        compositor.render(&overlay, &mut sampled_bg, &geometry),
        Err(RenderError::NotRenderTarget)
    );
}

#[test]
fn import_requires_allocation_and_happens_once() {
    let engine = Engine::software();
    let mut s = Surface::new(SurfaceConfig::new(OSD_W, OSD_H, Fourcc::ABGR8888)).unwrap();
    assert!(matches!(engine.import(&mut s), Err(SurfaceError::NotAllocated)));
    s.allocate(engine.allocator()).unwrap();
    engine.import(&mut s).unwrap();
    assert!(s.is_imported());
    assert!(s.texture_id().is_some());
    assert_eq!(s.framebuffer_id(), None);
    assert!(matches!(engine.import(&mut s), Err(SurfaceError::AlreadyImported)));
    assert_eq!(engine.live_textures(), 1);
    s.release();
    assert!(!s.is_imported());
    assert_eq!(engine.live_textures(), 0);
    //the buffer outlives the texture
    assert!(s.pixels().is_ok());
}

#[test]
fn soft_backend_refuses_compressed_surfaces() {
    let engine = Engine::software();
    let mut s = Surface::new(SurfaceConfig::new(OSD_W, OSD_H, Fourcc::ABGR8888).with_compressed(true)).unwrap();
    s.allocate(engine.allocator()).unwrap();
    assert!(matches!(engine.import(&mut s), Err(SurfaceError::Import(_))));
    assert!(!s.is_imported());
}

#[test]
fn dropping_everything_returns_to_baseline() {
    let s = scene([1, 2, 3, 4]);
    assert_eq!(s.engine.live_textures(), 2);
    assert_eq!(s.engine.allocator().live_buffers(), 2);
    let Scene {
        engine,
        overlay,
        background,
    } = s;
    drop(overlay);
    drop(background);
    assert_eq!(engine.live_textures(), 0);
    assert_eq!(engine.allocator().live_buffers(), 0);
}
