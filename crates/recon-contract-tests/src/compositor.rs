//! Frame-level contracts of the compositor, checked on the recording backend.

use recon_core::CompositorConfig;
use recon_runtime_glow::glow;
use recon_runtime_glow::recording::{GlCall, RecordingBackend};
use recon_runtime_glow::{
    final_blur_slot, uniforms, Compositor, EffectKind, ProgramSources, RenderBackend, RenderTarget,
    Slot,
};

fn compositor_with(
    gl: &RecordingBackend,
    w: i32,
    h: i32,
    cfg: &CompositorConfig,
) -> Compositor<RecordingBackend> {
    Compositor::new(gl, w, h, cfg, &ProgramSources::builtin()).expect("compositor")
}

fn frame(gl: &RecordingBackend, c: &Compositor<RecordingBackend>, time: f32) {
    c.begin_render(gl).expect("begin_render");
    c.end_render(gl, time).expect("end_render");
}

fn no_incomplete_status(calls: &[GlCall]) -> bool {
    calls.iter().all(|call| match call {
        GlCall::CheckStatus(s) => *s == glow::FRAMEBUFFER_COMPLETE,
        _ => true,
    })
}

/// Empty frame at 1280x720 with both toggles off ends on the display with one plain quad.
#[test]
fn plain_frame_end_to_end() {
    let gl = RecordingBackend::new();
    let mut c = compositor_with(&gl, 1280, 720, &CompositorConfig::default());
    assert!(!c.use_glitch && !c.use_bloom);

    gl.clear_calls();
    c.begin_render(&gl).unwrap();
    let stats = c.end_render(&gl, 0.0).unwrap();

    assert!(gl.diagnostics().is_empty(), "{:?}", gl.diagnostics());
    assert!(no_incomplete_status(&gl.calls()));
    assert_eq!(gl.bound_framebuffer(), None);
    assert_eq!(gl.viewport_rect(), (0, 0, 1280, 720));

    let draws = gl.draws();
    assert_eq!(draws.len(), 1);
    let quad = &draws[0];
    assert_eq!(quad.target, None);
    assert_eq!(quad.count, 6);
    assert!(!quad.depth_test);
    assert_eq!(quad.program, Some(c.program(EffectKind::Screen).unwrap()));
    assert_eq!(stats.composite, EffectKind::Screen);

    // The resolved scene reached the display through the intermediate target.
    let display = gl.surface(None).unwrap();
    assert_eq!(display.draws, 1);
    assert_eq!(display.color, [1.0, 1.0, 1.0, 1.0]);
    let blit = gl.last_blit().unwrap();
    assert_eq!(blit.read, c.pool().multisampled().framebuffer());
    assert_eq!(blit.draw, c.pool().intermediate().framebuffer());
    assert_eq!(blit.mask, glow::COLOR_BUFFER_BIT);
    assert_eq!(
        gl.surface(c.pool().intermediate().framebuffer()).unwrap().color,
        [0.02, 0.02, 0.05, 1.0]
    );

    c.destroy(&gl);
    assert_eq!(gl.live_objects(), 0);
}

/// Any resize sequence leaves all four targets at the final size, and frames stay clean.
#[test]
fn resize_sequences_keep_the_pool_consistent() {
    let gl = RecordingBackend::new();
    let cfg = CompositorConfig {
        use_bloom: true,
        ..CompositorConfig::default()
    };
    let mut c = compositor_with(&gl, 1280, 720, &cfg);

    for (w, h) in [(640, 480), (1, 1), (3840, 2160), (1280, 720), (333, 777)] {
        c.update_size(&gl, w, h).unwrap();
        gl.clear_calls();
        frame(&gl, &c, 0.5);

        for rt in c.pool().targets() {
            assert_eq!(rt.size(), (w, h));
            let color = gl.storage(rt.color_texture().unwrap()).unwrap();
            assert_eq!((color.width, color.height), (w, h));
        }
        assert!(no_incomplete_status(&gl.calls()));
        assert!(gl
            .draws()
            .iter()
            .all(|d| d.viewport == (0, 0, w, h)));
    }
    assert!(gl.diagnostics().is_empty(), "{:?}", gl.diagnostics());

    // 4 targets x 3 objects, 4 programs, quad VAO + VBO.
    assert_eq!(gl.live_objects(), 18);
    c.destroy(&gl);
    assert_eq!(gl.live_objects(), 0);
}

#[test]
fn blur_parity_selects_the_bloom_source() {
    assert_eq!(final_blur_slot(10), Slot::Zero);

    for iterations in [1, 2, 3, 10, 11] {
        let gl = RecordingBackend::new();
        let cfg = CompositorConfig {
            use_bloom: true,
            blur_iterations: iterations,
            ..CompositorConfig::default()
        };
        let mut c = compositor_with(&gl, 64, 64, &cfg);
        c.begin_render(&gl).unwrap();
        let stats = c.end_render(&gl, 0.0).unwrap();

        let expected = if iterations % 2 == 0 {
            Slot::Zero
        } else {
            Slot::One
        };
        assert_eq!(stats.bloom_slot, Some(expected), "iterations = {iterations}");
        assert_eq!(stats.passes, iterations + 2);
        let composite = gl.last_draw().unwrap();
        assert_eq!(
            composite.units[1],
            c.pool().ping_pong(expected).color_texture()
        );
        assert!(gl.diagnostics().is_empty(), "{:?}", gl.diagnostics());
        c.destroy(&gl);
    }
}

#[test]
fn blits_copy_color_and_leave_depth_alone() {
    let gl = RecordingBackend::new();
    let mut a = RenderTarget::create(&gl, 128, 128, false).unwrap();
    let mut b = RenderTarget::create(&gl, 64, 32, false).unwrap();

    a.bind(&gl).unwrap();
    gl.clear_color([0.9, 0.1, 0.1, 1.0]);
    gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
    gl.write_depth(a.framebuffer(), 0.25);
    gl.write_depth(b.framebuffer(), 0.75);
    gl.write_depth(None, 0.5);

    // Scaled copy between single-sample targets is allowed.
    a.blit_to(&gl, &b).unwrap();
    let blit = gl.last_blit().unwrap();
    assert_eq!((blit.src, blit.dst), ((128, 128), (64, 32)));
    let sb = gl.surface(b.framebuffer()).unwrap();
    assert_eq!(sb.color, [0.9, 0.1, 0.1, 1.0]);
    assert_eq!(sb.depth, 0.75);

    a.blit_to_display(&gl).unwrap();
    let display = gl.surface(None).unwrap();
    assert_eq!(display.color, [0.9, 0.1, 0.1, 1.0]);
    assert_eq!(display.depth, 0.5);

    assert!(gl.diagnostics().is_empty(), "{:?}", gl.diagnostics());
    a.destroy(&gl);
    b.destroy(&gl);
}

/// Turning bloom off between frames leaves no trace of the previous bloom frame.
#[test]
fn bloom_off_frame_matches_never_bloomed() {
    let bloomed = RecordingBackend::new();
    let mut c1 = compositor_with(
        &bloomed,
        800,
        600,
        &CompositorConfig {
            use_bloom: true,
            ..CompositorConfig::default()
        },
    );
    frame(&bloomed, &c1, 1.0);
    assert!(bloomed.texture_at(1).is_some());

    c1.use_bloom = false;
    bloomed.clear_calls();
    frame(&bloomed, &c1, 2.0);

    let plain = RecordingBackend::new();
    let mut c2 = compositor_with(&plain, 800, 600, &CompositorConfig::default());
    plain.clear_calls();
    frame(&plain, &c2, 2.0);

    assert_eq!(bloomed.texture_at(1), None);
    assert_eq!(bloomed.calls(), plain.calls());
    let screen = c1.program(EffectKind::Screen).unwrap();
    assert!(bloomed.calls().contains(&GlCall::UniformI32 {
        program: screen,
        name: uniforms::BLOOM.to_string(),
        value: 0
    }));

    c1.destroy(&bloomed);
    c2.destroy(&plain);
}

#[test]
fn target_destroy_is_idempotent() {
    let gl = RecordingBackend::new();

    let mut never = RenderTarget::<RecordingBackend>::unallocated(16, 16, true);
    never.destroy(&gl);

    let mut rt = RenderTarget::create(&gl, 16, 16, true).unwrap();
    rt.destroy(&gl);
    rt.destroy(&gl);

    assert_eq!(gl.live_objects(), 0);
    assert!(gl.diagnostics().is_empty(), "{:?}", gl.diagnostics());
}

#[test]
fn glitch_composite_receives_time() {
    let gl = RecordingBackend::new();
    let mut c = compositor_with(
        &gl,
        320,
        200,
        &CompositorConfig {
            use_glitch: true,
            use_bloom: true,
            ..CompositorConfig::default()
        },
    );
    frame(&gl, &c, 3.25);

    let glitch = c.program(EffectKind::Glitch).unwrap();
    assert_eq!(gl.last_draw().unwrap().program, Some(glitch));
    assert!(gl.calls().contains(&GlCall::UniformF32 {
        program: glitch,
        name: uniforms::TIME.to_string(),
        value: 3.25
    }));
    c.destroy(&gl);
}
