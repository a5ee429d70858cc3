//! Multi-pass post-processing compositor.
//
// Frame protocol (single thread, one GL context):
//   begin_render  -> scene draws land in the multisampled target
//   end_render(t) -> resolve, optional bloom chain, composite to the display surface
//
// `update_size` must run between frames whenever the display surface changes size.

use recon_core::CompositorConfig;

use crate::backend::RenderBackend;
use crate::pingpong::{final_blur_slot, BlurCursor, PingPong, Slot};
use crate::programs::{uniforms, EffectKind, EffectPrograms, ProgramSources};
use crate::quad::FullscreenQuad;
use crate::target::RenderTarget;
use crate::EngineError;

/// Scene background for the multisampled target.
pub const SCENE_CLEAR: [f32; 4] = [0.02, 0.02, 0.05, 1.0];
/// Display clear before the composite quad.
pub const DISPLAY_CLEAR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Texture units of the composite programs.
pub const SCREEN_UNIT: u32 = 0;
pub const BLOOM_UNIT: u32 = 1;

/// The four offscreen targets the compositor owns, always the same size.
pub struct TargetPool<B: RenderBackend> {
    multisampled: RenderTarget<B>,
    intermediate: RenderTarget<B>,
    ping_pong: PingPong<RenderTarget<B>>,
}

impl<B: RenderBackend> std::fmt::Debug for TargetPool<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetPool")
            .field("multisampled", &self.multisampled)
            .field("intermediate", &self.intermediate)
            .field("ping_pong", &self.ping_pong)
            .finish()
    }
}

impl<B: RenderBackend> TargetPool<B> {
    fn unallocated(w: i32, h: i32) -> Self {
        Self {
            multisampled: RenderTarget::unallocated(w, h, true),
            intermediate: RenderTarget::unallocated(w, h, false),
            ping_pong: PingPong::new(
                RenderTarget::unallocated(w, h, false),
                RenderTarget::unallocated(w, h, false),
            ),
        }
    }

    pub fn new(gl: &B, w: i32, h: i32) -> Result<Self, EngineError> {
        let mut pool = Self::unallocated(w, h);
        pool.resize(gl, w, h)?;
        Ok(pool)
    }

    /// Resize all four targets. On failure every target is released, so none can be bound stale.
    pub fn resize(&mut self, gl: &B, w: i32, h: i32) -> Result<(), EngineError> {
        let res = self.targets_mut().try_for_each(|rt| rt.resize(gl, w, h));
        if res.is_err() {
            self.destroy(gl);
        }
        res
    }

    pub fn destroy(&mut self, gl: &B) {
        for rt in self.targets_mut() {
            rt.destroy(gl);
        }
    }

    fn targets_mut(&mut self) -> impl Iterator<Item = &mut RenderTarget<B>> {
        [&mut self.multisampled, &mut self.intermediate]
            .into_iter()
            .chain(self.ping_pong.iter_mut())
    }

    /// Multisampled, intermediate, ping-pong 0, ping-pong 1.
    pub fn targets(&self) -> [&RenderTarget<B>; 4] {
        [
            &self.multisampled,
            &self.intermediate,
            self.ping_pong.get(Slot::Zero),
            self.ping_pong.get(Slot::One),
        ]
    }

    pub fn multisampled(&self) -> &RenderTarget<B> {
        &self.multisampled
    }

    pub fn intermediate(&self) -> &RenderTarget<B> {
        &self.intermediate
    }

    pub fn ping_pong(&self, slot: Slot) -> &RenderTarget<B> {
        self.ping_pong.get(slot)
    }
}

/// What `end_render` did this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameStats {
    /// Full-screen passes drawn (extract + blur passes + composite).
    pub passes: u32,
    pub composite: EffectKind,
    /// Ping-pong slot sampled as `bloomBlur`, if bloom ran.
    pub bloom_slot: Option<Slot>,
}

pub struct Compositor<B: RenderBackend> {
    /// Composite with the glitch program instead of the plain screen program.
    pub use_glitch: bool,
    /// Run the bright-pass + blur chain and add it in the composite.
    pub use_bloom: bool,
    exposure: f32,
    bloom_threshold: f32,
    blur_iterations: u32,
    width: i32,
    height: i32,
    pool: TargetPool<B>,
    programs: EffectPrograms<B>,
    quad: FullscreenQuad<B>,
}

impl<B: RenderBackend> std::fmt::Debug for Compositor<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("use_glitch", &self.use_glitch)
            .field("use_bloom", &self.use_bloom)
            .field("exposure", &self.exposure)
            .field("bloom_threshold", &self.bloom_threshold)
            .field("blur_iterations", &self.blur_iterations)
            .field("size", &(self.width, self.height))
            .field("pool", &self.pool)
            .finish()
    }
}

impl<B: RenderBackend> Compositor<B> {
    /// Compile the programs, build the quad and allocate the target pool.
    ///
    /// Anything already created is released again if a later step fails.
    pub fn new(
        gl: &B,
        width: i32,
        height: i32,
        cfg: &CompositorConfig,
        sources: &ProgramSources,
    ) -> Result<Self, EngineError> {
        let mut programs = EffectPrograms::compile(gl, sources)?;
        let mut quad = match FullscreenQuad::new(gl) {
            Ok(q) => q,
            Err(e) => {
                programs.destroy(gl);
                return Err(e);
            }
        };
        let pool = match TargetPool::new(gl, width, height) {
            Ok(p) => p,
            Err(e) => {
                quad.destroy(gl);
                programs.destroy(gl);
                return Err(e);
            }
        };

        tracing::debug!(width, height, "compositor ready");

        Ok(Self {
            use_glitch: cfg.use_glitch,
            use_bloom: cfg.use_bloom,
            exposure: cfg.exposure,
            bloom_threshold: cfg.bloom_threshold,
            blur_iterations: cfg.blur_iterations.max(1),
            width: width.max(1),
            height: height.max(1),
            pool,
            programs,
            quad,
        })
    }

    /// Like `new`, loading program sources from `cfg.shaders` when set.
    pub fn from_config(
        gl: &B,
        width: i32,
        height: i32,
        cfg: &CompositorConfig,
    ) -> Result<Self, EngineError> {
        let sources = match &cfg.shaders {
            Some(paths) => ProgramSources::from_paths(paths)?,
            None => ProgramSources::builtin(),
        };
        Self::new(gl, width, height, cfg, &sources)
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn pool(&self) -> &TargetPool<B> {
        &self.pool
    }

    /// Ping-pong target that holds the blurred bloom after a bloom frame.
    pub fn bloom_output(&self) -> &RenderTarget<B> {
        self.pool.ping_pong(final_blur_slot(self.blur_iterations))
    }

    pub fn program(&self, kind: EffectKind) -> Result<B::Program, EngineError> {
        self.programs.get(kind)
    }

    pub fn exposure(&self) -> f32 {
        self.exposure
    }

    pub fn set_exposure(&mut self, exposure: f32) {
        self.exposure = exposure;
    }

    pub fn bloom_threshold(&self) -> f32 {
        self.bloom_threshold
    }

    pub fn set_bloom_threshold(&mut self, threshold: f32) {
        self.bloom_threshold = threshold;
    }

    pub fn blur_iterations(&self) -> u32 {
        self.blur_iterations
    }

    pub fn set_blur_iterations(&mut self, iterations: u32) {
        self.blur_iterations = iterations.max(1);
    }

    /// Bind the multisampled target and clear it; scene draws follow.
    pub fn begin_render(&self, gl: &B) -> Result<(), EngineError> {
        self.pool.multisampled.bind(gl)?;
        gl.set_depth_test(true);
        gl.clear_color(SCENE_CLEAR);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        Ok(())
    }

    /// Resolve, optionally bloom, and composite to the display surface.
    pub fn end_render(&self, gl: &B, time: f32) -> Result<FrameStats, EngineError> {
        let use_bloom = self.use_bloom;
        let use_glitch = self.use_glitch;

        // Only the resolve collapses multisample data; the intermediate is sampleable after it.
        self.pool
            .multisampled
            .blit_to(gl, &self.pool.intermediate)?;
        let scene_tex = self
            .pool
            .intermediate
            .color_texture()
            .ok_or(EngineError::TargetNotAllocated("intermediate"))?;

        // Full-screen passes from here on; the ping-pong depth buffers are never cleared.
        gl.set_depth_test(false);

        let mut passes = 0;
        let bloom_slot = if use_bloom {
            let (slot, n) = self.run_bloom(gl, scene_tex)?;
            passes += n;
            Some(slot)
        } else {
            None
        };
        let bloom_tex = match bloom_slot {
            Some(slot) => Some(
                self.pool
                    .ping_pong(slot)
                    .color_texture()
                    .ok_or(EngineError::TargetNotAllocated("ping-pong"))?,
            ),
            None => None,
        };

        // Composite.
        gl.bind_framebuffer(None);
        gl.viewport(0, 0, self.width, self.height);
        gl.set_depth_test(false);
        gl.clear_color(DISPLAY_CLEAR);
        gl.clear(glow::COLOR_BUFFER_BIT);

        let composite = if use_glitch {
            EffectKind::Glitch
        } else {
            EffectKind::Screen
        };
        let prog = self.programs.get(composite)?;
        gl.use_program(Some(prog));
        gl.uniform_i32(prog, uniforms::SCREEN_TEXTURE, SCREEN_UNIT as i32);
        gl.uniform_i32(prog, uniforms::BLOOM_BLUR, BLOOM_UNIT as i32);
        gl.uniform_i32(prog, uniforms::BLOOM, use_bloom as i32);
        gl.uniform_f32(prog, uniforms::EXPOSURE, self.exposure);
        if use_glitch {
            gl.uniform_f32(prog, uniforms::TIME, time);
        }

        gl.bind_texture_unit(SCREEN_UNIT, Some(scene_tex));
        gl.bind_texture_unit(BLOOM_UNIT, bloom_tex);

        self.quad.draw(gl)?;
        passes += 1;

        Ok(FrameStats {
            passes,
            composite,
            bloom_slot,
        })
    }

    /// Bright-pass into slot 0, then `blur_iterations` separable passes.
    /// Returns the slot holding the result and the number of passes drawn.
    fn run_bloom(&self, gl: &B, scene_tex: B::Texture) -> Result<(Slot, u32), EngineError> {
        let mut cursor = BlurCursor::start();
        let mut passes = 0;

        let extract = self.programs.get(EffectKind::Extract)?;
        self.pool.ping_pong(cursor.current()).bind(gl)?;
        gl.clear(glow::COLOR_BUFFER_BIT);
        gl.use_program(Some(extract));
        gl.uniform_i32(extract, uniforms::SCENE, 0);
        gl.uniform_f32(extract, uniforms::THRESHOLD, self.bloom_threshold);
        gl.bind_texture_unit(0, Some(scene_tex));
        self.quad.draw(gl)?;
        passes += 1;

        let blur = self.programs.get(EffectKind::Blur)?;
        gl.use_program(Some(blur));
        gl.uniform_i32(blur, uniforms::IMAGE, 0);
        for _ in 0..self.blur_iterations {
            let src = self
                .pool
                .ping_pong(cursor.current())
                .color_texture()
                .ok_or(EngineError::TargetNotAllocated("ping-pong"))?;
            self.pool.ping_pong(cursor.other()).bind(gl)?;
            gl.uniform_i32(blur, uniforms::HORIZONTAL, cursor.horizontal() as i32);
            gl.bind_texture_unit(0, Some(src));
            self.quad.draw(gl)?;
            passes += 1;
            cursor.advance();
        }

        Ok((cursor.current(), passes))
    }

    /// Reallocate the whole pool at the display's new size. Call between frames only.
    pub fn update_size(&mut self, gl: &B, width: i32, height: i32) -> Result<(), EngineError> {
        self.width = width.max(1);
        self.height = height.max(1);
        tracing::debug!(width = self.width, height = self.height, "compositor resize");
        self.pool.resize(gl, self.width, self.height)
    }

    /// Release programs, quad and targets. Safe to call more than once.
    pub fn destroy(&mut self, gl: &B) {
        self.pool.destroy(gl);
        self.quad.destroy(gl);
        self.programs.destroy(gl);
    }
}
