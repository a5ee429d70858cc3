use crate::backend::{RenderBackend, Samples};
use crate::EngineError;

/// Sample count used for every multisampled target.
pub const MSAA_SAMPLES: i32 = 4;

/// The three GL objects behind one render target. Created and released as a unit.
pub struct TargetHandles<B: RenderBackend> {
    pub fbo: B::Framebuffer,
    pub color: B::Texture,
    pub depth_stencil: B::Renderbuffer,
}

impl<B: RenderBackend> std::fmt::Debug for TargetHandles<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetHandles")
            .field("fbo", &self.fbo)
            .field("color", &self.color)
            .field("depth_stencil", &self.depth_stencil)
            .finish()
    }
}

impl<B: RenderBackend> TargetHandles<B> {
    fn allocate(gl: &B, w: i32, h: i32, samples: Samples) -> Result<Self, EngineError> {
        let fbo = gl.create_framebuffer()?;
        let color = match gl.create_texture() {
            Ok(t) => t,
            Err(e) => {
                gl.delete_framebuffer(fbo);
                return Err(e);
            }
        };
        let depth_stencil = match gl.create_renderbuffer() {
            Ok(rb) => rb,
            Err(e) => {
                gl.delete_texture(color);
                gl.delete_framebuffer(fbo);
                return Err(e);
            }
        };
        let handles = Self {
            fbo,
            color,
            depth_stencil,
        };

        gl.allocate_color(color, samples, w, h);
        gl.allocate_depth_stencil(depth_stencil, samples, w, h);
        gl.attach(fbo, color, depth_stencil, samples);

        let status = gl.check_framebuffer_status();
        gl.bind_framebuffer(None);

        if status != glow::FRAMEBUFFER_COMPLETE {
            tracing::error!(
                status = format_args!("0x{status:x}"),
                width = w,
                height = h,
                multisampled = samples.is_multisampled(),
                "framebuffer is not complete"
            );
            handles.release(gl);
            return Err(EngineError::FramebufferIncomplete {
                status,
                width: w,
                height: h,
                multisampled: samples.is_multisampled(),
            });
        }

        Ok(handles)
    }

    fn release(self, gl: &B) {
        gl.delete_framebuffer(self.fbo);
        gl.delete_texture(self.color);
        gl.delete_renderbuffer(self.depth_stencil);
    }
}

/// Offscreen render target: one color attachment plus a combined depth/stencil attachment.
///
/// Resizing never reallocates storage in place; all three objects are released and
/// recreated, so any handle read before `resize` is stale afterwards.
///
/// GL objects are not released on `Drop` (no context is reachable there); call `destroy`.
pub struct RenderTarget<B: RenderBackend> {
    width: i32,
    height: i32,
    multisampled: bool,
    handles: Option<TargetHandles<B>>,
}

impl<B: RenderBackend> std::fmt::Debug for RenderTarget<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderTarget")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("multisampled", &self.multisampled)
            .field("handles", &self.handles)
            .finish()
    }
}

impl<B: RenderBackend> RenderTarget<B> {
    /// A target with no GPU objects. `destroy` on it is a no-op; `bind`/blits fail.
    pub fn unallocated(width: i32, height: i32, multisampled: bool) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            multisampled,
            handles: None,
        }
    }

    pub fn create(gl: &B, width: i32, height: i32, multisampled: bool) -> Result<Self, EngineError> {
        let mut rt = Self::unallocated(width, height, multisampled);
        rt.handles = Some(TargetHandles::allocate(
            gl,
            rt.width,
            rt.height,
            rt.samples(),
        )?);
        Ok(rt)
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn size(&self) -> (i32, i32) {
        (self.width, self.height)
    }

    pub fn is_multisampled(&self) -> bool {
        self.multisampled
    }

    pub fn samples(&self) -> Samples {
        if self.multisampled {
            Samples::Multi(MSAA_SAMPLES)
        } else {
            Samples::Single
        }
    }

    pub fn is_allocated(&self) -> bool {
        self.handles.is_some()
    }

    pub fn handles(&self) -> Option<&TargetHandles<B>> {
        self.handles.as_ref()
    }

    /// Color attachment, for sampling in a later pass. Do not hold across `resize`.
    pub fn color_texture(&self) -> Option<B::Texture> {
        self.handles.as_ref().map(|h| h.color)
    }

    pub fn framebuffer(&self) -> Option<B::Framebuffer> {
        self.handles.as_ref().map(|h| h.fbo)
    }

    fn require_fbo(&self) -> Result<B::Framebuffer, EngineError> {
        self.framebuffer()
            .ok_or(EngineError::TargetNotAllocated("render target has no framebuffer"))
    }

    /// Make this target the draw destination and set the viewport to its size.
    pub fn bind(&self, gl: &B) -> Result<(), EngineError> {
        let fbo = self.require_fbo()?;
        gl.bind_framebuffer(Some(fbo));
        gl.viewport(0, 0, self.width, self.height);
        Ok(())
    }

    /// Rebind the display surface. The viewport is left as is.
    pub fn unbind(&self, gl: &B) {
        gl.bind_framebuffer(None);
    }

    /// Color-only nearest blit of the full extent into `other`'s full extent.
    ///
    /// A multisampled source must match `other`'s size (GL rejects scaled resolves).
    pub fn blit_to(&self, gl: &B, other: &RenderTarget<B>) -> Result<(), EngineError> {
        let read = self.require_fbo()?;
        let draw = other.require_fbo()?;
        gl.blit_framebuffer(
            Some(read),
            Some(draw),
            self.size(),
            other.size(),
            glow::COLOR_BUFFER_BIT,
            glow::NEAREST,
        );
        gl.bind_framebuffer(None);
        Ok(())
    }

    /// Color-only nearest blit to the display surface at 1:1.
    pub fn blit_to_display(&self, gl: &B) -> Result<(), EngineError> {
        let read = self.require_fbo()?;
        gl.blit_framebuffer(
            Some(read),
            None,
            self.size(),
            self.size(),
            glow::COLOR_BUFFER_BIT,
            glow::NEAREST,
        );
        gl.bind_framebuffer(None);
        Ok(())
    }

    /// Release the current objects and allocate fresh ones at the new size.
    ///
    /// On error the target is left unallocated, never half-built.
    pub fn resize(&mut self, gl: &B, width: i32, height: i32) -> Result<(), EngineError> {
        self.destroy(gl);
        self.width = width.max(1);
        self.height = height.max(1);
        self.handles = Some(TargetHandles::allocate(
            gl,
            self.width,
            self.height,
            self.samples(),
        )?);
        Ok(())
    }

    /// Release all three GL objects. Safe to call repeatedly.
    pub fn destroy(&mut self, gl: &B) {
        if let Some(h) = self.handles.take() {
            h.release(gl);
        }
    }
}

impl<B: RenderBackend> Drop for RenderTarget<B> {
    fn drop(&mut self) {
        if let Some(h) = &self.handles {
            tracing::warn!(
                fbo = ?h.fbo,
                width = self.width,
                height = self.height,
                "render target dropped without destroy(); GL objects leaked"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingBackend;

    #[test]
    fn create_allocates_matching_attachments() {
        let gl = RecordingBackend::new();
        let mut rt = RenderTarget::create(&gl, 640, 360, true).expect("complete target");

        let h = rt.handles().unwrap();
        let color = gl.storage(h.color).expect("color storage");
        let depth = gl.storage(h.depth_stencil).expect("depth storage");
        assert_eq!((color.width, color.height), (640, 360));
        assert_eq!((depth.width, depth.height), (640, 360));
        assert_eq!(color.samples, Samples::Multi(MSAA_SAMPLES));
        assert_eq!(depth.samples, Samples::Multi(MSAA_SAMPLES));
        assert_eq!(gl.bound_framebuffer(), None, "create must leave the display bound");

        rt.destroy(&gl);
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn destroy_twice_and_on_unallocated_is_a_no_op() {
        let gl = RecordingBackend::new();

        let mut never = RenderTarget::<RecordingBackend>::unallocated(8, 8, false);
        never.destroy(&gl);
        never.destroy(&gl);

        let mut rt = RenderTarget::create(&gl, 8, 8, false).unwrap();
        rt.destroy(&gl);
        rt.destroy(&gl);

        assert!(!rt.is_allocated());
        assert_eq!(gl.live_objects(), 0);
        assert!(gl.diagnostics().is_empty(), "{:?}", gl.diagnostics());
    }

    #[test]
    fn resize_replaces_all_three_objects() {
        let gl = RecordingBackend::new();
        let mut rt = RenderTarget::create(&gl, 100, 50, false).unwrap();
        let old = (rt.framebuffer().unwrap(), rt.color_texture().unwrap());

        rt.resize(&gl, 300, 200).unwrap();

        assert_eq!(rt.size(), (300, 200));
        assert!(!gl.is_live(old.0));
        assert!(!gl.is_live(old.1));
        let tex = rt.color_texture().unwrap();
        assert_ne!(tex, old.1);
        let s = gl.storage(tex).unwrap();
        assert_eq!((s.width, s.height), (300, 200));
        assert_eq!(gl.live_objects(), 3);
        rt.destroy(&gl);
    }

    #[test]
    fn incomplete_framebuffer_is_an_error_and_releases_objects() {
        let gl = RecordingBackend::new();
        gl.fail_next_framebuffer(glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);

        let err = RenderTarget::create(&gl, 32, 32, false).expect_err("must fail");
        assert!(matches!(
            err,
            EngineError::FramebufferIncomplete {
                status: glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT,
                ..
            }
        ));
        assert_eq!(gl.live_objects(), 0);
    }

    #[test]
    fn failed_resize_leaves_target_unallocated() {
        let gl = RecordingBackend::new();
        let mut rt = RenderTarget::create(&gl, 16, 16, false).unwrap();

        gl.fail_next_framebuffer(glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT);
        assert!(rt.resize(&gl, 64, 64).is_err());

        assert!(!rt.is_allocated());
        assert_eq!(gl.live_objects(), 0);
        assert!(matches!(
            rt.bind(&gl),
            Err(EngineError::TargetNotAllocated(_))
        ));
    }

    #[test]
    fn bind_sets_viewport_to_target_size() {
        let gl = RecordingBackend::new();
        let mut rt = RenderTarget::create(&gl, 320, 240, false).unwrap();
        rt.bind(&gl).unwrap();

        assert_eq!(gl.bound_framebuffer(), rt.framebuffer());
        assert_eq!(gl.viewport_rect(), (0, 0, 320, 240));

        rt.unbind(&gl);
        assert_eq!(gl.bound_framebuffer(), None);
        rt.destroy(&gl);
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let gl = RecordingBackend::new();
        let mut rt = RenderTarget::create(&gl, 0, -5, false).unwrap();
        assert_eq!(rt.size(), (1, 1));
        rt.destroy(&gl);
    }

    #[test]
    fn blit_to_copies_color_and_keeps_destination_depth() {
        let gl = RecordingBackend::new();
        let mut src = RenderTarget::create(&gl, 64, 64, true).unwrap();
        let mut dst = RenderTarget::create(&gl, 64, 64, false).unwrap();

        src.bind(&gl).unwrap();
        gl.clear_color([0.25, 0.5, 0.75, 1.0]);
        gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        gl.write_depth(src.framebuffer(), 0.1);
        gl.write_depth(dst.framebuffer(), 0.6);

        src.blit_to(&gl, &dst).unwrap();

        let s = gl.surface(dst.framebuffer()).unwrap();
        assert_eq!(s.color, [0.25, 0.5, 0.75, 1.0]);
        assert_eq!(s.depth, 0.6);
        assert_eq!(gl.bound_framebuffer(), None);

        src.destroy(&gl);
        dst.destroy(&gl);
    }

    #[test]
    fn blit_to_display_is_color_only_and_unscaled() {
        let gl = RecordingBackend::new();
        let mut src = RenderTarget::create(&gl, 200, 100, false).unwrap();
        src.bind(&gl).unwrap();
        gl.clear_color([1.0, 0.0, 0.0, 1.0]);
        gl.clear(glow::COLOR_BUFFER_BIT);
        gl.write_depth(None, 0.3);

        src.blit_to_display(&gl).unwrap();

        let display = gl.surface(None).unwrap();
        assert_eq!(display.color, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(display.depth, 0.3);
        let blit = gl.last_blit().expect("one blit");
        assert_eq!(blit.src, (200, 100));
        assert_eq!(blit.dst, (200, 100));
        assert_eq!(blit.mask, glow::COLOR_BUFFER_BIT);
        assert_eq!(blit.filter, glow::NEAREST);

        src.destroy(&gl);
    }

    #[test]
    fn unallocated_blit_is_rejected() {
        let gl = RecordingBackend::new();
        let src = RenderTarget::<RecordingBackend>::unallocated(4, 4, false);
        assert!(src.blit_to_display(&gl).is_err());
        assert!(gl.last_blit().is_none());
    }
}
