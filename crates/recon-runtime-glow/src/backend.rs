//! The GPU seam.
//
// `RenderBackend` is the narrow slice of `glow::HasContext` that the compositor, render targets
// and scene helpers actually use. `glow::Context` implements it directly; the `recording` module
// implements it headlessly for tests.
//
// Every method must be called on the thread that owns the current GL context (see crate docs).

use std::fmt::Debug;

use glow::HasContext;

use crate::EngineError;

/// Sample mode of a color or depth/stencil allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Samples {
    Single,
    Multi(i32),
}

impl Samples {
    pub fn is_multisampled(self) -> bool {
        matches!(self, Samples::Multi(_))
    }
}

/// One float vertex attribute inside an interleaved buffer (all units are floats, not bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttrib {
    pub location: u32,
    pub components: i32,
    pub stride: i32,
    pub offset: i32,
}

pub trait RenderBackend {
    type Framebuffer: Copy + Debug + PartialEq;
    type Texture: Copy + Debug + PartialEq;
    type Renderbuffer: Copy + Debug + PartialEq;
    type Program: Copy + Debug + PartialEq;
    type VertexArray: Copy + Debug + PartialEq;
    type Buffer: Copy + Debug + PartialEq;

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, EngineError>;
    fn create_texture(&self) -> Result<Self::Texture, EngineError>;
    fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, EngineError>;
    fn create_vertex_array(&self) -> Result<Self::VertexArray, EngineError>;
    fn create_buffer(&self) -> Result<Self::Buffer, EngineError>;

    fn delete_framebuffer(&self, fbo: Self::Framebuffer);
    fn delete_texture(&self, tex: Self::Texture);
    fn delete_renderbuffer(&self, rb: Self::Renderbuffer);
    fn delete_vertex_array(&self, vao: Self::VertexArray);
    fn delete_buffer(&self, buf: Self::Buffer);
    fn delete_program(&self, program: Self::Program);

    /// RGB8 color storage, no mipmaps. Single-sample textures get linear filtering and
    /// clamp-to-edge wrapping so they can be sampled by later passes.
    fn allocate_color(&self, tex: Self::Texture, samples: Samples, width: i32, height: i32);

    /// Combined DEPTH24_STENCIL8 renderbuffer storage.
    fn allocate_depth_stencil(
        &self,
        rb: Self::Renderbuffer,
        samples: Samples,
        width: i32,
        height: i32,
    );

    /// Binds `fbo` to `FRAMEBUFFER` and attaches the color texture and depth/stencil buffer.
    /// The framebuffer stays bound afterwards.
    fn attach(
        &self,
        fbo: Self::Framebuffer,
        color: Self::Texture,
        depth_stencil: Self::Renderbuffer,
        samples: Samples,
    );

    /// Status of the framebuffer currently bound to `FRAMEBUFFER`.
    fn check_framebuffer_status(&self) -> u32;

    /// `None` is the display surface (framebuffer 0).
    fn bind_framebuffer(&self, fbo: Option<Self::Framebuffer>);
    fn viewport(&self, x: i32, y: i32, width: i32, height: i32);

    /// Copies `(0,0)-src` of `read` into `(0,0)-dst` of `draw`. Leaves read/draw bindings set.
    fn blit_framebuffer(
        &self,
        read: Option<Self::Framebuffer>,
        draw: Option<Self::Framebuffer>,
        src: (i32, i32),
        dst: (i32, i32),
        mask: u32,
        filter: u32,
    );

    fn set_depth_test(&self, enabled: bool);
    fn clear_color(&self, rgba: [f32; 4]);
    fn clear(&self, mask: u32);

    fn compile_program(&self, vert_src: &str, frag_src: &str)
        -> Result<Self::Program, EngineError>;
    fn use_program(&self, program: Option<Self::Program>);

    // Uniform setters return `false` when the program does not declare `name`.
    fn uniform_i32(&self, program: Self::Program, name: &str, value: i32) -> bool;
    fn uniform_f32(&self, program: Self::Program, name: &str, value: f32) -> bool;
    fn uniform_vec3(&self, program: Self::Program, name: &str, value: [f32; 3]) -> bool;
    fn uniform_mat4(&self, program: Self::Program, name: &str, value: &[f32; 16]) -> bool;

    /// `active_texture(TEXTURE0 + unit)` + `bind_texture(TEXTURE_2D, tex)`.
    fn bind_texture_unit(&self, unit: u32, tex: Option<Self::Texture>);

    fn upload_vertices(
        &self,
        vao: Self::VertexArray,
        vbo: Self::Buffer,
        data: &[f32],
        attribs: &[VertexAttrib],
    );
    fn draw_triangles(&self, vao: Self::VertexArray, first: i32, count: i32);
}

// -------------------------------------------------------------------------------------------------
// glow / OpenGL
// -------------------------------------------------------------------------------------------------

impl RenderBackend for glow::Context {
    type Framebuffer = glow::NativeFramebuffer;
    type Texture = glow::NativeTexture;
    type Renderbuffer = glow::NativeRenderbuffer;
    type Program = glow::NativeProgram;
    type VertexArray = glow::NativeVertexArray;
    type Buffer = glow::NativeBuffer;

    fn create_framebuffer(&self) -> Result<Self::Framebuffer, EngineError> {
        unsafe { HasContext::create_framebuffer(self) }
            .map_err(|e| EngineError::GlCreate(format!("create_framebuffer failed: {e:?}")))
    }

    fn create_texture(&self) -> Result<Self::Texture, EngineError> {
        unsafe { HasContext::create_texture(self) }
            .map_err(|e| EngineError::GlCreate(format!("create_texture failed: {e:?}")))
    }

    fn create_renderbuffer(&self) -> Result<Self::Renderbuffer, EngineError> {
        unsafe { HasContext::create_renderbuffer(self) }
            .map_err(|e| EngineError::GlCreate(format!("create_renderbuffer failed: {e:?}")))
    }

    fn create_vertex_array(&self) -> Result<Self::VertexArray, EngineError> {
        unsafe { HasContext::create_vertex_array(self) }
            .map_err(|e| EngineError::GlCreate(format!("create_vertex_array: {e}")))
    }

    fn create_buffer(&self) -> Result<Self::Buffer, EngineError> {
        unsafe { HasContext::create_buffer(self) }
            .map_err(|e| EngineError::GlCreate(format!("create_buffer: {e}")))
    }

    fn delete_framebuffer(&self, fbo: Self::Framebuffer) {
        unsafe { HasContext::delete_framebuffer(self, fbo) }
    }

    fn delete_texture(&self, tex: Self::Texture) {
        unsafe { HasContext::delete_texture(self, tex) }
    }

    fn delete_renderbuffer(&self, rb: Self::Renderbuffer) {
        unsafe { HasContext::delete_renderbuffer(self, rb) }
    }

    fn delete_vertex_array(&self, vao: Self::VertexArray) {
        unsafe { HasContext::delete_vertex_array(self, vao) }
    }

    fn delete_buffer(&self, buf: Self::Buffer) {
        unsafe { HasContext::delete_buffer(self, buf) }
    }

    fn delete_program(&self, program: Self::Program) {
        unsafe { HasContext::delete_program(self, program) }
    }

    fn allocate_color(&self, tex: Self::Texture, samples: Samples, width: i32, height: i32) {
        unsafe {
            match samples {
                Samples::Multi(n) => {
                    self.bind_texture(glow::TEXTURE_2D_MULTISAMPLE, Some(tex));
                    self.tex_image_2d_multisample(
                        glow::TEXTURE_2D_MULTISAMPLE,
                        n,
                        glow::RGB8 as i32,
                        width,
                        height,
                        true,
                    );
                    self.bind_texture(glow::TEXTURE_2D_MULTISAMPLE, None);
                }
                Samples::Single => {
                    self.bind_texture(glow::TEXTURE_2D, Some(tex));
                    self.tex_image_2d(
                        glow::TEXTURE_2D,
                        0,
                        glow::RGB8 as i32,
                        width,
                        height,
                        0,
                        glow::RGB,
                        glow::UNSIGNED_BYTE,
                        None,
                    );
                    self.tex_parameter_i32(
                        glow::TEXTURE_2D,
                        glow::TEXTURE_MIN_FILTER,
                        glow::LINEAR as i32,
                    );
                    self.tex_parameter_i32(
                        glow::TEXTURE_2D,
                        glow::TEXTURE_MAG_FILTER,
                        glow::LINEAR as i32,
                    );
                    self.tex_parameter_i32(
                        glow::TEXTURE_2D,
                        glow::TEXTURE_WRAP_S,
                        glow::CLAMP_TO_EDGE as i32,
                    );
                    self.tex_parameter_i32(
                        glow::TEXTURE_2D,
                        glow::TEXTURE_WRAP_T,
                        glow::CLAMP_TO_EDGE as i32,
                    );
                    self.bind_texture(glow::TEXTURE_2D, None);
                }
            }
        }
    }

    fn allocate_depth_stencil(
        &self,
        rb: Self::Renderbuffer,
        samples: Samples,
        width: i32,
        height: i32,
    ) {
        unsafe {
            self.bind_renderbuffer(glow::RENDERBUFFER, Some(rb));
            match samples {
                Samples::Multi(n) => self.renderbuffer_storage_multisample(
                    glow::RENDERBUFFER,
                    n,
                    glow::DEPTH24_STENCIL8,
                    width,
                    height,
                ),
                Samples::Single => self.renderbuffer_storage(
                    glow::RENDERBUFFER,
                    glow::DEPTH24_STENCIL8,
                    width,
                    height,
                ),
            }
            self.bind_renderbuffer(glow::RENDERBUFFER, None);
        }
    }

    fn attach(
        &self,
        fbo: Self::Framebuffer,
        color: Self::Texture,
        depth_stencil: Self::Renderbuffer,
        samples: Samples,
    ) {
        let tex_target = if samples.is_multisampled() {
            glow::TEXTURE_2D_MULTISAMPLE
        } else {
            glow::TEXTURE_2D
        };
        unsafe {
            HasContext::bind_framebuffer(self, glow::FRAMEBUFFER, Some(fbo));
            self.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                tex_target,
                Some(color),
                0,
            );
            self.framebuffer_renderbuffer(
                glow::FRAMEBUFFER,
                glow::DEPTH_STENCIL_ATTACHMENT,
                glow::RENDERBUFFER,
                Some(depth_stencil),
            );
        }
    }

    fn check_framebuffer_status(&self) -> u32 {
        unsafe { HasContext::check_framebuffer_status(self, glow::FRAMEBUFFER) }
    }

    fn bind_framebuffer(&self, fbo: Option<Self::Framebuffer>) {
        unsafe { HasContext::bind_framebuffer(self, glow::FRAMEBUFFER, fbo) }
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        unsafe { HasContext::viewport(self, x, y, width, height) }
    }

    fn blit_framebuffer(
        &self,
        read: Option<Self::Framebuffer>,
        draw: Option<Self::Framebuffer>,
        src: (i32, i32),
        dst: (i32, i32),
        mask: u32,
        filter: u32,
    ) {
        unsafe {
            HasContext::bind_framebuffer(self, glow::READ_FRAMEBUFFER, read);
            HasContext::bind_framebuffer(self, glow::DRAW_FRAMEBUFFER, draw);
            HasContext::blit_framebuffer(
                self, 0, 0, src.0, src.1, 0, 0, dst.0, dst.1, mask, filter,
            );
        }
    }

    fn set_depth_test(&self, enabled: bool) {
        unsafe {
            if enabled {
                self.enable(glow::DEPTH_TEST);
            } else {
                self.disable(glow::DEPTH_TEST);
            }
        }
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        unsafe { HasContext::clear_color(self, rgba[0], rgba[1], rgba[2], rgba[3]) }
    }

    fn clear(&self, mask: u32) {
        unsafe { HasContext::clear(self, mask) }
    }

    fn compile_program(
        &self,
        vert_src: &str,
        frag_src: &str,
    ) -> Result<Self::Program, EngineError> {
        unsafe {
            let vs = self
                .create_shader(glow::VERTEX_SHADER)
                .map_err(|e| EngineError::GlCreate(format!("create_shader(VS) failed: {e:?}")))?;
            self.shader_source(vs, vert_src);
            self.compile_shader(vs);
            if !self.get_shader_compile_status(vs) {
                let log = self.get_shader_info_log(vs);
                self.delete_shader(vs);
                return Err(EngineError::VertexCompile(log));
            }

            let fs = self
                .create_shader(glow::FRAGMENT_SHADER)
                .map_err(|e| EngineError::GlCreate(format!("create_shader(FS) failed: {e:?}")))?;
            self.shader_source(fs, frag_src);
            self.compile_shader(fs);
            if !self.get_shader_compile_status(fs) {
                let log = self.get_shader_info_log(fs);
                self.delete_shader(vs);
                self.delete_shader(fs);
                return Err(EngineError::FragmentCompile(log));
            }

            let program = self
                .create_program()
                .map_err(|e| EngineError::GlCreate(format!("create_program failed: {e:?}")))?;
            self.attach_shader(program, vs);
            self.attach_shader(program, fs);
            self.link_program(program);

            self.detach_shader(program, vs);
            self.detach_shader(program, fs);
            self.delete_shader(vs);
            self.delete_shader(fs);

            if !self.get_program_link_status(program) {
                let log = self.get_program_info_log(program);
                HasContext::delete_program(self, program);
                return Err(EngineError::Link(log));
            }

            Ok(program)
        }
    }

    fn use_program(&self, program: Option<Self::Program>) {
        unsafe { HasContext::use_program(self, program) }
    }

    fn uniform_i32(&self, program: Self::Program, name: &str, value: i32) -> bool {
        unsafe {
            match self.get_uniform_location(program, name) {
                Some(loc) => {
                    self.uniform_1_i32(Some(&loc), value);
                    true
                }
                None => false,
            }
        }
    }

    fn uniform_f32(&self, program: Self::Program, name: &str, value: f32) -> bool {
        unsafe {
            match self.get_uniform_location(program, name) {
                Some(loc) => {
                    self.uniform_1_f32(Some(&loc), value);
                    true
                }
                None => false,
            }
        }
    }

    fn uniform_vec3(&self, program: Self::Program, name: &str, value: [f32; 3]) -> bool {
        unsafe {
            match self.get_uniform_location(program, name) {
                Some(loc) => {
                    self.uniform_3_f32(Some(&loc), value[0], value[1], value[2]);
                    true
                }
                None => false,
            }
        }
    }

    fn uniform_mat4(&self, program: Self::Program, name: &str, value: &[f32; 16]) -> bool {
        unsafe {
            match self.get_uniform_location(program, name) {
                Some(loc) => {
                    self.uniform_matrix_4_f32_slice(Some(&loc), false, value);
                    true
                }
                None => false,
            }
        }
    }

    fn bind_texture_unit(&self, unit: u32, tex: Option<Self::Texture>) {
        unsafe {
            self.active_texture(glow::TEXTURE0 + unit);
            self.bind_texture(glow::TEXTURE_2D, tex);
        }
    }

    fn upload_vertices(
        &self,
        vao: Self::VertexArray,
        vbo: Self::Buffer,
        data: &[f32],
        attribs: &[VertexAttrib],
    ) {
        const F32: i32 = core::mem::size_of::<f32>() as i32;
        unsafe {
            self.bind_vertex_array(Some(vao));
            self.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            self.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(data),
                glow::STATIC_DRAW,
            );
            for a in attribs {
                self.enable_vertex_attrib_array(a.location);
                self.vertex_attrib_pointer_f32(
                    a.location,
                    a.components,
                    glow::FLOAT,
                    false,
                    a.stride * F32,
                    a.offset * F32,
                );
            }
            self.bind_buffer(glow::ARRAY_BUFFER, None);
            self.bind_vertex_array(None);
        }
    }

    fn draw_triangles(&self, vao: Self::VertexArray, first: i32, count: i32) {
        unsafe {
            self.bind_vertex_array(Some(vao));
            self.draw_arrays(glow::TRIANGLES, first, count);
            self.bind_vertex_array(None);
        }
    }
}
