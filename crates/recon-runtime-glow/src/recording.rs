//! Headless [`RenderBackend`] that records every call and models just enough GL state
//! to check render-target and compositor behavior without a context.
//
// Modelled state: object lifetimes, storage, attachments, the FRAMEBUFFER binding, viewport,
// clear color, depth test, current program, texture units and declared uniforms. Each surface
// (one per framebuffer, plus the display) carries one flat color and one depth value so clears
// and blits can be observed.
//
// Misuse does not panic; it is pushed to `diagnostics()` so tests can assert it stays empty.

use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::backend::{RenderBackend, Samples, VertexAttrib};
use crate::EngineError;

/// One backend call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum GlCall {
    Create { kind: ObjectKind, id: u32 },
    Delete { kind: ObjectKind, id: u32 },
    AllocateColor { tex: u32, samples: Samples, width: i32, height: i32 },
    AllocateDepthStencil { rb: u32, samples: Samples, width: i32, height: i32 },
    Attach { fbo: u32, color: u32, depth_stencil: u32 },
    CheckStatus(u32),
    BindFramebuffer(Option<u32>),
    Viewport(i32, i32, i32, i32),
    Blit(BlitRecord),
    DepthTest(bool),
    ClearColor([f32; 4]),
    Clear(u32),
    UseProgram(Option<u32>),
    UniformI32 { program: u32, name: String, value: i32 },
    UniformF32 { program: u32, name: String, value: f32 },
    UniformVec3 { program: u32, name: String, value: [f32; 3] },
    UniformMat4 { program: u32, name: String },
    BindTexture { unit: u32, tex: Option<u32> },
    UploadVertices { vao: u32, floats: usize },
    DrawTriangles { vao: u32, first: i32, count: i32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectKind {
    Framebuffer,
    Texture,
    Renderbuffer,
    Program,
    VertexArray,
    Buffer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Storage {
    pub samples: Samples,
    pub width: i32,
    pub height: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRecord {
    pub read: Option<u32>,
    pub draw: Option<u32>,
    pub src: (i32, i32),
    pub dst: (i32, i32),
    pub mask: u32,
    pub filter: u32,
}

/// Observable contents of one framebuffer (or the display when keyed by `None`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Surface {
    pub color: [f32; 4],
    pub depth: f32,
    pub draws: u32,
}

impl Default for Surface {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 0.0],
            depth: 1.0,
            draws: 0,
        }
    }
}

/// State captured at each `draw_triangles`.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub target: Option<u32>,
    pub program: Option<u32>,
    pub viewport: (i32, i32, i32, i32),
    pub depth_test: bool,
    /// Textures bound at units 0 and 1.
    pub units: [Option<u32>; 2],
    pub count: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    I32(i32),
    F32(f32),
    Vec3([f32; 3]),
    Mat4([f32; 16]),
}

#[derive(Debug, Default)]
struct State {
    next_id: u32,
    calls: Vec<GlCall>,
    diagnostics: Vec<String>,

    live: BTreeMap<u32, ObjectKind>,
    storage: BTreeMap<u32, Storage>,
    attachments: BTreeMap<u32, (u32, u32)>,
    /// program -> uniform name -> GLSL type
    declared: BTreeMap<u32, BTreeMap<String, String>>,
    uniforms: BTreeMap<(u32, String), UniformValue>,

    bound: Option<u32>,
    viewport: (i32, i32, i32, i32),
    clear_color: [f32; 4],
    depth_test: bool,
    program: Option<u32>,
    units: BTreeMap<u32, u32>,

    surfaces: BTreeMap<Option<u32>, Surface>,
    last_blit: Option<BlitRecord>,
    draws: Vec<DrawRecord>,

    forced_status: Option<u32>,
    compile_failures: Vec<(String, String)>,
}

impl State {
    fn create(&mut self, kind: ObjectKind) -> u32 {
        self.next_id += 1;
        let id = self.next_id;
        self.live.insert(id, kind);
        self.calls.push(GlCall::Create { kind, id });
        id
    }

    fn delete(&mut self, kind: ObjectKind, id: u32) {
        self.calls.push(GlCall::Delete { kind, id });
        match self.live.get(&id) {
            Some(k) if *k == kind => {
                self.live.remove(&id);
                self.storage.remove(&id);
                self.attachments.remove(&id);
                self.declared.remove(&id);
                self.uniforms.retain(|(p, _), _| *p != id);
                if kind == ObjectKind::Framebuffer {
                    self.surfaces.remove(&Some(id));
                    if self.bound == Some(id) {
                        self.bound = None;
                    }
                }
                if kind == ObjectKind::Program && self.program == Some(id) {
                    self.program = None;
                }
                if kind == ObjectKind::Texture {
                    self.units.retain(|_, t| *t != id);
                }
            }
            Some(k) => self
                .diagnostics
                .push(format!("delete {kind:?} {id}: object is a {k:?}")),
            None => self
                .diagnostics
                .push(format!("delete {kind:?} {id}: not live (double delete?)")),
        }
    }

    fn expect_live(&mut self, what: &str, kind: ObjectKind, id: u32) -> bool {
        match self.live.get(&id) {
            Some(k) if *k == kind => true,
            _ => {
                self.diagnostics
                    .push(format!("{what}: {kind:?} {id} is not a live object"));
                false
            }
        }
    }

    fn status_of(&self, fbo: u32) -> u32 {
        let Some(&(color, depth)) = self.attachments.get(&fbo) else {
            return glow::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
        };
        let (Some(c), Some(d)) = (self.storage.get(&color), self.storage.get(&depth)) else {
            return glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
        };
        if c.samples != d.samples {
            return glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE;
        }
        if (c.width, c.height) != (d.width, d.height) {
            return glow::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
        }
        glow::FRAMEBUFFER_COMPLETE
    }

    fn color_attachment(&self, fbo: Option<u32>) -> Option<u32> {
        fbo.and_then(|f| self.attachments.get(&f)).map(|(c, _)| *c)
    }

    fn surface_mut(&mut self, fbo: Option<u32>) -> &mut Surface {
        self.surfaces.entry(fbo).or_default()
    }

    fn set_uniform(&mut self, program: u32, name: &str, value: UniformValue) -> bool {
        if !self.expect_live("uniform", ObjectKind::Program, program) {
            return false;
        }
        if self.program != Some(program) {
            self.diagnostics
                .push(format!("uniform {name}: program {program} is not in use"));
        }
        let declared = self
            .declared
            .get(&program)
            .is_some_and(|set| set.contains_key(name));
        if declared {
            self.uniforms.insert((program, name.to_string()), value);
        }
        declared
    }
}

/// `(name, type)` of `uniform <type> <name>...;` declarations, one per line.
fn declared_uniforms(src: &str) -> impl Iterator<Item = (String, String)> + '_ {
    src.lines().filter_map(|line| {
        let mut words = line.trim().split_whitespace();
        if words.next() != Some("uniform") {
            return None;
        }
        let ty = words.next()?;
        let name = words.next()?;
        let end = name
            .find(|c: char| c == ';' || c == '[' || c == '=')
            .unwrap_or(name.len());
        Some((name[..end].to_string(), ty.to_string()))
    })
}

/// Texture units read by `program`: each declared sampler at the unit it was set to (0 if never set).
fn sampled_units_of(
    declared: &BTreeMap<String, String>,
    uniforms: &BTreeMap<(u32, String), UniformValue>,
    program: u32,
) -> Vec<u32> {
    declared
        .iter()
        .filter(|(_, ty)| ty.starts_with("sampler"))
        .map(|(name, _)| match uniforms.get(&(program, name.clone())) {
            Some(UniformValue::I32(unit)) => *unit as u32,
            _ => 0,
        })
        .collect()
}

/// Records calls and models GL state. See module docs.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    state: RefCell<State>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<GlCall> {
        self.state.borrow().calls.clone()
    }

    pub fn take_calls(&self) -> Vec<GlCall> {
        std::mem::take(&mut self.state.borrow_mut().calls)
    }

    pub fn clear_calls(&self) {
        self.state.borrow_mut().calls.clear();
        self.state.borrow_mut().draws.clear();
    }

    /// Misuse observed so far (double deletes, dangling handles, feedback loops...).
    pub fn diagnostics(&self) -> Vec<String> {
        self.state.borrow().diagnostics.clone()
    }

    pub fn live_objects(&self) -> usize {
        self.state.borrow().live.len()
    }

    pub fn live_of(&self, kind: ObjectKind) -> usize {
        self.state.borrow().live.values().filter(|k| **k == kind).count()
    }

    pub fn is_live(&self, id: u32) -> bool {
        self.state.borrow().live.contains_key(&id)
    }

    pub fn storage(&self, id: u32) -> Option<Storage> {
        self.state.borrow().storage.get(&id).copied()
    }

    pub fn bound_framebuffer(&self) -> Option<u32> {
        self.state.borrow().bound
    }

    pub fn viewport_rect(&self) -> (i32, i32, i32, i32) {
        self.state.borrow().viewport
    }

    pub fn depth_test_enabled(&self) -> bool {
        self.state.borrow().depth_test
    }

    pub fn current_program(&self) -> Option<u32> {
        self.state.borrow().program
    }

    pub fn texture_at(&self, unit: u32) -> Option<u32> {
        self.state.borrow().units.get(&unit).copied()
    }

    pub fn uniform(&self, program: u32, name: &str) -> Option<UniformValue> {
        self.state
            .borrow()
            .uniforms
            .get(&(program, name.to_string()))
            .cloned()
    }

    /// `None` is the display surface, which always exists.
    pub fn surface(&self, fbo: Option<u32>) -> Option<Surface> {
        let st = self.state.borrow();
        match fbo {
            None => Some(st.surfaces.get(&None).copied().unwrap_or_default()),
            Some(_) => st.surfaces.get(&fbo).copied(),
        }
    }

    /// Stand-in for scene geometry writing depth.
    pub fn write_depth(&self, fbo: Option<u32>, depth: f32) {
        self.state.borrow_mut().surface_mut(fbo).depth = depth;
    }

    pub fn last_blit(&self) -> Option<BlitRecord> {
        self.state.borrow().last_blit
    }

    pub fn draws(&self) -> Vec<DrawRecord> {
        self.state.borrow().draws.clone()
    }

    pub fn last_draw(&self) -> Option<DrawRecord> {
        self.state.borrow().draws.last().cloned()
    }

    /// The next `check_framebuffer_status` reports `status`.
    pub fn fail_next_framebuffer(&self, status: u32) {
        self.state.borrow_mut().forced_status = Some(status);
    }

    /// Any program whose source contains `pattern` fails to compile with `log`.
    pub fn fail_compile_containing(&self, pattern: &str, log: &str) {
        self.state
            .borrow_mut()
            .compile_failures
            .push((pattern.to_string(), log.to_string()));
    }
}

impl RenderBackend for RecordingBackend {
    type Framebuffer = u32;
    type Texture = u32;
    type Renderbuffer = u32;
    type Program = u32;
    type VertexArray = u32;
    type Buffer = u32;

    fn create_framebuffer(&self) -> Result<u32, EngineError> {
        Ok(self.state.borrow_mut().create(ObjectKind::Framebuffer))
    }

    fn create_texture(&self) -> Result<u32, EngineError> {
        Ok(self.state.borrow_mut().create(ObjectKind::Texture))
    }

    fn create_renderbuffer(&self) -> Result<u32, EngineError> {
        Ok(self.state.borrow_mut().create(ObjectKind::Renderbuffer))
    }

    fn create_vertex_array(&self) -> Result<u32, EngineError> {
        Ok(self.state.borrow_mut().create(ObjectKind::VertexArray))
    }

    fn create_buffer(&self) -> Result<u32, EngineError> {
        Ok(self.state.borrow_mut().create(ObjectKind::Buffer))
    }

    fn delete_framebuffer(&self, fbo: u32) {
        self.state.borrow_mut().delete(ObjectKind::Framebuffer, fbo);
    }

    fn delete_texture(&self, tex: u32) {
        self.state.borrow_mut().delete(ObjectKind::Texture, tex);
    }

    fn delete_renderbuffer(&self, rb: u32) {
        self.state.borrow_mut().delete(ObjectKind::Renderbuffer, rb);
    }

    fn delete_vertex_array(&self, vao: u32) {
        self.state.borrow_mut().delete(ObjectKind::VertexArray, vao);
    }

    fn delete_buffer(&self, buf: u32) {
        self.state.borrow_mut().delete(ObjectKind::Buffer, buf);
    }

    fn delete_program(&self, program: u32) {
        self.state.borrow_mut().delete(ObjectKind::Program, program);
    }

    fn allocate_color(&self, tex: u32, samples: Samples, width: i32, height: i32) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::AllocateColor {
            tex,
            samples,
            width,
            height,
        });
        if st.expect_live("allocate_color", ObjectKind::Texture, tex) {
            st.storage.insert(
                tex,
                Storage {
                    samples,
                    width,
                    height,
                },
            );
        }
    }

    fn allocate_depth_stencil(&self, rb: u32, samples: Samples, width: i32, height: i32) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::AllocateDepthStencil {
            rb,
            samples,
            width,
            height,
        });
        if st.expect_live("allocate_depth_stencil", ObjectKind::Renderbuffer, rb) {
            st.storage.insert(
                rb,
                Storage {
                    samples,
                    width,
                    height,
                },
            );
        }
    }

    fn attach(&self, fbo: u32, color: u32, depth_stencil: u32, samples: Samples) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::Attach {
            fbo,
            color,
            depth_stencil,
        });
        let ok = st.expect_live("attach", ObjectKind::Framebuffer, fbo)
            & st.expect_live("attach", ObjectKind::Texture, color)
            & st.expect_live("attach", ObjectKind::Renderbuffer, depth_stencil);
        if let Some(s) = st.storage.get(&color).copied() {
            if s.samples != samples {
                st.diagnostics.push(format!(
                    "attach: texture {color} attached as {samples:?} but stored as {:?}",
                    s.samples
                ));
            }
        }
        st.bound = Some(fbo);
        if ok {
            st.attachments.insert(fbo, (color, depth_stencil));
            st.surface_mut(Some(fbo));
        }
    }

    fn check_framebuffer_status(&self) -> u32 {
        let mut st = self.state.borrow_mut();
        let status = match (st.forced_status.take(), st.bound) {
            (Some(forced), _) => forced,
            (None, None) => glow::FRAMEBUFFER_COMPLETE,
            (None, Some(fbo)) => st.status_of(fbo),
        };
        st.calls.push(GlCall::CheckStatus(status));
        status
    }

    fn bind_framebuffer(&self, fbo: Option<u32>) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::BindFramebuffer(fbo));
        if let Some(id) = fbo {
            st.expect_live("bind_framebuffer", ObjectKind::Framebuffer, id);
        }
        st.bound = fbo;
    }

    fn viewport(&self, x: i32, y: i32, width: i32, height: i32) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::Viewport(x, y, width, height));
        st.viewport = (x, y, width, height);
    }

    fn blit_framebuffer(
        &self,
        read: Option<u32>,
        draw: Option<u32>,
        src: (i32, i32),
        dst: (i32, i32),
        mask: u32,
        filter: u32,
    ) {
        let mut st = self.state.borrow_mut();
        let record = BlitRecord {
            read,
            draw,
            src,
            dst,
            mask,
            filter,
        };
        st.calls.push(GlCall::Blit(record));
        st.last_blit = Some(record);

        for fbo in [read, draw].into_iter().flatten() {
            st.expect_live("blit_framebuffer", ObjectKind::Framebuffer, fbo);
        }
        let read_samples = st
            .color_attachment(read)
            .and_then(|c| st.storage.get(&c))
            .map(|s| s.samples);
        if read_samples.is_some_and(Samples::is_multisampled) && src != dst {
            st.diagnostics.push(format!(
                "blit_framebuffer: multisampled resolve from {src:?} to {dst:?} must not scale"
            ));
        }
        if mask & (glow::DEPTH_BUFFER_BIT | glow::STENCIL_BUFFER_BIT) != 0
            && filter != glow::NEAREST
        {
            st.diagnostics
                .push("blit_framebuffer: depth/stencil blits require NEAREST".to_string());
        }

        let from = st.surfaces.get(&read).copied().unwrap_or_default();
        let to = st.surface_mut(draw);
        if mask & glow::COLOR_BUFFER_BIT != 0 {
            to.color = from.color;
        }
        if mask & glow::DEPTH_BUFFER_BIT != 0 {
            to.depth = from.depth;
        }
    }

    fn set_depth_test(&self, enabled: bool) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::DepthTest(enabled));
        st.depth_test = enabled;
    }

    fn clear_color(&self, rgba: [f32; 4]) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::ClearColor(rgba));
        st.clear_color = rgba;
    }

    fn clear(&self, mask: u32) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::Clear(mask));
        let color = st.clear_color;
        let bound = st.bound;
        let s = st.surface_mut(bound);
        if mask & glow::COLOR_BUFFER_BIT != 0 {
            s.color = color;
        }
        if mask & glow::DEPTH_BUFFER_BIT != 0 {
            s.depth = 1.0;
        }
    }

    fn compile_program(&self, vert_src: &str, frag_src: &str) -> Result<u32, EngineError> {
        let mut st = self.state.borrow_mut();
        for (pattern, log) in &st.compile_failures {
            if vert_src.contains(pattern.as_str()) {
                return Err(EngineError::VertexCompile(log.clone()));
            }
            if frag_src.contains(pattern.as_str()) {
                return Err(EngineError::FragmentCompile(log.clone()));
            }
        }
        let id = st.create(ObjectKind::Program);
        let names = declared_uniforms(vert_src)
            .chain(declared_uniforms(frag_src))
            .collect();
        st.declared.insert(id, names);
        Ok(id)
    }

    fn use_program(&self, program: Option<u32>) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::UseProgram(program));
        if let Some(p) = program {
            st.expect_live("use_program", ObjectKind::Program, p);
        }
        st.program = program;
    }

    fn uniform_i32(&self, program: u32, name: &str, value: i32) -> bool {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::UniformI32 {
            program,
            name: name.to_string(),
            value,
        });
        st.set_uniform(program, name, UniformValue::I32(value))
    }

    fn uniform_f32(&self, program: u32, name: &str, value: f32) -> bool {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::UniformF32 {
            program,
            name: name.to_string(),
            value,
        });
        st.set_uniform(program, name, UniformValue::F32(value))
    }

    fn uniform_vec3(&self, program: u32, name: &str, value: [f32; 3]) -> bool {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::UniformVec3 {
            program,
            name: name.to_string(),
            value,
        });
        st.set_uniform(program, name, UniformValue::Vec3(value))
    }

    fn uniform_mat4(&self, program: u32, name: &str, value: &[f32; 16]) -> bool {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::UniformMat4 {
            program,
            name: name.to_string(),
        });
        st.set_uniform(program, name, UniformValue::Mat4(*value))
    }

    fn bind_texture_unit(&self, unit: u32, tex: Option<u32>) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::BindTexture { unit, tex });
        match tex {
            Some(t) => {
                if st.expect_live("bind_texture_unit", ObjectKind::Texture, t) {
                    if let Some(s) = st.storage.get(&t).copied() {
                        if s.samples.is_multisampled() {
                            st.diagnostics.push(format!(
                                "bind_texture_unit: multisampled texture {t} bound as TEXTURE_2D"
                            ));
                        }
                    }
                }
                st.units.insert(unit, t);
            }
            None => {
                st.units.remove(&unit);
            }
        }
    }

    fn upload_vertices(&self, vao: u32, vbo: u32, data: &[f32], attribs: &[VertexAttrib]) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::UploadVertices {
            vao,
            floats: data.len(),
        });
        st.expect_live("upload_vertices", ObjectKind::VertexArray, vao);
        st.expect_live("upload_vertices", ObjectKind::Buffer, vbo);
        for a in attribs {
            if a.offset + a.components > a.stride {
                st.diagnostics.push(format!(
                    "upload_vertices: attribute {} overruns its stride",
                    a.location
                ));
            }
        }
    }

    fn draw_triangles(&self, vao: u32, first: i32, count: i32) {
        let mut st = self.state.borrow_mut();
        st.calls.push(GlCall::DrawTriangles { vao, first, count });
        st.expect_live("draw_triangles", ObjectKind::VertexArray, vao);
        if st.program.is_none() {
            st.diagnostics
                .push("draw_triangles: no program in use".to_string());
        }
        if let (Some(attached), Some(program)) = (st.color_attachment(st.bound), st.program) {
            let sampled = st
                .declared
                .get(&program)
                .map(|decl| sampled_units_of(decl, &st.uniforms, program))
                .unwrap_or_default();
            if sampled.iter().any(|u| st.units.get(u) == Some(&attached)) {
                st.diagnostics.push(format!(
                    "draw_triangles: texture {attached} is sampled while bound for writing"
                ));
            }
        }
        let record = DrawRecord {
            target: st.bound,
            program: st.program,
            viewport: st.viewport,
            depth_test: st.depth_test,
            units: [st.units.get(&0).copied(), st.units.get(&1).copied()],
            count,
        };
        st.draws.push(record);
        let bound = st.bound;
        st.surface_mut(bound).draws += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_declarations_are_parsed_per_line() {
        let src = "uniform sampler2D image;\n  uniform bool horizontal;\nconst float weight[5] = float[](1.0);\nuniform float w[3];";
        let names: Vec<_> = declared_uniforms(src).map(|(name, _)| name).collect();
        assert_eq!(names, vec!["image", "horizontal", "w"]);
        assert_eq!(
            sampled_units_of(&declared_uniforms(src).collect(), &BTreeMap::new(), 1),
            vec![0]
        );
    }

    #[test]
    fn undeclared_uniforms_are_ignored() {
        let gl = RecordingBackend::new();
        let p = gl
            .compile_program("void main(){}", "uniform float exposure;")
            .unwrap();
        gl.use_program(Some(p));
        assert!(gl.uniform_f32(p, "exposure", 2.0));
        assert!(!gl.uniform_f32(p, "time", 1.0));
        assert_eq!(gl.uniform(p, "exposure"), Some(UniformValue::F32(2.0)));
        assert_eq!(gl.uniform(p, "time"), None);
        assert!(gl.diagnostics().is_empty());
    }

    #[test]
    fn attaching_with_the_wrong_sample_count_is_diagnosed() {
        let gl = RecordingBackend::new();
        let fbo = gl.create_framebuffer().unwrap();
        let tex = gl.create_texture().unwrap();
        let rb = gl.create_renderbuffer().unwrap();
        gl.allocate_color(tex, Samples::Single, 8, 8);
        gl.allocate_depth_stencil(rb, Samples::Single, 8, 8);
        gl.attach(fbo, tex, rb, Samples::Multi(4));

        let diags = gl.diagnostics();
        assert_eq!(diags.len(), 1, "{diags:?}");
        assert!(diags[0].contains("attached as"), "{diags:?}");
        assert_eq!(gl.bound_framebuffer(), Some(fbo));
    }

    #[test]
    fn live_objects_are_counted_per_kind() {
        let gl = RecordingBackend::new();
        let fbo = gl.create_framebuffer().unwrap();
        let t1 = gl.create_texture().unwrap();
        let _t2 = gl.create_texture().unwrap();
        assert_eq!(gl.live_of(ObjectKind::Texture), 2);
        assert_eq!(gl.live_of(ObjectKind::Framebuffer), 1);
        assert_eq!(gl.live_of(ObjectKind::Renderbuffer), 0);

        gl.delete_texture(t1);
        gl.delete_framebuffer(fbo);
        assert_eq!(gl.live_of(ObjectKind::Texture), 1);
        assert_eq!(gl.live_of(ObjectKind::Framebuffer), 0);
    }

    #[test]
    fn take_calls_drains_the_log() {
        let gl = RecordingBackend::new();
        gl.set_depth_test(true);
        gl.clear(glow::COLOR_BUFFER_BIT);

        let taken = gl.take_calls();
        assert_eq!(taken.len(), 2);
        assert!(taken.contains(&GlCall::DepthTest(true)));
        assert!(gl.calls().is_empty());
        assert!(gl.take_calls().is_empty());
    }

    #[test]
    fn double_delete_is_diagnosed() {
        let gl = RecordingBackend::new();
        let t = gl.create_texture().unwrap();
        gl.delete_texture(t);
        gl.delete_texture(t);
        assert_eq!(gl.diagnostics().len(), 1);
    }

    #[test]
    fn mismatched_attachments_are_incomplete() {
        let gl = RecordingBackend::new();
        let fbo = gl.create_framebuffer().unwrap();
        let tex = gl.create_texture().unwrap();
        let rb = gl.create_renderbuffer().unwrap();
        gl.allocate_color(tex, Samples::Multi(4), 8, 8);
        gl.allocate_depth_stencil(rb, Samples::Single, 8, 8);
        gl.attach(fbo, tex, rb, Samples::Multi(4));
        assert_eq!(
            gl.check_framebuffer_status(),
            glow::FRAMEBUFFER_INCOMPLETE_MULTISAMPLE
        );

        gl.allocate_depth_stencil(rb, Samples::Multi(4), 8, 8);
        assert_eq!(gl.check_framebuffer_status(), glow::FRAMEBUFFER_COMPLETE);
    }

    #[test]
    fn sampling_the_bound_target_is_a_feedback_loop() {
        let gl = RecordingBackend::new();
        let fbo = gl.create_framebuffer().unwrap();
        let tex = gl.create_texture().unwrap();
        let rb = gl.create_renderbuffer().unwrap();
        let vao = gl.create_vertex_array().unwrap();
        gl.allocate_color(tex, Samples::Single, 4, 4);
        gl.allocate_depth_stencil(rb, Samples::Single, 4, 4);
        gl.attach(fbo, tex, rb, Samples::Single);
        let p = gl.compile_program("", "uniform sampler2D image;").unwrap();
        gl.use_program(Some(p));
        gl.bind_texture_unit(0, Some(tex));
        gl.draw_triangles(vao, 0, 6);

        assert_eq!(gl.diagnostics().len(), 1);
        assert_eq!(gl.surface(Some(fbo)).unwrap().draws, 1);
    }
}
