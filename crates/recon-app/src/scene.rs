//! Target cubes drawn into the compositor's scene target.

use glam::{Mat4, Vec3};
use recon_game::Target;
use recon_runtime_glow::{EngineError, RenderBackend, VertexAttrib};

pub const TARGET_VERT: &str = include_str!("../shaders/target.vs");
pub const TARGET_FRAG: &str = include_str!("../shaders/target.fs");

/// Base tint of a target before the pulse brightens it.
pub const TARGET_COLOR: [f32; 3] = [1.0, 0.08, 0.05];
/// Edge length of a drawn target.
pub const TARGET_SCALE: f32 = 0.5;

/// Interleaved `pos.xyz, normal.xyz`.
const CUBE_LAYOUT: [VertexAttrib; 2] = [
    VertexAttrib {
        location: 0,
        components: 3,
        stride: 6,
        offset: 0,
    },
    VertexAttrib {
        location: 1,
        components: 3,
        stride: 6,
        offset: 3,
    },
];

pub const CUBE_VERTEX_COUNT: i32 = 36;

/// (normal, u, v) per face with `u x v == normal`, so the corner order below is CCW from outside.
const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
    ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
    ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
    ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
    ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
    ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
];

const CORNERS: [(f32, f32); 6] = [
    (-1.0, -1.0),
    (1.0, -1.0),
    (1.0, 1.0),
    (-1.0, -1.0),
    (1.0, 1.0),
    (-1.0, 1.0),
];

/// Unit cube centered on the origin.
pub fn cube_vertices() -> Vec<f32> {
    let mut out = Vec::with_capacity(CUBE_VERTEX_COUNT as usize * 6);
    for (n, u, v) in FACES {
        let (n, u, v) = (Vec3::from(n), Vec3::from(u), Vec3::from(v));
        for (s, t) in CORNERS {
            let p = 0.5 * (n + s * u + t * v);
            out.extend_from_slice(&p.to_array());
            out.extend_from_slice(&n.to_array());
        }
    }
    out
}

pub struct TargetRenderer<B: RenderBackend> {
    program: Option<B::Program>,
    mesh: Option<(B::VertexArray, B::Buffer)>,
}

impl<B: RenderBackend> std::fmt::Debug for TargetRenderer<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetRenderer")
            .field("program", &self.program)
            .field("mesh", &self.mesh)
            .finish()
    }
}

impl<B: RenderBackend> TargetRenderer<B> {
    pub fn new(gl: &B) -> Result<Self, EngineError> {
        let program = gl.compile_program(TARGET_VERT, TARGET_FRAG)?;
        let vao = match gl.create_vertex_array() {
            Ok(v) => v,
            Err(e) => {
                gl.delete_program(program);
                return Err(e);
            }
        };
        let vbo = match gl.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                gl.delete_vertex_array(vao);
                gl.delete_program(program);
                return Err(e);
            }
        };
        gl.upload_vertices(vao, vbo, &cube_vertices(), &CUBE_LAYOUT);
        Ok(Self {
            program: Some(program),
            mesh: Some((vao, vbo)),
        })
    }

    /// Draw every active target into whatever framebuffer is bound. Returns the number drawn.
    pub fn draw(
        &self,
        gl: &B,
        view: &Mat4,
        projection: &Mat4,
        targets: &[Target],
        time: f32,
    ) -> Result<usize, EngineError> {
        let (Some(program), Some((vao, _))) = (self.program, self.mesh) else {
            return Err(EngineError::other("target renderer already destroyed"));
        };

        gl.use_program(Some(program));
        gl.uniform_mat4(program, "view", &view.to_cols_array());
        gl.uniform_mat4(program, "projection", &projection.to_cols_array());
        gl.uniform_f32(program, "time", time);
        gl.uniform_vec3(program, "color", TARGET_COLOR);

        let mut drawn = 0;
        for t in targets.iter().filter(|t| t.active) {
            let model = Mat4::from_translation(t.position) * Mat4::from_scale(Vec3::splat(TARGET_SCALE));
            gl.uniform_mat4(program, "model", &model.to_cols_array());
            // Offsets the pulse so targets do not flash in lockstep.
            gl.uniform_f32(program, "phase", t.active_time);
            gl.draw_triangles(vao, 0, CUBE_VERTEX_COUNT);
            drawn += 1;
        }
        gl.use_program(None);
        Ok(drawn)
    }

    pub fn destroy(&mut self, gl: &B) {
        if let Some((vao, vbo)) = self.mesh.take() {
            gl.delete_vertex_array(vao);
            gl.delete_buffer(vbo);
        }
        if let Some(p) = self.program.take() {
            gl.delete_program(p);
        }
    }
}
