use crate::backend::{RenderBackend, VertexAttrib};
use crate::EngineError;

/// Two triangles covering NDC, interleaved `pos.xy, uv.xy`.
#[rustfmt::skip]
pub const QUAD_VERTICES: [f32; 24] = [
    // positions   // uvs
    -1.0,  1.0,    0.0, 1.0,
    -1.0, -1.0,    0.0, 0.0,
     1.0, -1.0,    1.0, 0.0,

    -1.0,  1.0,    0.0, 1.0,
     1.0, -1.0,    1.0, 0.0,
     1.0,  1.0,    1.0, 1.0,
];

pub const QUAD_VERTEX_COUNT: i32 = 6;

const QUAD_LAYOUT: [VertexAttrib; 2] = [
    VertexAttrib {
        location: 0,
        components: 2,
        stride: 4,
        offset: 0,
    },
    VertexAttrib {
        location: 1,
        components: 2,
        stride: 4,
        offset: 2,
    },
];

// --- Fullscreen draw helper ---
pub struct FullscreenQuad<B: RenderBackend> {
    mesh: Option<(B::VertexArray, B::Buffer)>,
}

impl<B: RenderBackend> std::fmt::Debug for FullscreenQuad<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullscreenQuad")
            .field("mesh", &self.mesh)
            .finish()
    }
}

impl<B: RenderBackend> FullscreenQuad<B> {
    pub fn new(gl: &B) -> Result<Self, EngineError> {
        let vao = gl.create_vertex_array()?;
        let vbo = match gl.create_buffer() {
            Ok(b) => b,
            Err(e) => {
                gl.delete_vertex_array(vao);
                return Err(e);
            }
        };
        gl.upload_vertices(vao, vbo, &QUAD_VERTICES, &QUAD_LAYOUT);
        Ok(Self {
            mesh: Some((vao, vbo)),
        })
    }

    pub fn draw(&self, gl: &B) -> Result<(), EngineError> {
        let (vao, _) = self
            .mesh
            .ok_or_else(|| EngineError::other("fullscreen quad already destroyed"))?;
        gl.draw_triangles(vao, 0, QUAD_VERTEX_COUNT);
        Ok(())
    }

    pub fn destroy(&mut self, gl: &B) {
        if let Some((vao, vbo)) = self.mesh.take() {
            gl.delete_vertex_array(vao);
            gl.delete_buffer(vbo);
        }
    }
}
