// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::mem::offset_of;
use std::rc::Rc;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use glow::Context as GlowContext;
use glow::HasContext;

use crate::camera::CameraState;
use crate::frustum::Frustum;
use crate::settings::Settings;
use crate::shader::{Shader, ShaderError};
use crate::texture::Texture;

const QUAD_VERT: &str = r#"#version 330 core
layout(location = 0) in vec3 position;
layout(location = 1) in vec2 uv;

uniform mat4 u_projection;
uniform mat4 u_modelview;

out vec2 v_uv;

void main() {
    v_uv = uv;
    gl_Position = u_projection * u_modelview * vec4(position, 1.0);
}
"#;

const QUAD_FRAG: &str = r#"#version 330 core
in vec2 v_uv;

uniform vec3 u_color;
uniform bool u_textured;
uniform sampler2D u_texture;

out vec4 frag_color;

void main() {
    if (u_textured) {
        frag_color = texture(u_texture, v_uv);
    } else {
        frag_color = vec4(u_color, 1.0);
    }
}
"#;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub position: [f32; 3],
    pub uv: [f32; 2],
}

unsafe impl Zeroable for Vertex {}
unsafe impl Pod for Vertex {}

impl Vertex {
    pub(crate) fn stride() -> i32 {
        std::mem::size_of::<Vertex>() as i32
    }
}

/// Unit square in the XY plane at Z = 0, drawn as a triangle fan.
/// Image rows run top to bottom, so V is flipped against Y.
pub const QUAD: [Vertex; 4] = [
    Vertex {
        position: [0.0, 0.0, 0.0],
        uv: [0.0, 1.0],
    },
    Vertex {
        position: [0.0, 1.0, 0.0],
        uv: [0.0, 0.0],
    },
    Vertex {
        position: [1.0, 1.0, 0.0],
        uv: [1.0, 0.0],
    },
    Vertex {
        position: [1.0, 0.0, 0.0],
        uv: [1.0, 1.0],
    },
];

/// Draws the single quad with a fixed perspective projection.
pub struct QuadRenderer {
    gl: Rc<GlowContext>,
    shader: Shader,
    vao: glow::VertexArray,
    vbo: glow::Buffer,
    projection: Mat4,
    clear_color: [f32; 4],
    color: Vec3,
    texture: Option<Texture>,
    frames_rendered: u64,
}

impl QuadRenderer {
    /// Compiles the quad program, uploads the vertices, sets the projection
    /// and enables depth testing for the lifetime of the context.
    pub fn new(gl: Rc<GlowContext>, settings: &Settings) -> Result<Self, ShaderError> {
        let shader = Shader::new(&gl, QUAD_VERT, QUAD_FRAG)?;

        let frustum = Frustum::from_fov(
            settings.camera.fov_y_degrees,
            settings.window.aspect_ratio(),
            settings.camera.near,
            settings.camera.far,
        );
        log::debug!("Projection frustum {:?}", frustum);

        unsafe {
            let vao = match gl.create_vertex_array() {
                Ok(vao) => vao,
                Err(e) => {
                    shader.delete(&gl);
                    return Err(ShaderError::Create(e));
                }
            };
            gl.bind_vertex_array(Some(vao));

            let vbo = match gl.create_buffer() {
                Ok(vbo) => vbo,
                Err(e) => {
                    gl.bind_vertex_array(None);
                    gl.delete_vertex_array(vao);
                    shader.delete(&gl);
                    return Err(ShaderError::Create(e));
                }
            };
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&QUAD),
                glow::STATIC_DRAW,
            );

            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(
                0,
                3,
                glow::FLOAT,
                false,
                Vertex::stride(),
                offset_of!(Vertex, position) as i32,
            );
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(
                1,
                2,
                glow::FLOAT,
                false,
                Vertex::stride(),
                offset_of!(Vertex, uv) as i32,
            );

            gl.bind_vertex_array(None);
            gl.bind_buffer(glow::ARRAY_BUFFER, None);

            gl.enable(glow::DEPTH_TEST);
            gl.viewport(
                0,
                0,
                settings.window.width as i32,
                settings.window.height as i32,
            );

            Ok(Self {
                gl,
                shader,
                vao,
                vbo,
                projection: frustum.projection_matrix(),
                clear_color: settings.render.clear_color,
                color: Vec3::from_array(settings.render.quad_color),
                texture: None,
                frames_rendered: 0,
            })
        }
    }

    /// Samples `texture` across the quad instead of the flat colour.
    pub fn set_texture(&mut self, texture: Texture) {
        self.texture = Some(texture);
    }

    pub fn resize(&self, width: i32, height: i32) {
        unsafe {
            self.gl.viewport(0, 0, width, height);
        }
    }

    pub fn clear(&self) {
        let [r, g, b, a] = self.clear_color;
        unsafe {
            self.gl.clear_color(r, g, b, a);
            self.gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }
    }

    pub fn draw(&mut self, camera: &CameraState) {
        let gl = &self.gl;
        let modelview = camera.modelview_matrix();
        log::trace!("Frame {} camera {:?}", self.frames_rendered, camera);

        unsafe {
            gl.use_program(Some(self.shader.program));
            gl.uniform_matrix_4_f32_slice(
                self.shader.uniform("u_projection"),
                false,
                &self.projection.to_cols_array(),
            );
            gl.uniform_matrix_4_f32_slice(
                self.shader.uniform("u_modelview"),
                false,
                &modelview.to_cols_array(),
            );
            gl.uniform_3_f32(
                self.shader.uniform("u_color"),
                self.color.x,
                self.color.y,
                self.color.z,
            );

            let textured = self.texture.as_ref().is_some_and(Texture::is_uploaded);
            gl.uniform_1_i32(self.shader.uniform("u_textured"), textured as i32);
            if let Some(texture) = self.texture.as_ref().filter(|_| textured) {
                gl.active_texture(glow::TEXTURE0);
                texture.bind(gl);
                gl.uniform_1_i32(self.shader.uniform("u_texture"), 0);
            }

            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(glow::TRIANGLE_FAN, 0, QUAD.len() as i32);
            gl.bind_vertex_array(None);

            if textured {
                gl.bind_texture(glow::TEXTURE_2D, None);
            }
        }
        self.frames_rendered += 1;
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Frees every GL object this renderer owns. Must run while the context is current.
    pub fn destroy(&mut self) {
        if let Some(texture) = self.texture.as_mut() {
            texture.delete(&self.gl);
        }
        self.shader.delete(&self.gl);
        unsafe {
            self.gl.delete_buffer(self.vbo);
            self.gl.delete_vertex_array(self.vao);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_layout_is_tightly_packed() {
        assert_eq!(Vertex::stride(), 5 * 4);
        assert_eq!(offset_of!(Vertex, uv), 3 * 4);
        assert_eq!(bytemuck::cast_slice::<Vertex, u8>(&QUAD).len(), 4 * 20);
    }

    #[test]
    fn quad_covers_unit_square_at_z_zero() {
        let corners: Vec<[f32; 3]> = QUAD.iter().map(|v| v.position).collect();
        assert_eq!(
            corners,
            vec![
                [0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
                [1.0, 0.0, 0.0],
            ]
        );
    }

    #[test]
    fn quad_uvs_put_first_image_row_at_top() {
        for vertex in QUAD {
            assert_eq!(vertex.uv[0], vertex.position[0]);
            assert_eq!(vertex.uv[1], 1.0 - vertex.position[1]);
        }
    }
}
