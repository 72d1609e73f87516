// Distributed under the GNU Affero General Public License v3.0 or later.
// See accompanying file LICENSE or https://www.gnu.org/licenses/agpl-3.0.html for details.
use std::collections::HashMap;

use glow::HasContext;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShaderError {
    #[error("Failed to create GL object: {0}")]
    Create(String),

    #[error("{stage} shader compilation failed: {log}")]
    Compile { stage: &'static str, log: String },

    #[error("Program linking failed: {0}")]
    Link(String),
}

pub struct Shader {
    pub program: glow::Program,
    pub uniforms: HashMap<String, glow::UniformLocation>,
}

impl Shader {
    pub fn new(
        gl: &glow::Context,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self, ShaderError> {
        unsafe {
            let vertex_shader = Self::compile(gl, glow::VERTEX_SHADER, "Vertex", vertex_src)?;
            let fragment_shader =
                match Self::compile(gl, glow::FRAGMENT_SHADER, "Fragment", fragment_src) {
                    Ok(shader) => shader,
                    Err(e) => {
                        gl.delete_shader(vertex_shader);
                        return Err(e);
                    }
                };

            let program = match gl.create_program() {
                Ok(program) => program,
                Err(e) => {
                    gl.delete_shader(vertex_shader);
                    gl.delete_shader(fragment_shader);
                    return Err(ShaderError::Create(e));
                }
            };
            gl.attach_shader(program, vertex_shader);
            gl.attach_shader(program, fragment_shader);
            gl.link_program(program);

            gl.detach_shader(program, vertex_shader);
            gl.detach_shader(program, fragment_shader);
            gl.delete_shader(vertex_shader);
            gl.delete_shader(fragment_shader);

            if !gl.get_program_link_status(program) {
                let log = gl.get_program_info_log(program);
                gl.delete_program(program);
                return Err(ShaderError::Link(log));
            }

            let mut uniforms = HashMap::new();
            let count = gl.get_program_parameter_i32(program, glow::ACTIVE_UNIFORMS);
            for i in 0..count {
                if let Some(info) = gl.get_active_uniform(program, i as u32) {
                    if let Some(loc) = gl.get_uniform_location(program, &info.name) {
                        uniforms.insert(info.name, loc);
                    }
                }
            }
            log::debug!("Linked shader program with uniforms {:?}", uniforms.keys());

            Ok(Shader { program, uniforms })
        }
    }

    unsafe fn compile(
        gl: &glow::Context,
        shader_type: u32,
        stage: &'static str,
        source: &str,
    ) -> Result<glow::Shader, ShaderError> {
        let shader = gl.create_shader(shader_type).map_err(ShaderError::Create)?;
        gl.shader_source(shader, source);
        gl.compile_shader(shader);
        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            gl.delete_shader(shader);
            return Err(ShaderError::Compile { stage, log });
        }
        Ok(shader)
    }

    pub fn uniform(&self, name: &str) -> Option<&glow::UniformLocation> {
        self.uniforms.get(name)
    }

    pub fn delete(&self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.program);
        }
    }
}
