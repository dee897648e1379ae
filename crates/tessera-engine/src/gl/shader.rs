use std::collections::HashMap;

use crate::device::{GraphicsContext, ProgramHandle, ShaderHandle, ShaderStage, UniformLocation};
use crate::error::{EngineError, Result};

/// Linked vertex + fragment program with cached attribute/uniform locations.
///
/// Lookup tables are built once after linking. Names the linker did not keep
/// (undeclared, unused, optimized out) are hard errors on lookup.
#[derive(Debug)]
pub struct Shader {
    name: String,
    program: ProgramHandle,
    attributes: HashMap<String, u32>,
    uniforms: HashMap<String, UniformLocation>,
}

impl Shader {
    /// Compiles and links `vertex_src` + `fragment_src`.
    ///
    /// Stage objects are deleted once the program is linked, or as soon as any
    /// step fails, so a failed construction leaves nothing behind.
    pub fn new(
        gl: &mut dyn GraphicsContext,
        name: impl Into<String>,
        vertex_src: &str,
        fragment_src: &str,
    ) -> Result<Self> {
        let name = name.into();

        let vertex = compile(gl, &name, ShaderStage::Vertex, vertex_src)?;
        let fragment = match compile(gl, &name, ShaderStage::Fragment, fragment_src) {
            Ok(f) => f,
            Err(e) => {
                gl.delete_shader(vertex);
                return Err(e);
            }
        };

        let linked = gl.link_program(vertex, fragment);
        gl.delete_shader(vertex);
        gl.delete_shader(fragment);
        let program = linked.map_err(|log| EngineError::ShaderLink {
            shader: name.clone(),
            log,
        })?;

        let attributes = gl
            .active_attributes(program)
            .into_iter()
            .map(|a| (a.name, a.location))
            .collect();
        let uniforms = gl
            .active_uniforms(program)
            .into_iter()
            .map(|u| (u.name, UniformLocation { program, index: u.location }))
            .collect();

        let shader = Self { name, program, attributes, uniforms };
        log::debug!(
            "shader '{}' linked: {} attribute(s), {} uniform(s)",
            shader.name,
            shader.attributes.len(),
            shader.uniforms.len()
        );
        Ok(shader)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ProgramHandle {
        self.program
    }

    /// Makes this program current.
    pub fn use_program(&self, gl: &mut dyn GraphicsContext) {
        gl.use_program(Some(self.program));
    }

    pub fn attribute_location(&self, name: &str) -> Result<u32> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::AttributeNotFound {
                shader: self.name.clone(),
                name: name.to_string(),
            })
    }

    pub fn uniform_location(&self, name: &str) -> Result<UniformLocation> {
        self.uniforms
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::UniformNotFound {
                shader: self.name.clone(),
                name: name.to_string(),
            })
    }

    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn uniform_names(&self) -> impl Iterator<Item = &str> {
        self.uniforms.keys().map(String::as_str)
    }

    pub fn destroy(self, gl: &mut dyn GraphicsContext) {
        gl.delete_program(self.program);
    }
}

fn compile(
    gl: &mut dyn GraphicsContext,
    shader: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<ShaderHandle> {
    gl.compile_shader(stage, source).map_err(|info_log| {
        log::error!("failed to compile {stage} shader '{shader}': {info_log}");
        EngineError::ShaderCompile {
            shader: shader.to_string(),
            stage,
            log: info_log,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessContext;

    const VS: &str = "
        attribute vec3 a_position;
        uniform mat4 u_projection;
        void main() {
            gl_Position = u_projection * vec4(a_position, 1.0);
        }";

    const FS: &str = "
        precision mediump float;
        uniform vec4 u_color;
        uniform vec4 u_unused;
        void main() {
            gl_FragColor = u_color;
        }";

    #[test]
    fn introspects_active_names() {
        let mut gl = HeadlessContext::new();
        let shader = Shader::new(&mut gl, "basic", VS, FS).unwrap();

        assert_eq!(shader.name(), "basic");
        assert_eq!(shader.attribute_location("a_position"), Ok(0));
        assert!(shader.uniform_location("u_projection").is_ok());
        assert!(shader.uniform_location("u_color").is_ok());
        assert_eq!(gl.live_shaders(), 0);
        assert_eq!(gl.live_programs(), 1);
    }

    #[test]
    fn optimized_out_uniform_is_a_hard_error() {
        let mut gl = HeadlessContext::new();
        let shader = Shader::new(&mut gl, "basic", VS, FS).unwrap();
        assert_eq!(
            shader.uniform_location("u_unused"),
            Err(EngineError::UniformNotFound {
                shader: "basic".into(),
                name: "u_unused".into(),
            })
        );
        assert!(matches!(
            shader.attribute_location("a_normal"),
            Err(EngineError::AttributeNotFound { .. })
        ));
    }

    #[test]
    fn fragment_syntax_error_yields_compile_error_and_no_program() {
        let mut gl = HeadlessContext::new();
        let bad_fs = "precision mediump float;\nvoid main() {\n  gl_FragColor = vec4(1.0) $\n}";
        let err = Shader::new(&mut gl, "broken", VS, bad_fs).unwrap_err();

        match err {
            EngineError::ShaderCompile { shader, stage, log } => {
                assert_eq!(shader, "broken");
                assert_eq!(stage, ShaderStage::Fragment);
                assert!(log.contains("syntax error"), "{log}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(gl.live_programs(), 0);
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn link_error_carries_driver_log() {
        let mut gl = HeadlessContext::new();
        let fs = "varying vec2 v_uv;\nvoid main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }";
        let err = Shader::new(&mut gl, "mismatch", VS, fs).unwrap_err();
        assert!(matches!(
            &err,
            EngineError::ShaderLink { shader, log } if shader == "mismatch" && log.contains("v_uv")
        ));
        assert_eq!(gl.live_shaders(), 0);
    }

    #[test]
    fn use_program_makes_it_current() {
        let mut gl = HeadlessContext::new();
        let shader = Shader::new(&mut gl, "basic", VS, FS).unwrap();
        shader.use_program(&mut gl);
        assert_eq!(gl.current_program(), Some(shader.program()));

        shader.destroy(&mut gl);
        assert_eq!(gl.current_program(), None);
    }
}
