use std::rc::Rc;

use bytemuck::{Pod, Zeroable};

use crate::coords::{Mat4, Vec3};
use crate::device::GraphicsContext;
use crate::error::{EngineError, Result};
use crate::gl::{AttributeInfo, GlBuffer, Shader};
use crate::resource::ReleaseOutcome;

use super::material::{Material, MaterialDeps, MaterialManager};

/// Vertices in a sprite quad (two triangles).
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// `x, y, z, u, v`
const VERTEX_SIZE: u32 = 5;

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
struct QuadVertex {
    position: [f32; 3],
    tex_coord: [f32; 2],
}

impl QuadVertex {
    const fn new(x: f32, y: f32, u: f32, v: f32) -> Self {
        Self { position: [x, y, 0.0], tex_coord: [u, v] }
    }
}

/// Textured quad with its own vertex buffer and a shared material.
///
/// The quad spans `(0, 0)`–`(width, height)` in local space and is placed by
/// `position`. It must be [`load`](Self::load)ed before it can be drawn.
pub struct Sprite {
    name: String,
    width: f32,
    height: f32,
    pub position: Vec3,
    material_name: String,
    material: Rc<Material>,
    buffer: Option<GlBuffer>,
}

impl Sprite {
    /// Takes one reference to `material_name`.
    pub fn new(
        name: impl Into<String>,
        material_name: &str,
        width: f32,
        height: f32,
        materials: &mut MaterialManager,
    ) -> Result<Self> {
        let material = materials.acquire(material_name)?;
        Ok(Self {
            name: name.into(),
            width,
            height,
            position: Vec3::ZERO,
            material_name: material_name.to_string(),
            material,
            buffer: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }

    pub fn material_name(&self) -> &str {
        &self.material_name
    }

    pub fn material(&self) -> &Rc<Material> {
        &self.material
    }

    pub fn is_loaded(&self) -> bool {
        self.buffer.is_some()
    }

    /// Builds and uploads the quad. Loading again replaces the old buffer.
    pub fn load(&mut self, gl: &mut dyn GraphicsContext, shader: &Shader) -> Result<()> {
        let position = shader.attribute_location("a_position")?;
        let tex_coord = shader.attribute_location("a_texCoord")?;

        let mut buffer = GlBuffer::vertices(gl, VERTEX_SIZE)?;
        buffer.add_attribute_location(AttributeInfo::new(position, 3, 0));
        buffer.add_attribute_location(AttributeInfo::new(tex_coord, 2, 3));

        let (w, h) = (self.width, self.height);
        let vertices = [
            QuadVertex::new(0.0, 0.0, 0.0, 0.0),
            QuadVertex::new(0.0, h, 0.0, 1.0),
            QuadVertex::new(w, h, 1.0, 1.0),
            QuadVertex::new(w, h, 1.0, 1.0),
            QuadVertex::new(w, 0.0, 1.0, 0.0),
            QuadVertex::new(0.0, 0.0, 0.0, 0.0),
        ];
        buffer.push_back_data(bytemuck::cast_slice::<QuadVertex, f32>(&vertices));
        buffer.upload(gl);
        buffer.unbind(gl);

        if let Some(old) = self.buffer.replace(buffer) {
            old.destroy(gl);
        }
        log::debug!("sprite '{}' loaded ({}x{})", self.name, w, h);
        Ok(())
    }

    /// Draws the quad with `shader`, which must already be in use.
    pub fn draw(&self, gl: &mut dyn GraphicsContext, shader: &Shader) -> Result<()> {
        let buffer = self
            .buffer
            .as_ref()
            .ok_or_else(|| EngineError::SpriteNotLoaded(self.name.clone()))?;

        self.material.diffuse_texture().activate_and_bind(gl, 0);
        gl.uniform_1i(shader.uniform_location("u_diffuse")?, 0);
        gl.uniform_4f(shader.uniform_location("u_tint")?, self.material.tint().to_array());
        let model = Mat4::from_translation(self.position).to_cols_array();
        gl.uniform_matrix_4fv(shader.uniform_location("u_model")?, &model);

        buffer.bind(gl, false);
        buffer.draw(gl);
        buffer.unbind(gl);
        Ok(())
    }

    /// Frees the vertex buffer, then gives back the material reference.
    pub fn destroy(self, materials: &mut MaterialManager, deps: MaterialDeps<'_>) -> ReleaseOutcome {
        if let Some(buffer) = self.buffer {
            buffer.destroy(&mut *deps.gpu.gl);
        }
        drop(self.material);
        log::debug!("sprite '{}' destroyed", self.name);
        materials.release(&self.material_name, deps)
    }
}
