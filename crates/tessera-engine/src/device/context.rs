use super::types::{
    ActiveInfo, BufferHandle, BufferTarget, BufferUsage, DataType, DrawMode, ProgramHandle,
    ShaderHandle, ShaderStage, TextureHandle, UniformLocation,
};

/// Immediate-mode graphics context supplied by the host platform layer.
///
/// The shape follows the GL/WebGL object model: objects are created and named
/// by handle, state is bound to targets, and draw calls consume whatever is
/// bound. Implementations own all driver state; the engine only holds handles.
///
/// Fallible creation methods return the driver's diagnostic text on failure.
pub trait GraphicsContext {
    // ── buffers ───────────────────────────────────────────────────────────

    fn create_buffer(&mut self) -> Result<BufferHandle, String>;
    fn delete_buffer(&mut self, buffer: BufferHandle);
    /// Binds `buffer` to `target`; `None` unbinds the target.
    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>);
    /// Replaces the contents of the buffer bound to `target`.
    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], usage: BufferUsage);

    // ── vertex attributes ─────────────────────────────────────────────────

    /// Describes attribute `location` as read from the bound array buffer.
    /// `stride` and `offset` are in bytes.
    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        size: u32,
        data_type: DataType,
        normalized: bool,
        stride: u32,
        offset: u32,
    );
    fn enable_vertex_attrib_array(&mut self, location: u32);
    fn disable_vertex_attrib_array(&mut self, location: u32);

    // ── draw calls ────────────────────────────────────────────────────────

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32);
    /// Indexed draw from the bound element array buffer; `offset` in bytes.
    fn draw_elements(&mut self, mode: DrawMode, count: u32, index_type: DataType, offset: u32);

    // ── shaders ───────────────────────────────────────────────────────────

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String>;
    fn delete_shader(&mut self, shader: ShaderHandle);
    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String>;
    fn delete_program(&mut self, program: ProgramHandle);
    /// Attributes the linker kept, with their assigned locations.
    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveInfo>;
    /// Uniforms the linker kept, with their locations.
    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveInfo>;
    fn use_program(&mut self, program: Option<ProgramHandle>);

    // ── uniforms (apply to the current program) ───────────────────────────

    fn uniform_1i(&mut self, location: UniformLocation, value: i32);
    fn uniform_4f(&mut self, location: UniformLocation, value: [f32; 4]);
    fn uniform_matrix_4fv(&mut self, location: UniformLocation, value: &[f32; 16]);

    // ── textures ──────────────────────────────────────────────────────────

    fn create_texture(&mut self) -> Result<TextureHandle, String>;
    fn delete_texture(&mut self, texture: TextureHandle);
    /// Selects the texture unit subsequent `bind_texture` calls apply to.
    fn active_texture(&mut self, unit: u32);
    fn bind_texture(&mut self, texture: Option<TextureHandle>);
    /// Uploads tightly packed RGBA8 pixels to the bound texture (level 0).
    fn tex_image_2d(&mut self, width: u32, height: u32, pixels: &[u8]);

    // ── surface ───────────────────────────────────────────────────────────

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn clear_color(&mut self, rgba: [f32; 4]);
    fn clear(&mut self);
}
