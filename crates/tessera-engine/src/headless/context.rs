use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::device::{
    ActiveInfo, BufferHandle, BufferTarget, BufferUsage, DataType, DrawMode, GraphicsContext,
    ProgramHandle, ShaderHandle, ShaderStage, TextureHandle, UniformLocation,
};

use super::glsl::{self, StageInterface};

/// Attribute pointer state captured by `vertex_attrib_pointer`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AttribPointer {
    /// Array buffer bound when the pointer was set.
    pub buffer: BufferHandle,
    pub size: u32,
    pub data_type: DataType,
    pub normalized: bool,
    pub stride: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UniformValue {
    Int(i32),
    Vec4([f32; 4]),
    Mat4([f32; 16]),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum DrawKind {
    Arrays { first: u32, count: u32 },
    Elements { count: u32, index_type: DataType, offset: u32 },
}

/// Snapshot of the state a draw call was issued with.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawCall {
    pub mode: DrawMode,
    pub kind: DrawKind,
    pub program: Option<ProgramHandle>,
    pub enabled_attributes: Vec<u32>,
    pub texture_unit0: Option<TextureHandle>,
}

impl DrawCall {
    /// Vertex count for array draws, index count for element draws.
    pub fn count(&self) -> u32 {
        match self.kind {
            DrawKind::Arrays { count, .. } | DrawKind::Elements { count, .. } => count,
        }
    }
}

#[derive(Debug)]
struct CompiledShader {
    stage: ShaderStage,
    iface: StageInterface,
}

#[derive(Debug)]
struct LinkedProgram {
    attributes: Vec<ActiveInfo>,
    uniforms: Vec<ActiveInfo>,
}

#[derive(Debug, Default)]
struct TextureImage {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

/// In-process [`GraphicsContext`] that keeps every object in CPU memory.
///
/// Shader sources are checked by a small GLSL front-end, so compile and link
/// failures carry driver-style logs and introspection reports exactly the
/// declared-and-referenced attributes and uniforms. Draw calls are recorded
/// with a snapshot of the bound state instead of rasterizing anything.
///
/// Misuse that a GL driver would flag with `GL_INVALID_OPERATION` is logged
/// and collected in [`HeadlessContext::errors`].
#[derive(Debug, Default)]
pub struct HeadlessContext {
    next_id: u32,

    buffers: HashMap<BufferHandle, Vec<u8>>,
    bound_buffers: HashMap<BufferTarget, BufferHandle>,
    attrib_pointers: BTreeMap<u32, AttribPointer>,
    enabled_attribs: BTreeSet<u32>,

    shaders: HashMap<ShaderHandle, CompiledShader>,
    programs: HashMap<ProgramHandle, LinkedProgram>,
    current_program: Option<ProgramHandle>,
    uniform_values: HashMap<UniformLocation, UniformValue>,

    textures: HashMap<TextureHandle, TextureImage>,
    active_unit: u32,
    bound_textures: BTreeMap<u32, TextureHandle>,

    viewport: (i32, i32, u32, u32),
    clear_color: [f32; 4],
    clear_count: u64,

    draw_calls: Vec<DrawCall>,
    errors: Vec<String>,
}

impl HeadlessContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn invalid(&mut self, msg: String) {
        log::warn!("headless gl: {msg}");
        self.errors.push(msg);
    }

    // ── inspection ────────────────────────────────────────────────────────

    /// Draw calls issued since creation (or the last `take_draw_calls`).
    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.draw_calls
    }

    pub fn take_draw_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.draw_calls)
    }

    /// Invalid operations observed so far.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(&buffer).map(Vec::as_slice)
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_shaders(&self) -> usize {
        self.shaders.len()
    }

    pub fn bound_buffer(&self, target: BufferTarget) -> Option<BufferHandle> {
        self.bound_buffers.get(&target).copied()
    }

    pub fn attrib_pointer(&self, location: u32) -> Option<AttribPointer> {
        self.attrib_pointers.get(&location).copied()
    }

    pub fn enabled_attributes(&self) -> Vec<u32> {
        self.enabled_attribs.iter().copied().collect()
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.current_program
    }

    pub fn uniform_value(&self, location: UniformLocation) -> Option<&UniformValue> {
        self.uniform_values.get(&location)
    }

    /// Uniform value looked up by name in the current program.
    pub fn current_uniform(&self, name: &str) -> Option<&UniformValue> {
        let program = self.current_program?;
        let info = self.programs.get(&program)?.uniforms.iter().find(|u| u.name == name)?;
        self.uniform_values.get(&UniformLocation { program, index: info.location })
    }

    /// `(width, height, rgba)` of a texture's level-0 image.
    pub fn texture_image(&self, texture: TextureHandle) -> Option<(u32, u32, &[u8])> {
        self.textures
            .get(&texture)
            .map(|t| (t.width, t.height, t.pixels.as_slice()))
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureHandle> {
        self.bound_textures.get(&unit).copied()
    }

    pub fn viewport_rect(&self) -> (i32, i32, u32, u32) {
        self.viewport
    }

    pub fn clear_rgba(&self) -> [f32; 4] {
        self.clear_color
    }

    pub fn clear_count(&self) -> u64 {
        self.clear_count
    }

    fn check_array_draw(&mut self, first: u32, count: u32) {
        if count == 0 {
            return;
        }
        let last = first + count - 1;
        let enabled: Vec<u32> = self.enabled_attribs.iter().copied().collect();
        for location in enabled {
            let Some(ptr) = self.attrib_pointers.get(&location).copied() else {
                self.invalid(format!("attribute {location} enabled without a pointer"));
                continue;
            };
            let Some(len) = self.buffers.get(&ptr.buffer).map(Vec::len) else {
                self.invalid(format!("attribute {location} reads from a deleted buffer"));
                continue;
            };
            let end = ptr.offset as usize
                + last as usize * ptr.stride as usize
                + (ptr.size * ptr.data_type.size_in_bytes()) as usize;
            if end > len {
                self.invalid(format!(
                    "attribute {location} reads {end} bytes from a {len}-byte buffer"
                ));
            }
        }
    }

    fn record_draw(&mut self, mode: DrawMode, kind: DrawKind) {
        if self.current_program.is_none() {
            self.invalid("draw call issued with no program in use".to_string());
        }
        let call = DrawCall {
            mode,
            kind,
            program: self.current_program,
            enabled_attributes: self.enabled_attributes(),
            texture_unit0: self.bound_texture(0),
        };
        log::trace!("headless gl: draw {call:?}");
        self.draw_calls.push(call);
    }

    fn set_uniform(&mut self, location: UniformLocation, value: UniformValue) {
        if self.current_program != Some(location.program) {
            self.invalid(format!(
                "uniform {} set while program {:?} is not current",
                location.index, location.program
            ));
            return;
        }
        self.uniform_values.insert(location, value);
    }
}

impl GraphicsContext for HeadlessContext {
    fn create_buffer(&mut self) -> Result<BufferHandle, String> {
        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, Vec::new());
        Ok(handle)
    }

    fn delete_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_none() {
            self.invalid(format!("delete of unknown buffer {buffer:?}"));
            return;
        }
        self.bound_buffers.retain(|_, b| *b != buffer);
    }

    fn bind_buffer(&mut self, target: BufferTarget, buffer: Option<BufferHandle>) {
        match buffer {
            Some(b) if !self.buffers.contains_key(&b) => {
                self.invalid(format!("bind of unknown buffer {b:?}"));
            }
            Some(b) => {
                self.bound_buffers.insert(target, b);
            }
            None => {
                self.bound_buffers.remove(&target);
            }
        }
    }

    fn buffer_data(&mut self, target: BufferTarget, data: &[u8], _usage: BufferUsage) {
        let Some(handle) = self.bound_buffer(target) else {
            self.invalid(format!("buffer_data with nothing bound to {target:?}"));
            return;
        };
        if let Some(storage) = self.buffers.get_mut(&handle) {
            storage.clear();
            storage.extend_from_slice(data);
        }
    }

    fn vertex_attrib_pointer(
        &mut self,
        location: u32,
        size: u32,
        data_type: DataType,
        normalized: bool,
        stride: u32,
        offset: u32,
    ) {
        let Some(buffer) = self.bound_buffer(BufferTarget::ArrayBuffer) else {
            self.invalid(format!("attribute pointer {location} with no array buffer bound"));
            return;
        };
        if !(1..=4).contains(&size) {
            self.invalid(format!("attribute {location} size {size} out of range"));
            return;
        }
        self.attrib_pointers.insert(
            location,
            AttribPointer { buffer, size, data_type, normalized, stride, offset },
        );
    }

    fn enable_vertex_attrib_array(&mut self, location: u32) {
        self.enabled_attribs.insert(location);
    }

    fn disable_vertex_attrib_array(&mut self, location: u32) {
        self.enabled_attribs.remove(&location);
    }

    fn draw_arrays(&mut self, mode: DrawMode, first: u32, count: u32) {
        self.check_array_draw(first, count);
        self.record_draw(mode, DrawKind::Arrays { first, count });
    }

    fn draw_elements(&mut self, mode: DrawMode, count: u32, index_type: DataType, offset: u32) {
        match self.bound_buffer(BufferTarget::ElementArrayBuffer) {
            None => self.invalid("draw_elements with no element array buffer bound".to_string()),
            Some(ibo) => {
                let len = self.buffers.get(&ibo).map_or(0, Vec::len);
                let end = offset as usize + count as usize * index_type.size_in_bytes() as usize;
                if end > len {
                    self.invalid(format!("draw_elements reads {end} bytes from a {len}-byte buffer"));
                }
            }
        }
        self.record_draw(mode, DrawKind::Elements { count, index_type, offset });
    }

    fn compile_shader(&mut self, stage: ShaderStage, source: &str) -> Result<ShaderHandle, String> {
        let iface = glsl::scan(stage, source)?;
        let handle = ShaderHandle(self.next_id());
        self.shaders.insert(handle, CompiledShader { stage, iface });
        Ok(handle)
    }

    fn delete_shader(&mut self, shader: ShaderHandle) {
        if self.shaders.remove(&shader).is_none() {
            self.invalid(format!("delete of unknown shader {shader:?}"));
        }
    }

    fn link_program(
        &mut self,
        vertex: ShaderHandle,
        fragment: ShaderHandle,
    ) -> Result<ProgramHandle, String> {
        let (Some(vs), Some(fs)) = (self.shaders.get(&vertex), self.shaders.get(&fragment)) else {
            return Err("ERROR: attached shader object does not exist".to_string());
        };
        if vs.stage != ShaderStage::Vertex || fs.stage != ShaderStage::Fragment {
            return Err("ERROR: program requires one vertex and one fragment shader".to_string());
        }

        for varying in fs.iface.varyings.iter().filter(|v| v.used) {
            if !vs.iface.varyings.iter().any(|v| v.name == varying.name) {
                return Err(format!(
                    "ERROR: Varying '{}' is not written by the vertex shader",
                    varying.name
                ));
            }
        }

        let attributes: Vec<ActiveInfo> = vs
            .iface
            .attributes
            .iter()
            .filter(|a| a.used)
            .enumerate()
            .map(|(i, a)| ActiveInfo { name: a.name.clone(), location: i as u32 })
            .collect();

        let mut uniforms: Vec<ActiveInfo> = Vec::new();
        for u in vs.iface.uniforms.iter().chain(&fs.iface.uniforms).filter(|u| u.used) {
            if !uniforms.iter().any(|known| known.name == u.name) {
                let location = uniforms.len() as u32;
                uniforms.push(ActiveInfo { name: u.name.clone(), location });
            }
        }

        let handle = ProgramHandle(self.next_id());
        self.programs.insert(handle, LinkedProgram { attributes, uniforms });
        Ok(handle)
    }

    fn delete_program(&mut self, program: ProgramHandle) {
        if self.programs.remove(&program).is_none() {
            self.invalid(format!("delete of unknown program {program:?}"));
            return;
        }
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        self.uniform_values.retain(|loc, _| loc.program != program);
    }

    fn active_attributes(&self, program: ProgramHandle) -> Vec<ActiveInfo> {
        self.programs
            .get(&program)
            .map(|p| p.attributes.clone())
            .unwrap_or_default()
    }

    fn active_uniforms(&self, program: ProgramHandle) -> Vec<ActiveInfo> {
        self.programs
            .get(&program)
            .map(|p| p.uniforms.clone())
            .unwrap_or_default()
    }

    fn use_program(&mut self, program: Option<ProgramHandle>) {
        match program {
            Some(p) if !self.programs.contains_key(&p) => {
                self.invalid(format!("use of unknown program {p:?}"));
            }
            other => self.current_program = other,
        }
    }

    fn uniform_1i(&mut self, location: UniformLocation, value: i32) {
        self.set_uniform(location, UniformValue::Int(value));
    }

    fn uniform_4f(&mut self, location: UniformLocation, value: [f32; 4]) {
        self.set_uniform(location, UniformValue::Vec4(value));
    }

    fn uniform_matrix_4fv(&mut self, location: UniformLocation, value: &[f32; 16]) {
        self.set_uniform(location, UniformValue::Mat4(*value));
    }

    fn create_texture(&mut self) -> Result<TextureHandle, String> {
        let handle = TextureHandle(self.next_id());
        self.textures.insert(handle, TextureImage::default());
        Ok(handle)
    }

    fn delete_texture(&mut self, texture: TextureHandle) {
        if self.textures.remove(&texture).is_none() {
            self.invalid(format!("delete of unknown texture {texture:?}"));
            return;
        }
        self.bound_textures.retain(|_, t| *t != texture);
    }

    fn active_texture(&mut self, unit: u32) {
        self.active_unit = unit;
    }

    fn bind_texture(&mut self, texture: Option<TextureHandle>) {
        match texture {
            Some(t) if !self.textures.contains_key(&t) => {
                self.invalid(format!("bind of unknown texture {t:?}"));
            }
            Some(t) => {
                self.bound_textures.insert(self.active_unit, t);
            }
            None => {
                self.bound_textures.remove(&self.active_unit);
            }
        }
    }

    fn tex_image_2d(&mut self, width: u32, height: u32, pixels: &[u8]) {
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            self.invalid(format!(
                "tex_image_2d expected {expected} bytes for {width}x{height}, got {}",
                pixels.len()
            ));
            return;
        }
        let Some(handle) = self.bound_texture(self.active_unit) else {
            self.invalid(format!("tex_image_2d with no texture bound to unit {}", self.active_unit));
            return;
        };
        if let Some(image) = self.textures.get_mut(&handle) {
            image.width = width;
            image.height = height;
            image.pixels = pixels.to_vec();
        }
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = (x, y, width, height);
    }

    fn clear_color(&mut self, rgba: [f32; 4]) {
        self.clear_color = rgba;
    }

    fn clear(&mut self) {
        self.clear_count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VS: &str = "
        attribute vec3 a_position;
        uniform vec4 u_offset;
        varying vec4 v_color;
        void main() {
            v_color = u_offset;
            gl_Position = vec4(a_position, 1.0) + u_offset;
        }";

    const FS: &str = "
        precision mediump float;
        uniform vec4 u_color;
        uniform vec4 u_offset;
        varying vec4 v_color;
        void main() {
            gl_FragColor = u_color * v_color + u_offset;
        }";

    fn program(gl: &mut HeadlessContext) -> ProgramHandle {
        let vs = gl.compile_shader(ShaderStage::Vertex, VS).unwrap();
        let fs = gl.compile_shader(ShaderStage::Fragment, FS).unwrap();
        gl.link_program(vs, fs).unwrap()
    }

    #[test]
    fn uniforms_shared_between_stages_are_reported_once() {
        let mut gl = HeadlessContext::new();
        let p = program(&mut gl);
        let names: Vec<String> = gl.active_uniforms(p).into_iter().map(|u| u.name).collect();
        assert_eq!(names, vec!["u_offset", "u_color"]);
        assert_eq!(gl.active_attributes(p), vec![ActiveInfo { name: "a_position".into(), location: 0 }]);
    }

    #[test]
    fn link_fails_on_unwritten_varying() {
        let mut gl = HeadlessContext::new();
        let vs = gl
            .compile_shader(ShaderStage::Vertex, "attribute vec3 a;\nvoid main() { gl_Position = vec4(a, 1.0); }")
            .unwrap();
        let fs = gl
            .compile_shader(
                ShaderStage::Fragment,
                "varying vec2 v_uv;\nvoid main() { gl_FragColor = vec4(v_uv, 0.0, 1.0); }",
            )
            .unwrap();
        let err = gl.link_program(vs, fs).unwrap_err();
        assert!(err.contains("v_uv"), "{err}");
        assert_eq!(gl.live_programs(), 0);
    }

    #[test]
    fn buffer_data_replaces_contents_of_bound_buffer() {
        let mut gl = HeadlessContext::new();
        let b = gl.create_buffer().unwrap();
        gl.bind_buffer(BufferTarget::ArrayBuffer, Some(b));
        gl.buffer_data(BufferTarget::ArrayBuffer, &[1, 2, 3, 4], BufferUsage::StaticDraw);
        gl.buffer_data(BufferTarget::ArrayBuffer, &[9, 9], BufferUsage::StaticDraw);
        assert_eq!(gl.buffer_contents(b), Some(&[9u8, 9][..]));
        assert!(gl.errors().is_empty());
    }

    #[test]
    fn buffer_data_without_binding_is_an_invalid_operation() {
        let mut gl = HeadlessContext::new();
        gl.buffer_data(BufferTarget::ElementArrayBuffer, &[0, 1], BufferUsage::StaticDraw);
        assert_eq!(gl.errors().len(), 1);
    }

    #[test]
    fn draw_past_end_of_buffer_is_flagged() {
        let mut gl = HeadlessContext::new();
        let p = program(&mut gl);
        gl.use_program(Some(p));

        let b = gl.create_buffer().unwrap();
        gl.bind_buffer(BufferTarget::ArrayBuffer, Some(b));
        gl.buffer_data(BufferTarget::ArrayBuffer, &[0; 36], BufferUsage::StaticDraw);
        gl.vertex_attrib_pointer(0, 3, DataType::Float, false, 12, 0);
        gl.enable_vertex_attrib_array(0);

        gl.draw_arrays(DrawMode::Triangles, 0, 3);
        assert!(gl.errors().is_empty());

        gl.draw_arrays(DrawMode::Triangles, 0, 4);
        assert_eq!(gl.errors().len(), 1);
        assert_eq!(gl.draw_calls().len(), 2);
    }

    #[test]
    fn uniform_on_non_current_program_is_rejected() {
        let mut gl = HeadlessContext::new();
        let p = program(&mut gl);
        let loc = UniformLocation { program: p, index: 0 };
        gl.uniform_4f(loc, [1.0; 4]);
        assert_eq!(gl.errors().len(), 1);

        gl.use_program(Some(p));
        gl.uniform_4f(loc, [1.0; 4]);
        assert_eq!(gl.current_uniform("u_offset"), Some(&UniformValue::Vec4([1.0; 4])));
    }

    #[test]
    fn texture_upload_goes_to_active_unit_binding() {
        let mut gl = HeadlessContext::new();
        let t = gl.create_texture().unwrap();
        gl.active_texture(2);
        gl.bind_texture(Some(t));
        gl.tex_image_2d(1, 1, &[255, 0, 0, 255]);
        assert_eq!(gl.texture_image(t), Some((1, 1, &[255u8, 0, 0, 255][..])));
        assert_eq!(gl.bound_texture(2), Some(t));
        assert_eq!(gl.bound_texture(0), None);

        gl.delete_texture(t);
        assert_eq!(gl.bound_texture(2), None);
        assert_eq!(gl.live_textures(), 0);
    }
}
