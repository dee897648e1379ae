use crate::device::{BufferHandle, BufferTarget, BufferUsage, DataType, DrawMode, GraphicsContext};
use crate::error::{EngineError, Result};

/// Layout of one vertex attribute inside an interleaved buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct AttributeInfo {
    /// Shader attribute location.
    pub location: u32,
    /// Number of components (e.g. 3 for a `vec3`).
    pub size: u32,
    /// Offset from the start of a vertex, in elements (not bytes).
    pub offset: u32,
}

impl AttributeInfo {
    #[inline]
    pub const fn new(location: u32, size: u32, offset: u32) -> Self {
        Self { location, size, offset }
    }
}

/// CPU-side staging + GPU buffer object.
///
/// Data is accumulated with [`push_back_data`](Self::push_back_data) and sent
/// to the GPU by [`upload`](Self::upload). Stride and type size are fixed at
/// construction.
///
/// Lifecycle: `new` → `push_back_data`* → `upload` → (`bind` → `draw` →
/// `unbind`)* → `destroy`. `destroy` consumes the buffer, so it cannot be
/// called twice or followed by further use.
#[derive(Debug)]
pub struct GlBuffer {
    handle: BufferHandle,
    element_size: u32,
    data_type: DataType,
    type_size: u32,
    stride: u32,
    target: BufferTarget,
    mode: DrawMode,

    data: Vec<f32>,
    /// Values sent by the last upload; draws are sized from this.
    uploaded: usize,
    attributes: Vec<AttributeInfo>,
}

impl GlBuffer {
    /// Creates a buffer holding records of `element_size` values of `data_type`.
    pub fn new(
        gl: &mut dyn GraphicsContext,
        element_size: u32,
        data_type: DataType,
        target: BufferTarget,
        mode: DrawMode,
    ) -> Result<Self> {
        let type_size = data_type.size_in_bytes();
        let handle = gl.create_buffer().map_err(EngineError::Context)?;
        Ok(Self {
            handle,
            element_size,
            data_type,
            type_size,
            stride: element_size * type_size,
            target,
            mode,
            data: Vec::new(),
            uploaded: 0,
            attributes: Vec::new(),
        })
    }

    /// Float vertex buffer drawn as a triangle list.
    pub fn vertices(gl: &mut dyn GraphicsContext, element_size: u32) -> Result<Self> {
        Self::new(gl, element_size, DataType::Float, BufferTarget::ArrayBuffer, DrawMode::Triangles)
    }

    /// Same as [`new`](Self::new) but validates a raw GL data type enum first.
    pub fn with_gl_type(
        gl: &mut dyn GraphicsContext,
        element_size: u32,
        gl_data_type: u32,
        target: BufferTarget,
        mode: DrawMode,
    ) -> Result<Self> {
        let data_type = DataType::try_from(gl_data_type)?;
        Self::new(gl, element_size, data_type, target, mode)
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn element_size(&self) -> u32 {
        self.element_size
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn type_size(&self) -> u32 {
        self.type_size
    }

    /// Bytes between consecutive records.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn data_len(&self) -> usize {
        self.data.len()
    }

    /// Values the GPU buffer holds as of the last upload.
    pub fn uploaded_len(&self) -> usize {
        self.uploaded
    }

    pub fn attributes(&self) -> &[AttributeInfo] {
        &self.attributes
    }

    pub fn add_attribute_location(&mut self, info: AttributeInfo) {
        self.attributes.push(info);
    }

    /// Appends flat, interleaved values (e.g. `x, y, z, u, v` per vertex).
    pub fn push_back_data(&mut self, values: &[f32]) {
        self.data.extend_from_slice(values);
    }

    /// Clears the staged values. GPU contents are untouched until the next upload.
    pub fn clear_data(&mut self) {
        self.data.clear();
    }

    /// Sends all staged values to the GPU, replacing any previous contents.
    pub fn upload(&mut self, gl: &mut dyn GraphicsContext) {
        gl.bind_buffer(self.target, Some(self.handle));
        let bytes = self.encode();
        log::trace!(
            "uploading {} values ({} bytes) to {:?}",
            self.data.len(),
            bytes.len(),
            self.handle
        );
        gl.buffer_data(self.target, &bytes, BufferUsage::StaticDraw);
        self.uploaded = self.data.len();
    }

    fn encode(&self) -> Vec<u8> {
        fn cast<T: bytemuck::Pod>(values: Vec<T>) -> Vec<u8> {
            bytemuck::cast_slice::<T, u8>(&values).to_vec()
        }

        let d = &self.data;
        match self.data_type {
            DataType::Float => bytemuck::cast_slice::<f32, u8>(d).to_vec(),
            DataType::Int => cast(d.iter().map(|v| *v as i32).collect()),
            DataType::UnsignedInt => cast(d.iter().map(|v| *v as u32).collect()),
            DataType::Short => cast(d.iter().map(|v| *v as i16).collect()),
            DataType::UnsignedShort => cast(d.iter().map(|v| *v as u16).collect()),
            DataType::Byte => cast(d.iter().map(|v| *v as i8).collect()),
            DataType::UnsignedByte => d.iter().map(|v| *v as u8).collect(),
        }
    }

    /// Binds the buffer and, for vertex data, configures and enables every
    /// declared attribute.
    pub fn bind(&self, gl: &mut dyn GraphicsContext, normalized: bool) {
        gl.bind_buffer(self.target, Some(self.handle));

        for attr in &self.attributes {
            gl.vertex_attrib_pointer(
                attr.location,
                attr.size,
                self.data_type,
                normalized,
                self.stride,
                attr.offset * self.type_size,
            );
            gl.enable_vertex_attrib_array(attr.location);
        }
    }

    /// Disables exactly the attributes `bind` enabled and unbinds the target.
    pub fn unbind(&self, gl: &mut dyn GraphicsContext) {
        for attr in &self.attributes {
            gl.disable_vertex_attrib_array(attr.location);
        }
        gl.bind_buffer(self.target, None);
    }

    /// Issues the draw call for the uploaded contents.
    ///
    /// Array buffers draw `uploaded / element_size` vertices; element buffers
    /// draw `uploaded` indices. Staged values that were never uploaded do not
    /// count.
    pub fn draw(&self, gl: &mut dyn GraphicsContext) {
        match self.target {
            BufferTarget::ArrayBuffer => {
                let count = self.uploaded as u32 / self.element_size.max(1);
                gl.draw_arrays(self.mode, 0, count);
            }
            BufferTarget::ElementArrayBuffer => {
                gl.draw_elements(self.mode, self.uploaded as u32, self.data_type, 0);
            }
        }
    }

    pub fn destroy(self, gl: &mut dyn GraphicsContext) {
        gl.delete_buffer(self.handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{DrawKind, HeadlessContext};

    const BASIC_VS: &str = "
        attribute vec3 a_position;
        attribute vec2 a_texCoord;
        varying vec2 v_texCoord;
        void main() {
            v_texCoord = a_texCoord;
            gl_Position = vec4(a_position, 1.0);
        }";

    const BASIC_FS: &str = "
        precision mediump float;
        varying vec2 v_texCoord;
        void main() { gl_FragColor = vec4(v_texCoord, 0.0, 1.0); }";

    fn use_basic_program(gl: &mut HeadlessContext) {
        use crate::device::ShaderStage;
        let vs = gl.compile_shader(ShaderStage::Vertex, BASIC_VS).unwrap();
        let fs = gl.compile_shader(ShaderStage::Fragment, BASIC_FS).unwrap();
        let p = gl.link_program(vs, fs).unwrap();
        gl.use_program(Some(p));
    }

    #[test]
    fn stride_is_resolved_at_construction() {
        let mut gl = HeadlessContext::new();
        let b = GlBuffer::new(&mut gl, 5, DataType::Float, BufferTarget::ArrayBuffer, DrawMode::Triangles)
            .unwrap();
        assert_eq!(b.type_size(), 4);
        assert_eq!(b.stride(), 20);

        let b = GlBuffer::new(&mut gl, 3, DataType::UnsignedShort, BufferTarget::ElementArrayBuffer, DrawMode::Triangles)
            .unwrap();
        assert_eq!(b.stride(), 6);
    }

    #[test]
    fn unsupported_gl_type_fails_before_creating_a_buffer() {
        let mut gl = HeadlessContext::new();
        let err = GlBuffer::with_gl_type(&mut gl, 3, 0x140A, BufferTarget::ArrayBuffer, DrawMode::Triangles)
            .unwrap_err();
        assert_eq!(err, EngineError::UnsupportedDataType(0x140A));
        assert_eq!(gl.live_buffers(), 0);
    }

    #[test]
    fn draw_vertex_count_is_len_over_element_size() {
        let mut gl = HeadlessContext::new();
        use_basic_program(&mut gl);

        let n = 7;
        let mut b = GlBuffer::vertices(&mut gl, 5).unwrap();
        b.add_attribute_location(AttributeInfo::new(0, 3, 0));
        b.add_attribute_location(AttributeInfo::new(1, 2, 3));
        b.push_back_data(&vec![0.5; n * 5]);
        b.upload(&mut gl);
        b.bind(&mut gl, false);
        b.draw(&mut gl);

        let call = &gl.draw_calls()[0];
        assert_eq!(call.kind, DrawKind::Arrays { first: 0, count: n as u32 });
        assert_eq!(call.enabled_attributes, vec![0, 1]);
        assert!(gl.errors().is_empty(), "{:?}", gl.errors());
    }

    #[test]
    fn attribute_offset_is_converted_to_bytes() {
        let mut gl = HeadlessContext::new();
        let mut b = GlBuffer::vertices(&mut gl, 5).unwrap();
        b.add_attribute_location(AttributeInfo::new(1, 2, 3));
        b.bind(&mut gl, false);

        let ptr = gl.attrib_pointer(1).unwrap();
        assert_eq!(ptr.offset, 12);
        assert_eq!(ptr.stride, 20);
        assert_eq!(ptr.size, 2);
        assert_eq!(ptr.buffer, b.handle());
    }

    #[test]
    fn unbind_mirrors_bind() {
        let mut gl = HeadlessContext::new();
        gl.enable_vertex_attrib_array(7);

        let mut b = GlBuffer::vertices(&mut gl, 5).unwrap();
        b.add_attribute_location(AttributeInfo::new(0, 3, 0));
        b.add_attribute_location(AttributeInfo::new(1, 2, 3));
        b.bind(&mut gl, true);
        assert_eq!(gl.enabled_attributes(), vec![0, 1, 7]);
        assert!(gl.attrib_pointer(0).unwrap().normalized);

        b.unbind(&mut gl);
        // Attribute 7 was not enabled by this buffer and stays enabled.
        assert_eq!(gl.enabled_attributes(), vec![7]);
        assert_eq!(gl.bound_buffer(BufferTarget::ArrayBuffer), None);
    }

    #[test]
    fn upload_converts_to_configured_type_and_replaces() {
        let mut gl = HeadlessContext::new();
        let mut b = GlBuffer::new(&mut gl, 1, DataType::UnsignedShort, BufferTarget::ElementArrayBuffer, DrawMode::Triangles)
            .unwrap();
        b.push_back_data(&[0.0, 1.0, 2.0]);
        b.upload(&mut gl);
        assert_eq!(gl.buffer_contents(b.handle()), Some(&[0u8, 0, 1, 0, 2, 0][..]));

        b.clear_data();
        b.push_back_data(&[258.0]);
        b.upload(&mut gl);
        assert_eq!(gl.buffer_contents(b.handle()), Some(&[2u8, 1][..]));
    }

    #[test]
    fn element_buffer_draws_indexed() {
        let mut gl = HeadlessContext::new();
        use_basic_program(&mut gl);

        let mut b = GlBuffer::new(&mut gl, 1, DataType::UnsignedShort, BufferTarget::ElementArrayBuffer, DrawMode::Triangles)
            .unwrap();
        b.push_back_data(&[0.0, 1.0, 2.0, 0.0, 2.0, 3.0]);
        b.upload(&mut gl);
        b.bind(&mut gl, false);
        b.draw(&mut gl);

        assert_eq!(
            gl.draw_calls()[0].kind,
            DrawKind::Elements { count: 6, index_type: DataType::UnsignedShort, offset: 0 }
        );
        assert!(gl.errors().is_empty(), "{:?}", gl.errors());
    }

    #[test]
    fn draw_counts_what_was_uploaded_not_what_is_staged() {
        let mut gl = HeadlessContext::new();
        use_basic_program(&mut gl);

        let mut b = GlBuffer::vertices(&mut gl, 5).unwrap();
        b.add_attribute_location(AttributeInfo::new(0, 3, 0));
        b.add_attribute_location(AttributeInfo::new(1, 2, 3));
        b.push_back_data(&[0.25; 15]);
        b.upload(&mut gl);
        b.bind(&mut gl, false);

        b.clear_data();
        b.draw(&mut gl);
        assert_eq!(gl.buffer_contents(b.handle()).map(<[u8]>::len), Some(60));
        assert_eq!(gl.draw_calls()[0].kind, DrawKind::Arrays { first: 0, count: 3 });

        b.push_back_data(&[0.5; 30]);
        b.draw(&mut gl);
        assert_eq!(gl.draw_calls()[1].kind, DrawKind::Arrays { first: 0, count: 3 });
        assert_eq!(b.uploaded_len(), 15);

        b.upload(&mut gl);
        b.bind(&mut gl, false);
        b.draw(&mut gl);
        assert_eq!(gl.draw_calls()[2].kind, DrawKind::Arrays { first: 0, count: 6 });
        assert!(gl.errors().is_empty(), "{:?}", gl.errors());
    }

    #[test]
    fn destroy_releases_the_gpu_buffer() {
        let mut gl = HeadlessContext::new();
        let b = GlBuffer::vertices(&mut gl, 3).unwrap();
        assert_eq!(gl.live_buffers(), 1);
        b.destroy(&mut gl);
        assert_eq!(gl.live_buffers(), 0);
        assert!(gl.errors().is_empty());
    }
}
