use crate::error::EngineError;

/// Opaque buffer object handle issued by a [`super::GraphicsContext`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Opaque shader stage object handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ShaderHandle(pub u32);

/// Opaque linked program handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

/// Opaque texture object handle.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u32);

/// Uniform location inside a linked program.
///
/// Locations are only meaningful for the program they were queried from.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct UniformLocation {
    pub program: ProgramHandle,
    pub index: u32,
}

/// Name + location of an active attribute or uniform reported after linking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveInfo {
    pub name: String,
    pub location: u32,
}

/// Buffer binding target.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data.
    ArrayBuffer,
    /// Index data.
    ElementArrayBuffer,
}

/// Upload usage hint.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BufferUsage {
    StaticDraw,
    DynamicDraw,
}

/// Primitive assembly mode for draw calls.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawMode {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
    TriangleFan,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShaderStage::Vertex => f.write_str("vertex"),
            ShaderStage::Fragment => f.write_str("fragment"),
        }
    }
}

/// Fixed-width numeric kinds a buffer may hold.
///
/// Discriminants are the GL enum values so raw codes coming from a host can be
/// validated with `DataType::try_from(code)`.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u32)]
pub enum DataType {
    Byte = 0x1400,
    UnsignedByte = 0x1401,
    Short = 0x1402,
    UnsignedShort = 0x1403,
    Int = 0x1404,
    UnsignedInt = 0x1405,
    Float = 0x1406,
}

impl DataType {
    /// Size of one value in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> u32 {
        match self {
            DataType::Byte | DataType::UnsignedByte => 1,
            DataType::Short | DataType::UnsignedShort => 2,
            DataType::Int | DataType::UnsignedInt | DataType::Float => 4,
        }
    }

    #[inline]
    pub const fn gl_enum(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for DataType {
    type Error = EngineError;

    fn try_from(code: u32) -> Result<Self, Self::Error> {
        Ok(match code {
            0x1400 => DataType::Byte,
            0x1401 => DataType::UnsignedByte,
            0x1402 => DataType::Short,
            0x1403 => DataType::UnsignedShort,
            0x1404 => DataType::Int,
            0x1405 => DataType::UnsignedInt,
            0x1406 => DataType::Float,
            other => return Err(EngineError::UnsupportedDataType(other)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_sizes() {
        assert_eq!(DataType::Float.size_in_bytes(), 4);
        assert_eq!(DataType::UnsignedInt.size_in_bytes(), 4);
        assert_eq!(DataType::Short.size_in_bytes(), 2);
        assert_eq!(DataType::UnsignedByte.size_in_bytes(), 1);
    }

    #[test]
    fn gl_codes_round_trip_through_try_from() {
        for ty in [DataType::Byte, DataType::UnsignedShort, DataType::Float] {
            assert_eq!(DataType::try_from(ty.gl_enum()), Ok(ty));
        }
    }

    #[test]
    fn double_and_half_float_are_rejected() {
        // GL_DOUBLE, GL_HALF_FLOAT
        assert_eq!(
            DataType::try_from(0x140A),
            Err(EngineError::UnsupportedDataType(0x140A))
        );
        assert_eq!(
            DataType::try_from(0x140B),
            Err(EngineError::UnsupportedDataType(0x140B))
        );
    }
}
