//! Fixed-function pipeline state.
//!
//! A variant's [`PipelineState`] is built by folding the [`PartialPipelineState`]
//! of every applicable pipeline block onto [`PipelineState::default`]. Scalar
//! fields take the latest override; list fields are overwritten positionally.
//!
//! # Binary layout
//!
//! ```text
//! coverage_to_alpha:bool, blend_factor:f32x4, blend_attachments:[BlendAttachment],
//! depth_test:bool, depth_write:bool, stencil_test:bool,
//! stencil_read_mask:u8, stencil_write_mask:u8, stencil_reference:u32,
//! stencil_front:StencilState, stencil_back:StencilState,
//! cull_mode:u8, fill_mode:u8, front_face:u8, depth_clip:bool, scissor_test:bool,
//! primitive_topology:u8, depth_output:option<u8>, color_outputs:[{name:string, format:u8}],
//! output_samples:u8
//! ```

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec4;

use super::{NumericType, ScalarType};
use crate::error::FormatError;
use crate::formats::serialization::{
    BinarySerializable, read_array, read_bool, read_option, read_string, write_array, write_bool,
    write_option, write_string,
};

u8_enum! {
    pub enum BlendFactor {
        BlendFactor = 0,
        DstAlpha = 1,
        DstColor = 2,
        InvBlendFactor = 3,
        InvDstAlpha = 4,
        InvDstColor = 5,
        InvSrcAlpha = 6,
        InvSrcColor = 7,
        One = 8,
        SrcAlpha = 9,
        SrcColor = 10,
        Zero = 11,
    }
}

u8_enum! {
    pub enum BlendFunction {
        Add = 0,
        Maximum = 1,
        Minimum = 2,
        ReverseSubtract = 3,
        Subtract = 4,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFormula {
    pub source: BlendFactor,
    pub destination: BlendFactor,
    pub function: BlendFunction,
}

impl BlendFormula {
    /// `source * 1 + destination * 0`, i.e. blending disabled
    pub const OPAQUE: Self = Self {
        source: BlendFactor::One,
        destination: BlendFactor::Zero,
        function: BlendFunction::Add,
    };

    pub const ALPHA: Self = Self {
        source: BlendFactor::SrcAlpha,
        destination: BlendFactor::InvSrcAlpha,
        function: BlendFunction::Add,
    };
}

impl Default for BlendFormula {
    fn default() -> Self {
        Self::OPAQUE
    }
}

/// Blending of one color attachment. Without an alpha formula the color formula is used for alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendAttachment {
    pub color: BlendFormula,
    pub alpha: Option<BlendFormula>,
}

u8_enum! {
    pub enum ComparisonKind {
        Always = 0,
        Equal = 1,
        Greater = 2,
        GreaterEqual = 3,
        Less = 4,
        LessEqual = 5,
        Never = 6,
        NotEqual = 7,
    }
}

u8_enum! {
    pub enum StencilOperation {
        DecrementAndClamp = 0,
        DecrementAndWrap = 1,
        IncrementAndClamp = 2,
        IncrementAndWrap = 3,
        Invert = 4,
        Keep = 5,
        Replace = 6,
        Zero = 7,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilState {
    pub comparison: ComparisonKind,
    pub pass: StencilOperation,
    pub fail: StencilOperation,
    pub depth_fail: StencilOperation,
}

impl Default for StencilState {
    fn default() -> Self {
        Self {
            comparison: ComparisonKind::Always,
            pass: StencilOperation::Keep,
            fail: StencilOperation::Keep,
            depth_fail: StencilOperation::Keep,
        }
    }
}

impl StencilState {
    /// `primary` wins over `secondary`, which wins over `self`
    pub fn with(&self, primary: &PartialStencilState, secondary: &PartialStencilState) -> Self {
        Self {
            comparison: primary
                .comparison
                .or(secondary.comparison)
                .unwrap_or(self.comparison),
            pass: primary.pass.or(secondary.pass).unwrap_or(self.pass),
            fail: primary.fail.or(secondary.fail).unwrap_or(self.fail),
            depth_fail: primary
                .depth_fail
                .or(secondary.depth_fail)
                .unwrap_or(self.depth_fail),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PartialStencilState {
    pub comparison: Option<ComparisonKind>,
    pub pass: Option<StencilOperation>,
    pub fail: Option<StencilOperation>,
    pub depth_fail: Option<StencilOperation>,
}

impl PartialStencilState {
    pub fn merge(&mut self, other: &PartialStencilState) {
        self.comparison = other.comparison.or(self.comparison);
        self.pass = other.pass.or(self.pass);
        self.fail = other.fail.or(self.fail);
        self.depth_fail = other.depth_fail.or(self.depth_fail);
    }
}

u8_enum! {
    pub enum FaceCullMode {
        Back = 0,
        Front = 1,
        None = 2,
    }
}

u8_enum! {
    pub enum FaceFillMode {
        Solid = 0,
        Wireframe = 1,
    }
}

u8_enum! {
    pub enum FrontFace {
        Clockwise = 0,
        CounterClockwise = 1,
    }
}

u8_enum! {
    pub enum PrimitiveTopology {
        LineList = 0,
        LineStrip = 1,
        PointList = 2,
        TriangleList = 3,
        TriangleStrip = 4,
    }
}

u8_enum! {
    pub enum PixelFormat {
        B8G8R8A8UNorm = 0,
        B8G8R8A8UNormSRgb = 1,
        R10G10B10A2UInt = 2,
        R10G10B10A2UNorm = 3,
        R11G11B10Float = 4,
        R16Float = 5,
        R16G16B16A16Float = 6,
        R16G16B16A16SInt = 7,
        R16G16B16A16SNorm = 8,
        R16G16B16A16UInt = 9,
        R16G16B16A16UNorm = 10,
        R16G16Float = 11,
        R16G16SInt = 12,
        R16G16SNorm = 13,
        R16G16UInt = 14,
        R16G16UNorm = 15,
        R16SInt = 16,
        R16SNorm = 17,
        R16UInt = 18,
        R16UNorm = 19,
        R32Float = 20,
        R32G32B32A32Float = 21,
        R32G32B32A32SInt = 22,
        R32G32B32A32UInt = 23,
        R32G32Float = 24,
        R32G32SInt = 25,
        R32G32UInt = 26,
        R32SInt = 27,
        R32UInt = 28,
        R8G8B8A8SInt = 29,
        R8G8B8A8SNorm = 30,
        R8G8B8A8UInt = 31,
        R8G8B8A8UNorm = 32,
        R8G8B8A8UNormSRgb = 33,
        R8G8SInt = 34,
        R8G8SNorm = 35,
        R8G8UInt = 36,
        R8G8UNorm = 37,
        R8SInt = 38,
        R8SNorm = 39,
        R8UInt = 40,
        R8UNorm = 41,
        D24UNormS8UInt = 42,
        D32FloatS8UInt = 43,
    }
}

impl PixelFormat {
    pub fn is_depth_only(self) -> bool {
        matches!(self, PixelFormat::D24UNormS8UInt | PixelFormat::D32FloatS8UInt)
    }

    /// Number of color components, depth/stencil formats count as two
    pub fn components(self) -> u8 {
        use PixelFormat::*;
        match self {
            R16Float | R16SInt | R16SNorm | R16UInt | R16UNorm | R32Float | R32SInt | R32UInt
            | R8SInt | R8SNorm | R8UInt | R8UNorm => 1,
            R16G16Float | R16G16SInt | R16G16SNorm | R16G16UInt | R16G16UNorm | R32G32Float
            | R32G32SInt | R32G32UInt | R8G8SInt | R8G8SNorm | R8G8UInt | R8G8UNorm
            | D24UNormS8UInt | D32FloatS8UInt => 2,
            R11G11B10Float => 3,
            _ => 4,
        }
    }

    /// Scalar type a shader reads or writes for this format
    pub fn scalar_type(self) -> ScalarType {
        use PixelFormat::*;
        match self {
            R16G16B16A16SInt | R16G16SInt | R16SInt | R32G32B32A32SInt | R32G32SInt | R32SInt
            | R8G8B8A8SInt | R8G8SInt | R8SInt => ScalarType::Int,
            R10G10B10A2UInt | R16G16B16A16UInt | R16G16UInt | R16UInt | R32G32B32A32UInt
            | R32G32UInt | R32UInt | R8G8B8A8UInt | R8G8UInt | R8UInt | D24UNormS8UInt => {
                ScalarType::UInt
            }
            _ => ScalarType::Float,
        }
    }

    pub fn numeric_type(self) -> NumericType {
        NumericType::new(self.scalar_type(), 1, self.components())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorOutput {
    pub name: String,
    pub format: PixelFormat,
}

impl ColorOutput {
    pub fn new(name: impl Into<String>, format: PixelFormat) -> Self {
        Self {
            name: name.into(),
            format,
        }
    }

    fn default_for(index: usize) -> Self {
        Self::new(format!("color{index}"), PixelFormat::R8G8B8A8UNorm)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineState {
    pub coverage_to_alpha: bool,
    pub blend_factor: Vec4,
    pub blend_attachments: Vec<BlendAttachment>,

    pub depth_test: bool,
    pub depth_write: bool,
    pub stencil_test: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    pub stencil_reference: u32,
    pub stencil_front: StencilState,
    pub stencil_back: StencilState,

    pub cull_mode: FaceCullMode,
    pub fill_mode: FaceFillMode,
    pub front_face: FrontFace,
    pub depth_clip: bool,
    pub scissor_test: bool,

    pub primitive_topology: PrimitiveTopology,

    pub depth_output: Option<PixelFormat>,
    pub color_outputs: Vec<ColorOutput>,
    pub output_samples: u8,
}

impl Default for PipelineState {
    fn default() -> Self {
        Self::with_attachments(1)
    }
}

impl PipelineState {
    /// Depth test and write on, back-face culling of counter-clockwise triangles,
    /// opaque blending and `count` RGBA8 color outputs named `color0..`
    pub fn with_attachments(count: usize) -> Self {
        Self {
            coverage_to_alpha: false,
            blend_factor: Vec4::ZERO,
            blend_attachments: vec![BlendAttachment::default(); count],
            depth_test: true,
            depth_write: true,
            stencil_test: false,
            stencil_read_mask: 0,
            stencil_write_mask: 0,
            stencil_reference: 0,
            stencil_front: StencilState::default(),
            stencil_back: StencilState::default(),
            cull_mode: FaceCullMode::Back,
            fill_mode: FaceFillMode::Solid,
            front_face: FrontFace::CounterClockwise,
            depth_clip: true,
            scissor_test: false,
            primitive_topology: PrimitiveTopology::TriangleList,
            depth_output: None,
            color_outputs: (0..count).map(ColorOutput::default_for).collect(),
            output_samples: 1,
        }
    }

    /// Applies one override on top of this state
    pub fn with(&self, s: &PartialPipelineState) -> Self {
        Self {
            coverage_to_alpha: s.coverage_to_alpha.unwrap_or(self.coverage_to_alpha),
            blend_factor: s.blend_factor.unwrap_or(self.blend_factor),
            blend_attachments: overwrite_positionally(&self.blend_attachments, &s.blend_attachments),

            depth_test: s.depth_test.unwrap_or(self.depth_test),
            depth_write: s.depth_write.unwrap_or(self.depth_write),
            stencil_test: s.stencil_test.unwrap_or(self.stencil_test),
            stencil_read_mask: s.stencil_read_mask.unwrap_or(self.stencil_read_mask),
            stencil_write_mask: s.stencil_write_mask.unwrap_or(self.stencil_write_mask),
            stencil_reference: s.stencil_reference.unwrap_or(self.stencil_reference),
            stencil_front: self.stencil_front.with(&s.stencil_front, &s.stencil),
            stencil_back: self.stencil_back.with(&s.stencil_back, &s.stencil),

            cull_mode: s.cull_mode.unwrap_or(self.cull_mode),
            fill_mode: s.fill_mode.unwrap_or(self.fill_mode),
            front_face: s.front_face.unwrap_or(self.front_face),
            depth_clip: s.depth_clip.unwrap_or(self.depth_clip),
            scissor_test: s.scissor_test.unwrap_or(self.scissor_test),

            primitive_topology: s.primitive_topology.unwrap_or(self.primitive_topology),

            depth_output: s.depth_output.or(self.depth_output),
            color_outputs: overwrite_positionally(&self.color_outputs, &s.color_outputs),
            output_samples: s.output_samples.unwrap_or(self.output_samples),
        }
    }
}

/// `result[i]` is `over[i]` where present, else `base[i]`
fn overwrite_positionally<T: Clone>(base: &[T], over: &[T]) -> Vec<T> {
    let len = base.len().max(over.len());
    (0..len)
        .filter_map(|i| over.get(i).or_else(|| base.get(i)))
        .cloned()
        .collect()
}

/// The override carried by one pipeline block
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PartialPipelineState {
    pub coverage_to_alpha: Option<bool>,
    pub blend_factor: Option<Vec4>,
    pub blend_attachments: Vec<BlendAttachment>,

    pub depth_test: Option<bool>,
    pub depth_write: Option<bool>,
    pub stencil_test: Option<bool>,
    pub stencil_read_mask: Option<u8>,
    pub stencil_write_mask: Option<u8>,
    pub stencil_reference: Option<u32>,
    /// Applies to both faces unless a face-specific value is set
    pub stencil: PartialStencilState,
    pub stencil_front: PartialStencilState,
    pub stencil_back: PartialStencilState,

    pub cull_mode: Option<FaceCullMode>,
    pub fill_mode: Option<FaceFillMode>,
    pub front_face: Option<FrontFace>,
    pub depth_clip: Option<bool>,
    pub scissor_test: Option<bool>,

    pub primitive_topology: Option<PrimitiveTopology>,

    pub depth_output: Option<PixelFormat>,
    pub color_outputs: Vec<ColorOutput>,
    pub output_samples: Option<u8>,
}

impl PartialPipelineState {
    /// Accumulates a later declaration of the same block; list fields append
    pub fn merge(&mut self, s: &PartialPipelineState) {
        self.coverage_to_alpha = s.coverage_to_alpha.or(self.coverage_to_alpha);
        self.blend_factor = s.blend_factor.or(self.blend_factor);
        self.blend_attachments.extend_from_slice(&s.blend_attachments);

        self.depth_test = s.depth_test.or(self.depth_test);
        self.depth_write = s.depth_write.or(self.depth_write);
        self.stencil_test = s.stencil_test.or(self.stencil_test);
        self.stencil_read_mask = s.stencil_read_mask.or(self.stencil_read_mask);
        self.stencil_write_mask = s.stencil_write_mask.or(self.stencil_write_mask);
        self.stencil_reference = s.stencil_reference.or(self.stencil_reference);
        self.stencil.merge(&s.stencil);
        self.stencil_front.merge(&s.stencil_front);
        self.stencil_back.merge(&s.stencil_back);

        self.cull_mode = s.cull_mode.or(self.cull_mode);
        self.fill_mode = s.fill_mode.or(self.fill_mode);
        self.front_face = s.front_face.or(self.front_face);
        self.depth_clip = s.depth_clip.or(self.depth_clip);
        self.scissor_test = s.scissor_test.or(self.scissor_test);

        self.primitive_topology = s.primitive_topology.or(self.primitive_topology);

        self.depth_output = s.depth_output.or(self.depth_output);
        self.color_outputs.extend_from_slice(&s.color_outputs);
        self.output_samples = s.output_samples.or(self.output_samples);
    }
}

fn write_blend_formula<W: Write>(writer: &mut W, formula: &BlendFormula) -> io::Result<()> {
    writer.write_u8(formula.source.as_u8())?;
    writer.write_u8(formula.destination.as_u8())?;
    writer.write_u8(formula.function.as_u8())
}

fn read_blend_formula<R: Read>(reader: &mut R) -> Result<BlendFormula, FormatError> {
    Ok(BlendFormula {
        source: BlendFactor::from_u8(reader.read_u8()?)?,
        destination: BlendFactor::from_u8(reader.read_u8()?)?,
        function: BlendFunction::from_u8(reader.read_u8()?)?,
    })
}

impl BinarySerializable for StencilState {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_u8(self.comparison.as_u8())?;
        writer.write_u8(self.pass.as_u8())?;
        writer.write_u8(self.fail.as_u8())?;
        writer.write_u8(self.depth_fail.as_u8())
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        Ok(Self {
            comparison: ComparisonKind::from_u8(reader.read_u8()?)?,
            pass: StencilOperation::from_u8(reader.read_u8()?)?,
            fail: StencilOperation::from_u8(reader.read_u8()?)?,
            depth_fail: StencilOperation::from_u8(reader.read_u8()?)?,
        })
    }
}

impl BinarySerializable for PipelineState {
    fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_bool(writer, self.coverage_to_alpha)?;
        for component in self.blend_factor.to_array() {
            writer.write_f32::<LittleEndian>(component)?;
        }
        write_array(writer, &self.blend_attachments, |w, attachment| {
            write_blend_formula(w, &attachment.color)?;
            write_option(w, attachment.alpha.as_ref(), write_blend_formula)
        })?;

        write_bool(writer, self.depth_test)?;
        write_bool(writer, self.depth_write)?;
        write_bool(writer, self.stencil_test)?;
        writer.write_u8(self.stencil_read_mask)?;
        writer.write_u8(self.stencil_write_mask)?;
        writer.write_u32::<LittleEndian>(self.stencil_reference)?;
        self.stencil_front.write_to(writer)?;
        self.stencil_back.write_to(writer)?;

        writer.write_u8(self.cull_mode.as_u8())?;
        writer.write_u8(self.fill_mode.as_u8())?;
        writer.write_u8(self.front_face.as_u8())?;
        write_bool(writer, self.depth_clip)?;
        write_bool(writer, self.scissor_test)?;

        writer.write_u8(self.primitive_topology.as_u8())?;
        write_option(writer, self.depth_output.as_ref(), |w, format| {
            w.write_u8(format.as_u8())
        })?;
        write_array(writer, &self.color_outputs, |w, output| {
            write_string(w, &output.name)?;
            w.write_u8(output.format.as_u8())
        })?;
        writer.write_u8(self.output_samples)
    }

    fn read_from<R: Read>(reader: &mut R) -> Result<Self, FormatError> {
        let coverage_to_alpha = read_bool(reader)?;
        let mut blend_factor = [0.0f32; 4];
        for component in &mut blend_factor {
            *component = reader.read_f32::<LittleEndian>()?;
        }
        let blend_attachments = read_array(reader, |r| {
            Ok(BlendAttachment {
                color: read_blend_formula(r)?,
                alpha: read_option(r, read_blend_formula)?,
            })
        })?;

        Ok(Self {
            coverage_to_alpha,
            blend_factor: Vec4::from_array(blend_factor),
            blend_attachments,

            depth_test: read_bool(reader)?,
            depth_write: read_bool(reader)?,
            stencil_test: read_bool(reader)?,
            stencil_read_mask: reader.read_u8()?,
            stencil_write_mask: reader.read_u8()?,
            stencil_reference: reader.read_u32::<LittleEndian>()?,
            stencil_front: StencilState::read_from(reader)?,
            stencil_back: StencilState::read_from(reader)?,

            cull_mode: FaceCullMode::from_u8(reader.read_u8()?)?,
            fill_mode: FaceFillMode::from_u8(reader.read_u8()?)?,
            front_face: FrontFace::from_u8(reader.read_u8()?)?,
            depth_clip: read_bool(reader)?,
            scissor_test: read_bool(reader)?,

            primitive_topology: PrimitiveTopology::from_u8(reader.read_u8()?)?,
            depth_output: read_option(reader, |r| PixelFormat::from_u8(r.read_u8()?))?,
            color_outputs: read_array(reader, |r| {
                Ok(ColorOutput {
                    name: read_string(r)?,
                    format: PixelFormat::from_u8(r.read_u8()?)?,
                })
            })?,
            output_samples: reader.read_u8()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = PipelineState::default();
        assert!(state.depth_test && state.depth_write);
        assert_eq!(state.blend_attachments.len(), 1);
        assert_eq!(state.color_outputs, [ColorOutput::new("color0", PixelFormat::R8G8B8A8UNorm)]);
        assert_eq!(state.cull_mode, FaceCullMode::Back);
        assert_eq!(state.primitive_topology, PrimitiveTopology::TriangleList);
        assert_eq!(state.output_samples, 1);
    }

    #[test]
    fn test_later_override_wins() {
        let first = PartialPipelineState {
            depth_write: Some(false),
            cull_mode: Some(FaceCullMode::None),
            ..Default::default()
        };
        let second = PartialPipelineState {
            cull_mode: Some(FaceCullMode::Front),
            ..Default::default()
        };
        let state = PipelineState::default().with(&first).with(&second);
        assert!(!state.depth_write);
        assert_eq!(state.cull_mode, FaceCullMode::Front);
    }

    #[test]
    fn test_lists_overwrite_positionally() {
        let base = PipelineState::with_attachments(2);
        let partial = PartialPipelineState {
            blend_attachments: vec![BlendAttachment {
                color: BlendFormula::ALPHA,
                alpha: None,
            }],
            color_outputs: vec![
                ColorOutput::new("albedo", PixelFormat::R8G8B8A8UNormSRgb),
                ColorOutput::new("normal", PixelFormat::R16G16Float),
                ColorOutput::new("depth", PixelFormat::R32Float),
            ],
            ..Default::default()
        };
        let state = base.with(&partial);
        assert_eq!(state.blend_attachments.len(), 2);
        assert_eq!(state.blend_attachments[0].color, BlendFormula::ALPHA);
        assert_eq!(state.blend_attachments[1].color, BlendFormula::OPAQUE);
        let names: Vec<_> = state.color_outputs.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["albedo", "normal", "depth"]);
    }

    #[test]
    fn test_shared_stencil_applies_to_both_faces() {
        let partial = PartialPipelineState {
            stencil: PartialStencilState {
                comparison: Some(ComparisonKind::Equal),
                pass: Some(StencilOperation::Replace),
                ..Default::default()
            },
            stencil_back: PartialStencilState {
                pass: Some(StencilOperation::Zero),
                ..Default::default()
            },
            ..Default::default()
        };
        let state = PipelineState::default().with(&partial);
        assert_eq!(state.stencil_front.comparison, ComparisonKind::Equal);
        assert_eq!(state.stencil_front.pass, StencilOperation::Replace);
        assert_eq!(state.stencil_back.comparison, ComparisonKind::Equal);
        assert_eq!(state.stencil_back.pass, StencilOperation::Zero);
    }

    #[test]
    fn test_merge_appends_lists() {
        let mut merged = PartialPipelineState {
            color_outputs: vec![ColorOutput::new("a", PixelFormat::R8UNorm)],
            depth_test: Some(false),
            ..Default::default()
        };
        merged.merge(&PartialPipelineState {
            color_outputs: vec![ColorOutput::new("b", PixelFormat::R8UNorm)],
            depth_test: Some(true),
            ..Default::default()
        });
        assert_eq!(merged.color_outputs.len(), 2);
        assert_eq!(merged.depth_test, Some(true));
    }

    #[test]
    fn test_binary_roundtrip_with_optional_fields() {
        let mut state = PipelineState::with_attachments(2);
        state.blend_factor = Vec4::new(0.25, 0.5, 0.75, 1.0);
        state.blend_attachments[1].alpha = Some(BlendFormula::ALPHA);
        state.depth_output = Some(PixelFormat::D24UNormS8UInt);
        state.stencil_reference = 0xABCD;

        let mut bytes = Vec::new();
        state.write_to(&mut bytes).unwrap();
        let read = PipelineState::read_from(&mut bytes.as_slice()).unwrap();
        assert_eq!(read, state);
    }

    #[test]
    fn test_pixel_format_numeric_types() {
        assert_eq!(
            PixelFormat::R8G8B8A8UNorm.numeric_type().glsl_name().as_deref(),
            Some("vec4")
        );
        assert_eq!(
            PixelFormat::R32G32UInt.numeric_type().glsl_name().as_deref(),
            Some("uvec2")
        );
        assert_eq!(
            PixelFormat::R16SInt.numeric_type().glsl_name().as_deref(),
            Some("int")
        );
        assert!(PixelFormat::D32FloatS8UInt.is_depth_only());
    }
}
