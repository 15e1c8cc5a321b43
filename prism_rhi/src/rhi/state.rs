/// Fixed-function state objects referenced by a pipeline state
///
/// All of them are plain values: two states with the same fields describe
/// the same configuration and hash identically (floats hash by bit pattern).

use std::hash::{Hash, Hasher};

// ===== RASTERIZATION ENUMS =====

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    LineList,
}

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Polygon fill mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Solid,
    Wireframe,
}

// ===== DEPTH/STENCIL ENUMS =====

/// Comparison function (depth test, stencil test, comparison samplers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Stencil operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    Keep,
    Zero,
    Replace,
    IncrSat,
    DecrSat,
    Invert,
    Incr,
    Decr,
}

// ===== BLEND ENUMS =====

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blend {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
    SrcAlphaSat,
    BlendFactor,
    InvBlendFactor,
    Src1Color,
    InvSrc1Color,
    Src1Alpha,
    InvSrc1Alpha,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

// ===== RASTERIZER STATE =====

/// Rasterizer state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizerState {
    pub cull_mode: CullMode,
    pub polygon_mode: PolygonMode,
    pub depth_clip_enabled: bool,
    /// Depth bias in depth units; scaled by 2^24 when compiled
    pub depth_bias: f32,
    pub depth_bias_clamp: f32,
    pub depth_bias_slope_scaled: f32,
    pub line_width: f32,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            polygon_mode: PolygonMode::Solid,
            depth_clip_enabled: true,
            depth_bias: 0.0,
            depth_bias_clamp: 0.0,
            depth_bias_slope_scaled: 0.0,
            line_width: 1.0,
        }
    }
}

impl RasterizerState {
    /// Rasterizer with the given cull mode and fill mode, everything else default
    pub fn new(cull_mode: CullMode, polygon_mode: PolygonMode) -> Self {
        Self { cull_mode, polygon_mode, ..Default::default() }
    }

    /// Rasterizer used for shadow-map rendering
    pub fn with_depth_bias(mut self, bias: f32, clamp: f32, slope_scaled: f32) -> Self {
        self.depth_bias = bias;
        self.depth_bias_clamp = clamp;
        self.depth_bias_slope_scaled = slope_scaled;
        self
    }
}

impl Eq for RasterizerState {}

impl Hash for RasterizerState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.cull_mode.hash(state);
        self.polygon_mode.hash(state);
        self.depth_clip_enabled.hash(state);
        self.depth_bias.to_bits().hash(state);
        self.depth_bias_clamp.to_bits().hash(state);
        self.depth_bias_slope_scaled.to_bits().hash(state);
        self.line_width.to_bits().hash(state);
    }
}

// ===== BLEND STATE =====

/// Blend state shared by every color target of a pipeline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    pub blend_enabled: bool,
    pub source_blend: Blend,
    pub dest_blend: Blend,
    pub blend_op: BlendOperation,
    pub source_blend_alpha: Blend,
    pub dest_blend_alpha: Blend,
    pub blend_op_alpha: BlendOperation,
    /// Written to all four blend constants
    pub blend_factor: f32,
}

impl Default for BlendState {
    fn default() -> Self {
        Self::disabled()
    }
}

impl BlendState {
    /// Opaque: output overwrites the target
    pub fn disabled() -> Self {
        Self {
            blend_enabled: false,
            source_blend: Blend::One,
            dest_blend: Blend::Zero,
            blend_op: BlendOperation::Add,
            source_blend_alpha: Blend::One,
            dest_blend_alpha: Blend::Zero,
            blend_op_alpha: BlendOperation::Add,
            blend_factor: 0.0,
        }
    }

    /// Classic alpha blending
    pub fn alpha() -> Self {
        Self {
            blend_enabled: true,
            source_blend: Blend::SrcAlpha,
            dest_blend: Blend::InvSrcAlpha,
            blend_op: BlendOperation::Add,
            source_blend_alpha: Blend::One,
            dest_blend_alpha: Blend::One,
            blend_op_alpha: BlendOperation::Add,
            blend_factor: 0.0,
        }
    }

    /// Additive blending
    pub fn additive() -> Self {
        Self {
            blend_enabled: true,
            source_blend: Blend::One,
            dest_blend: Blend::One,
            blend_op: BlendOperation::Add,
            source_blend_alpha: Blend::One,
            dest_blend_alpha: Blend::One,
            blend_op_alpha: BlendOperation::Add,
            blend_factor: 1.0,
        }
    }
}

impl Eq for BlendState {}

impl Hash for BlendState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.blend_enabled.hash(state);
        self.source_blend.hash(state);
        self.dest_blend.hash(state);
        self.blend_op.hash(state);
        self.source_blend_alpha.hash(state);
        self.dest_blend_alpha.hash(state);
        self.blend_op_alpha.hash(state);
        self.blend_factor.to_bits().hash(state);
    }
}

// ===== DEPTH-STENCIL STATE =====

/// Depth-stencil state (reverse-z: the default depth test is GreaterEqual)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepthStencilState {
    pub depth_test_enabled: bool,
    pub depth_write_enabled: bool,
    pub depth_comparison_function: CompareFunction,
    pub stencil_test_enabled: bool,
    pub stencil_comparison_function: CompareFunction,
    pub stencil_fail_operation: StencilOperation,
    pub stencil_depth_fail_operation: StencilOperation,
    pub stencil_pass_operation: StencilOperation,
    pub stencil_read_mask: u32,
    pub stencil_write_mask: u32,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self::depth(true, true, CompareFunction::GreaterEqual)
    }
}

impl DepthStencilState {
    /// Depth only, stencil disabled
    pub fn depth(test: bool, write: bool, comparison: CompareFunction) -> Self {
        Self {
            depth_test_enabled: test,
            depth_write_enabled: write,
            depth_comparison_function: comparison,
            stencil_test_enabled: false,
            stencil_comparison_function: CompareFunction::Always,
            stencil_fail_operation: StencilOperation::Keep,
            stencil_depth_fail_operation: StencilOperation::Keep,
            stencil_pass_operation: StencilOperation::Replace,
            stencil_read_mask: 0x01,
            stencil_write_mask: 0x01,
        }
    }

    /// No depth test, no stencil
    pub fn off() -> Self {
        Self::depth(false, false, CompareFunction::Always)
    }
}

// ===== VIEWPORT & SCISSOR =====

/// Viewport (top-left origin)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub depth_min: f32,
    pub depth_max: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }
}

impl Viewport {
    /// Viewport with the full [0, 1] depth range
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height, depth_min: 0.0, depth_max: 1.0 }
    }

    /// True when the viewport has a drawable area
    pub fn is_defined(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

impl Eq for Viewport {}

impl Hash for Viewport {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
        self.width.to_bits().hash(state);
        self.height.to_bits().hash(state);
        self.depth_min.to_bits().hash(state);
        self.depth_max.to_bits().hash(state);
    }
}

/// Scissor rectangle given by its edges
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rectangle {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
