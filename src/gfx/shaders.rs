//! 立方体着色器
//!
//! 顶点着色器以行向量方式相乘，矩阵上传前需要转置（见 `math::to_shader_layout`）。

/// HLSL 源码，顶点和像素着色器共用
pub const CUBE_SHADER_SOURCE: &str = include_str!("shaders/cube.hlsl");

/// 顶点着色器入口与编译目标
pub const VERTEX_ENTRY: &str = "MainVS";
pub const VERTEX_TARGET: &str = "vs_5_0";

/// 像素着色器入口与编译目标
pub const PIXEL_ENTRY: &str = "MainPS";
pub const PIXEL_TARGET: &str = "ps_5_0";

/// 着色器阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderStage {
    Vertex,
    Pixel,
}

impl ShaderStage {
    pub fn entry_point(self) -> &'static str {
        match self {
            ShaderStage::Vertex => VERTEX_ENTRY,
            ShaderStage::Pixel => PIXEL_ENTRY,
        }
    }

    pub fn target(self) -> &'static str {
        match self {
            ShaderStage::Vertex => VERTEX_TARGET,
            ShaderStage::Pixel => PIXEL_TARGET,
        }
    }
}
