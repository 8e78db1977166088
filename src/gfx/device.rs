//! 图形设备抽象
//!
//! 立方体渲染器只依赖这里的 trait，不直接接触任何图形 API。
//! 每个后端（D3D11、无头）提供三样东西：
//!
//! - `RenderDevice`：资源创建 + 立即上下文上的绘制命令
//! - `SwapchainImage`：运行时填写的交换链图像记录
//! - `Backend`：设备创建、实例扩展、图形绑定
//!
//! 所有方法都在单一渲染线程上调用，不要求 `Send`/`Sync`。

use std::fmt::Debug;
use std::hash::Hash;

use openxr::sys;

use crate::core::error::Result;
use crate::gfx::feature_level::{CreationAttempt, DeviceCreationError, FeatureLevel};
use crate::gfx::renderer::CubePipeline;
use crate::gfx::shaders::ShaderStage;

/// 纹理描述（深度缓冲按颜色纹理的尺寸创建）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub array_size: u32,
    pub sample_count: u32,
}

/// 视口（像素）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// 由子图像矩形构建，深度范围 [0, 1]
    pub fn from_rect(rect: &openxr::Rect2Di) -> Self {
        Self {
            x: rect.offset.x as f32,
            y: rect.offset.y as f32,
            width: rect.extent.width as f32,
            height: rect.extent.height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// 缓冲区用途
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Vertex,
    Index,
    Constant,
}

/// 顶点输入元素
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputElement {
    pub semantic: &'static str,
    /// `DXGI_FORMAT`
    pub format: i64,
    pub offset: u32,
}

/// 渲染设备
pub trait RenderDevice: Sized {
    /// 交换链颜色纹理
    type Texture;
    /// 纹理身份，用作深度缓存的键
    type TextureId: Copy + Eq + Hash + Debug;
    type RenderTargetView;
    type DepthStencilView: Clone;
    type VertexShader;
    type PixelShader;
    type InputLayout;
    type Buffer;

    // ---- 资源创建 ----

    /// 编译 HLSL，返回字节码
    fn compile_shader(&self, source: &str, stage: ShaderStage) -> Result<Vec<u8>>;

    fn create_vertex_shader(&self, bytecode: &[u8]) -> Result<Self::VertexShader>;

    fn create_pixel_shader(&self, bytecode: &[u8]) -> Result<Self::PixelShader>;

    /// 输入布局需要顶点着色器字节码做签名校验
    fn create_input_layout(
        &self,
        elements: &[InputElement],
        vs_bytecode: &[u8],
    ) -> Result<Self::InputLayout>;

    fn create_buffer(
        &self,
        kind: BufferKind,
        byte_width: u32,
        initial_data: Option<&[u8]>,
    ) -> Result<Self::Buffer>;

    fn texture_id(&self, texture: &Self::Texture) -> Self::TextureId;

    fn texture_desc(&self, texture: &Self::Texture) -> TextureDesc;

    /// 按交换链格式为颜色纹理创建渲染目标视图
    fn create_render_target_view(
        &self,
        texture: &Self::Texture,
        format: i64,
    ) -> Result<Self::RenderTargetView>;

    /// 创建与颜色纹理同尺寸的深度缓冲及其视图
    fn create_depth_stencil_view(&self, desc: &TextureDesc) -> Result<Self::DepthStencilView>;

    // ---- 立即上下文 ----

    fn set_viewport(&mut self, viewport: &Viewport);

    fn clear_render_target(&mut self, rtv: &Self::RenderTargetView, color: [f32; 4]);

    fn clear_depth_stencil(&mut self, dsv: &Self::DepthStencilView, depth: f32, stencil: u8);

    fn set_render_targets(&mut self, rtv: &Self::RenderTargetView, dsv: &Self::DepthStencilView);

    fn update_buffer(&mut self, buffer: &Self::Buffer, data: &[u8]);

    /// 绑定着色器、常量缓冲区、输入布局、顶点/索引缓冲区和图元拓扑
    fn bind_pipeline(&mut self, pipeline: &CubePipeline<Self>);

    fn draw_indexed(&mut self, index_count: u32);
}

/// 交换链图像记录
///
/// # Safety
///
/// 实现类型必须是 `#[repr(C)]`，并以 `XrSwapchainImageBaseHeader`（`type` + `next`）开头，
/// 这样指向它的指针才能作为 `*mut SwapchainImageBaseHeader` 交给运行时填写。
pub unsafe trait SwapchainImage: Sized {
    type Texture;

    /// 记录头部的结构类型标记
    fn structure_type() -> sys::StructureType;

    /// 只设置了类型标记、其余字段为零的记录
    fn tagged() -> Self;

    /// 运行时写入的纹理；尚未填写时返回 `None`
    fn texture(&self) -> Option<Self::Texture>;
}

/// 会话创建时链接到 `XrSessionCreateInfo::next` 的图形绑定结构
///
/// # Safety
///
/// 实现类型必须是 `#[repr(C)]` 且以 `XrBaseInStructure` 头部开头。
pub unsafe trait GraphicsBinding {
    fn as_base(&self) -> *const sys::BaseInStructure {
        self as *const Self as *const sys::BaseInStructure
    }
}

/// 图形后端
pub trait Backend {
    type Device: RenderDevice;
    type Image: SwapchainImage<Texture = <Self::Device as RenderDevice>::Texture>;
    type Binding: GraphicsBinding;

    /// 注册表中使用的名字
    const NAME: &'static str;

    /// 需要启用的 OpenXR 实例扩展
    fn instance_extensions(&self) -> Vec<String>;

    /// 本后端支持的颜色交换链格式
    fn supported_color_formats(&self) -> &'static [i64];

    /// 按一次尝试的参数创建设备
    fn create_device(
        &mut self,
        attempt: &CreationAttempt,
        levels: &[FeatureLevel],
    ) -> std::result::Result<Self::Device, DeviceCreationError>;

    /// 为已创建的设备生成图形绑定
    fn graphics_binding(&self, device: &Self::Device) -> Self::Binding;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_from_rect() {
        let rect = openxr::Rect2Di {
            offset: openxr::Offset2Di { x: 16, y: 8 },
            extent: openxr::Extent2Di { width: 1024, height: 768 },
        };
        let vp = Viewport::from_rect(&rect);
        assert_eq!((vp.x, vp.y, vp.width, vp.height), (16.0, 8.0, 1024.0, 768.0));
        assert_eq!((vp.min_depth, vp.max_depth), (0.0, 1.0));
    }
}
