//! 图形插件模块
//!
//! 本模块实现 OpenXR 程序所需的图形插件层，包括：
//! - 设备选择：特性级别过滤与带回退的设备创建
//! - 交换链：颜色格式协商、交换链图像记录分配
//! - 渲染：深度缓冲缓存、立方体渲染序列
//! - 后端：D3D11（仅 Windows）与无头后端
//!
//! 所有后端都通过 `Backend`/`RenderDevice` trait 接入通用的 `CubePlugin`，
//! 对外统一暴露为 `GraphicsPlugin`。

pub mod plugin;
pub mod device;
pub mod feature_level;
pub mod format;
pub mod swapchain;
pub mod depth;
pub mod geometry;
pub mod shaders;
pub mod renderer;
pub mod cube_plugin;
pub mod factory;
pub mod headless;
#[cfg(target_os = "windows")]
pub mod d3d11;

pub use plugin::GraphicsPlugin;
pub use cube_plugin::{ClearColorPolicy, CubePlugin};
pub use factory::{create_graphics_plugin, PluginRegistry};
pub use headless::HeadlessBackend;
#[cfg(target_os = "windows")]
pub use d3d11::D3D11Backend;
