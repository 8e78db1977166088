//! 交换链颜色格式选择

use tracing::debug;

use crate::core::error::{GraphicsError, Result};

/// 本插件用到的 `DXGI_FORMAT` 数值
pub mod dxgi {
    pub const R8G8B8A8_UNORM: i64 = 28;
    pub const R8G8B8A8_UNORM_SRGB: i64 = 29;
    pub const B8G8R8A8_UNORM: i64 = 87;
    pub const B8G8R8A8_UNORM_SRGB: i64 = 91;
    pub const R32_TYPELESS: i64 = 39;
    pub const D32_FLOAT: i64 = 40;
    pub const R16_UINT: i64 = 57;
    pub const R32G32B32_FLOAT: i64 = 6;
}

/// D3D11 后端支持的颜色格式
pub const D3D11_COLOR_FORMATS: [i64; 4] = [
    dxgi::R8G8B8A8_UNORM,
    dxgi::B8G8R8A8_UNORM,
    dxgi::R8G8B8A8_UNORM_SRGB,
    dxgi::B8G8R8A8_UNORM_SRGB,
];

/// 从运行时提供的格式中选出第一个本后端支持的格式
///
/// 运行时列表按其偏好排序，所以选择顺序以运行时为准，而不是以 `supported` 为准。
pub fn select_color_swapchain_format(runtime_formats: &[i64], supported: &[i64]) -> Result<i64> {
    match runtime_formats.iter().copied().find(|f| supported.contains(f)) {
        Some(format) => {
            debug!(format, "Selected color swapchain format");
            Ok(format)
        }
        None => Err(GraphicsError::UnsupportedSwapchainFormat(runtime_formats.to_vec()).into()),
    }
}
