//! 图形插件接口
//!
//! OpenXR 程序通过这个 trait 与图形后端交互：选择设备、协商交换链格式、
//! 分配交换链图像记录、逐视图渲染立方体。
//!
//! # 调用顺序
//!
//! 1. `instance_extensions`（创建实例前）
//! 2. `initialize_device`（拿到 system 之后、创建会话之前）
//! 3. `graphics_binding`（链接到会话创建信息）
//! 4. `select_color_swapchain_format` / `supported_swapchain_sample_count`
//! 5. `allocate_swapchain_image_structs`（每条交换链一次）
//! 6. `render_view`（每帧每个视图一次）

use openxr as xr;
use openxr::sys;

use crate::core::config::GraphicsConfig;
use crate::core::error::Result;
use crate::xr::{Cube, ProjectionView, XrRuntime};

/// 图形插件
pub trait GraphicsPlugin {
    /// 后端名称（注册表中的标签）
    fn name(&self) -> &'static str;

    /// 需要启用的 OpenXR 实例扩展
    fn instance_extensions(&self) -> Vec<String>;

    /// 按运行时需求选择并创建设备，然后构建绘制资源
    ///
    /// 只能成功调用一次。失败后插件保持未初始化。
    fn initialize_device(&mut self, runtime: &dyn XrRuntime, system: sys::SystemId) -> Result<()>;

    /// 从运行时提供的格式列表中选出颜色交换链格式
    fn select_color_swapchain_format(&self, runtime_formats: &[i64]) -> Result<i64>;

    /// 会话创建用的图形绑定；设备未初始化时为 `None`
    ///
    /// 指针在插件存活期间有效。
    fn graphics_binding(&self) -> Option<*const sys::BaseInStructure>;

    /// 为一条交换链分配 `capacity` 条图像记录
    ///
    /// 返回的指针在插件存活期间有效，交给 `xrEnumerateSwapchainImages` 填写。
    fn allocate_swapchain_image_structs(&mut self, capacity: u32) -> Vec<*mut sys::SwapchainImageBaseHeader>;

    /// 渲染一个视图
    ///
    /// # Safety
    ///
    /// `image` 必须为空，或者指向本插件 `allocate_swapchain_image_structs` 返回的记录，
    /// 且该记录已由运行时填写。
    unsafe fn render_view(
        &mut self,
        view: &ProjectionView,
        image: *const sys::SwapchainImageBaseHeader,
        format: i64,
        cubes: &[Cube],
    ) -> Result<()>;

    /// 交换链采样数
    fn supported_swapchain_sample_count(&self, view: &xr::ViewConfigurationView) -> u32;

    /// 应用运行期选项（目前只有清屏颜色）
    fn update_options(&mut self, config: &GraphicsConfig);
}
