//! 通用立方体插件
//!
//! 把设备选择器、格式协商、交换链记录和立方体渲染器组合起来，
//! 对任意 `Backend` 实现 `GraphicsPlugin`。

use openxr as xr;
use openxr::sys;

use crate::core::config::GraphicsConfig;
use crate::core::error::{DistXrError, GraphicsError, Result};
use crate::gfx::device::{Backend, GraphicsBinding, SwapchainImage};
use crate::gfx::feature_level::{
    candidate_feature_levels, create_device_with_fallback, APPLICATION_FEATURE_LEVELS,
};
use crate::gfx::format;
use crate::gfx::plugin::GraphicsPlugin;
use crate::gfx::renderer::CubeRenderer;
use crate::gfx::swapchain::SwapchainImageRegistry;
use crate::math::Color;
use crate::xr::{Cube, ProjectionView, XrRuntime};
use crate::{engine_error, engine_info};

/// 清屏颜色策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearColorPolicy {
    /// 固定颜色
    Fixed(Color),
    /// 跟随环境混合模式
    BlendMode(crate::core::config::EnvironmentBlendMode),
}

impl ClearColorPolicy {
    pub fn from_config(config: &GraphicsConfig) -> Self {
        if config.clear_from_blend_mode {
            ClearColorPolicy::BlendMode(config.environment_blend_mode)
        } else {
            ClearColorPolicy::Fixed(Color::TRANSPARENT_BLACK)
        }
    }

    pub fn color(&self) -> Color {
        match self {
            ClearColorPolicy::Fixed(color) => *color,
            ClearColorPolicy::BlendMode(mode) => mode.background_clear_color(),
        }
    }
}

/// 基于某个后端的立方体插件
pub struct CubePlugin<B: Backend> {
    backend: B,
    debug_layer: bool,
    clear_color: ClearColorPolicy,
    renderer: Option<CubeRenderer<B::Device>>,
    binding: Option<Box<B::Binding>>,
    swapchain_images: SwapchainImageRegistry<B::Image>,
}

impl<B: Backend> CubePlugin<B> {
    pub fn new(backend: B, config: &GraphicsConfig) -> Self {
        engine_info!(backend = B::NAME, debug_layer = config.debug_layer, "Graphics plugin created");
        Self {
            backend,
            debug_layer: config.debug_layer,
            clear_color: ClearColorPolicy::from_config(config),
            renderer: None,
            binding: None,
            swapchain_images: SwapchainImageRegistry::new(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn renderer(&self) -> Option<&CubeRenderer<B::Device>> {
        self.renderer.as_ref()
    }

    pub fn is_initialized(&self) -> bool {
        self.renderer.is_some()
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color.color()
    }

    fn try_initialize(&mut self, runtime: &dyn XrRuntime, system: sys::SystemId) -> Result<()> {
        let requirements = runtime.query_graphics_requirements(system).map_err(DistXrError::Runtime)?;

        let levels = candidate_feature_levels(&APPLICATION_FEATURE_LEVELS, requirements.min_feature_level);
        if levels.is_empty() {
            return Err(GraphicsError::UnsupportedFeatureLevel(format!(
                "runtime requires {:#x}, application supports up to {}",
                requirements.min_feature_level, APPLICATION_FEATURE_LEVELS[0]
            ))
            .into());
        }

        let backend = &mut self.backend;
        let device = create_device_with_fallback(requirements.adapter, &levels, self.debug_layer, |attempt, levels| {
            backend.create_device(attempt, levels)
        })?;

        let binding = Box::new(self.backend.graphics_binding(&device));
        let mut renderer = CubeRenderer::new(device)?;
        renderer.set_clear_color(self.clear_color.color());

        self.binding = Some(binding);
        self.renderer = Some(renderer);
        Ok(())
    }
}

impl<B: Backend> GraphicsPlugin for CubePlugin<B> {
    fn name(&self) -> &'static str {
        B::NAME
    }

    fn instance_extensions(&self) -> Vec<String> {
        self.backend.instance_extensions()
    }

    fn initialize_device(&mut self, runtime: &dyn XrRuntime, system: sys::SystemId) -> Result<()> {
        if self.is_initialized() {
            return Err(DistXrError::Initialization("graphics device is already initialized".into()));
        }

        match self.try_initialize(runtime, system) {
            Ok(()) => {
                engine_info!(backend = B::NAME, "Graphics device initialized");
                Ok(())
            }
            Err(e) => {
                engine_error!(backend = B::NAME, error = %e, "Graphics device initialization failed");
                Err(e)
            }
        }
    }

    fn select_color_swapchain_format(&self, runtime_formats: &[i64]) -> Result<i64> {
        format::select_color_swapchain_format(runtime_formats, self.backend.supported_color_formats())
    }

    fn graphics_binding(&self) -> Option<*const sys::BaseInStructure> {
        self.binding.as_ref().map(|binding| binding.as_base())
    }

    fn allocate_swapchain_image_structs(&mut self, capacity: u32) -> Vec<*mut sys::SwapchainImageBaseHeader> {
        self.swapchain_images.allocate(capacity)
    }

    unsafe fn render_view(
        &mut self,
        view: &ProjectionView,
        image: *const sys::SwapchainImageBaseHeader,
        format: i64,
        cubes: &[Cube],
    ) -> Result<()> {
        let renderer = self.renderer.as_mut().ok_or(GraphicsError::NotInitialized)?;

        if view.targets_array_slice() {
            return Ok(());
        }

        if image.is_null() {
            return Err(GraphicsError::InvalidSwapchainImage("null image".into()).into());
        }
        let ty = (*image).ty;
        if ty != B::Image::structure_type() {
            return Err(GraphicsError::InvalidSwapchainImage(format!("unexpected structure type {:?}", ty)).into());
        }
        let image = &*(image as *const B::Image);
        let texture = image
            .texture()
            .ok_or_else(|| GraphicsError::InvalidSwapchainImage("texture not written by runtime".into()))?;

        renderer.render_view(view, &texture, format, cubes)
    }

    fn supported_swapchain_sample_count(&self, _view: &xr::ViewConfigurationView) -> u32 {
        1
    }

    fn update_options(&mut self, config: &GraphicsConfig) {
        self.clear_color = ClearColorPolicy::from_config(config);
        if let Some(renderer) = self.renderer.as_mut() {
            renderer.set_clear_color(self.clear_color.color());
        }
    }
}
