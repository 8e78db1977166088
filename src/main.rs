//! DistXR 探测程序
//!
//! 按配置创建图形插件，打印它需要的 OpenXR 实例扩展。
//! 选择无头后端时，再用一个固定需求的模拟运行时跑一帧完整的双眼渲染，
//! 用来在没有头显的机器上检查插件流程。
//!
//! # 使用方法
//!
//! ```bash
//! # 使用配置文件 dist_xr.toml
//! cargo run
//!
//! # 命令行覆盖
//! cargo run -- --graphics headless --blend-mode additive --no-debug-layer
//! ```

use anyhow::{bail, Context};
use openxr as xr;
use openxr::sys;
use tracing::{error, info};

use dist_xr::core::{log, Config};
use dist_xr::gfx::format::dxgi;
use dist_xr::gfx::headless::{HeadlessImage, HeadlessTexture};
use dist_xr::gfx::{GraphicsPlugin, PluginRegistry};
use dist_xr::xr::runtime::FixedRequirements;
use dist_xr::xr::{AdapterLuid, Cube, GraphicsRequirements, ProjectionView, SubImage};

const EYE_WIDTH: i32 = 1024;
const EYE_HEIGHT: i32 = 1024;

fn main() -> anyhow::Result<()> {
    // 1. 加载配置并应用命令行参数
    let mut config = Config::from_file_or_default("dist_xr.toml");
    config.apply_args(std::env::args());
    config.validate().context("invalid configuration")?;

    // 2. 初始化日志系统
    let log_file = config.logging.file_output.then_some(config.logging.log_file.as_str());
    log::init_logger(config.logging.level, config.logging.file_output, log_file)?;
    info!(version = env!("CARGO_PKG_VERSION"), "DistXR probe starting");

    // 3. 创建插件
    let registry = PluginRegistry::with_builtin_backends();
    info!(available = ?registry.tags(), requested = %config.graphics.plugin, "Graphics plugins");
    let mut plugin = registry.create(&config.graphics.plugin, &config)?;
    info!(
        plugin = plugin.name(),
        extensions = ?plugin.instance_extensions(),
        blend_mode = config.graphics.environment_blend_mode.name(),
        "Graphics plugin ready"
    );

    if plugin.name() != "Headless" {
        info!("A running OpenXR runtime is required to go further with this backend");
        return Ok(());
    }

    if let Err(e) = run_headless_frame(plugin.as_mut()) {
        error!(error = %e, "Headless frame failed");
        return Err(e);
    }
    Ok(())
}

/// 用模拟运行时跑一帧：初始化设备、协商格式、分配交换链记录、渲染左右眼
fn run_headless_frame(plugin: &mut dyn GraphicsPlugin) -> anyhow::Result<()> {
    let runtime = FixedRequirements(Ok(GraphicsRequirements::new(
        AdapterLuid { low_part: 0, high_part: 0 },
        0xb000,
    )));
    plugin.initialize_device(&runtime, sys::SystemId::from_raw(1))?;
    if plugin.graphics_binding().is_none() {
        bail!("plugin reported success without a graphics binding");
    }

    let format = plugin.select_color_swapchain_format(&[
        dxgi::R8G8B8A8_UNORM_SRGB,
        dxgi::B8G8R8A8_UNORM_SRGB,
        dxgi::R8G8B8A8_UNORM,
    ])?;

    // 模拟运行时为每只眼睛的交换链写入纹理
    let images: Vec<_> = (0..2u64)
        .map(|eye| {
            let image = plugin.allocate_swapchain_image_structs(1)[0];
            unsafe {
                (*(image as *mut HeadlessImage)).texture =
                    HeadlessTexture::new(eye + 1, EYE_WIDTH as u32, EYE_HEIGHT as u32, 1);
            }
            image
        })
        .collect();

    let cubes = [
        Cube::at(pose(0.0, 0.0, -1.5), 0.25),
        Cube::at(pose(-0.5, 0.0, -2.0), 0.1),
        Cube::at(pose(0.5, 0.0, -2.0), 0.1),
    ];

    for (eye, &image) in images.iter().enumerate() {
        let offset = if eye == 0 { -0.032 } else { 0.032 };
        let view = ProjectionView {
            pose: pose(offset, 1.6, 0.0),
            fov: xr::Fovf { angle_left: -0.785, angle_right: 0.785, angle_up: 0.785, angle_down: -0.785 },
            sub_image: SubImage {
                image_rect: xr::Rect2Di {
                    offset: xr::Offset2Di { x: 0, y: 0 },
                    extent: xr::Extent2Di { width: EYE_WIDTH, height: EYE_HEIGHT },
                },
                image_array_index: 0,
            },
        };
        unsafe { plugin.render_view(&view, image, format, &cubes)? };
        info!(eye, format, cubes = cubes.len(), "View rendered");
    }

    info!("Headless frame completed");
    Ok(())
}

fn pose(x: f32, y: f32, z: f32) -> xr::Posef {
    xr::Posef {
        orientation: xr::Quaternionf { x: 0.0, y: 0.0, z: 0.0, w: 1.0 },
        position: xr::Vector3f { x, y, z },
    }
}
