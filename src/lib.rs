//! DistXR - OpenXR 图形插件层
//!
//! 为 OpenXR 程序提供图形侧的全部工作：选择并创建图形设备、协商交换链格式、
//! 管理交换链图像记录，以及把一组立方体渲染到每个视图。
//! 支持 D3D11（仅 Windows）和一个不依赖 GPU 的无头后端。
//!
//! # 模块结构
//!
//! - `core`: 核心功能模块（日志、配置、错误处理）
//! - `math`: 位姿与矩阵转换
//! - `xr`: 按帧传入的 XR 数据类型与运行时查询接口
//! - `gfx`: 图形插件、设备抽象与各后端实现
//! - `ffi`: C ABI 导出
//!
//! # 使用示例
//!
//! ```no_run
//! use dist_xr::core::Config;
//! use dist_xr::gfx::create_graphics_plugin;
//!
//! let mut config = Config::default();
//! config.graphics.plugin = "Headless".to_string();
//! let plugin = create_graphics_plugin(&config).unwrap();
//! println!("extensions: {:?}", plugin.instance_extensions());
//! ```

pub mod core;
pub mod math;
pub mod xr;
pub mod gfx;
pub mod ffi;
