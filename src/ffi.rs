//! C ABI
//!
//! 把 `GraphicsPlugin` 以不透明句柄的形式导出给 C/C++ 的 OpenXR 程序。
//!
//! # 约定
//!
//! - 返回 `i32` 的函数：0 表示成功，负数为 `XrResult` 错误码
//! - `dist_xr_select_color_swapchain_format` 成功时返回格式（非负），失败时返回负的错误码
//! - 所有函数都会捕获 panic，panic 映射为 `XR_ERROR_RUNTIME_FAILURE`
//! - 句柄只能在创建它的线程上使用

use std::ffi::{c_char, c_void, CStr, CString};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;

use openxr as xr;
use openxr::sys;

use crate::core::config::{Config, EnvironmentBlendMode};
use crate::core::error::{ConfigError, DistXrError, Result};
use crate::engine_error;
use crate::gfx::factory::PluginRegistry;
use crate::gfx::plugin::GraphicsPlugin;
use crate::xr::{AdapterLuid, Cube, GraphicsRequirements, ProjectionView, XrRuntime};

/// 插件句柄
pub struct DistXrPlugin {
    plugin: Box<dyn GraphicsPlugin>,
    config: Config,
    extensions: Vec<CString>,
}

/// 运行时回调写出的图形需求
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct DistXrGraphicsRequirements {
    pub adapter_luid_low: u32,
    pub adapter_luid_high: i32,
    /// `D3D_FEATURE_LEVEL`
    pub min_feature_level: u32,
}

/// 调用方提供的运行时查询回调
///
/// 回调返回 `XrResult`；非 0 时原样作为 `dist_xr_initialize_device` 的返回值。
#[repr(C)]
pub struct DistXrRuntime {
    pub user_data: *mut c_void,
    pub get_graphics_requirements: Option<
        unsafe extern "C" fn(user_data: *mut c_void, system_id: u64, out: *mut DistXrGraphicsRequirements) -> i32,
    >,
}

impl XrRuntime for DistXrRuntime {
    fn query_graphics_requirements(
        &self,
        system: sys::SystemId,
    ) -> std::result::Result<GraphicsRequirements, sys::Result> {
        let callback = self.get_graphics_requirements.ok_or(sys::Result::ERROR_FUNCTION_UNSUPPORTED)?;
        let mut out = DistXrGraphicsRequirements::default();
        let code = unsafe { callback(self.user_data, system.into_raw(), &mut out) };
        if code != 0 {
            return Err(sys::Result::from_raw(code));
        }
        Ok(GraphicsRequirements::new(
            AdapterLuid { low_part: out.adapter_luid_low, high_part: out.adapter_luid_high },
            out.min_feature_level,
        ))
    }
}

fn runtime_failure() -> i32 {
    sys::Result::ERROR_RUNTIME_FAILURE.into_raw()
}

fn handle_invalid() -> i32 {
    sys::Result::ERROR_HANDLE_INVALID.into_raw()
}

fn validation_failure() -> i32 {
    sys::Result::ERROR_VALIDATION_FAILURE.into_raw()
}

/// 执行 `f`，把 panic 转为错误码
fn guarded<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            engine_error!("Panic caught at C ABI boundary");
            on_panic
        }
    }
}

fn status(result: Result<()>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => {
            engine_error!(error = %e, "Graphics plugin call failed");
            e.status_code()
        }
    }
}

unsafe fn optional_str<'a>(s: *const c_char) -> std::result::Result<Option<&'a str>, DistXrError> {
    if s.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(s).to_str().map(Some).map_err(|e| {
        ConfigError::InvalidValue { field: "string argument".into(), reason: e.to_string() }.into()
    })
}

unsafe fn create(api: *const c_char, config_path: *const c_char) -> Result<DistXrPlugin> {
    let mut config = match optional_str(config_path)? {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    config.graphics.plugin = optional_str(api)?.unwrap_or_default().to_string();

    let plugin = PluginRegistry::with_builtin_backends().create(&config.graphics.plugin, &config)?;
    let extensions = plugin
        .instance_extensions()
        .into_iter()
        .map(CString::new)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| DistXrError::Initialization(e.to_string()))?;

    Ok(DistXrPlugin { plugin, config, extensions })
}

/// 创建插件
///
/// `api` 为后端标签（大小写不敏感）；`config_path` 可为空，非空时从该 TOML 文件加载配置。
/// 失败时返回空指针。
///
/// # Safety
///
/// 非空的字符串参数必须是以 NUL 结尾的有效 C 字符串。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_create(api: *const c_char, config_path: *const c_char) -> *mut DistXrPlugin {
    guarded(ptr::null_mut(), || match create(api, config_path) {
        Ok(plugin) => Box::into_raw(Box::new(plugin)),
        Err(e) => {
            engine_error!(error = %e, "Failed to create graphics plugin");
            ptr::null_mut()
        }
    })
}

/// 销毁插件；之前分配的交换链记录和图形绑定随之失效
///
/// # Safety
///
/// `plugin` 必须为空或由 `dist_xr_create` 返回且尚未销毁。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_destroy(plugin: *mut DistXrPlugin) {
    if plugin.is_null() {
        return;
    }
    guarded((), || drop(Box::from_raw(plugin)))
}

/// 写出实例扩展名，返回扩展总数
///
/// `out` 为空或容量不足时只返回总数。字符串在插件存活期间有效。
///
/// # Safety
///
/// `plugin` 必须有效；`out` 非空时至少可写 `capacity` 个指针。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_get_instance_extensions(
    plugin: *const DistXrPlugin,
    out: *mut *const c_char,
    capacity: u32,
) -> u32 {
    let Some(handle) = plugin.as_ref() else { return 0 };
    guarded(0, || {
        let count = handle.extensions.len() as u32;
        if !out.is_null() && capacity >= count {
            for (i, name) in handle.extensions.iter().enumerate() {
                *out.add(i) = name.as_ptr();
            }
        }
        count
    })
}

/// 选择设备并构建绘制资源
///
/// # Safety
///
/// `plugin` 与 `runtime` 必须有效。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_initialize_device(
    plugin: *mut DistXrPlugin,
    runtime: *const DistXrRuntime,
    system_id: u64,
) -> i32 {
    let Some(handle) = plugin.as_mut() else { return handle_invalid() };
    let Some(runtime) = runtime.as_ref() else { return validation_failure() };
    guarded(runtime_failure(), || {
        status(handle.plugin.initialize_device(runtime, sys::SystemId::from_raw(system_id)))
    })
}

/// 选择颜色交换链格式
///
/// # Safety
///
/// `plugin` 必须有效；`formats` 指向 `count` 个 `int64_t`。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_select_color_swapchain_format(
    plugin: *const DistXrPlugin,
    formats: *const i64,
    count: u32,
) -> i64 {
    let Some(handle) = plugin.as_ref() else { return handle_invalid() as i64 };
    let formats = if formats.is_null() || count == 0 { &[][..] } else { slice::from_raw_parts(formats, count as usize) };
    guarded(runtime_failure() as i64, || match handle.plugin.select_color_swapchain_format(formats) {
        Ok(format) => format,
        Err(e) => {
            engine_error!(error = %e, "Swapchain format negotiation failed");
            e.status_code() as i64
        }
    })
}

/// 会话创建用的图形绑定；设备未初始化时为空
///
/// # Safety
///
/// `plugin` 必须有效。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_get_graphics_binding(plugin: *const DistXrPlugin) -> *const sys::BaseInStructure {
    let Some(handle) = plugin.as_ref() else { return ptr::null() };
    guarded(ptr::null(), || handle.plugin.graphics_binding().unwrap_or(ptr::null()))
}

/// 分配 `capacity` 条交换链图像记录，把头部指针写入 `out`
///
/// # Safety
///
/// `plugin` 必须有效；`capacity > 0` 时 `out` 至少可写 `capacity` 个指针。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_allocate_swapchain_image_structs(
    plugin: *mut DistXrPlugin,
    capacity: u32,
    out: *mut *mut sys::SwapchainImageBaseHeader,
) -> i32 {
    let Some(handle) = plugin.as_mut() else { return handle_invalid() };
    if capacity > 0 && out.is_null() {
        return validation_failure();
    }
    guarded(runtime_failure(), || {
        for (i, header) in handle.plugin.allocate_swapchain_image_structs(capacity).into_iter().enumerate() {
            *out.add(i) = header;
        }
        0
    })
}

/// 渲染一个视图
///
/// # Safety
///
/// `plugin`、`view` 必须有效；`image` 必须是本插件分配且已由运行时填写的记录；
/// `cubes` 指向 `cube_count` 个 `Cube`（`cube_count == 0` 时可为空）。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_render_view(
    plugin: *mut DistXrPlugin,
    view: *const sys::CompositionLayerProjectionView,
    image: *const sys::SwapchainImageBaseHeader,
    format: i64,
    cubes: *const Cube,
    cube_count: u32,
) -> i32 {
    let Some(handle) = plugin.as_mut() else { return handle_invalid() };
    let Some(view) = view.as_ref() else { return validation_failure() };
    if cube_count > 0 && cubes.is_null() {
        return validation_failure();
    }
    let cubes = if cube_count == 0 { &[][..] } else { slice::from_raw_parts(cubes, cube_count as usize) };
    let view = ProjectionView::from(view);
    guarded(runtime_failure(), || status(handle.plugin.render_view(&view, image, format, cubes)))
}

/// 交换链采样数
///
/// # Safety
///
/// `plugin` 与 `view` 必须有效。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_get_supported_swapchain_sample_count(
    plugin: *const DistXrPlugin,
    view: *const sys::ViewConfigurationView,
) -> u32 {
    let (Some(handle), Some(view)) = (plugin.as_ref(), view.as_ref()) else { return 1 };
    let view = xr::ViewConfigurationView {
        recommended_image_rect_width: view.recommended_image_rect_width,
        max_image_rect_width: view.max_image_rect_width,
        recommended_image_rect_height: view.recommended_image_rect_height,
        max_image_rect_height: view.max_image_rect_height,
        recommended_swapchain_sample_count: view.recommended_swapchain_sample_count,
        max_swapchain_sample_count: view.max_swapchain_sample_count,
    };
    guarded(1, || handle.plugin.supported_swapchain_sample_count(&view))
}

/// 更新运行期选项
///
/// `blend_mode` 为 `XrEnvironmentBlendMode` 原始值；`clear_from_blend_mode` 为真时清屏颜色跟随混合模式。
///
/// # Safety
///
/// `plugin` 必须有效。
#[no_mangle]
pub unsafe extern "C" fn dist_xr_update_options(
    plugin: *mut DistXrPlugin,
    blend_mode: i32,
    clear_from_blend_mode: bool,
) -> i32 {
    let Some(handle) = plugin.as_mut() else { return handle_invalid() };
    let mode = match xr::EnvironmentBlendMode::from_raw(blend_mode) {
        xr::EnvironmentBlendMode::OPAQUE => EnvironmentBlendMode::Opaque,
        xr::EnvironmentBlendMode::ADDITIVE => EnvironmentBlendMode::Additive,
        xr::EnvironmentBlendMode::ALPHA_BLEND => EnvironmentBlendMode::AlphaBlend,
        _ => return validation_failure(),
    };
    guarded(runtime_failure(), || {
        handle.config.graphics.environment_blend_mode = mode;
        handle.config.graphics.clear_from_blend_mode = clear_from_blend_mode;
        handle.plugin.update_options(&handle.config.graphics);
        0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{HeadlessImage, HeadlessTexture};

    unsafe extern "C" fn requirements_11_0(
        _user_data: *mut c_void,
        _system_id: u64,
        out: *mut DistXrGraphicsRequirements,
    ) -> i32 {
        *out = DistXrGraphicsRequirements { adapter_luid_low: 0, adapter_luid_high: 0, min_feature_level: 0xb000 };
        0
    }

    unsafe extern "C" fn requirements_lost(_: *mut c_void, _: u64, _: *mut DistXrGraphicsRequirements) -> i32 {
        sys::Result::ERROR_INSTANCE_LOST.into_raw()
    }

    fn runtime(callback: unsafe extern "C" fn(*mut c_void, u64, *mut DistXrGraphicsRequirements) -> i32) -> DistXrRuntime {
        DistXrRuntime { user_data: ptr::null_mut(), get_graphics_requirements: Some(callback) }
    }

    fn headless() -> *mut DistXrPlugin {
        unsafe { dist_xr_create(c"headless".as_ptr(), ptr::null()) }
    }

    fn projection_view(array_index: u32) -> sys::CompositionLayerProjectionView {
        sys::CompositionLayerProjectionView {
            ty: sys::CompositionLayerProjectionView::TYPE,
            next: ptr::null(),
            pose: xr::Posef::IDENTITY,
            fov: xr::Fovf { angle_left: -0.7, angle_right: 0.7, angle_up: 0.7, angle_down: -0.7 },
            sub_image: sys::SwapchainSubImage {
                swapchain: sys::Swapchain::NULL,
                image_rect: xr::Rect2Di {
                    offset: xr::Offset2Di { x: 0, y: 0 },
                    extent: xr::Extent2Di { width: 128, height: 128 },
                },
                image_array_index: array_index,
            },
        }
    }

    #[test]
    fn test_create_rejects_unknown_and_empty_api() {
        unsafe {
            assert!(dist_xr_create(c"Metal".as_ptr(), ptr::null()).is_null());
            assert!(dist_xr_create(c"".as_ptr(), ptr::null()).is_null());
            assert!(dist_xr_create(ptr::null(), ptr::null()).is_null());
        }
    }

    #[test]
    fn test_full_frame_over_c_abi() {
        let plugin = headless();
        assert!(!plugin.is_null());
        unsafe {
            assert_eq!(dist_xr_get_instance_extensions(plugin, ptr::null_mut(), 0), 0);
            assert!(dist_xr_get_graphics_binding(plugin).is_null());

            let rt = runtime(requirements_11_0);
            assert_eq!(dist_xr_initialize_device(plugin, &rt, 1), 0);
            assert!(!dist_xr_get_graphics_binding(plugin).is_null());

            let formats = [1000i64, 29, 28];
            assert_eq!(dist_xr_select_color_swapchain_format(plugin, formats.as_ptr(), 3), 29);

            let mut images = [ptr::null_mut(); 2];
            assert_eq!(dist_xr_allocate_swapchain_image_structs(plugin, 2, images.as_mut_ptr()), 0);
            assert!(images.iter().all(|p| !p.is_null()));
            (*(images[0] as *mut HeadlessImage)).texture = HeadlessTexture::new(77, 128, 128, 1);

            let view = projection_view(0);
            let cubes = [Cube::unit()];
            assert_eq!(dist_xr_render_view(plugin, &view, images[0], 29, cubes.as_ptr(), 1), 0);
            assert_eq!(dist_xr_render_view(plugin, &view, images[0], 29, ptr::null(), 0), 0);

            dist_xr_destroy(plugin);
        }
    }

    #[test]
    fn test_runtime_error_code_is_returned() {
        let plugin = headless();
        unsafe {
            let rt = runtime(requirements_lost);
            assert_eq!(dist_xr_initialize_device(plugin, &rt, 1), sys::Result::ERROR_INSTANCE_LOST.into_raw());
            dist_xr_destroy(plugin);
        }
    }

    #[test]
    fn test_error_codes() {
        let plugin = headless();
        unsafe {
            let formats = [5i64];
            assert_eq!(
                dist_xr_select_color_swapchain_format(plugin, formats.as_ptr(), 1),
                sys::Result::ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED.into_raw() as i64
            );

            // 未初始化时渲染
            let view = projection_view(0);
            assert_eq!(
                dist_xr_render_view(plugin, &view, ptr::null(), 28, ptr::null(), 0),
                sys::Result::ERROR_RUNTIME_FAILURE.into_raw()
            );
            assert_eq!(dist_xr_initialize_device(ptr::null_mut(), ptr::null(), 1), handle_invalid());
            assert_eq!(dist_xr_update_options(plugin, 99, true), validation_failure());
            assert_eq!(dist_xr_update_options(plugin, 1, true), 0);
            dist_xr_destroy(plugin);
        }
    }

    #[test]
    fn test_sample_count() {
        let plugin = headless();
        let view = sys::ViewConfigurationView {
            ty: sys::ViewConfigurationView::TYPE,
            next: ptr::null_mut(),
            recommended_image_rect_width: 1440,
            max_image_rect_width: 2880,
            recommended_image_rect_height: 1600,
            max_image_rect_height: 3200,
            recommended_swapchain_sample_count: 4,
            max_swapchain_sample_count: 4,
        };
        unsafe {
            assert_eq!(dist_xr_get_supported_swapchain_sample_count(plugin, &view), 1);
            dist_xr_destroy(plugin);
        }
    }
}
