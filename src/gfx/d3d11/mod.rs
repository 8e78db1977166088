//! Direct3D 11 后端
//!
//! 仅在 Windows 上编译。负责：
//! - 声明 `XR_KHR_D3D11_enable` 扩展
//! - 按运行时指定的适配器 LUID 查找 DXGI 适配器并创建设备
//! - 读取运行时写入 `XrSwapchainImageD3D11KHR` 的纹理
//! - 生成 `XrGraphicsBindingD3D11KHR`

mod device;

use std::ffi::c_void;
use std::ptr;

use openxr as xr;
use openxr::sys;
use tracing::{debug, warn};
use windows::{
    core::Interface,
    Win32::Foundation::HMODULE,
    Win32::Graphics::Direct3D::*,
    Win32::Graphics::Direct3D11::*,
    Win32::Graphics::Dxgi::*,
};

use crate::gfx::device::{Backend, GraphicsBinding, SwapchainImage};
use crate::gfx::feature_level::{CreationAttempt, DeviceCreationError, DriverType, FeatureLevel};
use crate::gfx::format::D3D11_COLOR_FORMATS;
use crate::xr::{AdapterLuid, GraphicsRequirements, XrRuntime};

pub use device::D3D11Device;

/// D3D11 后端
#[derive(Debug, Default)]
pub struct D3D11Backend;

impl D3D11Backend {
    pub fn new() -> Self {
        Self
    }
}

/// 按 LUID 查找适配器
fn find_adapter(luid: AdapterLuid) -> std::result::Result<IDXGIAdapter, DeviceCreationError> {
    let failed = |e: windows::core::Error| DeviceCreationError::Failed(e.to_string());
    unsafe {
        let factory: IDXGIFactory1 = CreateDXGIFactory1().map_err(failed)?;
        let mut index = 0;
        // 枚举结束时返回 DXGI_ERROR_NOT_FOUND
        while let Ok(adapter) = factory.EnumAdapters1(index) {
            let desc = adapter.GetDesc1().map_err(failed)?;
            if desc.AdapterLuid.LowPart == luid.low_part && desc.AdapterLuid.HighPart == luid.high_part {
                debug!(index, "Found adapter matching runtime LUID");
                return adapter.cast::<IDXGIAdapter>().map_err(failed);
            }
            index += 1;
        }
    }
    Err(DeviceCreationError::Failed(format!(
        "no adapter with LUID {:08x}:{:08x}",
        luid.high_part, luid.low_part
    )))
}

impl Backend for D3D11Backend {
    type Device = D3D11Device;
    type Image = sys::SwapchainImageD3D11KHR;
    type Binding = sys::GraphicsBindingD3D11KHR;

    const NAME: &'static str = "D3D11";

    fn instance_extensions(&self) -> Vec<String> {
        vec!["XR_KHR_D3D11_enable".to_string()]
    }

    fn supported_color_formats(&self) -> &'static [i64] {
        &D3D11_COLOR_FORMATS
    }

    fn create_device(
        &mut self,
        attempt: &CreationAttempt,
        levels: &[FeatureLevel],
    ) -> std::result::Result<D3D11Device, DeviceCreationError> {
        let adapter = match attempt.adapter {
            Some(luid) => Some(find_adapter(luid)?),
            None => None,
        };

        let driver = match attempt.driver {
            DriverType::Hardware => D3D_DRIVER_TYPE_HARDWARE,
            DriverType::Unknown => D3D_DRIVER_TYPE_UNKNOWN,
            DriverType::Warp => D3D_DRIVER_TYPE_WARP,
        };

        let mut flags = D3D11_CREATE_DEVICE_BGRA_SUPPORT;
        if attempt.debug {
            flags |= D3D11_CREATE_DEVICE_DEBUG;
        }

        let feature_levels: Vec<D3D_FEATURE_LEVEL> =
            levels.iter().map(|level| D3D_FEATURE_LEVEL(level.raw() as i32)).collect();

        let mut device = None;
        let mut context = None;
        let mut feature_level = D3D_FEATURE_LEVEL::default();

        let result = unsafe {
            D3D11CreateDevice(
                adapter.as_ref(),
                driver,
                HMODULE::default(),
                flags,
                Some(&feature_levels),
                D3D11_SDK_VERSION,
                Some(&mut device),
                Some(&mut feature_level),
                Some(&mut context),
            )
        };

        if let Err(e) = result {
            if e.code() == DXGI_ERROR_SDK_COMPONENT_MISSING {
                return Err(DeviceCreationError::DebugLayerMissing);
            }
            return Err(DeviceCreationError::Failed(e.to_string()));
        }

        match (device, context) {
            (Some(device), Some(context)) => {
                debug!(feature_level = feature_level.0, "D3D11 device created");
                Ok(D3D11Device::new(device, context, feature_level, attempt.debug))
            }
            _ => {
                warn!("D3D11CreateDevice succeeded without returning a device");
                Err(DeviceCreationError::Failed("no device returned".into()))
            }
        }
    }

    fn graphics_binding(&self, device: &D3D11Device) -> sys::GraphicsBindingD3D11KHR {
        sys::GraphicsBindingD3D11KHR {
            ty: sys::GraphicsBindingD3D11KHR::TYPE,
            next: ptr::null(),
            device: device.device.as_raw() as *mut _,
        }
    }
}

unsafe impl SwapchainImage for sys::SwapchainImageD3D11KHR {
    type Texture = ID3D11Texture2D;

    fn structure_type() -> sys::StructureType {
        sys::SwapchainImageD3D11KHR::TYPE
    }

    fn tagged() -> Self {
        Self {
            ty: Self::TYPE,
            next: ptr::null_mut(),
            texture: ptr::null_mut(),
        }
    }

    fn texture(&self) -> Option<ID3D11Texture2D> {
        let raw = self.texture as *mut c_void;
        // 运行时持有纹理的引用；这里借用后 AddRef 得到自己的引用
        unsafe { ID3D11Texture2D::from_raw_borrowed(&raw).cloned() }
    }
}

unsafe impl GraphicsBinding for sys::GraphicsBindingD3D11KHR {}

impl XrRuntime for xr::Instance {
    fn query_graphics_requirements(
        &self,
        system: sys::SystemId,
    ) -> std::result::Result<GraphicsRequirements, sys::Result> {
        let requirements = self.graphics_requirements::<xr::D3D11>(system)?;
        let luid = AdapterLuid {
            low_part: requirements.adapter_luid.LowPart,
            high_part: requirements.adapter_luid.HighPart,
        };
        Ok(GraphicsRequirements::new(luid, requirements.min_feature_level as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_image_has_no_texture() {
        let image = sys::SwapchainImageD3D11KHR::tagged();
        assert_eq!(image.ty, sys::StructureType::SWAPCHAIN_IMAGE_D3D11_KHR);
        assert!(image.texture().is_none());
    }

    #[test]
    fn test_extension_name() {
        assert_eq!(D3D11Backend::new().instance_extensions(), vec!["XR_KHR_D3D11_enable"]);
    }
}
