//! 无头后端
//!
//! 不需要 GPU 或操作系统图形栈的后端实现。所有平台都会注册，
//! 用于在没有 D3D11 的机器上跑通插件流程，也是插件层测试的基础。
//!
//! 设备创建失败可以预先注入，以验证设备选择器的回退顺序。

mod device;

use std::collections::VecDeque;
use std::ffi::c_void;
use std::ptr;

use openxr::sys;

use crate::gfx::device::{Backend, GraphicsBinding, SwapchainImage};
use crate::gfx::feature_level::{CreationAttempt, DeviceCreationError, FeatureLevel};
use crate::gfx::format::D3D11_COLOR_FORMATS;

pub use device::{DeviceCommand, HeadlessBuffer, HeadlessDevice, HeadlessTexture, HeadlessView};

/// 交换链图像记录的类型标记（不与任何 Khronos 注册值冲突）
const HEADLESS_IMAGE_TYPE: i32 = 1_000_990_001;
/// 图形绑定的类型标记
const HEADLESS_BINDING_TYPE: i32 = 1_000_990_002;

/// 无头交换链图像记录
#[repr(C)]
#[derive(Debug)]
pub struct HeadlessImage {
    pub ty: sys::StructureType,
    pub next: *mut c_void,
    pub texture: HeadlessTexture,
}

unsafe impl SwapchainImage for HeadlessImage {
    type Texture = HeadlessTexture;

    fn structure_type() -> sys::StructureType {
        sys::StructureType::from_raw(HEADLESS_IMAGE_TYPE)
    }

    fn tagged() -> Self {
        Self {
            ty: Self::structure_type(),
            next: ptr::null_mut(),
            texture: HeadlessTexture::default(),
        }
    }

    fn texture(&self) -> Option<HeadlessTexture> {
        (self.texture.id != 0).then_some(self.texture)
    }
}

/// 无头图形绑定
#[repr(C)]
#[derive(Debug)]
pub struct HeadlessBinding {
    pub ty: sys::StructureType,
    pub next: *const c_void,
    pub device_id: u64,
}

unsafe impl GraphicsBinding for HeadlessBinding {}

/// 无头后端
#[derive(Debug, Default)]
pub struct HeadlessBackend {
    failures: VecDeque<DeviceCreationError>,
    fail_resources: bool,
    attempts: Vec<(CreationAttempt, Vec<FeatureLevel>)>,
    next_device: u64,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预先注入设备创建失败，按顺序消耗
    pub fn with_creation_failures<I>(mut self, failures: I) -> Self
    where
        I: IntoIterator<Item = DeviceCreationError>,
    {
        self.failures.extend(failures);
        self
    }

    /// 创建出的设备无法分配缓冲区
    pub fn with_resource_failure(mut self) -> Self {
        self.fail_resources = true;
        self
    }

    /// 已经发生的设备创建尝试及其特性级别列表
    pub fn attempts(&self) -> &[(CreationAttempt, Vec<FeatureLevel>)] {
        &self.attempts
    }
}

impl Backend for HeadlessBackend {
    type Device = HeadlessDevice;
    type Image = HeadlessImage;
    type Binding = HeadlessBinding;

    const NAME: &'static str = "Headless";

    fn instance_extensions(&self) -> Vec<String> {
        Vec::new()
    }

    fn supported_color_formats(&self) -> &'static [i64] {
        &D3D11_COLOR_FORMATS
    }

    fn create_device(
        &mut self,
        attempt: &CreationAttempt,
        levels: &[FeatureLevel],
    ) -> std::result::Result<HeadlessDevice, DeviceCreationError> {
        self.attempts.push((*attempt, levels.to_vec()));
        if let Some(failure) = self.failures.pop_front() {
            return Err(failure);
        }
        self.next_device += 1;
        let device = HeadlessDevice::with_id(self.next_device);
        Ok(if self.fail_resources { device.failing_resources() } else { device })
    }

    fn graphics_binding(&self, device: &HeadlessDevice) -> HeadlessBinding {
        HeadlessBinding {
            ty: sys::StructureType::from_raw(HEADLESS_BINDING_TYPE),
            next: ptr::null(),
            device_id: device.id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untouched_image_has_no_texture() {
        let image = HeadlessImage::tagged();
        assert_eq!(image.ty, HeadlessImage::structure_type());
        assert!(image.texture().is_none());
    }

    #[test]
    fn test_injected_failures_are_consumed_in_order() {
        let mut backend = HeadlessBackend::new()
            .with_creation_failures([DeviceCreationError::DebugLayerMissing]);
        let attempt = CreationAttempt::initial(None, true);
        assert_eq!(
            backend.create_device(&attempt, &[FeatureLevel::Level11_0]).err(),
            Some(DeviceCreationError::DebugLayerMissing)
        );
        assert!(backend.create_device(&attempt, &[FeatureLevel::Level11_0]).is_ok());
        assert_eq!(backend.attempts().len(), 2);
    }

    #[test]
    fn test_binding_points_at_header() {
        let backend = HeadlessBackend::new();
        let binding = backend.graphics_binding(&HeadlessDevice::with_id(7));
        let base = binding.as_base();
        assert_eq!(unsafe { (*base).ty }, sys::StructureType::from_raw(HEADLESS_BINDING_TYPE));
        assert_eq!(binding.device_id, 7);
    }
}
