//! 按帧传入的 XR 数据类型

use openxr as xr;
use openxr::sys;

/// 待绘制的立方体：位姿 + 非均匀缩放
///
/// 内存布局与 C 侧 `struct Cube { XrPosef Pose; XrVector3f Scale; }` 一致，
/// 可以直接从 FFI 指针读取。
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Cube {
    pub pose: xr::Posef,
    pub scale: xr::Vector3f,
}

impl Cube {
    /// 单位缩放、单位位姿的立方体
    pub fn unit() -> Self {
        Self {
            pose: xr::Posef::IDENTITY,
            scale: xr::Vector3f { x: 1.0, y: 1.0, z: 1.0 },
        }
    }

    /// 在给定位姿处、按统一比例缩放的立方体
    pub fn at(pose: xr::Posef, scale: f32) -> Self {
        Self {
            pose,
            scale: xr::Vector3f { x: scale, y: scale, z: scale },
        }
    }
}

/// 交换链子图像：渲染区域与纹理数组切片
#[derive(Debug, Clone, Copy)]
pub struct SubImage {
    pub image_rect: xr::Rect2Di,
    pub image_array_index: u32,
}

/// 单个视图（单眼）的渲染描述
#[derive(Debug, Clone, Copy)]
pub struct ProjectionView {
    /// 视图在应用空间中的位姿
    pub pose: xr::Posef,
    /// 视场角（四个半角，弧度）
    pub fov: xr::Fovf,
    /// 目标子图像
    pub sub_image: SubImage,
}

impl ProjectionView {
    /// 该视图是否指向纹理数组的非零切片（不支持）
    pub fn targets_array_slice(&self) -> bool {
        self.sub_image.image_array_index != 0
    }
}

impl From<&sys::CompositionLayerProjectionView> for ProjectionView {
    fn from(view: &sys::CompositionLayerProjectionView) -> Self {
        Self {
            pose: view.pose,
            fov: view.fov,
            sub_image: SubImage {
                image_rect: view.sub_image.image_rect,
                image_array_index: view.sub_image.image_array_index,
            },
        }
    }
}

/// 显卡适配器的本地唯一标识（Windows LUID）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AdapterLuid {
    pub low_part: u32,
    pub high_part: i32,
}

impl AdapterLuid {
    /// 全零 LUID 表示运行时未指定适配器
    pub fn is_unspecified(&self) -> bool {
        self.low_part == 0 && self.high_part == 0
    }
}

/// 运行时对图形设备的要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsRequirements {
    /// 必须使用的适配器；`None` 表示使用系统默认适配器
    pub adapter: Option<AdapterLuid>,
    /// 运行时要求的最低特性级别（`D3D_FEATURE_LEVEL` 原始值）
    pub min_feature_level: u32,
}

impl GraphicsRequirements {
    /// 由原始 LUID 构造，全零 LUID 视为未指定
    pub fn new(adapter: AdapterLuid, min_feature_level: u32) -> Self {
        Self {
            adapter: (!adapter.is_unspecified()).then_some(adapter),
            min_feature_level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_luid_means_default_adapter() {
        let reqs = GraphicsRequirements::new(AdapterLuid { low_part: 0, high_part: 0 }, 0xb000);
        assert!(reqs.adapter.is_none());

        let luid = AdapterLuid { low_part: 3, high_part: 0 };
        assert_eq!(GraphicsRequirements::new(luid, 0xb000).adapter, Some(luid));
    }

    #[test]
    fn test_array_slice_detection() {
        let mut view = ProjectionView {
            pose: xr::Posef::IDENTITY,
            fov: xr::Fovf { angle_left: -1.0, angle_right: 1.0, angle_up: 1.0, angle_down: -1.0 },
            sub_image: SubImage {
                image_rect: xr::Rect2Di {
                    offset: xr::Offset2Di { x: 0, y: 0 },
                    extent: xr::Extent2Di { width: 8, height: 8 },
                },
                image_array_index: 0,
            },
        };
        assert!(!view.targets_array_slice());
        view.sub_image.image_array_index = 1;
        assert!(view.targets_array_slice());
    }
}
