//! 设备选择器
//!
//! 负责两件事：
//! 1. 计算应用与运行时都能接受的特性级别列表
//! 2. 按「调试层 → 去掉调试层 → WARP 软件驱动」的顺序尝试创建设备
//!
//! 每次尝试都是一次全新的创建，失败的尝试不会留下任何状态。

use std::fmt;

use tracing::{info, warn};

use crate::core::error::{GraphicsError, Result};
use crate::xr::AdapterLuid;

/// D3D 特性级别
///
/// 变体按数值升序声明，派生的 `Ord` 与 D3D 数值大小一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum FeatureLevel {
    Level10_0 = 0xa000,
    Level10_1 = 0xa100,
    Level11_0 = 0xb000,
    Level11_1 = 0xb100,
    Level12_0 = 0xc000,
    Level12_1 = 0xc100,
}

/// 应用愿意使用的特性级别，从高到低
pub const APPLICATION_FEATURE_LEVELS: [FeatureLevel; 6] = [
    FeatureLevel::Level12_1,
    FeatureLevel::Level12_0,
    FeatureLevel::Level11_1,
    FeatureLevel::Level11_0,
    FeatureLevel::Level10_1,
    FeatureLevel::Level10_0,
];

impl FeatureLevel {
    /// 从 `D3D_FEATURE_LEVEL` 原始值转换
    ///
    /// 运行时可能报告本应用不认识的级别（如 9_x），此时返回 `None`。
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0xa000 => Some(FeatureLevel::Level10_0),
            0xa100 => Some(FeatureLevel::Level10_1),
            0xb000 => Some(FeatureLevel::Level11_0),
            0xb100 => Some(FeatureLevel::Level11_1),
            0xc000 => Some(FeatureLevel::Level12_0),
            0xc100 => Some(FeatureLevel::Level12_1),
            _ => None,
        }
    }

    /// `D3D_FEATURE_LEVEL` 原始值
    pub fn raw(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for FeatureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw = self.raw();
        write!(f, "{}_{}", raw >> 12, (raw >> 8) & 0xf)
    }
}

/// 过滤出不低于运行时最低要求的特性级别，保持原有相对顺序
///
/// `minimum` 是运行时报告的 `D3D_FEATURE_LEVEL` 原始值，可能高于本应用认识的任何级别。
pub fn candidate_feature_levels(levels: &[FeatureLevel], minimum: u32) -> Vec<FeatureLevel> {
    levels.iter().copied().filter(|level| level.raw() >= minimum).collect()
}

/// 驱动类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverType {
    /// 默认硬件适配器
    Hardware,
    /// 由显式指定的适配器决定
    Unknown,
    /// WARP 软件光栅化器
    Warp,
}

/// 单次设备创建尝试的参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreationAttempt {
    /// 目标适配器；WARP 尝试时总为 `None`
    pub adapter: Option<AdapterLuid>,
    pub driver: DriverType,
    /// 是否启用调试层
    pub debug: bool,
}

impl CreationAttempt {
    /// 第一次尝试：有适配器时绑定适配器，否则使用默认硬件
    pub fn initial(adapter: Option<AdapterLuid>, debug: bool) -> Self {
        let driver = if adapter.is_some() { DriverType::Unknown } else { DriverType::Hardware };
        Self { adapter, driver, debug }
    }
}

/// 设备创建失败的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCreationError {
    /// 调试层不可用（`DXGI_ERROR_SDK_COMPONENT_MISSING`）
    DebugLayerMissing,
    /// 其他原因
    Failed(String),
}

impl fmt::Display for DeviceCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceCreationError::DebugLayerMissing => write!(f, "debug layer is not installed"),
            DeviceCreationError::Failed(msg) => write!(f, "{}", msg),
        }
    }
}

/// 带回退的设备创建
///
/// # 回退顺序
///
/// 1. 调试层缺失且当前启用了调试层：去掉调试层重试
/// 2. 其他失败且当前不是 WARP：切换到 WARP（丢弃适配器）重试
/// 3. WARP 仍然失败：返回 `GraphicsError::DeviceCreation`
///
/// 调试层只会被去掉一次，驱动只会切换一次，所以最多尝试 3 次。
pub fn create_device_with_fallback<T, F>(
    adapter: Option<AdapterLuid>,
    levels: &[FeatureLevel],
    debug: bool,
    mut create: F,
) -> Result<T>
where
    F: FnMut(&CreationAttempt, &[FeatureLevel]) -> std::result::Result<T, DeviceCreationError>,
{
    let mut attempt = CreationAttempt::initial(adapter, debug);

    loop {
        match create(&attempt, levels) {
            Ok(device) => {
                info!(
                    driver = ?attempt.driver,
                    debug = attempt.debug,
                    adapter = ?attempt.adapter,
                    "Graphics device created"
                );
                return Ok(device);
            }
            Err(DeviceCreationError::DebugLayerMissing) if attempt.debug => {
                warn!(driver = ?attempt.driver, "Debug layer unavailable, retrying without it");
                attempt.debug = false;
            }
            Err(e) if attempt.driver != DriverType::Warp => {
                warn!(driver = ?attempt.driver, error = %e, "Device creation failed, falling back to WARP");
                attempt.driver = DriverType::Warp;
                attempt.adapter = None;
            }
            Err(e) => {
                return Err(GraphicsError::DeviceCreation(e.to_string()).into());
            }
        }
    }
}
