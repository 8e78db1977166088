//! OpenXR 运行时查询接口
//!
//! 设备选择器只需要运行时回答一个问题：这个系统要求用哪块适配器、最低什么特性级别。
//! 把它抽象成 trait 之后，Windows 上由 `openxr::Instance` 实现，
//! 测试和 FFI 调用方可以提供自己的实现。

use openxr::sys;

use super::types::GraphicsRequirements;

/// 运行时图形需求查询
pub trait XrRuntime {
    /// 查询指定系统的图形设备需求
    ///
    /// # 返回值
    ///
    /// 失败时返回运行时自身的错误码，调用方原样向上传递。
    fn query_graphics_requirements(
        &self,
        system: sys::SystemId,
    ) -> std::result::Result<GraphicsRequirements, sys::Result>;
}

/// 固定返回同一份需求的运行时，供无头后端和测试使用
#[derive(Debug, Clone, Copy)]
pub struct FixedRequirements(pub std::result::Result<GraphicsRequirements, sys::Result>);

impl XrRuntime for FixedRequirements {
    fn query_graphics_requirements(
        &self,
        _system: sys::SystemId,
    ) -> std::result::Result<GraphicsRequirements, sys::Result> {
        self.0
    }
}
