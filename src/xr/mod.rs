//! OpenXR 边界类型
//!
//! 插件与外部程序、OpenXR 运行时之间交换的数据结构：
//! - `types`：立方体、投影视图、图形需求等按调用传入的数据
//! - `runtime`：运行时图形需求查询接口

pub mod types;
pub mod runtime;

pub use types::{AdapterLuid, Cube, GraphicsRequirements, ProjectionView, SubImage};
pub use runtime::XrRuntime;
