//! 错误处理模块
//!
//! 定义了图形插件层使用的统一错误类型。
//!
//! # 错误分类
//!
//! - **能力错误**：没有可用的特性级别、没有共同的交换链格式。初始化路径上致命，不重试。
//! - **设备创建错误**：调试层缺失、硬件设备创建失败。由设备选择器按回退顺序自动重试，
//!   全部失败后才会上报。
//! - **资源创建错误**：着色器编译、缓冲区分配失败。插件保持未初始化状态，不存在降级模式。
//! - **运行时错误**：OpenXR 运行时自身返回的错误码，原样向上传递。

use std::fmt;

use openxr::sys;

/// 插件层统一的 Result 类型
pub type Result<T> = std::result::Result<T, DistXrError>;

/// DistXR 的错误类型
#[derive(Debug)]
pub enum DistXrError {
    /// 配置错误
    Config(ConfigError),

    /// 图形 API 错误
    Graphics(GraphicsError),

    /// OpenXR 运行时返回的错误码
    Runtime(sys::Result),

    /// IO 错误
    Io(std::io::Error),

    /// 日志系统错误
    Log(String),

    /// 初始化错误
    Initialization(String),
}

/// 配置相关的错误
#[derive(Debug)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),

    /// 配置文件解析失败
    ParseError(String),

    /// 配置值无效
    InvalidValue { field: String, reason: String },

    /// 请求的图形后端未注册
    UnsupportedGraphicsApi(String),
}

/// 图形 API 相关的错误
#[derive(Debug)]
pub enum GraphicsError {
    /// 运行时要求的最低特性级别高于应用支持的所有级别
    UnsupportedFeatureLevel(String),

    /// 运行时提供的交换链格式与应用支持的格式没有交集
    UnsupportedSwapchainFormat(Vec<i64>),

    /// 设备创建失败（所有回退均已尝试）
    DeviceCreation(String),

    /// 着色器编译失败
    ShaderCompilation(String),

    /// 资源创建失败
    ResourceCreation(String),

    /// 渲染命令执行失败
    CommandExecution(String),

    /// 设备尚未初始化
    NotInitialized,

    /// 交换链图像记录无效（空指针、类型标记不匹配或纹理为空）
    InvalidSwapchainImage(String),
}

impl DistXrError {
    /// 转换为 OpenXR 风格的状态码
    ///
    /// 错误永远不会映射为 0。运行时错误返回运行时自己的错误码，
    /// 能力错误映射到对应的 OpenXR 错误码，其余映射为 `XR_ERROR_RUNTIME_FAILURE`。
    pub fn status_code(&self) -> i32 {
        match self {
            DistXrError::Runtime(result) => result.into_raw(),
            DistXrError::Graphics(GraphicsError::UnsupportedFeatureLevel(_))
            | DistXrError::Graphics(GraphicsError::DeviceCreation(_)) => {
                sys::Result::ERROR_GRAPHICS_DEVICE_INVALID.into_raw()
            }
            DistXrError::Graphics(GraphicsError::UnsupportedSwapchainFormat(_)) => {
                sys::Result::ERROR_SWAPCHAIN_FORMAT_UNSUPPORTED.into_raw()
            }
            _ => sys::Result::ERROR_RUNTIME_FAILURE.into_raw(),
        }
    }

    /// 是否为能力错误（不可重试）
    pub fn is_capability_error(&self) -> bool {
        matches!(
            self,
            DistXrError::Graphics(GraphicsError::UnsupportedFeatureLevel(_))
                | DistXrError::Graphics(GraphicsError::UnsupportedSwapchainFormat(_))
        )
    }
}

impl fmt::Display for DistXrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistXrError::Config(e) => write!(f, "Configuration error: {}", e),
            DistXrError::Graphics(e) => write!(f, "Graphics error: {}", e),
            DistXrError::Runtime(code) => write!(f, "OpenXR runtime error: {:?}", code),
            DistXrError::Io(e) => write!(f, "IO error: {}", e),
            DistXrError::Log(msg) => write!(f, "Log error: {}", msg),
            DistXrError::Initialization(msg) => write!(f, "Initialization error: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseError(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, reason } => {
                write!(f, "Invalid value for '{}': {}", field, reason)
            }
            ConfigError::UnsupportedGraphicsApi(tag) if tag.is_empty() => {
                write!(f, "No graphics API specified")
            }
            ConfigError::UnsupportedGraphicsApi(tag) => {
                write!(f, "Unsupported graphics API '{}'", tag)
            }
        }
    }
}

impl fmt::Display for GraphicsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphicsError::UnsupportedFeatureLevel(msg) => {
                write!(f, "Unsupported minimum feature level: {}", msg)
            }
            GraphicsError::UnsupportedSwapchainFormat(offered) => write!(
                f,
                "No runtime swapchain format supported for color swapchain (offered: {:?})",
                offered
            ),
            GraphicsError::DeviceCreation(msg) => write!(f, "Device creation failed: {}", msg),
            GraphicsError::ShaderCompilation(msg) => write!(f, "Shader compilation failed: {}", msg),
            GraphicsError::ResourceCreation(msg) => write!(f, "Resource creation failed: {}", msg),
            GraphicsError::CommandExecution(msg) => write!(f, "Command execution failed: {}", msg),
            GraphicsError::NotInitialized => write!(f, "Graphics device is not initialized"),
            GraphicsError::InvalidSwapchainImage(msg) => {
                write!(f, "Invalid swapchain image: {}", msg)
            }
        }
    }
}

impl std::error::Error for DistXrError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DistXrError::Io(e) => Some(e),
            DistXrError::Config(e) => Some(e),
            DistXrError::Graphics(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for GraphicsError {}

// 实现 From trait 以便于错误转换
impl From<std::io::Error> for DistXrError {
    fn from(err: std::io::Error) -> Self {
        DistXrError::Io(err)
    }
}

impl From<ConfigError> for DistXrError {
    fn from(err: ConfigError) -> Self {
        DistXrError::Config(err)
    }
}

impl From<GraphicsError> for DistXrError {
    fn from(err: GraphicsError) -> Self {
        DistXrError::Graphics(err)
    }
}

impl From<sys::Result> for DistXrError {
    fn from(err: sys::Result) -> Self {
        DistXrError::Runtime(err)
    }
}
