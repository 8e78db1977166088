//! 配置管理模块
//!
//! 提供插件配置的加载、解析和管理功能。
//! 支持从 TOML 配置文件加载，也支持命令行参数覆盖。
//!
//! # 配置文件格式 (dist_xr.toml)
//!
//! ```toml
//! [graphics]
//! plugin = "D3D11"                  # 或 "Headless"
//! debug_layer = true
//! environment_blend_mode = "opaque" # opaque, additive, alpha_blend
//! clear_from_blend_mode = false
//!
//! [xr]
//! form_factor = "hmd"
//! view_configuration = "stereo"
//! app_space = "Local"
//!
//! [logging]
//! level = "info"      # trace, debug, info, warn, error
//! file_output = false
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::error::{ConfigError, Result};
use crate::math::Color;

/// 插件配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 图形配置
    #[serde(default)]
    pub graphics: GraphicsConfig,

    /// XR 会话相关配置（由外部程序使用，插件只读取混合模式）
    #[serde(default)]
    pub xr: XrConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 图形配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphicsConfig {
    /// 图形后端标签（大小写不敏感，如 "D3D11"、"Headless"）
    #[serde(default = "default_plugin")]
    pub plugin: String,

    /// 是否尝试启用调试层
    #[serde(default = "default_debug_layer")]
    pub debug_layer: bool,

    /// 环境混合模式
    #[serde(default)]
    pub environment_blend_mode: EnvironmentBlendMode,

    /// 是否根据混合模式选择清屏颜色（否则清为全零）
    #[serde(default)]
    pub clear_from_blend_mode: bool,
}

/// XR 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct XrConfig {
    /// 设备形态
    #[serde(default)]
    pub form_factor: FormFactor,

    /// 视图配置
    #[serde(default)]
    pub view_configuration: ViewConfiguration,

    /// 应用参考空间名称
    #[serde(default = "default_app_space")]
    pub app_space: String,
}

/// 环境混合模式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentBlendMode {
    #[default]
    Opaque,
    Additive,
    AlphaBlend,
}

/// 设备形态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormFactor {
    #[default]
    Hmd,
    Handheld,
}

/// 视图配置类型
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewConfiguration {
    Mono,
    #[default]
    Stereo,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: LogLevel,

    /// 是否输出到文件
    #[serde(default = "default_file_output")]
    pub file_output: bool,

    /// 日志文件路径
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

// 默认值函数
#[cfg(target_os = "windows")]
fn default_plugin() -> String { "D3D11".to_string() }
#[cfg(not(target_os = "windows"))]
fn default_plugin() -> String { "Headless".to_string() }
fn default_debug_layer() -> bool { cfg!(debug_assertions) }
fn default_app_space() -> String { "Local".to_string() }
fn default_log_level() -> LogLevel { LogLevel::Info }
fn default_file_output() -> bool { false }
fn default_log_file() -> String { "dist_xr.log".to_string() }

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            plugin: default_plugin(),
            debug_layer: default_debug_layer(),
            environment_blend_mode: EnvironmentBlendMode::default(),
            clear_from_blend_mode: false,
        }
    }
}

impl Default for XrConfig {
    fn default() -> Self {
        Self {
            form_factor: FormFactor::default(),
            view_configuration: ViewConfiguration::default(),
            app_space: default_app_space(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file_output: default_file_output(),
            log_file: default_log_file(),
        }
    }
}

impl Config {
    /// 从配置文件加载
    ///
    /// # 参数
    ///
    /// * `path` - 配置文件路径
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();

        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path_str.clone()))?;

        Self::from_toml_str(&contents)
    }

    /// 从 TOML 字符串解析
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()).into())
    }

    /// 从配置文件加载，如果文件不存在或解析失败则使用默认配置
    pub fn from_file_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::from_file(path).unwrap_or_default()
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// 从命令行参数覆盖配置
    ///
    /// 支持的参数：
    /// - `--graphics <tag>`: 选择图形后端
    /// - `--blend-mode <opaque|additive|alpha_blend>`: 设置环境混合模式
    /// - `--no-debug-layer`: 禁用调试层
    pub fn apply_args<I>(&mut self, args: I)
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let args: Vec<String> = args.into_iter().map(|s| s.as_ref().to_string()).collect();

        if let Some(idx) = args.iter().position(|a| a == "--graphics") {
            if let Some(tag) = args.get(idx + 1) {
                self.graphics.plugin = tag.clone();
            }
        }

        if let Some(idx) = args.iter().position(|a| a == "--blend-mode") {
            if let Some(mode) = args.get(idx + 1) {
                if let Some(mode) = EnvironmentBlendMode::parse(mode) {
                    self.graphics.environment_blend_mode = mode;
                }
            }
        }

        if args.iter().any(|a| a == "--no-debug-layer") {
            self.graphics.debug_layer = false;
        }
    }

    /// 验证配置的有效性
    pub fn validate(&self) -> Result<()> {
        if self.graphics.plugin.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "graphics.plugin".to_string(),
                reason: "No graphics API specified".to_string(),
            }.into());
        }

        if self.xr.app_space.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "xr.app_space".to_string(),
                reason: "Reference space name must not be empty".to_string(),
            }.into());
        }

        Ok(())
    }
}

impl EnvironmentBlendMode {
    /// 解析混合模式名称（大小写不敏感，兼容 "AlphaBlend" 与 "alpha_blend"）
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().replace('_', "").as_str() {
            "opaque" => Some(EnvironmentBlendMode::Opaque),
            "additive" => Some(EnvironmentBlendMode::Additive),
            "alphablend" => Some(EnvironmentBlendMode::AlphaBlend),
            _ => None,
        }
    }

    /// 获取混合模式的显示名称
    pub fn name(&self) -> &'static str {
        match self {
            EnvironmentBlendMode::Opaque => "Opaque",
            EnvironmentBlendMode::Additive => "Additive",
            EnvironmentBlendMode::AlphaBlend => "AlphaBlend",
        }
    }

    /// 该混合模式下的背景清屏颜色
    ///
    /// - Opaque：石板灰
    /// - Additive：黑色（加法混合下黑色即透明）
    /// - AlphaBlend：全透明黑色
    pub fn background_clear_color(&self) -> Color {
        match self {
            EnvironmentBlendMode::Opaque => Color::SLATE_GREY,
            EnvironmentBlendMode::Additive => Color::BLACK,
            EnvironmentBlendMode::AlphaBlend => Color::TRANSPARENT_BLACK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.graphics.plugin.is_empty());
        assert_eq!(config.graphics.environment_blend_mode, EnvironmentBlendMode::Opaque);
        assert_eq!(config.xr.view_configuration, ViewConfiguration::Stereo);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.graphics.plugin = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = Config::from_toml_str(
            "[graphics]\nplugin = \"Headless\"\nenvironment_blend_mode = \"alpha_blend\"\n",
        )
        .unwrap();
        assert_eq!(config.graphics.plugin, "Headless");
        assert_eq!(config.graphics.environment_blend_mode, EnvironmentBlendMode::AlphaBlend);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.xr.app_space, "Local");
    }

    #[test]
    fn test_apply_args() {
        let mut config = Config::default();
        config.apply_args(["probe", "--graphics", "d3d11", "--blend-mode", "Additive", "--no-debug-layer"]);
        assert_eq!(config.graphics.plugin, "d3d11");
        assert_eq!(config.graphics.environment_blend_mode, EnvironmentBlendMode::Additive);
        assert!(!config.graphics.debug_layer);
    }

    #[test]
    fn test_blend_mode_clear_colors() {
        assert_eq!(EnvironmentBlendMode::Opaque.background_clear_color(), Color::SLATE_GREY);
        assert_eq!(EnvironmentBlendMode::Additive.background_clear_color().a, 1.0);
        assert_eq!(EnvironmentBlendMode::AlphaBlend.background_clear_color().a, 0.0);
        assert_eq!(EnvironmentBlendMode::parse("AlphaBlend"), Some(EnvironmentBlendMode::AlphaBlend));
        assert_eq!(EnvironmentBlendMode::parse("glass"), None);
    }
}
