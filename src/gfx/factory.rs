//! 图形插件注册表
//!
//! 标签在注册时统一转成小写，查找时大小写不敏感。
//! 无头后端在所有平台注册，D3D11 只在 Windows 注册。

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::config::Config;
use crate::core::error::{ConfigError, Result};
use crate::gfx::cube_plugin::CubePlugin;
use crate::gfx::device::Backend;
use crate::gfx::headless::HeadlessBackend;
use crate::gfx::plugin::GraphicsPlugin;

type PluginConstructor = Box<dyn Fn(&Config) -> Result<Box<dyn GraphicsPlugin>>>;

/// 标签 → 插件构造函数
pub struct PluginRegistry {
    constructors: BTreeMap<String, PluginConstructor>,
}

impl PluginRegistry {
    /// 空注册表
    pub fn new() -> Self {
        Self { constructors: BTreeMap::new() }
    }

    /// 注册了全部内置后端的注册表
    pub fn with_builtin_backends() -> Self {
        let mut registry = Self::new();
        registry.register(HeadlessBackend::NAME, |config| {
            Ok(Box::new(CubePlugin::new(HeadlessBackend::new(), &config.graphics)) as Box<dyn GraphicsPlugin>)
        });
        #[cfg(target_os = "windows")]
        registry.register(crate::gfx::d3d11::D3D11Backend::NAME, |config| {
            Ok(Box::new(CubePlugin::new(crate::gfx::d3d11::D3D11Backend::new(), &config.graphics)) as Box<dyn GraphicsPlugin>)
        });
        registry
    }

    /// 注册后端；同名标签后注册者覆盖先注册者
    pub fn register<F>(&mut self, tag: &str, constructor: F)
    where
        F: Fn(&Config) -> Result<Box<dyn GraphicsPlugin>> + 'static,
    {
        self.constructors.insert(tag.to_ascii_lowercase(), Box::new(constructor));
    }

    /// 已注册的标签（小写）
    pub fn tags(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    /// 按标签创建插件
    pub fn create(&self, tag: &str, config: &Config) -> Result<Box<dyn GraphicsPlugin>> {
        if tag.is_empty() {
            return Err(ConfigError::UnsupportedGraphicsApi(String::new()).into());
        }
        let constructor = self
            .constructors
            .get(&tag.to_ascii_lowercase())
            .ok_or_else(|| ConfigError::UnsupportedGraphicsApi(tag.to_string()))?;
        debug!(tag, "Creating graphics plugin");
        constructor(config)
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtin_backends()
    }
}

/// 按配置中的 `graphics.plugin` 创建插件
pub fn create_graphics_plugin(config: &Config) -> Result<Box<dyn GraphicsPlugin>> {
    PluginRegistry::with_builtin_backends().create(&config.graphics.plugin, config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = PluginRegistry::with_builtin_backends();
        let config = Config::default();
        for tag in ["headless", "HEADLESS", "HeadLess"] {
            assert_eq!(registry.create(tag, &config).unwrap().name(), "Headless");
        }
        assert!(registry.tags().contains(&"headless"));
    }

    #[test]
    fn test_empty_tag() {
        let err = PluginRegistry::with_builtin_backends().create("", &Config::default()).err().unwrap();
        assert_eq!(err.to_string(), "Configuration error: No graphics API specified");
    }

    #[test]
    fn test_unknown_tag() {
        let err = PluginRegistry::with_builtin_backends().create("Vulkan", &Config::default()).err().unwrap();
        assert_eq!(err.to_string(), "Configuration error: Unsupported graphics API 'Vulkan'");
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = PluginRegistry::new();
        registry.register("Mock", |config| {
            Ok(Box::new(CubePlugin::new(HeadlessBackend::new(), &config.graphics)) as Box<dyn GraphicsPlugin>)
        });
        assert!(registry.create("mock", &Config::default()).is_ok());
        assert!(registry.create("headless", &Config::default()).is_err());
    }

    #[test]
    fn test_create_from_config() {
        let mut config = Config::default();
        config.graphics.plugin = "Headless".into();
        let plugin = create_graphics_plugin(&config).unwrap();
        assert!(plugin.instance_extensions().is_empty());
    }

    #[cfg(target_os = "windows")]
    #[test]
    fn test_d3d11_registered_on_windows() {
        let registry = PluginRegistry::with_builtin_backends();
        let plugin = registry.create("d3d11", &Config::default()).unwrap();
        assert_eq!(plugin.instance_extensions(), vec!["XR_KHR_D3D11_enable".to_string()]);
    }
}
