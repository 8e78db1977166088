//! 深度缓冲缓存
//!
//! 以颜色纹理为键缓存深度模板视图，同一颜色纹理在整个插件生命周期内只创建一次深度缓冲。
//! 命中时不重新校验尺寸：交换链图像的尺寸在其生命周期内不会变化。

use std::collections::HashMap;
use std::hash::Hash;

use crate::core::error::Result;

/// 颜色纹理 → 深度视图 的缓存
pub struct DepthBufferCache<K, V> {
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash, V: Clone> DepthBufferCache<K, V> {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    /// 取出已有的深度视图，不存在时调用 `create` 创建并缓存
    ///
    /// 创建失败时不写入缓存，下次调用会重新尝试。
    pub fn get_or_create<F>(&mut self, key: K, create: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        if let Some(view) = self.entries.get(&key) {
            return Ok(view.clone());
        }
        let view = create()?;
        self.entries.insert(key, view.clone());
        Ok(view)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Eq + Hash, V: Clone> Default for DepthBufferCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::GraphicsError;

    #[test]
    fn test_created_once_per_texture() {
        let mut cache = DepthBufferCache::new();
        let mut created = 0;
        for _ in 0..3 {
            let view = cache
                .get_or_create(1u64, || {
                    created += 1;
                    Ok("depth-1")
                })
                .unwrap();
            assert_eq!(view, "depth-1");
        }
        assert_eq!(created, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_distinct_textures_get_distinct_entries() {
        let mut cache = DepthBufferCache::new();
        let a = cache.get_or_create(1u64, || Ok(10)).unwrap();
        let b = cache.get_or_create(2u64, || Ok(20)).unwrap();
        assert_ne!(a, b);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let mut cache: DepthBufferCache<u64, u32> = DepthBufferCache::new();
        let failed = cache.get_or_create(5, || Err(GraphicsError::ResourceCreation("oom".into()).into()));
        assert!(failed.is_err());
        assert!(cache.is_empty());
        assert_eq!(cache.get_or_create(5, || Ok(3)).unwrap(), 3);
    }
}
