//! 交换链图像记录的分配
//!
//! 运行时枚举交换链图像时会往我们提供的记录里写入纹理，之后每帧按指针读回。
//! 因此每批记录一经分配就固定在堆上，直到插件销毁都不会移动或释放。

use openxr::sys;
use tracing::debug;

use crate::gfx::device::SwapchainImage;

/// 按批分配、地址稳定的交换链图像记录
pub struct SwapchainImageRegistry<T: SwapchainImage> {
    blocks: Vec<Box<[T]>>,
}

impl<T: SwapchainImage> SwapchainImageRegistry<T> {
    pub fn new() -> Self {
        Self { blocks: Vec::new() }
    }

    /// 分配 `capacity` 条带类型标记的记录，返回按顺序排列的头部指针
    ///
    /// 新批次单独占一块堆内存，之前返回的指针不受影响。
    pub fn allocate(&mut self, capacity: u32) -> Vec<*mut sys::SwapchainImageBaseHeader> {
        if capacity == 0 {
            return Vec::new();
        }

        let block: Box<[T]> = (0..capacity).map(|_| T::tagged()).collect();
        self.blocks.push(block);

        let pointers = match self.blocks.last_mut() {
            Some(block) => block
                .iter_mut()
                .map(|image| image as *mut T as *mut sys::SwapchainImageBaseHeader)
                .collect(),
            None => Vec::new(),
        };

        debug!(capacity, blocks = self.blocks.len(), "Allocated swapchain image structs");
        pointers
    }

    /// 已分配的批次数
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// 已分配的记录总数
    pub fn image_count(&self) -> usize {
        self.blocks.iter().map(|b| b.len()).sum()
    }
}

impl<T: SwapchainImage> Default for SwapchainImageRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{HeadlessImage, HeadlessTexture};
    use std::collections::HashSet;

    #[test]
    fn test_allocate_returns_tagged_distinct_pointers() {
        let mut registry = SwapchainImageRegistry::<HeadlessImage>::new();
        let ptrs = registry.allocate(3);
        assert_eq!(ptrs.len(), 3);
        assert_eq!(ptrs.iter().collect::<HashSet<_>>().len(), 3);
        for &p in &ptrs {
            let ty = unsafe { (*p).ty };
            assert_eq!(ty, HeadlessImage::structure_type());
        }
    }

    #[test]
    fn test_zero_capacity() {
        let mut registry = SwapchainImageRegistry::<HeadlessImage>::new();
        assert!(registry.allocate(0).is_empty());
        assert_eq!(registry.block_count(), 0);
    }

    #[test]
    fn test_earlier_blocks_stay_valid() {
        let mut registry = SwapchainImageRegistry::<HeadlessImage>::new();
        let first = registry.allocate(2);

        // 模拟运行时写入纹理
        unsafe {
            (*(first[0] as *mut HeadlessImage)).texture = HeadlessTexture::new(9, 32, 32, 1);
        }

        for _ in 0..8 {
            registry.allocate(4);
        }
        assert_eq!(registry.block_count(), 9);
        assert_eq!(registry.image_count(), 34);

        let image = unsafe { &*(first[0] as *const HeadlessImage) };
        assert_eq!(image.texture().map(|t| t.id), Some(9));
        assert_eq!(unsafe { (*first[1]).ty }, HeadlessImage::structure_type());
    }
}
