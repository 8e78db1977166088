//! 立方体渲染器
//!
//! 负责两件事：
//! 1. 设备创建后一次性构建着色器、输入布局和缓冲区（`CubeRenderer::new`）
//! 2. 每个视图一次的渲染序列（`CubeRenderer::render_view`）
//!
//! # 渲染序列
//!
//! 1. 视口 = 子图像矩形
//! 2. 按交换链格式创建渲染目标视图
//! 3. 取出（或创建）该颜色纹理对应的深度缓冲
//! 4. 清除颜色和深度，绑定渲染目标
//! 5. 上传视图投影矩阵（近 0.05，远 100）
//! 6. 绑定管线，每个立方体上传模型矩阵并绘制 36 个索引

use bytemuck::{Pod, Zeroable};
use tracing::{debug, trace};

use crate::core::error::Result;
use crate::gfx::depth::DepthBufferCache;
use crate::gfx::device::{BufferKind, InputElement, RenderDevice, Viewport};
use crate::gfx::format::dxgi;
use crate::gfx::geometry::{Vertex, CUBE_INDICES, CUBE_VERTICES};
use crate::gfx::shaders::{ShaderStage, CUBE_SHADER_SOURCE};
use crate::math::{self, Color};
use crate::xr::{Cube, ProjectionView};

/// 近裁剪面
pub const NEAR_PLANE: f32 = 0.05;
/// 远裁剪面
pub const FAR_PLANE: f32 = 100.0;

/// 顶点输入布局：POSITION + COLOR
pub const CUBE_INPUT_LAYOUT: [InputElement; 2] = [
    InputElement { semantic: "POSITION", format: dxgi::R32G32B32_FLOAT, offset: 0 },
    InputElement { semantic: "COLOR", format: dxgi::R32G32B32_FLOAT, offset: Vertex::COLOR_OFFSET },
];

/// 模型常量缓冲区（b0）
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ModelConstants {
    pub model: [[f32; 4]; 4],
}

/// 视图投影常量缓冲区（b1）
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ViewProjectionConstants {
    pub view_projection: [[f32; 4]; 4],
}

/// 设备创建后不再变化的绘制资源
pub struct CubePipeline<D: RenderDevice> {
    pub vertex_shader: D::VertexShader,
    pub pixel_shader: D::PixelShader,
    pub input_layout: D::InputLayout,
    pub model_buffer: D::Buffer,
    pub view_projection_buffer: D::Buffer,
    pub vertex_buffer: D::Buffer,
    pub index_buffer: D::Buffer,
    pub vertex_stride: u32,
    pub index_count: u32,
}

/// 持有设备与绘制资源的渲染器
pub struct CubeRenderer<D: RenderDevice> {
    device: D,
    pipeline: CubePipeline<D>,
    depth_buffers: DepthBufferCache<D::TextureId, D::DepthStencilView>,
    clear_color: Color,
}

impl<D: RenderDevice> CubeRenderer<D> {
    /// 构建全部绘制资源
    ///
    /// 任一步失败都返回错误，设备随之被丢弃，不存在部分初始化的渲染器。
    pub fn new(device: D) -> Result<Self> {
        let vs_bytecode = device.compile_shader(CUBE_SHADER_SOURCE, ShaderStage::Vertex)?;
        let vertex_shader = device.create_vertex_shader(&vs_bytecode)?;

        let ps_bytecode = device.compile_shader(CUBE_SHADER_SOURCE, ShaderStage::Pixel)?;
        let pixel_shader = device.create_pixel_shader(&ps_bytecode)?;

        let input_layout = device.create_input_layout(&CUBE_INPUT_LAYOUT, &vs_bytecode)?;

        let model_buffer = device.create_buffer(
            BufferKind::Constant,
            std::mem::size_of::<ModelConstants>() as u32,
            None,
        )?;
        let view_projection_buffer = device.create_buffer(
            BufferKind::Constant,
            std::mem::size_of::<ViewProjectionConstants>() as u32,
            None,
        )?;

        let vertex_bytes: &[u8] = bytemuck::cast_slice(&CUBE_VERTICES);
        let vertex_buffer =
            device.create_buffer(BufferKind::Vertex, vertex_bytes.len() as u32, Some(vertex_bytes))?;

        let index_bytes: &[u8] = bytemuck::cast_slice(&CUBE_INDICES);
        let index_buffer =
            device.create_buffer(BufferKind::Index, index_bytes.len() as u32, Some(index_bytes))?;

        debug!("Cube pipeline resources created");

        Ok(Self {
            device,
            pipeline: CubePipeline {
                vertex_shader,
                pixel_shader,
                input_layout,
                model_buffer,
                view_projection_buffer,
                vertex_buffer,
                index_buffer,
                vertex_stride: Vertex::STRIDE,
                index_count: CUBE_INDICES.len() as u32,
            },
            depth_buffers: DepthBufferCache::new(),
            clear_color: Color::TRANSPARENT_BLACK,
        })
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn set_clear_color(&mut self, color: Color) {
        self.clear_color = color;
    }

    /// 已缓存的深度缓冲数量
    pub fn depth_buffer_count(&self) -> usize {
        self.depth_buffers.len()
    }

    /// 渲染一个视图
    ///
    /// 指向纹理数组非零切片的视图不做任何事（不清除、不绘制）。
    pub fn render_view(
        &mut self,
        view: &ProjectionView,
        texture: &D::Texture,
        format: i64,
        cubes: &[Cube],
    ) -> Result<()> {
        if view.targets_array_slice() {
            trace!(index = view.sub_image.image_array_index, "Texture array slices are not rendered");
            return Ok(());
        }

        let device = &mut self.device;
        device.set_viewport(&Viewport::from_rect(&view.sub_image.image_rect));

        let rtv = device.create_render_target_view(texture, format)?;

        let texture_id = device.texture_id(texture);
        let desc = device.texture_desc(texture);
        let dsv = self
            .depth_buffers
            .get_or_create(texture_id, || device.create_depth_stencil_view(&desc))?;

        device.clear_render_target(&rtv, self.clear_color.to_array());
        device.clear_depth_stencil(&dsv, 1.0, 0);
        device.set_render_targets(&rtv, &dsv);

        let projection = math::projection_fov(&view.fov, NEAR_PLANE, FAR_PLANE);
        let view_matrix = math::view_matrix(&view.pose);
        let view_projection = ViewProjectionConstants {
            view_projection: math::to_shader_layout(&(projection * view_matrix)),
        };
        device.update_buffer(&self.pipeline.view_projection_buffer, bytemuck::bytes_of(&view_projection));

        device.bind_pipeline(&self.pipeline);

        for cube in cubes {
            let model = ModelConstants {
                model: math::to_shader_layout(&math::model_matrix(&cube.pose, &cube.scale)),
            };
            device.update_buffer(&self.pipeline.model_buffer, bytemuck::bytes_of(&model));
            device.draw_indexed(self.pipeline.index_count);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::headless::{DeviceCommand, HeadlessDevice, HeadlessTexture};
    use crate::xr::SubImage;
    use openxr as xr;

    fn view(array_index: u32) -> ProjectionView {
        ProjectionView {
            pose: xr::Posef::IDENTITY,
            fov: xr::Fovf { angle_left: -0.8, angle_right: 0.8, angle_up: 0.8, angle_down: -0.8 },
            sub_image: SubImage {
                image_rect: xr::Rect2Di {
                    offset: xr::Offset2Di { x: 0, y: 0 },
                    extent: xr::Extent2Di { width: 640, height: 480 },
                },
                image_array_index: array_index,
            },
        }
    }

    #[test]
    fn test_constant_buffer_sizes() {
        assert_eq!(std::mem::size_of::<ModelConstants>(), 64);
        assert_eq!(std::mem::size_of::<ViewProjectionConstants>(), 64);
    }

    #[test]
    fn test_resource_builder_order() {
        let renderer = CubeRenderer::new(HeadlessDevice::new()).unwrap();
        let created: Vec<_> = renderer.device().commands().to_vec();
        assert!(matches!(created[0], DeviceCommand::CompileShader(ShaderStage::Vertex)));
        assert!(matches!(created[1], DeviceCommand::CreateVertexShader));
        assert!(matches!(created[2], DeviceCommand::CompileShader(ShaderStage::Pixel)));
        assert!(matches!(created[3], DeviceCommand::CreatePixelShader));
        assert!(matches!(created[4], DeviceCommand::CreateInputLayout));
        assert!(matches!(created[5], DeviceCommand::CreateBuffer(BufferKind::Constant, 64)));
        assert!(matches!(created[6], DeviceCommand::CreateBuffer(BufferKind::Constant, 64)));
        assert!(matches!(created[7], DeviceCommand::CreateBuffer(BufferKind::Vertex, 864)));
        assert!(matches!(created[8], DeviceCommand::CreateBuffer(BufferKind::Index, 72)));
    }

    #[test]
    fn test_render_single_cube() {
        let mut renderer = CubeRenderer::new(HeadlessDevice::new()).unwrap();
        let texture = HeadlessTexture::new(1, 640, 480, 1);
        renderer.device.clear_commands();

        renderer
            .render_view(&view(0), &texture, dxgi::R8G8B8A8_UNORM, &[Cube::unit()])
            .unwrap();

        let cmds = renderer.device().commands();
        assert_eq!(cmds.iter().filter(|c| matches!(c, DeviceCommand::ClearRenderTarget(_))).count(), 1);
        assert_eq!(cmds.iter().filter(|c| matches!(c, DeviceCommand::ClearDepthStencil(d, 0) if *d == 1.0)).count(), 1);
        assert_eq!(cmds.iter().filter(|c| matches!(c, DeviceCommand::DrawIndexed(36))).count(), 1);
        assert!(cmds.contains(&DeviceCommand::CreateRenderTargetView(1, dxgi::R8G8B8A8_UNORM)));
        assert!(cmds.contains(&DeviceCommand::ClearRenderTarget([0.0, 0.0, 0.0, 0.0])));
    }

    #[test]
    fn test_draws_once_per_cube_after_clear() {
        let mut renderer = CubeRenderer::new(HeadlessDevice::new()).unwrap();
        let texture = HeadlessTexture::new(2, 320, 240, 1);
        let cubes = [Cube::unit(), Cube::at(xr::Posef::IDENTITY, 0.1), Cube::unit()];
        renderer.device.clear_commands();

        renderer.render_view(&view(0), &texture, dxgi::B8G8R8A8_UNORM, &cubes).unwrap();

        let cmds = renderer.device().commands();
        let clear = cmds.iter().position(|c| matches!(c, DeviceCommand::ClearRenderTarget(_))).unwrap();
        let first_draw = cmds.iter().position(|c| matches!(c, DeviceCommand::DrawIndexed(_))).unwrap();
        assert!(clear < first_draw);
        assert_eq!(cmds.iter().filter(|c| matches!(c, DeviceCommand::DrawIndexed(36))).count(), 3);
    }

    #[test]
    fn test_no_cubes_still_clears() {
        let mut renderer = CubeRenderer::new(HeadlessDevice::new()).unwrap();
        let texture = HeadlessTexture::new(3, 64, 64, 1);
        renderer.render_view(&view(0), &texture, dxgi::R8G8B8A8_UNORM, &[]).unwrap();
        let cmds = renderer.device().commands();
        assert!(cmds.iter().any(|c| matches!(c, DeviceCommand::ClearRenderTarget(_))));
        assert!(!cmds.iter().any(|c| matches!(c, DeviceCommand::DrawIndexed(_))));
    }

    #[test]
    fn test_array_slice_is_noop() {
        let mut renderer = CubeRenderer::new(HeadlessDevice::new()).unwrap();
        let texture = HeadlessTexture::new(4, 64, 64, 2);
        renderer.device.clear_commands();
        renderer.render_view(&view(1), &texture, dxgi::R8G8B8A8_UNORM, &[Cube::unit()]).unwrap();
        assert!(renderer.device().commands().is_empty());
        assert_eq!(renderer.depth_buffer_count(), 0);
    }

    #[test]
    fn test_depth_buffer_reused_per_texture() {
        let mut renderer = CubeRenderer::new(HeadlessDevice::new()).unwrap();
        let a = HeadlessTexture::new(10, 128, 128, 1);
        let b = HeadlessTexture::new(11, 256, 256, 1);
        for _ in 0..3 {
            renderer.render_view(&view(0), &a, dxgi::R8G8B8A8_UNORM, &[]).unwrap();
        }
        renderer.render_view(&view(0), &b, dxgi::R8G8B8A8_UNORM, &[]).unwrap();
        assert_eq!(renderer.depth_buffer_count(), 2);

        let depth_created: Vec<_> = renderer
            .device()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DeviceCommand::CreateDepthStencilView(desc) => Some((desc.width, desc.height)),
                _ => None,
            })
            .collect();
        assert_eq!(depth_created, vec![(128, 128), (256, 256)]);
    }

    #[test]
    fn test_clear_color_is_configurable() {
        let mut renderer = CubeRenderer::new(HeadlessDevice::new()).unwrap();
        renderer.set_clear_color(Color::SLATE_GREY);
        let texture = HeadlessTexture::new(5, 64, 64, 1);
        renderer.render_view(&view(0), &texture, dxgi::R8G8B8A8_UNORM, &[]).unwrap();
        assert!(renderer.device().commands().contains(&DeviceCommand::ClearRenderTarget(Color::SLATE_GREY.to_array())));
    }
}
