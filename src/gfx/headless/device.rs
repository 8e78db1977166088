//! 记录命令的无头设备
//!
//! 不接触 GPU，只把每次资源创建和上下文调用按顺序记进命令日志。

use std::cell::{Cell, RefCell};

use crate::core::error::{GraphicsError, Result};
use crate::gfx::device::{BufferKind, InputElement, RenderDevice, TextureDesc, Viewport};
use crate::gfx::renderer::CubePipeline;
use crate::gfx::shaders::ShaderStage;

/// 无头纹理：身份 + 尺寸
///
/// `id == 0` 表示运行时尚未写入。
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeadlessTexture {
    pub id: u64,
    pub width: u32,
    pub height: u32,
    pub array_size: u32,
}

impl HeadlessTexture {
    pub fn new(id: u64, width: u32, height: u32, array_size: u32) -> Self {
        Self { id, width, height, array_size }
    }
}

/// 句柄只是一个递增编号
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessBuffer {
    pub id: u64,
    pub kind: BufferKind,
    pub byte_width: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessView {
    pub id: u64,
    pub texture: u64,
}

/// 设备收到的调用
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    CompileShader(ShaderStage),
    CreateVertexShader,
    CreatePixelShader,
    CreateInputLayout,
    CreateBuffer(BufferKind, u32),
    /// 纹理编号 + 格式
    CreateRenderTargetView(u64, i64),
    CreateDepthStencilView(TextureDesc),
    SetViewport(Viewport),
    ClearRenderTarget([f32; 4]),
    ClearDepthStencil(f32, u8),
    SetRenderTargets,
    /// 缓冲区编号 + 写入字节数
    UpdateBuffer(u64, usize),
    BindPipeline,
    DrawIndexed(u32),
}

pub struct HeadlessDevice {
    id: u64,
    next_handle: Cell<u64>,
    commands: RefCell<Vec<DeviceCommand>>,
    fail_resources: bool,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::with_id(1)
    }

    pub fn with_id(id: u64) -> Self {
        Self {
            id,
            next_handle: Cell::new(1),
            commands: RefCell::new(Vec::new()),
            fail_resources: false,
        }
    }

    /// 缓冲区创建总是失败的设备
    pub fn failing_resources(mut self) -> Self {
        self.fail_resources = true;
        self
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// 到目前为止记录的命令
    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.commands.borrow().clone()
    }

    pub fn clear_commands(&mut self) {
        self.commands.get_mut().clear();
    }

    fn record(&self, command: DeviceCommand) {
        self.commands.borrow_mut().push(command);
    }

    fn handle(&self) -> u64 {
        let id = self.next_handle.get();
        self.next_handle.set(id + 1);
        id
    }
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderDevice for HeadlessDevice {
    type Texture = HeadlessTexture;
    type TextureId = u64;
    type RenderTargetView = HeadlessView;
    type DepthStencilView = HeadlessView;
    type VertexShader = u64;
    type PixelShader = u64;
    type InputLayout = u64;
    type Buffer = HeadlessBuffer;

    fn compile_shader(&self, source: &str, stage: ShaderStage) -> Result<Vec<u8>> {
        self.record(DeviceCommand::CompileShader(stage));
        if !source.contains(stage.entry_point()) {
            return Err(GraphicsError::ShaderCompilation(format!(
                "entry point '{}' not found",
                stage.entry_point()
            ))
            .into());
        }
        Ok(format!("{}:{}", stage.target(), stage.entry_point()).into_bytes())
    }

    fn create_vertex_shader(&self, bytecode: &[u8]) -> Result<u64> {
        self.record(DeviceCommand::CreateVertexShader);
        if !bytecode.starts_with(b"vs_") {
            return Err(GraphicsError::ResourceCreation("not vertex shader bytecode".into()).into());
        }
        Ok(self.handle())
    }

    fn create_pixel_shader(&self, bytecode: &[u8]) -> Result<u64> {
        self.record(DeviceCommand::CreatePixelShader);
        if !bytecode.starts_with(b"ps_") {
            return Err(GraphicsError::ResourceCreation("not pixel shader bytecode".into()).into());
        }
        Ok(self.handle())
    }

    fn create_input_layout(&self, elements: &[InputElement], vs_bytecode: &[u8]) -> Result<u64> {
        self.record(DeviceCommand::CreateInputLayout);
        if elements.is_empty() || !vs_bytecode.starts_with(b"vs_") {
            return Err(GraphicsError::ResourceCreation("input layout does not match vertex shader".into()).into());
        }
        Ok(self.handle())
    }

    fn create_buffer(&self, kind: BufferKind, byte_width: u32, initial_data: Option<&[u8]>) -> Result<HeadlessBuffer> {
        self.record(DeviceCommand::CreateBuffer(kind, byte_width));
        if self.fail_resources {
            return Err(GraphicsError::ResourceCreation(format!("{:?} buffer allocation failed", kind)).into());
        }
        if let Some(data) = initial_data {
            if data.len() != byte_width as usize {
                return Err(GraphicsError::ResourceCreation("initial data size mismatch".into()).into());
            }
        }
        Ok(HeadlessBuffer { id: self.handle(), kind, byte_width })
    }

    fn texture_id(&self, texture: &HeadlessTexture) -> u64 {
        texture.id
    }

    fn texture_desc(&self, texture: &HeadlessTexture) -> TextureDesc {
        TextureDesc {
            width: texture.width,
            height: texture.height,
            array_size: texture.array_size,
            sample_count: 1,
        }
    }

    fn create_render_target_view(&self, texture: &HeadlessTexture, format: i64) -> Result<HeadlessView> {
        self.record(DeviceCommand::CreateRenderTargetView(texture.id, format));
        Ok(HeadlessView { id: self.handle(), texture: texture.id })
    }

    fn create_depth_stencil_view(&self, desc: &TextureDesc) -> Result<HeadlessView> {
        self.record(DeviceCommand::CreateDepthStencilView(*desc));
        Ok(HeadlessView { id: self.handle(), texture: 0 })
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        self.record(DeviceCommand::SetViewport(*viewport));
    }

    fn clear_render_target(&mut self, _rtv: &HeadlessView, color: [f32; 4]) {
        self.record(DeviceCommand::ClearRenderTarget(color));
    }

    fn clear_depth_stencil(&mut self, _dsv: &HeadlessView, depth: f32, stencil: u8) {
        self.record(DeviceCommand::ClearDepthStencil(depth, stencil));
    }

    fn set_render_targets(&mut self, _rtv: &HeadlessView, _dsv: &HeadlessView) {
        self.record(DeviceCommand::SetRenderTargets);
    }

    fn update_buffer(&mut self, buffer: &HeadlessBuffer, data: &[u8]) {
        self.record(DeviceCommand::UpdateBuffer(buffer.id, data.len()));
    }

    fn bind_pipeline(&mut self, _pipeline: &CubePipeline<Self>) {
        self.record(DeviceCommand::BindPipeline);
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.record(DeviceCommand::DrawIndexed(index_count));
    }
}
