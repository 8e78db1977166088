//! Direct3D 11 渲染设备
//!
//! 封装设备和立即上下文。所有资源都在设备上创建，所有命令都录制到立即上下文。

use std::ffi::{c_void, CString};

use tracing::debug;
use windows::{
    core::{Interface, PCSTR},
    Win32::Graphics::Direct3D::Fxc::*,
    Win32::Graphics::Direct3D::*,
    Win32::Graphics::Direct3D11::*,
    Win32::Graphics::Dxgi::Common::*,
};

use crate::core::error::{GraphicsError, Result};
use crate::gfx::device::{BufferKind, InputElement, RenderDevice, TextureDesc, Viewport};
use crate::gfx::format::dxgi;
use crate::gfx::renderer::CubePipeline;
use crate::gfx::shaders::ShaderStage;

/// D3D11 设备 + 立即上下文
pub struct D3D11Device {
    pub device: ID3D11Device,
    pub context: ID3D11DeviceContext,
    pub feature_level: D3D_FEATURE_LEVEL,
    debug: bool,
}

impl D3D11Device {
    pub fn new(
        device: ID3D11Device,
        context: ID3D11DeviceContext,
        feature_level: D3D_FEATURE_LEVEL,
        debug: bool,
    ) -> Self {
        Self { device, context, feature_level, debug }
    }
}

fn resource_error(what: &str, e: windows::core::Error) -> GraphicsError {
    GraphicsError::ResourceCreation(format!("{}: {}", what, e))
}

fn created<T>(what: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| GraphicsError::ResourceCreation(format!("{}: no object returned", what)).into())
}

fn dxgi_format(format: i64) -> DXGI_FORMAT {
    DXGI_FORMAT(format as i32)
}

impl RenderDevice for D3D11Device {
    type Texture = ID3D11Texture2D;
    type TextureId = usize;
    type RenderTargetView = ID3D11RenderTargetView;
    type DepthStencilView = ID3D11DepthStencilView;
    type VertexShader = ID3D11VertexShader;
    type PixelShader = ID3D11PixelShader;
    type InputLayout = ID3D11InputLayout;
    type Buffer = ID3D11Buffer;

    fn compile_shader(&self, source: &str, stage: ShaderStage) -> Result<Vec<u8>> {
        let entry = CString::new(stage.entry_point())
            .map_err(|e| GraphicsError::ShaderCompilation(e.to_string()))?;
        let target = CString::new(stage.target())
            .map_err(|e| GraphicsError::ShaderCompilation(e.to_string()))?;

        let mut flags = D3DCOMPILE_ENABLE_STRICTNESS | D3DCOMPILE_PACK_MATRIX_COLUMN_MAJOR;
        flags |= if self.debug {
            D3DCOMPILE_DEBUG | D3DCOMPILE_SKIP_OPTIMIZATION
        } else {
            D3DCOMPILE_OPTIMIZATION_LEVEL3
        };

        let mut blob: Option<ID3DBlob> = None;
        let mut error_blob: Option<ID3DBlob> = None;

        unsafe {
            let result = D3DCompile(
                source.as_ptr() as *const c_void,
                source.len(),
                None,
                None,
                None,
                PCSTR(entry.as_ptr() as *const u8),
                PCSTR(target.as_ptr() as *const u8),
                flags,
                0,
                &mut blob,
                Some(&mut error_blob),
            );

            if let Err(e) = result {
                let message = match error_blob {
                    Some(error) => String::from_utf8_lossy(std::slice::from_raw_parts(
                        error.GetBufferPointer() as *const u8,
                        error.GetBufferSize(),
                    ))
                    .into_owned(),
                    None => e.to_string(),
                };
                return Err(GraphicsError::ShaderCompilation(format!(
                    "{} ({}): {}",
                    stage.entry_point(),
                    stage.target(),
                    message
                ))
                .into());
            }

            let blob = blob.ok_or_else(|| GraphicsError::ShaderCompilation("no bytecode returned".into()))?;
            let bytecode =
                std::slice::from_raw_parts(blob.GetBufferPointer() as *const u8, blob.GetBufferSize()).to_vec();
            debug!(entry = stage.entry_point(), bytes = bytecode.len(), "Shader compiled");
            Ok(bytecode)
        }
    }

    fn create_vertex_shader(&self, bytecode: &[u8]) -> Result<ID3D11VertexShader> {
        let mut shader = None;
        unsafe { self.device.CreateVertexShader(bytecode, None, Some(&mut shader)) }
            .map_err(|e| resource_error("vertex shader", e))?;
        created("vertex shader", shader)
    }

    fn create_pixel_shader(&self, bytecode: &[u8]) -> Result<ID3D11PixelShader> {
        let mut shader = None;
        unsafe { self.device.CreatePixelShader(bytecode, None, Some(&mut shader)) }
            .map_err(|e| resource_error("pixel shader", e))?;
        created("pixel shader", shader)
    }

    fn create_input_layout(&self, elements: &[InputElement], vs_bytecode: &[u8]) -> Result<ID3D11InputLayout> {
        let names = elements
            .iter()
            .map(|e| CString::new(e.semantic))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| GraphicsError::ResourceCreation(e.to_string()))?;

        let descs: Vec<D3D11_INPUT_ELEMENT_DESC> = elements
            .iter()
            .zip(&names)
            .map(|(element, name)| D3D11_INPUT_ELEMENT_DESC {
                SemanticName: PCSTR(name.as_ptr() as *const u8),
                SemanticIndex: 0,
                Format: dxgi_format(element.format),
                InputSlot: 0,
                AlignedByteOffset: element.offset,
                InputSlotClass: D3D11_INPUT_PER_VERTEX_DATA,
                InstanceDataStepRate: 0,
            })
            .collect();

        let mut layout = None;
        unsafe { self.device.CreateInputLayout(&descs, vs_bytecode, Some(&mut layout)) }
            .map_err(|e| resource_error("input layout", e))?;
        created("input layout", layout)
    }

    fn create_buffer(&self, kind: BufferKind, byte_width: u32, initial_data: Option<&[u8]>) -> Result<ID3D11Buffer> {
        let (usage, bind) = match kind {
            BufferKind::Vertex => (D3D11_USAGE_IMMUTABLE, D3D11_BIND_VERTEX_BUFFER),
            BufferKind::Index => (D3D11_USAGE_IMMUTABLE, D3D11_BIND_INDEX_BUFFER),
            BufferKind::Constant => (D3D11_USAGE_DEFAULT, D3D11_BIND_CONSTANT_BUFFER),
        };
        let desc = D3D11_BUFFER_DESC {
            ByteWidth: byte_width,
            Usage: usage,
            BindFlags: bind.0 as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
            StructureByteStride: 0,
        };
        let data = initial_data.map(|bytes| D3D11_SUBRESOURCE_DATA {
            pSysMem: bytes.as_ptr() as *const c_void,
            SysMemPitch: 0,
            SysMemSlicePitch: 0,
        });

        let mut buffer = None;
        unsafe {
            self.device
                .CreateBuffer(&desc, data.as_ref().map(|d| d as *const _), Some(&mut buffer))
        }
        .map_err(|e| resource_error("buffer", e))?;
        created("buffer", buffer)
    }

    fn texture_id(&self, texture: &ID3D11Texture2D) -> usize {
        texture.as_raw() as usize
    }

    fn texture_desc(&self, texture: &ID3D11Texture2D) -> TextureDesc {
        let mut desc = D3D11_TEXTURE2D_DESC::default();
        unsafe { texture.GetDesc(&mut desc) };
        TextureDesc {
            width: desc.Width,
            height: desc.Height,
            array_size: desc.ArraySize,
            sample_count: desc.SampleDesc.Count,
        }
    }

    fn create_render_target_view(&self, texture: &ID3D11Texture2D, format: i64) -> Result<ID3D11RenderTargetView> {
        let desc = D3D11_RENDER_TARGET_VIEW_DESC {
            Format: dxgi_format(format),
            ViewDimension: D3D11_RTV_DIMENSION_TEXTURE2D,
            Anonymous: D3D11_RENDER_TARGET_VIEW_DESC_0 {
                Texture2D: D3D11_TEX2D_RTV { MipSlice: 0 },
            },
        };
        let mut rtv = None;
        unsafe { self.device.CreateRenderTargetView(texture, Some(&desc), Some(&mut rtv)) }
            .map_err(|e| resource_error("render target view", e))?;
        created("render target view", rtv)
    }

    fn create_depth_stencil_view(&self, desc: &TextureDesc) -> Result<ID3D11DepthStencilView> {
        // 无类型格式，以便同一纹理也能作为着色器资源读取
        let texture_desc = D3D11_TEXTURE2D_DESC {
            Width: desc.width,
            Height: desc.height,
            MipLevels: 1,
            ArraySize: desc.array_size,
            Format: dxgi_format(dxgi::R32_TYPELESS),
            SampleDesc: DXGI_SAMPLE_DESC { Count: desc.sample_count, Quality: 0 },
            Usage: D3D11_USAGE_DEFAULT,
            BindFlags: (D3D11_BIND_SHADER_RESOURCE.0 | D3D11_BIND_DEPTH_STENCIL.0) as u32,
            CPUAccessFlags: 0,
            MiscFlags: 0,
        };
        let mut depth_texture = None;
        unsafe { self.device.CreateTexture2D(&texture_desc, None, Some(&mut depth_texture)) }
            .map_err(|e| resource_error("depth texture", e))?;
        let depth_texture = created("depth texture", depth_texture)?;

        let view_desc = D3D11_DEPTH_STENCIL_VIEW_DESC {
            Format: dxgi_format(dxgi::D32_FLOAT),
            ViewDimension: D3D11_DSV_DIMENSION_TEXTURE2D,
            Flags: 0,
            Anonymous: D3D11_DEPTH_STENCIL_VIEW_DESC_0 {
                Texture2D: D3D11_TEX2D_DSV { MipSlice: 0 },
            },
        };
        let mut dsv = None;
        unsafe { self.device.CreateDepthStencilView(&depth_texture, Some(&view_desc), Some(&mut dsv)) }
            .map_err(|e| resource_error("depth stencil view", e))?;
        debug!(width = desc.width, height = desc.height, "Depth buffer created");
        created("depth stencil view", dsv)
    }

    fn set_viewport(&mut self, viewport: &Viewport) {
        let vp = D3D11_VIEWPORT {
            TopLeftX: viewport.x,
            TopLeftY: viewport.y,
            Width: viewport.width,
            Height: viewport.height,
            MinDepth: viewport.min_depth,
            MaxDepth: viewport.max_depth,
        };
        unsafe { self.context.RSSetViewports(Some(&[vp])) };
    }

    fn clear_render_target(&mut self, rtv: &ID3D11RenderTargetView, color: [f32; 4]) {
        unsafe { self.context.ClearRenderTargetView(rtv, &color) };
    }

    fn clear_depth_stencil(&mut self, dsv: &ID3D11DepthStencilView, depth: f32, stencil: u8) {
        unsafe {
            self.context.ClearDepthStencilView(
                dsv,
                (D3D11_CLEAR_DEPTH.0 | D3D11_CLEAR_STENCIL.0) as u32,
                depth,
                stencil,
            )
        };
    }

    fn set_render_targets(&mut self, rtv: &ID3D11RenderTargetView, dsv: &ID3D11DepthStencilView) {
        unsafe { self.context.OMSetRenderTargets(Some(&[Some(rtv.clone())]), dsv) };
    }

    fn update_buffer(&mut self, buffer: &ID3D11Buffer, data: &[u8]) {
        unsafe {
            self.context
                .UpdateSubresource(buffer, 0, None, data.as_ptr() as *const c_void, 0, 0)
        };
    }

    fn bind_pipeline(&mut self, pipeline: &CubePipeline<Self>) {
        let constant_buffers = [
            Some(pipeline.model_buffer.clone()),
            Some(pipeline.view_projection_buffer.clone()),
        ];
        let stride = pipeline.vertex_stride;
        let offset = 0u32;
        unsafe {
            self.context.VSSetConstantBuffers(0, Some(&constant_buffers));
            self.context.VSSetShader(&pipeline.vertex_shader, None);
            self.context.PSSetShader(&pipeline.pixel_shader, None);
            self.context.IASetVertexBuffers(
                0,
                1,
                Some(&Some(pipeline.vertex_buffer.clone())),
                Some(&stride),
                Some(&offset),
            );
            self.context
                .IASetIndexBuffer(&pipeline.index_buffer, dxgi_format(dxgi::R16_UINT), 0);
            self.context.IASetPrimitiveTopology(D3D11_PRIMITIVE_TOPOLOGY_TRIANGLELIST);
            self.context.IASetInputLayout(&pipeline.input_layout);
        }
    }

    fn draw_indexed(&mut self, index_count: u32) {
        unsafe { self.context.DrawIndexed(index_count, 0, 0) };
    }
}
