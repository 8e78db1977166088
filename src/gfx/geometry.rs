//! 立方体几何数据
//!
//! 每个面 2 个三角形、6 个顶点，面内使用同一种颜色；索引就是 0..36。

use bytemuck::{Pod, Zeroable};

/// 顶点：位置 + 颜色
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl Vertex {
    /// 顶点步长（字节）
    pub const STRIDE: u32 = std::mem::size_of::<Vertex>() as u32;
    /// `COLOR` 属性在顶点中的偏移
    pub const COLOR_OFFSET: u32 = 12;
}

const RED: [f32; 3] = [1.0, 0.0, 0.0];
const DARK_RED: [f32; 3] = [0.25, 0.0, 0.0];
const GREEN: [f32; 3] = [0.0, 1.0, 0.0];
const DARK_GREEN: [f32; 3] = [0.0, 0.25, 0.0];
const BLUE: [f32; 3] = [0.0, 0.0, 1.0];
const DARK_BLUE: [f32; 3] = [0.0, 0.0, 0.25];

// 角点命名：左/右 (x)、下/上 (y)、后/前 (z)
const LBB: [f32; 3] = [-0.5, -0.5, -0.5];
const LBF: [f32; 3] = [-0.5, -0.5, 0.5];
const LTB: [f32; 3] = [-0.5, 0.5, -0.5];
const LTF: [f32; 3] = [-0.5, 0.5, 0.5];
const RBB: [f32; 3] = [0.5, -0.5, -0.5];
const RBF: [f32; 3] = [0.5, -0.5, 0.5];
const RTB: [f32; 3] = [0.5, 0.5, -0.5];
const RTF: [f32; 3] = [0.5, 0.5, 0.5];

const FACES: [([[f32; 3]; 6], [f32; 3]); 6] = [
    ([LTB, LBF, LBB, LTB, LTF, LBF], DARK_RED),   // -X
    ([RTB, RBB, RBF, RTB, RBF, RTF], RED),        // +X
    ([LBB, LBF, RBF, LBB, RBF, RBB], DARK_GREEN), // -Y
    ([LTB, RTB, RTF, LTB, RTF, LTF], GREEN),      // +Y
    ([LBB, RBB, RTB, LBB, RTB, LTB], DARK_BLUE),  // -Z
    ([LBF, LTF, RTF, LBF, RTF, RBF], BLUE),       // +Z
];

const fn build_vertices() -> [Vertex; 36] {
    let mut out = [Vertex { position: [0.0; 3], color: [0.0; 3] }; 36];
    let mut face = 0;
    while face < 6 {
        let mut i = 0;
        while i < 6 {
            out[face * 6 + i] = Vertex { position: FACES[face].0[i], color: FACES[face].1 };
            i += 1;
        }
        face += 1;
    }
    out
}

const fn build_indices() -> [u16; 36] {
    let mut out = [0u16; 36];
    let mut i = 0;
    while i < 36 {
        out[i] = i as u16;
        i += 1;
    }
    out
}

pub const CUBE_VERTICES: [Vertex; 36] = build_vertices();
pub const CUBE_INDICES: [u16; 36] = build_indices();

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(Vertex::STRIDE, 24);
        assert_eq!(bytemuck::cast_slice::<Vertex, u8>(&CUBE_VERTICES).len(), 36 * 24);
    }

    #[test]
    fn test_faces_have_flat_color_and_lie_on_plane() {
        for (face, chunk) in CUBE_VERTICES.chunks(6).enumerate() {
            assert!(chunk.iter().all(|v| v.color == chunk[0].color));
            let axis = face / 2;
            let sign = if face % 2 == 0 { -0.5 } else { 0.5 };
            assert!(chunk.iter().all(|v| v.position[axis] == sign));
        }
    }

    #[test]
    fn test_indices_are_sequential() {
        assert!(CUBE_INDICES.iter().enumerate().all(|(i, &idx)| idx as usize == i));
    }
}
