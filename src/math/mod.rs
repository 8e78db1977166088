//! 数学库模块
//!
//! 基于 `nalgebra`，提供 OpenXR 位姿与渲染矩阵之间的转换。
//!
//! # 约定
//!
//! - 数学上使用列向量：`clip = projection * view * model * position`
//! - 上传到常量缓冲区前转置一次，HLSL 侧使用 `mul(position, matrix)`（行向量）
//! - 投影矩阵采用 D3D 深度范围 [0, 1]

use openxr as xr;

pub use nalgebra::{
    Isometry3, Matrix4 as Mat4, Quaternion as Quat, Translation3, UnitQuaternion,
    Vector3 as Vec3,
};

// 类型别名，使用更简洁的名称
pub type Vector3 = Vec3<f32>;
pub type Matrix4 = Mat4<f32>;
pub type Quaternion = UnitQuaternion<f32>;

/// 颜色类型（RGBA，范围 0.0-1.0）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// 创建新的颜色
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// 转换为清屏用的数组
    pub fn to_array(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    // 预定义颜色
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT_BLACK: Color = Color::new(0.0, 0.0, 0.0, 0.0);
    pub const SLATE_GREY: Color = Color::new(0.184313729, 0.309803933, 0.309803933, 1.0);
}

/// 将 OpenXR 位姿转换为刚体变换
pub fn pose_to_isometry(pose: &xr::Posef) -> Isometry3<f32> {
    let o = &pose.orientation;
    let p = &pose.position;
    Isometry3::from_parts(
        Translation3::new(p.x, p.y, p.z),
        UnitQuaternion::from_quaternion(Quat::new(o.w, o.x, o.y, o.z)),
    )
}

/// 位姿矩阵（先旋转后平移）
pub fn pose_matrix(pose: &xr::Posef) -> Matrix4 {
    pose_to_isometry(pose).to_homogeneous()
}

/// 视图矩阵：位姿的逆
pub fn view_matrix(pose: &xr::Posef) -> Matrix4 {
    pose_to_isometry(pose).inverse().to_homogeneous()
}

/// 模型矩阵：先按轴缩放，再应用位姿
pub fn model_matrix(pose: &xr::Posef, scale: &xr::Vector3f) -> Matrix4 {
    pose_matrix(pose) * Matrix4::new_nonuniform_scaling(&Vector3::new(scale.x, scale.y, scale.z))
}

/// 由四个半角构建非对称透视投影（D3D 深度范围 [0, 1]，右手坐标系，看向 -Z）
///
/// `far <= near` 时构建无限远投影。
pub fn projection_fov(fov: &xr::Fovf, near: f32, far: f32) -> Matrix4 {
    let tan_left = fov.angle_left.tan();
    let tan_right = fov.angle_right.tan();
    let tan_down = fov.angle_down.tan();
    let tan_up = fov.angle_up.tan();

    let tan_width = tan_right - tan_left;
    let tan_height = tan_up - tan_down;

    let (z_scale, z_offset) = if far <= near {
        (-1.0, -near)
    } else {
        (-far / (far - near), -(far * near) / (far - near))
    };

    Matrix4::new(
        2.0 / tan_width, 0.0, (tan_right + tan_left) / tan_width, 0.0,
        0.0, 2.0 / tan_height, (tan_up + tan_down) / tan_height, 0.0,
        0.0, 0.0, z_scale, z_offset,
        0.0, 0.0, -1.0, 0.0,
    )
}

/// 转换为行主序数组，供 HLSL 常量缓冲区使用
pub fn to_shader_layout(matrix: &Matrix4) -> [[f32; 4]; 4] {
    matrix.transpose().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_4;

    fn identity_pose() -> xr::Posef {
        xr::Posef {
            orientation: xr::Quaternionf { x: 0.0, y: 0.0, z: 0.0, w: 1.0 },
            position: xr::Vector3f { x: 0.0, y: 0.0, z: 0.0 },
        }
    }

    #[test]
    fn test_symmetric_projection() {
        let fov = xr::Fovf {
            angle_left: -FRAC_PI_4,
            angle_right: FRAC_PI_4,
            angle_up: FRAC_PI_4,
            angle_down: -FRAC_PI_4,
        };
        let proj = projection_fov(&fov, 0.05, 100.0);
        assert!((proj[(0, 0)] - 1.0).abs() < 1e-5);
        assert!((proj[(1, 1)] - 1.0).abs() < 1e-5);
        assert!(proj[(0, 2)].abs() < 1e-6);
        assert_eq!(proj[(3, 2)], -1.0);

        // 近平面映射到深度 0，远平面映射到深度 1
        let near = proj * nalgebra::Vector4::new(0.0, 0.0, -0.05, 1.0);
        let far = proj * nalgebra::Vector4::new(0.0, 0.0, -100.0, 1.0);
        assert!((near.z / near.w).abs() < 1e-4);
        assert!((far.z / far.w - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_view_is_inverse_of_pose() {
        let pose = xr::Posef {
            orientation: xr::Quaternionf { x: 0.0, y: 0.7071068, z: 0.0, w: 0.7071068 },
            position: xr::Vector3f { x: 1.0, y: 2.0, z: -3.0 },
        };
        let product = pose_matrix(&pose) * view_matrix(&pose);
        assert!((product - Matrix4::identity()).abs().max() < 1e-5);
    }

    #[test]
    fn test_model_scales_before_pose() {
        let mut pose = identity_pose();
        pose.position.x = 2.0;
        let model = model_matrix(&pose, &xr::Vector3f { x: 0.5, y: 2.0, z: 1.0 });
        let corner = model * nalgebra::Vector4::new(1.0, 1.0, 1.0, 1.0);
        assert!((corner.x - 2.5).abs() < 1e-6);
        assert!((corner.y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_shader_layout_is_row_major() {
        let m = Matrix4::new_translation(&Vector3::new(1.0, 2.0, 3.0));
        let rows = to_shader_layout(&m);
        assert_eq!(rows[0][3], 1.0);
        assert_eq!(rows[1][3], 2.0);
        assert_eq!(rows[2][3], 3.0);
    }
}
