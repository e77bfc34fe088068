//! Affine transforms applied to whole meshes
//!
//! LOD levels are shrunk by a uniform factor about the origin. The factor
//! is baked into the vertex positions, not kept as a scene transform.

use nalgebra::{Matrix3, Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    pub matrix: Matrix4<f32>,
}

impl Transform3D {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix4::identity(),
        }
    }

    /// Uniform scaling about the origin
    pub fn uniform_scaling(scale: f32) -> Self {
        Self {
            matrix: Matrix4::new_scaling(scale),
        }
    }

    pub fn transform_point(&self, point: &Point3<f32>) -> Point3<f32> {
        self.matrix.transform_point(point)
    }

    /// Transform a surface normal with the inverse transpose and renormalize.
    pub fn transform_normal(&self, normal: &Vector3<f32>) -> Vector3<f32> {
        let linear: Matrix3<f32> = self.matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let n = match linear.try_inverse() {
            Some(inv) => inv.transpose() * normal,
            None => *normal,
        };
        n.try_normalize(f32::EPSILON).unwrap_or(*normal)
    }
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}
