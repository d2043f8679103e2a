/// Affine transforms for scene nodes and the per-leaf vertex transformer
use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Rotation around three axes (in radians), applied in Z, Y, X order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RotationState {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RotationState {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }
}

impl Default for RotationState {
    fn default() -> Self {
        Self::zero()
    }
}

/// A node's transform relative to its parent: scale, then rotate, then translate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalTransform {
    pub translation: Vector3<f64>,
    pub rotation: RotationState,
    pub scale: Vector3<f64>,
}

impl LocalTransform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: RotationState::zero(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            translation: Vector3::new(x, y, z),
            ..Self::identity()
        }
    }

    pub fn with_rotation(mut self, rotation: RotationState) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_scale(mut self, sx: f64, sy: f64, sz: f64) -> Self {
        self.scale = Vector3::new(sx, sy, sz);
        self
    }

    /// The 4x4 matrix `T * R * S`.
    pub fn matrix(&self) -> Matrix4<f64> {
        Transform::translation_matrix(self.translation.x, self.translation.y, self.translation.z)
            * Transform::rotation_matrix(&self.rotation)
            * Transform::scale_matrix(self.scale.x, self.scale.y, self.scale.z)
    }
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// Transform builder for 3D transformations
pub struct Transform;

impl Transform {
    /// Create a rotation matrix from a rotation state
    pub fn rotation_matrix(rotation: &RotationState) -> Matrix4<f64> {
        let rx = Matrix4::new_rotation(Vector3::new(rotation.x, 0.0, 0.0));
        let ry = Matrix4::new_rotation(Vector3::new(0.0, rotation.y, 0.0));
        let rz = Matrix4::new_rotation(Vector3::new(0.0, 0.0, rotation.z));

        rz * ry * rx
    }

    pub fn translation_matrix(x: f64, y: f64, z: f64) -> Matrix4<f64> {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    pub fn scale_matrix(sx: f64, sy: f64, sz: f64) -> Matrix4<f64> {
        Matrix4::new_nonuniform_scaling(&Vector3::new(sx, sy, sz))
    }

    /// Compose a child's local transform onto its parent's world transform
    pub fn compose(parent_world: &Matrix4<f64>, local: &LocalTransform) -> Matrix4<f64> {
        parent_world * local.matrix()
    }
}

/// Apply a world transform to local vertex positions.
///
/// Always allocates a fresh output list; the input is never touched.
pub fn transform_vertices(local: &[Point3<f64>], world: &Matrix4<f64>) -> Vec<Point3<f64>> {
    local.iter().map(|p| world.transform_point(p)).collect()
}
