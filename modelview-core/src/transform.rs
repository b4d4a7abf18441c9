/// Node transforms: translation, rotation and scale
use nalgebra::{Matrix4, Unit, UnitQuaternion, Vector3};

/// Local transform of a scene node, composed as `T * R * S`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::repeat(1.0),
        }
    }

    pub fn from_trs(translation: [f32; 3], rotation_xyzw: [f32; 4], scale: [f32; 3]) -> Self {
        let [x, y, z, w] = rotation_xyzw;
        Self {
            translation: Vector3::from(translation),
            rotation: UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(w, x, y, z)),
            scale: Vector3::from(scale),
        }
    }

    /// Rotation from Euler angles applied in X, Y, Z order (intrinsic)
    pub fn euler_xyz(x: f32, y: f32, z: f32) -> UnitQuaternion<f32> {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), x)
            * UnitQuaternion::from_axis_angle(&Vector3::y_axis(), y)
            * UnitQuaternion::from_axis_angle(&Vector3::z_axis(), z)
    }

    /// Rotate by `delta` about the parent's axes, on top of the current rotation
    pub fn rotate(&mut self, delta: UnitQuaternion<f32>) {
        self.rotation = delta * self.rotation;
    }

    pub fn rotate_axis(&mut self, axis: Unit<Vector3<f32>>, angle: f32) {
        self.rotate(UnitQuaternion::from_axis_angle(&axis, angle));
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Matrix4::new_translation(&self.translation)
            * self.rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_identity_matrix() {
        let matrix = Transform::identity().matrix();
        assert!((matrix - Matrix4::identity()).norm() < 1e-6);
    }

    #[test]
    fn test_quarter_turn_about_x_maps_y_to_z() {
        let mut transform = Transform::identity();
        transform.rotate_axis(Vector3::x_axis(), FRAC_PI_2);
        let p = transform.matrix().transform_point(&Point3::new(0.0, 1.0, 0.0));
        assert!((p - Point3::new(0.0, 0.0, 1.0)).norm() < 1e-6);
    }

    #[test]
    fn test_trs_order() {
        let transform = Transform::from_trs([1.0, 0.0, 0.0], [0.0, 0.0, 0.0, 1.0], [2.0, 2.0, 2.0]);
        let p = transform.matrix().transform_point(&Point3::new(1.0, 1.0, 1.0));
        assert!((p - Point3::new(3.0, 2.0, 2.0)).norm() < 1e-6);
    }

    #[test]
    fn test_euler_xyz_single_axis() {
        let q = Transform::euler_xyz(FRAC_PI_2, 0.0, 0.0);
        let expected = UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2);
        assert!(q.angle_to(&expected) < 1e-6);
    }
}
