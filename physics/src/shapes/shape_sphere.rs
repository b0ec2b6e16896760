use super::{MassInfo, Ray, ShapeTrait};
use crate::{bounds::Bounds, math::Pose};
use glam::{Mat3, Vec3};
use std::f32::consts::PI;

#[derive(Copy, Clone, Debug)]
pub struct ShapeSphere {
    pub local_center: Vec3,
    pub center: Vec3,
    pub radius: f32,
}

impl ShapeSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            local_center: center,
            center,
            radius,
        }
    }
}

impl ShapeTrait for ShapeSphere {
    fn update(&mut self, pose: &Pose) {
        self.center = pose.transform(self.local_center);
    }

    fn bounds(&self) -> Bounds {
        Bounds {
            mins: self.center - Vec3::splat(self.radius),
            maxs: self.center + Vec3::splat(self.radius),
        }
    }

    fn mass_info(&self, density: f32) -> MassInfo {
        let r2 = self.radius * self.radius;
        let mass = PI * self.radius * r2 * 4.0 / 3.0 * density;
        MassInfo {
            mass,
            center: self.local_center,
            inertia: Mat3::from_diagonal(Vec3::splat(0.4 * mass * r2)),
        }
    }

    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let rel = self.center - ray.pos;
        let proj = ray.dir.dot(rel);
        let dist2 = rel.length_squared() - proj * proj;
        let r2 = self.radius * self.radius;
        if r2 - dist2 < 0.0 {
            return None;
        }
        let t = proj - (r2 - dist2).sqrt();
        if t < 0.0 {
            None
        } else {
            Some(t)
        }
    }
}
