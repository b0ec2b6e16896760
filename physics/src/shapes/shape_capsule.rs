use super::{MassInfo, Ray, ShapeTrait};
use crate::{
    bounds::Bounds,
    math::{glam_ext::Vec3Ext, Pose},
};
use glam::{Mat3, Vec3};
use std::f32::consts::PI;

/// A segment swept by a sphere.
#[derive(Copy, Clone, Debug)]
pub struct ShapeCapsule {
    pub local_start: Vec3,
    pub local_end: Vec3,
    pub start: Vec3,
    pub end: Vec3,
    pub radius: f32,
}

impl ShapeCapsule {
    pub fn new(start: Vec3, end: Vec3, radius: f32) -> Self {
        Self {
            local_start: start,
            local_end: end,
            start,
            end,
            radius,
        }
    }

    /// Closest point on the world segment to `pt`.
    pub fn closest_point(&self, pt: Vec3) -> Vec3 {
        let dir = self.end - self.start;
        let len2 = dir.length_squared();
        if len2 < 1e-12 {
            return self.start;
        }
        let t = ((pt - self.start).dot(dir) / len2).clamp(0.0, 1.0);
        self.start + dir * t
    }
}

fn intersect_sphere(center: Vec3, radius: f32, ray: &Ray) -> Option<f32> {
    let rel = center - ray.pos;
    let proj = ray.dir.dot(rel);
    let dist2 = rel.length_squared() - proj * proj;
    let h2 = radius * radius - dist2;
    if h2 < 0.0 {
        return None;
    }
    let t = proj - h2.sqrt();
    if t < 0.0 {
        None
    } else {
        Some(t)
    }
}

impl ShapeTrait for ShapeCapsule {
    fn update(&mut self, pose: &Pose) {
        self.start = pose.transform(self.local_start);
        self.end = pose.transform(self.local_end);
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_points(&[self.start, self.end]).grown(self.radius)
    }

    fn mass_info(&self, density: f32) -> MassInfo {
        let r = self.radius;
        let r2 = r * r;
        let ht = self.local_start.distance(self.local_end);

        // cylinder plus two hemispheres, the segment runs along the local y axis
        let cylinder_mass = PI * ht * r2;
        let hemisphere_mass = PI * 2.0 * r2 * r / 3.0;
        let mut i22 = r2 * cylinder_mass * 0.5;
        let mut i11 = i22 * 0.5 + cylinder_mass * ht * ht / 12.0;
        let t0 = hemisphere_mass * r2 * 0.4;
        i22 += t0 * 2.0;
        let t1 = ht * 0.5;
        let t2 = t0 + hemisphere_mass * (t1 * t1 + 3.0 * ht * r / 8.0);
        i11 += t2 * 2.0;
        let i33 = i11;

        let axis = (self.local_end - self.local_start).normalize_or(1e-6, Vec3::Z);
        let (x_axis, z_axis) = axis.make_basis();
        let orient = Mat3::from_cols(x_axis, axis, z_axis);
        let diagonal = Mat3::from_diagonal(Vec3::new(i11, i22, i33) * density);

        MassInfo {
            mass: (cylinder_mass + 2.0 * hemisphere_mass) * density,
            center: self.local_start.lerp(self.local_end, 0.5),
            inertia: orient * diagonal * orient.transpose(),
        }
    }

    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let mut best = intersect_sphere(self.start, self.radius, ray);
        let mut consider = |t: Option<f32>| {
            if let Some(t) = t {
                if best.map_or(true, |b| t < b) {
                    best = Some(t);
                }
            }
        };
        consider(intersect_sphere(self.end, self.radius, ray));

        // the cylinder body
        let axis = self.end - self.start;
        let len = axis.length();
        if len > 1e-6 {
            let axis = axis / len;
            let rel = ray.pos - self.start;
            let d = ray.dir - axis * ray.dir.dot(axis);
            let o = rel - axis * rel.dot(axis);
            let a = d.length_squared();
            if a > 1e-12 {
                let b = 2.0 * d.dot(o);
                let c = o.length_squared() - self.radius * self.radius;
                let disc = b * b - 4.0 * a * c;
                if disc >= 0.0 {
                    let t = (-b - disc.sqrt()) / (2.0 * a);
                    let along = (rel + ray.dir * t).dot(axis);
                    if t >= 0.0 && along >= 0.0 && along <= len {
                        consider(Some(t));
                    }
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capsule_mass_is_symmetric_about_axis() {
        let capsule = ShapeCapsule::new(Vec3::new(0.0, 0.0, -1.0), Vec3::new(0.0, 0.0, 1.0), 0.5);
        let info = capsule.mass_info(1.0);
        let expected = PI * 2.0 * 0.25 + 4.0 / 3.0 * PI * 0.125;
        assert!((info.mass - expected).abs() < 1e-4);
        assert!(info.center.abs_diff_eq(Vec3::ZERO, 1e-6));
        let i = info.inertia;
        // the axial moment is the smallest, the two others are equal
        assert!((i.x_axis.x - i.y_axis.y).abs() < 1e-4);
        assert!(i.z_axis.z < i.x_axis.x);
        assert!(i.x_axis.y.abs() < 1e-5);
    }

    #[test]
    fn test_capsule_ray() {
        let capsule = ShapeCapsule::new(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.5);
        let side = capsule.intersect(&Ray::new(Vec3::new(-5.0, 0.0, 0.0), Vec3::X));
        assert!((side.unwrap() - 4.5).abs() < 1e-4);
        let cap = capsule.intersect(&Ray::new(Vec3::new(0.0, 5.0, 0.0), -Vec3::Y));
        assert!((cap.unwrap() - 3.5).abs() < 1e-4);
        assert!(capsule
            .intersect(&Ray::new(Vec3::new(-5.0, 3.0, 0.0), Vec3::X))
            .is_none());
    }
}
