use super::{MassInfo, Ray, ShapeTrait};
use crate::{bounds::Bounds, math::Pose};
use glam::Vec3;

const PLANE_EXTENT: f32 = 1e4;

/// Static half space `normal . x <= offset`.
#[derive(Copy, Clone, Debug)]
pub struct ShapePlane {
    pub normal: Vec3,
    pub offset: f32,
    bounds: Bounds,
}

impl ShapePlane {
    pub fn new(normal: Vec3, offset: f32) -> Self {
        let normal = normal.normalize();
        let mut bounds = Bounds {
            mins: Vec3::splat(-PLANE_EXTENT),
            maxs: Vec3::splat(PLANE_EXTENT),
        };
        // clip the box on the axis the plane is aligned to, if any
        for i in 0..3 {
            if normal[i] > 1.0 - 1e-4 {
                bounds.maxs[i] = normal[i] * offset;
                break;
            } else if normal[i] < -1.0 + 1e-4 {
                bounds.mins[i] = normal[i] * offset;
                break;
            }
        }
        Self {
            normal,
            offset,
            bounds,
        }
    }

    pub fn distance(&self, pt: Vec3) -> f32 {
        self.normal.dot(pt) - self.offset
    }
}

impl ShapeTrait for ShapePlane {
    // planes never move
    fn update(&mut self, _pose: &Pose) {}

    fn bounds(&self) -> Bounds {
        self.bounds
    }

    fn mass_info(&self, _density: f32) -> MassInfo {
        MassInfo::default()
    }

    fn intersect(&self, ray: &Ray) -> Option<f32> {
        let fpos = self.distance(ray.pos);
        let fdir = ray.dir.dot(self.normal);
        if fdir.abs() < 1e-4 {
            return None;
        }
        let t = -fpos / fdir;
        if t < 0.0 {
            None
        } else {
            Some(t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ground_plane_bounds() {
        let plane = ShapePlane::new(Vec3::Z, 0.0);
        let bounds = plane.bounds();
        assert_eq!(bounds.maxs.z, 0.0);
        assert_eq!(bounds.mins.z, -PLANE_EXTENT);
        assert_eq!(bounds.maxs.x, PLANE_EXTENT);

        let ceiling = ShapePlane::new(-Vec3::Z, -3.0);
        assert_eq!(ceiling.bounds().mins.z, 3.0);
    }

    #[test]
    fn test_plane_ray() {
        let plane = ShapePlane::new(Vec3::Z, 1.0);
        let hit = plane.intersect(&Ray::new(Vec3::new(0.0, 0.0, 5.0), -Vec3::Z));
        assert!((hit.unwrap() - 4.0).abs() < 1e-5);
        assert!(plane
            .intersect(&Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::X))
            .is_none());
    }
}
