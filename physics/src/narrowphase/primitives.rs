//! Pairs made of spheres, capsules and planes.

use super::{
    segment::{capsule_parallel, closest_segment_segment},
    Side,
};
use crate::{contact::FeatureId, manifold::ContactSet, shapes::Shape};
use glam::Vec3;

pub(crate) fn sphere_sphere(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (sp1, sp2) = match (sh1.sphere(), sh2.sphere()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    let diff = sp1.center - sp2.center;
    let dist = diff.length();
    let separation = dist - sp1.radius - sp2.radius;
    if separation > delta {
        return;
    }
    set.normal = if dist < 1e-4 { Vec3::X } else { diff / dist };
    // halfway between the two surfaces
    let point = sp2.center + set.normal * (0.5 * (dist + sp2.radius - sp1.radius));
    set.sync(Side::A);
    set.add(point, -separation, FeatureId::Point(0));
}

pub(crate) fn plane_sphere(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (plane, sphere) = match (sh1.plane(), sh2.sphere()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    let dist = plane.distance(sphere.center) - sphere.radius;
    if dist > delta {
        return;
    }
    set.normal = plane.normal;
    set.sync(Side::B);
    set.add(
        sphere.center - plane.normal * sphere.radius,
        -dist,
        FeatureId::Point(0),
    );
}

pub(crate) fn capsule_sphere(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (cap, sphere) = match (sh1.capsule(), sh2.sphere()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    let closest = closest_segment_segment(cap.start, cap.end, sphere.center, sphere.center);
    let r = cap.radius + sphere.radius;
    let diff = closest.point1 - closest.point2;
    let dist = diff.length();
    if dist > r + delta {
        return;
    }
    set.normal = if dist > delta { diff / dist } else { Vec3::Z };
    let point = closest.point2 + set.normal * (0.5 * (sphere.radius + dist - cap.radius));
    set.sync(Side::A);
    set.add(point, r - dist, FeatureId::Point(0));
}

pub(crate) fn capsule_capsule(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (cap1, cap2) = match (sh1.capsule(), sh2.capsule()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    if capsule_parallel(set, cap1, Side::A, cap2.start, cap2.end, cap2.radius, 0, delta) {
        return;
    }
    let closest = closest_segment_segment(cap1.start, cap1.end, cap2.start, cap2.end);
    let r = cap1.radius + cap2.radius;
    let diff = closest.point1 - closest.point2;
    let dist = diff.length();
    if dist > r + delta {
        return;
    }
    set.normal = if dist > delta { diff / dist } else { Vec3::Z };
    let point = closest.point2 + set.normal * (0.5 * (cap2.radius + dist - cap1.radius));
    set.sync(Side::A);
    set.add(point, r - dist, FeatureId::Point(0));
}

pub(crate) fn capsule_plane(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (cap, plane) = match (sh1.capsule(), sh2.plane()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    for (i, &end) in [cap.start, cap.end].iter().enumerate() {
        let dist = plane.distance(end) - cap.radius;
        if dist < delta {
            set.normal = plane.normal;
            set.sync(Side::A);
            set.add(end - plane.normal * cap.radius, -dist, FeatureId::Point(i as u32));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{math::Pose, narrowphase::tests::collide};
    use glam::Quat;

    #[test]
    fn test_sphere_sphere() {
        let a = Shape::make_sphere(Vec3::new(0.0, 0.0, 0.9), 0.5);
        let b = Shape::make_sphere(Vec3::ZERO, 0.5);
        let points = collide(&a, &b);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert!(p.normal.abs_diff_eq(Vec3::Z, 1e-6));
        assert!((p.penetration - 0.1).abs() < 1e-5);
        assert!(p.position.abs_diff_eq(Vec3::new(0.0, 0.0, 0.45), 1e-5));

        let far = Shape::make_sphere(Vec3::new(0.0, 0.0, 1.5), 0.5);
        assert!(collide(&far, &b).is_empty());
    }

    #[test]
    fn test_coincident_spheres_use_fallback_normal() {
        let a = Shape::make_sphere(Vec3::ZERO, 0.5);
        let b = Shape::make_sphere(Vec3::ZERO, 0.25);
        let points = collide(&a, &b);
        assert_eq!(points[0].normal, Vec3::X);
        assert!((points[0].penetration - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_sphere_on_plane_either_order() {
        let sphere = Shape::make_sphere(Vec3::new(1.0, 2.0, 0.45), 0.5);
        let plane = Shape::make_plane(Vec3::Z, 0.0);
        let points = collide(&sphere, &plane);
        assert_eq!(points.len(), 1);
        assert!(points[0].normal.abs_diff_eq(Vec3::Z, 1e-6));
        assert!((points[0].penetration - 0.05).abs() < 1e-5);
        assert!(points[0].position.abs_diff_eq(Vec3::new(1.0, 2.0, -0.05), 1e-5));

        // the normal always pushes the first shape
        let points = collide(&plane, &sphere);
        assert!(points[0].normal.abs_diff_eq(-Vec3::Z, 1e-6));
    }

    #[test]
    fn test_capsule_sphere() {
        let cap = Shape::make_capsule(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.25);
        let sphere = Shape::make_sphere(Vec3::new(0.5, 0.0, 0.7), 0.5);
        let points = collide(&cap, &sphere);
        assert_eq!(points.len(), 1);
        assert!(points[0].normal.abs_diff_eq(-Vec3::Z, 1e-5));
        assert!((points[0].penetration - 0.05).abs() < 1e-5);
    }

    #[test]
    fn test_parallel_capsules_give_two_points() {
        let a = Shape::make_capsule(Vec3::new(-1.0, 0.0, 0.45), Vec3::new(1.0, 0.0, 0.45), 0.25);
        let b = Shape::make_capsule(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), 0.25);
        let points = collide(&a, &b);
        assert_eq!(points.len(), 2);
        for p in points.iter() {
            assert!(p.normal.abs_diff_eq(Vec3::Z, 1e-5));
            assert!((p.penetration - 0.05).abs() < 1e-5);
        }
        let mut xs: Vec<f32> = points.iter().map(|p| p.position.x).collect();
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((xs[0] - 0.0).abs() < 1e-5);
        assert!((xs[1] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_crossed_capsules_give_one_point() {
        let a = Shape::make_capsule(Vec3::new(-1.0, 0.0, 0.45), Vec3::new(1.0, 0.0, 0.45), 0.25);
        let b = Shape::make_capsule(Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.0, 1.0, 0.0), 0.25);
        let points = collide(&a, &b);
        assert_eq!(points.len(), 1);
        assert!(points[0].position.abs_diff_eq(Vec3::new(0.0, 0.0, 0.225), 1e-5));
    }

    #[test]
    fn test_tilted_capsule_on_plane() {
        let mut cap = Shape::make_capsule(Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), 0.25);
        cap.update(&Pose::new(Vec3::new(0.0, 0.0, 0.5), Quat::from_rotation_y(0.3)));
        let plane = Shape::make_plane(Vec3::Z, 0.0);
        let points = collide(&cap, &plane);
        // only the lower end touches
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert!(p.position.x > 0.0);
        assert!((p.penetration - 0.0455).abs() < 1e-3);
        assert!((p.position.z + p.penetration).abs() < 1e-5);
    }
}
