//! Pairs with a hull or box on at least one side.

use super::{
    clip::{clip_face, ClipPoint},
    sat::{box_sat, sat, SatFeature},
    segment::{capsule_parallel, closest_segment_segment},
    CachedAxis, CachedFeature, Side,
};
use crate::{
    contact::FeatureId,
    gjk::{gjk, Segment},
    manifold::ContactSet,
    shapes::{Shape, ShapeCapsule, ShapeHull},
};
use glam::Vec3;

pub(crate) fn hull_plane(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (hull, plane) = match (sh1.hull(), sh2.plane()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    set.normal = plane.normal;
    set.sync(Side::A);
    for (i, &v) in hull.vertices.iter().enumerate() {
        let dist = plane.distance(v);
        if dist < delta {
            set.add(v, -dist, FeatureId::Point(i as u32));
        }
    }
}

pub(crate) fn hull_sphere(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (hull, sphere) = match (sh1.hull(), sh2.sphere()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    let r = sphere.radius;
    if let Some(closest) = gjk(hull, &sphere.center, sphere.center - hull.center) {
        let dist2 = closest.point_a.distance_squared(closest.point_b);
        if dist2 > delta && dist2 < r * r + delta {
            set.normal = (closest.point_a - closest.point_b).normalize();
            set.sync(Side::A);
            set.add(closest.point_a, r - dist2.sqrt(), FeatureId::Point(0));
        }
        if dist2 > delta {
            return;
        }
    }

    // the center is inside, leave through the nearest face
    let (best, dist) = hull
        .faces
        .iter()
        .map(|face| face.distance(sphere.center))
        .enumerate()
        .fold((0, f32::MIN), |acc, (i, d)| if d > acc.1 { (i, d) } else { acc });
    let normal = hull.faces[best].normal;
    set.normal = normal;
    set.sync(Side::B);
    set.add(sphere.center - normal * dist, r - dist, FeatureId::Face(best as u32));
}

pub(crate) fn box_sphere(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (cuboid, sphere) = match (sh1.cuboid(), sh2.sphere()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    let half = cuboid.half_size;
    let local = cuboid.to_local(sphere.center);
    let abs = local.abs();
    if abs.cmplt(half + Vec3::splat(delta)).all() {
        // center inside, push out through the closest face
        let depth = half - abs;
        let axis = if depth.x < depth.y && depth.x < depth.z {
            0
        } else if depth.y < depth.z {
            1
        } else {
            2
        };
        let mut normal = cuboid.axes[axis];
        let mut feature = axis as u32;
        if local[axis] < 0.0 {
            normal = -normal;
            feature += 3;
        }
        set.normal = normal;
        set.sync(Side::B);
        let d = depth[axis];
        set.add(
            sphere.center + normal * d,
            d + sphere.radius,
            FeatureId::Face(feature),
        );
    } else {
        // one bit per clamped side
        let mut feature = 0;
        let mut clamped = local;
        for i in 0..3 {
            if local[i] < -half[i] {
                clamped[i] = -half[i];
                feature += 1 << (2 * i);
            }
            if local[i] > half[i] {
                clamped[i] = half[i];
                feature += 2 << (2 * i);
            }
        }
        let on_box = cuboid.center
            + cuboid.axes[0] * clamped.x
            + cuboid.axes[1] * clamped.y
            + cuboid.axes[2] * clamped.z;
        let dist = on_box.distance(sphere.center);
        if dist > sphere.radius + delta {
            return;
        }
        set.normal = (on_box - sphere.center) / dist;
        set.sync(Side::A);
        set.add(on_box, sphere.radius - dist, FeatureId::Point(feature));
    }
}

// Clips the face of `other` most opposed to `face` against it.
fn try_face(reference: &ShapeHull, other: &ShapeHull, face: usize, delta: f32) -> Vec<ClipPoint> {
    let normal = reference.faces[face].normal;
    let mut incident = None;
    let mut best = 0.0;
    for (i, f) in other.faces.iter().enumerate() {
        let d = f.normal.dot(normal);
        if d < best {
            best = d;
            incident = Some(i);
        }
    }
    match incident {
        Some(i) => clip_face(reference, face, other, i, (face as u32).wrapping_mul(1439), delta),
        None => Vec::new(),
    }
}

fn add_clipped(set: &mut ContactSet, points: &[ClipPoint]) {
    for p in points {
        set.add(p.position, p.penetration, FeatureId::Clip(p.id));
    }
}

/// Hulls and boxes. The axis and feature found last frame are tried first, a full separating
/// axis test only runs when they no longer apply.
pub(crate) fn hull_hull(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (hull1, hull2) = match (sh1.hull(), sh2.hull()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    let by_side = |side: Side| match side {
        Side::A => (hull1, hull2),
        Side::B => (hull2, hull1),
    };

    if let Some(cache) = set.cache {
        let (c1, c2) = by_side(cache.reference);
        let a = c1.support(cache.axis);
        let b = c2.support(-cache.axis);
        if (b - a).dot(cache.axis) > delta {
            return;
        }

        match cache.feature {
            CachedFeature::Face(face) => {
                let points = try_face(c1, c2, face, delta);
                if !points.is_empty() {
                    let axis = c1.faces[face].normal;
                    set.cache = Some(CachedAxis { axis, ..cache });
                    set.normal = -axis;
                    set.sync(cache.reference);
                    add_clipped(set, &points);
                    return;
                }
            }
            CachedFeature::Edges(e1, e2) => {
                let (a1, b1) = c1.edge_points(&c1.edges[e1]);
                let (a2, b2) = c2.edge_points(&c2.edges[e2]);
                let closest = closest_segment_segment(a1, b1, a2, b2);
                let interior = |t: f32| t > delta && t < 1.0 - delta;
                let axis = (b1 - a1).cross(b2 - a2);
                if interior(closest.t1) && interior(closest.t2) && axis.length_squared() > 1e-12 {
                    let mut axis = axis.normalize();
                    if (c2.center - c1.center).dot(axis) < 0.0 {
                        axis = -axis;
                    }
                    let dist = (closest.point2 - closest.point1).dot(axis);
                    if dist < delta {
                        set.cache = Some(CachedAxis { axis, ..cache });
                        set.normal = -axis;
                        set.sync(cache.reference);
                        set.add(
                            closest.point1.lerp(closest.point2, 0.5),
                            -dist,
                            FeatureId::Edges(e1 as u32, e2 as u32),
                        );
                        return;
                    }
                }
            }
            CachedFeature::None => {}
        }
    }

    let result = match (sh1.cuboid(), sh2.cuboid()) {
        (Some(box1), Some(box2)) => box_sat(box1, box2, delta),
        _ => sat(hull1, hull2, delta),
    };
    let mut cache = CachedAxis {
        axis: result.normal,
        reference: result.reference,
        feature: CachedFeature::None,
    };
    if result.distance > delta {
        set.cache = Some(cache);
        return;
    }

    set.normal = -result.normal;
    set.sync(result.reference);
    match result.feature {
        SatFeature::Face(face) => {
            cache.feature = CachedFeature::Face(face);
            let (c1, c2) = by_side(result.reference);
            let points = try_face(c1, c2, face, delta);
            add_clipped(set, &points);
        }
        SatFeature::Edges(e1, e2) => {
            cache.feature = CachedFeature::Edges(e1, e2);
            set.add(
                result.point,
                -result.distance,
                FeatureId::Edges(e1 as u32, e2 as u32),
            );
        }
    }
    set.cache = Some(cache);
}

// Contacts of a capsule lying on a face, clipped to the face. Returns false when the capsule
// does not lie over the face or is too far from it.
fn capsule_face(
    set: &mut ContactSet,
    hull: &ShapeHull,
    face_idx: usize,
    cap: &ShapeCapsule,
    delta: f32,
) -> bool {
    let face = &hull.faces[face_idx];
    let (mut t0, mut t1) = (0.0f32, 1.0f32);
    let n = face.vertices.len();
    for ei in 0..n {
        let va = hull.vertices[face.vertices[ei]];
        let vb = hull.vertices[face.vertices[(ei + 1) % n]];
        let side = face.normal.cross(vb - va);
        let offset = side.dot(va) - delta;
        let fa = side.dot(cap.start) - offset;
        let fb = side.dot(cap.end) - offset;
        if fa < delta && fb < delta {
            return false;
        }
        if fa > 0.0 && fb > 0.0 {
            continue;
        }
        let t = -fa / (fb - fa);
        if fa < fb {
            t0 = t0.max(t);
        } else {
            t1 = t1.min(t);
        }
        if t0 >= t1 {
            return false;
        }
    }

    let p0 = cap.start.lerp(cap.end, t0);
    let p1 = cap.start.lerp(cap.end, t1);
    let d0 = face.distance(p0);
    let d1 = face.distance(p1);
    let reach = cap.radius + delta;
    if d0 >= reach && d1 >= reach {
        return false;
    }
    set.normal = face.normal;
    set.sync(Side::A);
    if d0 < reach {
        set.add(p0 - face.normal * d0, cap.radius - d0, FeatureId::Point(0));
    }
    if d1 < reach {
        set.add(p1 - face.normal * d1, cap.radius - d1, FeatureId::Point(1));
    }
    true
}

pub(crate) fn capsule_hull(set: &mut ContactSet, sh1: &Shape, sh2: &Shape, delta: f32) {
    let (cap, hull) = match (sh1.capsule(), sh2.hull()) {
        (Some(a), Some(b)) => (a, b),
        _ => return,
    };
    let segment = Segment {
        start: cap.start,
        end: cap.end,
    };
    let mid = cap.start.lerp(cap.end, 0.5);
    if let Some(closest) = gjk(hull, &segment, mid - hull.center) {
        let dir = closest.point_b - closest.point_a;
        let dist = dir.length();
        if dist > delta && dist < cap.radius + delta {
            let normal = dir / dist;
            // lying flat on a face
            for fi in 0..hull.faces.len() {
                if normal.dot(hull.faces[fi].normal) > 0.99 && capsule_face(set, hull, fi, cap, delta)
                {
                    return;
                }
            }
            // lying along an edge
            for (ei, edge) in hull.edges.iter().enumerate() {
                let front1 = hull.faces[edge.f1].distance(closest.point_b) > -delta;
                let front2 = hull.faces[edge.f2].distance(closest.point_b) > -delta;
                if front1 && front2 {
                    let (a, b) = hull.edge_points(edge);
                    if capsule_parallel(set, cap, Side::A, a, b, 0.0, ei as u32, delta) {
                        return;
                    }
                }
            }
            set.normal = normal;
            set.sync(Side::A);
            set.add(closest.point_a, cap.radius - dist, FeatureId::Point(0));
        }
        if dist > delta {
            return;
        }
    }

    // the core segment touches the hull, find the axis of least penetration
    let mut best_face = None;
    let mut best_edge = None;
    let mut dist = -1e9f32;
    let mut edge_normal = Vec3::Z;
    for (i, face) in hull.faces.iter().enumerate() {
        let d = face.distance(cap.start).min(face.distance(cap.end));
        if d > dist {
            best_face = Some(i);
            dist = d;
        }
    }
    let cdir = cap.end - cap.start;
    for (i, edge) in hull.edges.iter().enumerate() {
        let (n1, n2) = hull.edge_normals(edge);
        if cdir.dot(n1) * cdir.dot(n2) >= 0.0 {
            continue;
        }
        let (a, b) = hull.edge_points(edge);
        let axis = cdir.cross(b - a);
        let len = axis.length();
        if len < 1e-4 {
            continue;
        }
        let mut axis = axis / len;
        if axis.dot(a - hull.center) < 0.0 {
            axis = -axis;
        }
        let d = (cap.start - a).dot(axis);
        if d > dist {
            best_face = None;
            best_edge = Some(i);
            dist = d;
            edge_normal = axis;
        }
    }
    dist -= cap.radius;
    if dist > delta {
        return;
    }
    if let Some(face) = best_face {
        capsule_face(set, hull, face, cap, delta);
    } else if let Some(ei) = best_edge {
        let (a, b) = hull.edge_points(&hull.edges[ei]);
        let closest = closest_segment_segment(cap.start, cap.end, a, b);
        set.normal = edge_normal;
        set.sync(Side::A);
        set.add(closest.point2, -dist, FeatureId::Edges(ei as u32, 0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::Pose,
        narrowphase::tests::{collide, contact_set},
        shapes::ShapeBox,
    };
    use glam::Quat;

    fn cuboid(half: Vec3, pose: Pose) -> Shape {
        let mut shape = Shape::make_box(ShapeBox::new(half).unwrap());
        shape.update(&pose);
        shape
    }

    fn cube_hull(pose: Pose) -> Shape {
        let corners: Vec<Vec3> = (0..8)
            .map(|i| {
                let sign = |bit: usize| if i & bit != 0 { 0.5 } else { -0.5 };
                Vec3::new(sign(1), sign(2), sign(4))
            })
            .collect();
        let mut shape = Shape::make_hull(ShapeHull::from_points(&corners).unwrap());
        shape.update(&pose);
        shape
    }

    #[test]
    fn test_box_on_plane() {
        let cube = cuboid(Vec3::splat(0.5), Pose::from_translation(Vec3::new(0.0, 0.0, 0.49)));
        let plane = Shape::make_plane(Vec3::Z, 0.0);
        let points = collide(&cube, &plane);
        assert_eq!(points.len(), 4);
        for p in points.iter() {
            assert!((p.penetration - 0.01).abs() < 1e-5);
            assert!(p.normal.abs_diff_eq(Vec3::Z, 1e-6));
            assert!(matches!(p.feature, FeatureId::Point(i) if i < 4));
        }
    }

    #[test]
    fn test_sphere_above_hull() {
        let hull = cube_hull(Pose::IDENTITY);
        let sphere = Shape::make_sphere(Vec3::new(0.1, 0.0, 0.9), 0.5);
        let points = collide(&sphere, &hull);
        assert_eq!(points.len(), 1);
        assert!(points[0].normal.z > 0.99);
        assert!((points[0].penetration - 0.1).abs() < 0.02);
    }

    #[test]
    fn test_sphere_center_inside_hull() {
        let hull = cube_hull(Pose::IDENTITY);
        let sphere = Shape::make_sphere(Vec3::new(0.0, 0.0, 0.3), 0.5);
        let points = collide(&sphere, &hull);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert!(p.normal.abs_diff_eq(Vec3::Z, 1e-5));
        // the full radius plus the depth of the center below the face
        assert!((p.penetration - 0.7).abs() < 1e-5);
        assert!(p.position.abs_diff_eq(Vec3::new(0.0, 0.0, 0.5), 1e-5));
    }

    #[test]
    fn test_sphere_center_inside_flat_box() {
        let slab = cuboid(Vec3::new(1.0, 0.5, 0.25), Pose::IDENTITY);
        let sphere = Shape::make_sphere(Vec3::new(0.5, 0.0, 0.1), 0.2);
        let points = collide(&sphere, &slab);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        // the top face is the closest, not the axis with the largest offset
        assert!(p.normal.abs_diff_eq(Vec3::Z, 1e-5));
        assert!((p.penetration - 0.35).abs() < 1e-5);
        assert!(p.position.abs_diff_eq(Vec3::new(0.5, 0.0, 0.25), 1e-5));
        assert_eq!(p.feature, FeatureId::Face(2));
    }

    #[test]
    fn test_sphere_outside_box() {
        let cube = cuboid(Vec3::splat(0.5), Pose::IDENTITY);
        let sphere = Shape::make_sphere(Vec3::new(0.0, 0.0, 0.7), 0.25);
        let points = collide(&sphere, &cube);
        assert_eq!(points.len(), 1);
        let p = &points[0];
        assert!(p.normal.abs_diff_eq(Vec3::Z, 1e-5));
        assert!((p.penetration - 0.05).abs() < 1e-5);
        assert_eq!(p.feature, FeatureId::Point(32));

        let far = Shape::make_sphere(Vec3::new(0.0, 0.0, 1.0), 0.25);
        assert!(collide(&far, &cube).is_empty());
    }

    #[test]
    fn test_stacked_boxes_reuse_cached_face() {
        let ground = cuboid(Vec3::splat(0.5), Pose::IDENTITY);
        let top = cuboid(
            Vec3::splat(0.5),
            Pose::new(Vec3::new(0.1, 0.0, 0.99), Quat::from_rotation_z(0.2)),
        );
        let mut set = contact_set(&top, &ground);
        set.generate(&top, &ground, 0.01);
        let first: Vec<_> = set.points().to_vec();
        assert_eq!(first.len(), 4);
        assert!(matches!(
            set.cache,
            Some(CachedAxis {
                feature: CachedFeature::Face(_),
                ..
            })
        ));
        for p in first.iter() {
            assert!(p.normal.abs_diff_eq(Vec3::Z, 1e-5));
            assert!((p.penetration - 0.01).abs() < 1e-4);
        }

        // same configuration, the cached face gives identical ids
        set.generate(&top, &ground, 0.01);
        let second = set.points();
        assert_eq!(second.len(), 4);
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.feature, b.feature);
        }
    }

    #[test]
    fn test_separated_hulls_keep_axis() {
        let a = cube_hull(Pose::IDENTITY);
        let b = cube_hull(Pose::from_translation(Vec3::new(0.0, 1.5, 0.0)));
        let mut set = contact_set(&a, &b);
        set.generate(&a, &b, 0.01);
        assert!(set.points().is_empty());
        let cache = set.cache.unwrap();
        assert!(cache.axis.abs_diff_eq(Vec3::Y, 1e-5));
        assert_eq!(cache.feature, CachedFeature::None);
    }

    #[test]
    fn test_rotated_box_contacts_behind_reference_face() {
        use glam::EulerRot;
        use rand::{Rng, SeedableRng};
        use rand_pcg::Pcg32;

        fn random_rotation(rng: &mut Pcg32) -> Quat {
            let mut angle = || rng.gen_range(-std::f32::consts::PI..std::f32::consts::PI);
            Quat::from_euler(EulerRot::XYZ, angle(), angle(), angle())
        }

        let delta = 0.01;
        let mut rng = Pcg32::seed_from_u64(11);
        for _ in 0..200 {
            let rot1 = random_rotation(&mut rng);
            let rot2 = random_rotation(&mut rng);
            // centers closer than the inscribed spheres keep the boxes overlapping
            let offset = random_rotation(&mut rng) * Vec3::X * rng.gen_range(0.2..0.95);
            let a = cuboid(Vec3::splat(0.5), Pose::new(Vec3::ZERO, rot1));
            let b = cuboid(Vec3::splat(0.5), Pose::new(offset, rot2));

            let result = box_sat(a.cuboid().unwrap(), b.cuboid().unwrap(), delta);
            assert!(result.distance < 0.0);
            let reference = match result.reference {
                Side::A => a.hull().unwrap(),
                Side::B => b.hull().unwrap(),
            };
            let n = result.normal;
            let face_point = reference.support(n);

            let points = collide(&a, &b);
            assert!(!points.is_empty());
            for p in points.iter() {
                assert!(n.dot(p.position - face_point) <= 1e-4);
                assert!(p.penetration >= -delta);
                assert!(p.penetration <= -result.distance + 1e-3);
                assert!(p.normal.dot(n).abs() > 0.999);
            }
        }
    }

    #[test]
    fn test_crossed_edges_reuse_cached_pair() {
        use std::f32::consts::FRAC_PI_4;

        let a = cuboid(
            Vec3::splat(0.5),
            Pose::new(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_4)),
        );
        let reach = 0.5 * std::f32::consts::SQRT_2;
        let b = cuboid(
            Vec3::splat(0.5),
            Pose::new(
                Vec3::new(0.0, 0.0, 2.0 * reach - 0.05),
                Quat::from_rotation_x(FRAC_PI_4),
            ),
        );
        let mut set = contact_set(&a, &b);
        set.generate(&a, &b, 0.01);
        let first = set.points().to_vec();
        assert_eq!(first.len(), 1);
        assert!(matches!(first[0].feature, FeatureId::Edges(..)));
        assert!((first[0].penetration - 0.05).abs() < 1e-3);
        let cached = match set.cache {
            Some(CachedAxis {
                feature: CachedFeature::Edges(e1, e2),
                ..
            }) => (e1, e2),
            other => panic!("expected an edge pair, got {:?}", other),
        };

        // nothing moved, the cached pair answers without a new search
        set.generate(&a, &b, 0.01);
        let second = set.points();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].feature, first[0].feature);
        assert_eq!(
            second[0].feature,
            FeatureId::Edges(cached.0 as u32, cached.1 as u32)
        );
        assert!(second[0].position.abs_diff_eq(first[0].position, 1e-4));
        assert!((second[0].penetration - first[0].penetration).abs() < 1e-4);
        assert!(second[0].normal.abs_diff_eq(first[0].normal, 1e-4));
        assert!(matches!(
            set.cache,
            Some(CachedAxis {
                feature: CachedFeature::Edges(e1, e2),
                ..
            }) if (e1, e2) == cached
        ));
    }

    #[test]
    fn test_capsule_sunk_into_box() {
        let cube = cuboid(Vec3::splat(0.5), Pose::IDENTITY);
        let cap = Shape::make_capsule(Vec3::new(-0.3, 0.0, 0.45), Vec3::new(0.3, 0.0, 0.45), 0.25);
        let points = collide(&cap, &cube);
        assert_eq!(points.len(), 2);
        for p in points.iter() {
            assert!(p.normal.abs_diff_eq(Vec3::Z, 1e-5));
            assert!((p.penetration - 0.3).abs() < 1e-5);
            assert!((p.position.z - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_capsule_end_on_box() {
        let cube = cuboid(Vec3::splat(0.5), Pose::IDENTITY);
        let cap = Shape::make_capsule(Vec3::new(0.0, 0.0, 0.8), Vec3::new(0.0, 0.0, 1.5), 0.35);
        let points = collide(&cap, &cube);
        assert_eq!(points.len(), 1);
        assert!(points[0].normal.z > 0.9);
        assert!((points[0].penetration - 0.05).abs() < 0.02);
    }
}
