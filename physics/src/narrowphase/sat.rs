//! Separating axis tests between convex polyhedra.

use super::{segment::closest_segment_segment, Side};
use crate::shapes::{ShapeBox, ShapeHull};
use glam::Vec3;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SatFeature {
    /// Face of the reference shape.
    Face(usize),
    /// Edge of the reference shape and edge of the other shape.
    Edges(usize, usize),
}

/// Axis of least penetration, or of greatest separation when `distance` is positive.
#[derive(Copy, Clone, Debug)]
pub struct SatResult {
    /// Which argument owns the face or first edge, `normal` points out of it.
    pub reference: Side,
    pub normal: Vec3,
    /// Deepest point of the other shape, or the middle of the two closest edge points.
    pub point: Vec3,
    /// Signed separation along `normal`, negative when the shapes overlap. The preference
    /// for face axes only affects which axis is chosen, never this value.
    pub distance: f32,
    pub feature: SatFeature,
}

impl SatResult {
    fn unset() -> Self {
        Self {
            reference: Side::A,
            normal: Vec3::Z,
            point: Vec3::ZERO,
            distance: -1e9,
            feature: SatFeature::Face(0),
        }
    }
}

// `score` is the distance to beat, it runs ahead of `best.distance` once biased.
fn face_axes(
    reference: &ShapeHull,
    other: &ShapeHull,
    side: Side,
    best: &mut SatResult,
    score: &mut f32,
) {
    for (i, face) in reference.faces.iter().enumerate() {
        let pt = other.support(-face.normal);
        let dist = face.distance(pt);
        if dist > *score {
            *score = dist;
            *best = SatResult {
                reference: side,
                normal: face.normal,
                point: pt,
                distance: dist,
                feature: SatFeature::Face(i),
            };
        }
    }
}

/// Full test over the face normals of both hulls and the cross products of edge pairs that
/// form a face of the Minkowski difference. Face axes are preferred over slightly better ones
/// from later phases by `2 * delta`, and a face axis within `delta` of touching ends the
/// search.
pub fn sat(hull1: &ShapeHull, hull2: &ShapeHull, delta: f32) -> SatResult {
    let mut best = SatResult::unset();
    let mut score = best.distance;
    face_axes(hull1, hull2, Side::A, &mut best, &mut score);
    score += 2.0 * delta;
    if score > delta {
        return best;
    }
    face_axes(hull2, hull1, Side::B, &mut best, &mut score);
    score += 2.0 * delta;
    if score > delta {
        return best;
    }

    for (i1, edge1) in hull1.edges.iter().enumerate() {
        let (a1, b1) = hull1.edge_points(edge1);
        let (n1a, n1b) = hull1.edge_normals(edge1);
        let dir1 = b1 - a1;
        let outward = a1 - hull1.center;
        for (i2, edge2) in hull2.edges.iter().enumerate() {
            let (a2, b2) = hull2.edge_points(edge2);
            let (n2a, n2b) = hull2.edge_normals(edge2);
            let dir2 = b2 - a2;

            // the arcs of the two edges on the Gauss map must cross
            let cba = n2a.dot(dir1);
            let dba = n2b.dot(dir1);
            let adc = -n1a.dot(dir2);
            let bdc = -n1b.dot(dir2);
            if !(cba * dba < 0.0 && adc * bdc < 0.0 && cba * bdc > 0.0) {
                continue;
            }

            let axis = dir1.cross(dir2);
            let len = axis.length();
            if len <= 0.01 {
                continue;
            }
            let mut axis = axis / len;
            if axis.dot(outward) < 0.0 {
                axis = -axis;
            }
            let dist = axis.dot(a2 - a1);
            if dist > score {
                score = dist;
                let closest = closest_segment_segment(a1, b1, a2, b2);
                best = SatResult {
                    reference: Side::A,
                    normal: axis,
                    point: closest.point1.lerp(closest.point2, 0.5),
                    distance: dist,
                    feature: SatFeature::Edges(i1, i2),
                };
            }
        }
    }
    best
}

fn box_face_axes(
    reference: &ShapeBox,
    other: &ShapeBox,
    side: Side,
    dir: Vec3,
    best: &mut SatResult,
    score: &mut f32,
) {
    for (i, &axis) in reference.axes.iter().enumerate() {
        let cd = dir.dot(axis);
        let dist = cd.abs() - reference.extents_along(axis) - other.extents_along(axis);
        if dist > *score {
            *score = dist;
            let (normal, face) = if cd < 0.0 {
                (-axis, i * 2)
            } else {
                (axis, i * 2 + 1)
            };
            *best = SatResult {
                reference: side,
                normal,
                point: other.support(-normal),
                distance: dist,
                feature: SatFeature::Face(face),
            };
        }
    }
}

/// Same result as [`sat`] for two boxes, using their axes directly.
pub fn box_sat(box1: &ShapeBox, box2: &ShapeBox, delta: f32) -> SatResult {
    let mut best = SatResult::unset();
    let mut score = best.distance;
    let dir = box2.center - box1.center;
    box_face_axes(box1, box2, Side::A, dir, &mut best, &mut score);
    score += 2.0 * delta;
    if score > delta {
        return best;
    }
    box_face_axes(box2, box1, Side::B, -dir, &mut best, &mut score);
    score += 2.0 * delta;
    if score > delta {
        return best;
    }

    let (hull1, hull2) = (box1.hull(), box2.hull());
    for (ax1, &e1) in box1.axes.iter().enumerate() {
        for (ax2, &e2) in box2.axes.iter().enumerate() {
            let axis = e1.cross(e2);
            if axis.length_squared() < delta {
                continue;
            }
            let mut axis = axis.normalize();
            let cd = dir.dot(axis);
            if cd < 0.0 {
                axis = -axis;
            }
            let dist = cd.abs() - box1.extents_along(axis) - box2.extents_along(axis);
            if dist <= score {
                continue;
            }

            // the edge of each box closest to the other along the axis
            let mut v1 = 0;
            let mut v2 = 0;
            for i in 0..3 {
                if i != ax1 && box1.axes[i].dot(axis) > 0.0 {
                    v1 += 1 << i;
                }
                if i != ax2 && box2.axes[i].dot(axis) < 0.0 {
                    v2 += 1 << i;
                }
            }
            let (w1, w2) = (v1 + (1 << ax1), v2 + (1 << ax2));
            let (i1, i2) = match (hull1.edge(v1, w1), hull2.edge(v2, w2)) {
                (Some(i1), Some(i2)) => (i1, i2),
                _ => continue,
            };
            let closest = closest_segment_segment(
                hull1.vertices[v1],
                hull1.vertices[w1],
                hull2.vertices[v2],
                hull2.vertices[w2],
            );
            score = dist;
            best = SatResult {
                reference: Side::A,
                normal: axis,
                point: closest.point1.lerp(closest.point2, 0.5),
                distance: dist,
                feature: SatFeature::Edges(i1, i2),
            };
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{gjk::gjk, math::Pose, shapes::Shape};
    use glam::Quat;
    use std::f32::consts::FRAC_PI_4;

    fn unit_box(pose: Pose) -> Shape {
        let mut shape = Shape::make_box(ShapeBox::new(Vec3::splat(0.5)).unwrap());
        shape.update(&pose);
        shape
    }

    #[test]
    fn test_separated_boxes() {
        let a = unit_box(Pose::IDENTITY);
        let b = unit_box(Pose::from_translation(Vec3::new(2.0, 0.0, 0.0)));
        let result = box_sat(a.cuboid().unwrap(), b.cuboid().unwrap(), 0.01);
        // a clear separating face returns before the second shape is tested
        assert!((result.distance - 1.0).abs() < 1e-4);
        assert_eq!(result.reference, Side::A);
        assert_eq!(result.feature, SatFeature::Face(1));
        assert!(result.normal.abs_diff_eq(Vec3::X, 1e-5));
    }

    #[test]
    fn test_stacked_boxes_face_contact() {
        let a = unit_box(Pose::IDENTITY);
        let b = unit_box(Pose::from_translation(Vec3::new(0.1, 0.0, 0.9)));
        let result = sat(a.hull().unwrap(), b.hull().unwrap(), 0.01);
        // the bottom face of the second box ties and loses to the preferred first face
        assert!((result.distance + 0.1).abs() < 1e-4);
        assert_eq!(result.reference, Side::A);
        assert!(result.normal.abs_diff_eq(Vec3::Z, 1e-5));
        assert_eq!(result.feature, SatFeature::Face(5));
    }

    #[test]
    fn test_box_sat_matches_hull_sat() {
        let a = unit_box(Pose::IDENTITY);
        let poses = [
            Pose::new(Vec3::new(0.3, 0.2, 0.95), Quat::from_rotation_z(0.4)),
            Pose::new(Vec3::new(0.0, 0.0, 1.0), Quat::from_rotation_x(0.3)),
            Pose::new(Vec3::new(-1.5, 0.0, 0.0), Quat::from_rotation_y(0.3)),
        ];
        for pose in poses.iter() {
            let b = unit_box(*pose);
            let generic = sat(a.hull().unwrap(), b.hull().unwrap(), 0.01);
            let boxed = box_sat(a.cuboid().unwrap(), b.cuboid().unwrap(), 0.01);
            assert!((generic.distance - boxed.distance).abs() < 1e-3);
        }
    }

    #[test]
    fn test_crossed_edges() {
        // a ridge along y under a ridge along x
        let a = unit_box(Pose::new(Vec3::ZERO, Quat::from_rotation_y(FRAC_PI_4)));
        let reach = 0.5 * std::f32::consts::SQRT_2;
        let b = unit_box(Pose::new(
            Vec3::new(0.0, 0.0, 2.0 * reach - 0.05),
            Quat::from_rotation_x(FRAC_PI_4),
        ));
        let (hull1, hull2) = (a.hull().unwrap(), b.hull().unwrap());
        let results = [
            sat(hull1, hull2, 0.01),
            box_sat(a.cuboid().unwrap(), b.cuboid().unwrap(), 0.01),
        ];
        let expected = (hull1.edge(4, 6).unwrap(), hull2.edge(0, 1).unwrap());
        for result in results.iter() {
            assert_eq!(result.feature, SatFeature::Edges(expected.0, expected.1));
            assert!((result.distance + 0.05).abs() < 1e-3);
            assert!(result.normal.abs_diff_eq(Vec3::Z, 1e-4));
            assert!(result.point.abs_diff_eq(Vec3::new(0.0, 0.0, reach - 0.025), 1e-3));
        }
    }

    #[test]
    fn test_separation_agrees_with_gjk() {
        let a = unit_box(Pose::IDENTITY);
        let b = unit_box(Pose::new(
            Vec3::new(3.0, 0.0, 0.0),
            Quat::from_rotation_z(0.3),
        ));
        let (hull1, hull2) = (a.hull().unwrap(), b.hull().unwrap());
        let result = sat(hull1, hull2, 0.0);
        let closest = gjk(hull1, hull2, Vec3::X).unwrap();
        // a corner of the turned box faces the +x side of the first
        let expected = 2.5 - 0.5 * (0.3f32.cos() + 0.3f32.sin());
        assert!((result.distance - expected).abs() < 1e-4);
        assert!((closest.distance() - result.distance).abs() < 0.02);
    }
}
