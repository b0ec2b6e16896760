use super::Side;
use crate::{
    contact::FeatureId, manifold::ContactSet, math::glam_ext::Vec3Ext, shapes::ShapeCapsule,
};
use glam::Vec3;

/// Closest points of two segments and their parameters along each segment.
#[derive(Copy, Clone, Debug)]
pub struct SegmentClosest {
    pub point1: Vec3,
    pub point2: Vec3,
    pub t1: f32,
    pub t2: f32,
}

fn clamped_root(slope: f32, h0: f32, h1: f32) -> f32 {
    if h0 > -1e-6 {
        return 0.0;
    }
    if h1 < 1e-6 {
        return 1.0;
    }
    let r = -h0 / slope;
    if r > 1.0 {
        0.5
    } else {
        r
    }
}

fn classify(s: f32) -> i32 {
    if s < 1e-6 {
        -1
    } else if s > 1.0 - 1e-6 {
        1
    } else {
        0
    }
}

// https://www.geometrictools.com/GTE/Mathematics/DistSegmentSegment.h
pub fn closest_segment_segment(p0: Vec3, p1: Vec3, q0: Vec3, q1: Vec3) -> SegmentClosest {
    let p1_p0 = p1 - p0;
    let q1_q0 = q1 - q0;
    let p0_q0 = p0 - q0;
    let a = p1_p0.dot(p1_p0);
    let b = p1_p0.dot(q1_q0);
    let c = q1_q0.dot(q1_q0);
    let d = p1_p0.dot(p0_q0);
    let e = q1_q0.dot(p0_q0);

    let f00 = d;
    let f10 = f00 + a;
    let f01 = f00 - b;
    let f11 = f10 - b;
    let g00 = -e;
    let g10 = g00 - b;
    let g01 = g00 + c;
    let g11 = g10 + c;

    let (t1, t2) = if a > 1e-6 && c > 1e-6 {
        let s0 = clamped_root(a, f00, f10);
        let s1 = clamped_root(a, f01, f11);
        let c0 = classify(s0);
        let c1 = classify(s1);
        if c0 == -1 && c1 == -1 {
            (0.0, clamped_root(c, g00, g01))
        } else if c0 == 1 && c1 == 1 {
            (1.0, clamped_root(c, g10, g11))
        } else {
            // the minimum lies on the segment between the two edge points of the unit square
            let on_line = |f: f32| {
                let t = f / b;
                if (0.0..=1.0).contains(&t) {
                    t
                } else {
                    0.5
                }
            };
            let (edge0, e00, e01) = match c0 {
                -1 => (0, 0.0, on_line(f00)),
                0 => (2, s0, 0.0),
                _ => (1, 1.0, on_line(f10)),
            };
            let (edge1, e10, e11) = match c1 {
                -1 => (0, 0.0, on_line(f00)),
                0 => (3, s1, 1.0),
                _ => (1, 1.0, on_line(f10)),
            };
            let delta = e11 - e01;
            let h0 = delta * (c * e01 - b * e00 - e);
            let at_edge = |edge: i32, s: f32, t: f32| match edge {
                0 => (0.0, clamped_root(c, g00, g01)),
                1 => (1.0, clamped_root(c, g10, g11)),
                _ => (s, t),
            };
            if h0 > -1e-6 {
                at_edge(edge0, e00, e01)
            } else {
                let h1 = delta * (c * e11 - b * e10 - e);
                if h1 < 1e-6 {
                    at_edge(edge1, e10, e11)
                } else {
                    let z = (h0 / (h0 - h1)).max(0.0).min(1.0);
                    let omz = 1.0 - z;
                    (omz * e00 + z * e10, omz * e01 + z * e11)
                }
            }
        }
    } else if a > 1e-6 {
        (clamped_root(a, f00, f10), 0.0)
    } else if c > 1e-6 {
        (0.0, clamped_root(c, g00, g01))
    } else {
        (0.0, 0.0)
    };

    SegmentClosest {
        point1: p0.lerp(p1, t1),
        point2: q0.lerp(q1, t2),
        t1,
        t2,
    }
}

/// Contacts for a capsule lying along a segment, such as another capsule or a hull edge
/// (`radius2` zero). Returns false when the two are not close to parallel or do not overlap, in
/// which case nothing was added.
#[allow(clippy::too_many_arguments)]
pub(crate) fn capsule_parallel(
    set: &mut ContactSet,
    cap1: &ShapeCapsule,
    side1: Side,
    start2: Vec3,
    end2: Vec3,
    radius2: f32,
    feature: u32,
    delta: f32,
) -> bool {
    let dir = end2 - start2;
    let len = dir.length();
    let r = cap1.radius + radius2;
    if len < delta {
        return false;
    }
    let dir = dir / len;
    let v1 = cap1.start - start2;
    let v2 = cap1.end - start2;
    let mut d1 = dir.cross(v1).length();
    let mut d2 = dir.cross(v2).length();
    if (d1 - d2).abs() > (0.1f32).max(0.1 * d1) {
        return false;
    }

    let (mut a, mut b) = (v1, v2);
    let (mut at, mut bt) = (v1.dot(dir), v2.dot(dir));
    if bt < at {
        std::mem::swap(&mut a, &mut b);
        std::mem::swap(&mut at, &mut bt);
        std::mem::swap(&mut d1, &mut d2);
    }
    let t0 = at.max(0.0);
    let t1 = bt.min(len);
    if t1 - t0 < delta {
        return false;
    }

    let s0 = (t0 - at) / (bt - at);
    let s1 = (t1 - at) / (bt - at);
    let pa = a.lerp(b, s0);
    let pb = a.lerp(b, s1);
    let da = d1 + (d2 - d1) * s0;
    let db = d1 + (d2 - d1) * s1;
    if da >= r + delta && db >= r + delta {
        return false;
    }

    // perpendicular offsets from the second segment to the capsule axis
    let offset_a = pa - dir * t0;
    let offset_b = pb - dir * t1;
    let normal = if da > db && da > 1e-4 {
        offset_a.normalize_or(1e-6, Vec3::Z)
    } else if db > 1e-4 {
        offset_b.normalize_or(1e-6, Vec3::Z)
    } else {
        Vec3::Z
    };
    set.normal = normal;
    set.sync(side1);

    // on a bare edge the contact sits on the edge itself
    let shift = |dist: f32| {
        let inner = if radius2 != 0.0 { cap1.radius } else { dist };
        -0.5 * (dist - radius2 + inner)
    };
    if da < r + delta {
        set.add(start2 + pa + normal * shift(da), r - da, FeatureId::Parallel(feature, 0));
    }
    if db < r + delta {
        set.add(start2 + pb + normal * shift(db), r - db, FeatureId::Parallel(feature, 1));
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossing_segments() {
        let closest = closest_segment_segment(
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.5, -1.0, 2.0),
            Vec3::new(0.5, 1.0, 2.0),
        );
        assert!(closest.point1.abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-5));
        assert!(closest.point2.abs_diff_eq(Vec3::new(0.5, 0.0, 2.0), 1e-5));
        assert!((closest.t1 - 0.75).abs() < 1e-5);
        assert!((closest.t2 - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_clamped_to_endpoints() {
        let closest = closest_segment_segment(
            Vec3::ZERO,
            Vec3::X,
            Vec3::new(3.0, 1.0, 0.0),
            Vec3::new(3.0, 2.0, 0.0),
        );
        assert_eq!(closest.t1, 1.0);
        assert_eq!(closest.t2, 0.0);
        assert!(closest.point2.abs_diff_eq(Vec3::new(3.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_point_against_segment() {
        let pt = Vec3::new(0.25, 1.0, 0.0);
        let closest = closest_segment_segment(Vec3::ZERO, Vec3::X, pt, pt);
        assert!((closest.t1 - 0.25).abs() < 1e-5);
        assert_eq!(closest.point2, pt);
    }

    #[test]
    fn test_degenerate_segments() {
        let closest = closest_segment_segment(Vec3::X, Vec3::X, Vec3::Y, Vec3::Y);
        assert_eq!(closest.point1, Vec3::X);
        assert_eq!(closest.point2, Vec3::Y);
    }
}
