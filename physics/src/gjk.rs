use crate::{
    math::glam_ext::Mat4Ext,
    shapes::{ShapeBox, ShapeHull},
};
use glam::{Mat4, Vec2, Vec3, Vec4};

const MAX_ITERATIONS: usize = 20;
const PROGRESS_TOLERANCE: f32 = 0.01;

/// Furthest point of a convex set along a direction.
pub trait Support {
    fn support(&self, dir: Vec3) -> Vec3;
}

impl Support for Vec3 {
    fn support(&self, _dir: Vec3) -> Vec3 {
        *self
    }
}

impl Support for ShapeHull {
    fn support(&self, dir: Vec3) -> Vec3 {
        ShapeHull::support(self, dir)
    }
}

impl Support for ShapeBox {
    fn support(&self, dir: Vec3) -> Vec3 {
        ShapeBox::support(self, dir)
    }
}

/// Line segment, the core of a capsule.
#[derive(Copy, Clone, Debug)]
pub struct Segment {
    pub start: Vec3,
    pub end: Vec3,
}

impl Support for Segment {
    fn support(&self, dir: Vec3) -> Vec3 {
        if dir.dot(self.end - self.start) > 0.0 {
            self.end
        } else {
            self.start
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClosestPoints {
    pub point_a: Vec3,
    pub point_b: Vec3,
}

impl ClosestPoints {
    pub fn distance(&self) -> f32 {
        self.point_a.distance(self.point_b)
    }
}

fn signed_volume_1d(s1: Vec3, s2: Vec3) -> Vec2 {
    let ab = s2 - s1; // ray from a to b
    let ap = Vec3::ZERO - s1; // ray from a to origin
    let len2 = ab.length_squared();
    if len2 < 1e-12 {
        return Vec2::X;
    }
    let p0 = s1 + ab * ab.dot(ap) / len2; // projection of the origin onto the line

    // Choose the axis with the greatest difference/length
    let mut idx = 0;
    let mut mu_max = 0.0;
    for i in 0..3 {
        let mu = s2[i] - s1[i];
        if mu * mu > mu_max * mu_max {
            mu_max = mu;
            idx = i;
        }
    }

    // Project the simplex points and projected origin onto the axis with the greatest length
    let a = s1[idx];
    let b = s2[idx];
    let p = p0[idx];

    // Get the signed distance from a to p and from p to b
    let c1 = p - a;
    let c2 = b - p;

    if (p > a && p < b) || (p > b && p < a) {
        // p is between [a,b]
        Vec2::new(c2 / mu_max, c1 / mu_max)
    } else if (a <= b && p <= a) || (a >= b && p >= a) {
        // p is on the far side of a
        Vec2::X
    } else {
        // p must be on the far side of b
        Vec2::Y
    }
}

fn compare_signs(a: f32, b: f32) -> bool {
    (a > 0.0 && b > 0.0) || (a < 0.0 && b < 0.0)
}

fn closest_on_edges(pts: [Vec3; 3]) -> Vec3 {
    let mut dist = f32::MAX;
    let mut lambdas = Vec3::X;
    for i in 0..3 {
        let k = (i + 1) % 3;
        let l = (i + 2) % 3;

        let lambda_edge = signed_volume_1d(pts[k], pts[l]);
        let pt = pts[k] * lambda_edge[0] + pts[l] * lambda_edge[1];
        if pt.length_squared() < dist {
            dist = pt.length_squared();
            lambdas[i] = 0.0;
            lambdas[k] = lambda_edge[0];
            lambdas[l] = lambda_edge[1];
        }
    }
    lambdas
}

fn signed_volume_2d(s1: Vec3, s2: Vec3, s3: Vec3) -> Vec3 {
    let normal = (s2 - s1).cross(s3 - s1);
    if normal.length_squared() < 1e-12 {
        // degenerate triangle, the answer lies on an edge
        return closest_on_edges([s1, s2, s3]);
    }
    let p0 = normal * s1.dot(normal) / normal.length_squared();

    // find the axis with the greatest projected area
    let mut idx = 0;
    let mut area_max = 0.0;
    for i in 0..3 {
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;

        let a = Vec2::new(s1[j], s1[k]);
        let b = Vec2::new(s2[j], s2[k]);
        let c = Vec2::new(s3[j], s3[k]);
        let ab = b - a;
        let ac = c - a;
        let area = ab.x * ac.y - ab.y * ac.x;
        if area * area > area_max * area_max {
            idx = i;
            area_max = area;
        }
    }

    // Project onto the appropriate axis
    let x = (idx + 1) % 3;
    let y = (idx + 2) % 3;
    let s = [
        Vec2::new(s1[x], s1[y]),
        Vec2::new(s2[x], s2[y]),
        Vec2::new(s3[x], s3[y]),
    ];
    let p = Vec2::new(p0[x], p0[y]);

    // Get the sub-areas of the triangles formed from the projected origin and the edges
    let mut areas = Vec3::ZERO;
    for i in 0..3 {
        let j = (i + 1) % 3;
        let k = (i + 2) % 3;

        let ab = s[j] - p;
        let ac = s[k] - p;
        areas[i] = ab.x * ac.y - ab.y * ac.x;
    }

    if compare_signs(area_max, areas[0])
        && compare_signs(area_max, areas[1])
        && compare_signs(area_max, areas[2])
    {
        // the projected origin is inside the triangle
        areas / area_max
    } else {
        closest_on_edges([s1, s2, s3])
    }
}

fn signed_volume_3d(s1: Vec3, s2: Vec3, s3: Vec3, s4: Vec3) -> Vec4 {
    let m = Mat4::from_cols(
        Vec4::new(s1.x, s2.x, s3.x, s4.x),
        Vec4::new(s1.y, s2.y, s3.y, s4.y),
        Vec4::new(s1.z, s2.z, s3.z, s4.z),
        Vec4::ONE,
    );

    let c4 = Vec4::new(
        m.cofactor(3, 0),
        m.cofactor(3, 1),
        m.cofactor(3, 2),
        m.cofactor(3, 3),
    );

    let det_m = c4[0] + c4[1] + c4[2] + c4[3];

    if compare_signs(det_m, c4[0])
        && compare_signs(det_m, c4[1])
        && compare_signs(det_m, c4[2])
        && compare_signs(det_m, c4[3])
    {
        // the origin is inside the simplex
        c4 * det_m.recip()
    } else {
        // project the origin onto the faces and keep the closest one
        let face_pts = [s1, s2, s3, s4];
        let mut lambdas = Vec4::ZERO;
        let mut dist = f32::MAX;
        for i in 0..4 {
            let j = (i + 1) % 4;
            let k = (i + 2) % 4;

            let lambdas_face = signed_volume_2d(face_pts[i], face_pts[j], face_pts[k]);
            let pt = face_pts[i] * lambdas_face[0]
                + face_pts[j] * lambdas_face[1]
                + face_pts[k] * lambdas_face[2];
            if pt.length_squared() < dist {
                dist = pt.length_squared();
                let l = (i + 3) % 4;
                lambdas[i] = lambdas_face[0];
                lambdas[j] = lambdas_face[1];
                lambdas[k] = lambdas_face[2];
                lambdas[l] = 0.0;
            }
        }
        lambdas
    }
}

/// A vertex of the Minkowski difference with the two points it came from.
#[derive(Copy, Clone, Debug)]
struct SimplexPoint {
    w: Vec3,
    a: Vec3,
    b: Vec3,
}

fn support_point<A, B>(a: &A, b: &B, dir: Vec3) -> SimplexPoint
where
    A: Support + ?Sized,
    B: Support + ?Sized,
{
    let pa = a.support(dir);
    let pb = b.support(-dir);
    SimplexPoint {
        w: pa - pb,
        a: pa,
        b: pb,
    }
}

struct Simplex {
    points: [SimplexPoint; 4],
    lambdas: [f32; 4],
    count: usize,
}

impl Simplex {
    fn new(first: SimplexPoint) -> Self {
        Self {
            points: [first; 4],
            lambdas: [1.0, 0.0, 0.0, 0.0],
            count: 1,
        }
    }

    fn contains(&self, w: Vec3) -> bool {
        self.points[..self.count]
            .iter()
            .any(|p| p.w.distance_squared(w) < 1e-10)
    }

    fn push(&mut self, pt: SimplexPoint) {
        self.points[self.count] = pt;
        self.count += 1;
    }

    /// Reduces to the sub simplex supporting the point closest to the origin, returns it.
    fn reduce(&mut self) -> Vec3 {
        let p = &self.points;
        let lambdas = match self.count {
            2 => {
                let l = signed_volume_1d(p[0].w, p[1].w);
                [l.x, l.y, 0.0, 0.0]
            }
            3 => {
                let l = signed_volume_2d(p[0].w, p[1].w, p[2].w);
                [l.x, l.y, l.z, 0.0]
            }
            4 => signed_volume_3d(p[0].w, p[1].w, p[2].w, p[3].w).into(),
            _ => [1.0, 0.0, 0.0, 0.0],
        };

        let mut count = 0;
        for i in 0..self.count {
            if lambdas[i] > 0.0 {
                self.points[count] = self.points[i];
                self.lambdas[count] = lambdas[i];
                count += 1;
            }
        }
        self.count = count;
        self.closest()
    }

    fn closest(&self) -> Vec3 {
        (0..self.count).fold(Vec3::ZERO, |acc, i| acc + self.points[i].w * self.lambdas[i])
    }

    fn closest_points(&self) -> ClosestPoints {
        let mut point_a = Vec3::ZERO;
        let mut point_b = Vec3::ZERO;
        for i in 0..self.count {
            point_a += self.points[i].a * self.lambdas[i];
            point_b += self.points[i].b * self.lambdas[i];
        }
        ClosestPoints { point_a, point_b }
    }
}

/// Closest points between two convex sets, `None` when they overlap.
pub fn gjk<A, B>(a: &A, b: &B, dir: Vec3) -> Option<ClosestPoints>
where
    A: Support + ?Sized,
    B: Support + ?Sized,
{
    let dir = if dir.length_squared() > 1e-12 { dir } else { Vec3::X };
    let mut simplex = Simplex::new(support_point(a, b, dir));
    let mut v = simplex.closest();

    for _ in 0..MAX_ITERATIONS {
        if v.length_squared() < 1e-10 {
            return None;
        }
        let d = -v.normalize();
        let pt = support_point(a, b, d);
        if pt.w.dot(d) < v.dot(d) + PROGRESS_TOLERANCE || simplex.contains(pt.w) {
            return Some(simplex.closest_points());
        }

        simplex.push(pt);
        v = simplex.reduce();
        if simplex.count == 4 {
            // the tetrahedron encloses the origin
            return None;
        }
    }
    None
}
