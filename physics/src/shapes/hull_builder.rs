//! Incremental convex hull construction from a point cloud.

use glam::Vec3;

// points closer than this to a triangle plane count as lying on it
const PLANE_EPSILON: f32 = 1e-4;
const MERGE_EPSILON: f32 = 1e-3;

fn find_point_furthest_in_dir(pts: &[Vec3], dir: Vec3) -> usize {
    let mut max_idx = 0;
    let mut max_dist = dir.dot(pts[0]);
    for (i, pt) in pts.iter().enumerate().skip(1) {
        let dist = dir.dot(*pt);
        if dist > max_dist {
            max_dist = dist;
            max_idx = i;
        }
    }
    max_idx
}

fn distance_from_line(a: Vec3, b: Vec3, pt: Vec3) -> f32 {
    let ab = (b - a).normalize();
    let ray = pt - a;
    (ray - ab * ray.dot(ab)).length()
}

fn distance_from_triangle(a: Vec3, b: Vec3, c: Vec3, pt: Vec3) -> f32 {
    let normal = (b - a).cross(c - a).normalize();
    (pt - a).dot(normal)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Tri {
    a: usize,
    b: usize,
    c: usize,
}

impl Tri {
    fn edges(&self) -> [(usize, usize); 3] {
        [(self.a, self.b), (self.b, self.c), (self.c, self.a)]
    }

    fn distance(&self, pts: &[Vec3], pt: Vec3) -> f32 {
        distance_from_triangle(pts[self.a], pts[self.b], pts[self.c], pt)
    }
}

fn same_edge(lhs: (usize, usize), rhs: (usize, usize)) -> bool {
    lhs == rhs || (lhs.0 == rhs.1 && lhs.1 == rhs.0)
}

struct HullBuilder {
    points: Vec<Vec3>,
    tris: Vec<Tri>,
}

impl HullBuilder {
    /// Starts from the largest tetrahedron that can be found cheaply.
    fn tetrahedron(verts: &[Vec3]) -> Option<Self> {
        let mut point0 = verts[find_point_furthest_in_dir(verts, Vec3::X)];
        let mut point1 = verts[find_point_furthest_in_dir(verts, -point0)];
        if point0.distance_squared(point1) < PLANE_EPSILON * PLANE_EPSILON {
            return None;
        }

        let point2 = verts
            .iter()
            .copied()
            .max_by(|a, b| {
                distance_from_line(point0, point1, *a)
                    .total_cmp(&distance_from_line(point0, point1, *b))
            })?;
        if distance_from_line(point0, point1, point2) < PLANE_EPSILON {
            return None;
        }

        let point3 = verts.iter().copied().max_by(|a, b| {
            distance_from_triangle(point0, point1, point2, *a)
                .abs()
                .total_cmp(&distance_from_triangle(point0, point1, point2, *b).abs())
        })?;
        let height = distance_from_triangle(point0, point1, point2, point3);
        if height.abs() < PLANE_EPSILON {
            return None;
        }

        // keep every face counter clockwise seen from outside
        if height > 0.0 {
            std::mem::swap(&mut point0, &mut point1);
        }

        Some(Self {
            points: vec![point0, point1, point2, point3],
            tris: vec![
                Tri { a: 0, b: 1, c: 2 },
                Tri { a: 0, b: 2, c: 3 },
                Tri { a: 2, b: 1, c: 3 },
                Tri { a: 1, b: 0, c: 3 },
            ],
        })
    }

    fn is_external(&self, pt: Vec3) -> bool {
        self.tris
            .iter()
            .any(|tri| tri.distance(&self.points, pt) > PLANE_EPSILON)
    }

    fn remove_internal_points(&self, check_pts: &mut Vec<Vec3>) {
        check_pts.retain(|pt| {
            self.is_external(*pt)
                && !self
                    .points
                    .iter()
                    .any(|hull_pt| hull_pt.distance_squared(*pt) < 0.01 * 0.01)
        });
    }

    fn add_point(&mut self, pt: Vec3) {
        // triangles facing the new point, in descending index order so they can be removed
        let facing_tris: Vec<usize> = (0..self.tris.len())
            .rev()
            .filter(|&i| self.tris[i].distance(&self.points, pt) > PLANE_EPSILON)
            .collect();

        // edges not shared between two facing triangles form the horizon
        let mut horizon = Vec::new();
        for &tri_idx in &facing_tris {
            for edge in self.tris[tri_idx].edges().iter() {
                let shared = facing_tris.iter().any(|&other| {
                    other != tri_idx
                        && self.tris[other]
                            .edges()
                            .iter()
                            .any(|other_edge| same_edge(*edge, *other_edge))
                });
                if !shared {
                    horizon.push(*edge);
                }
            }
        }

        for &tri_idx in &facing_tris {
            self.tris.remove(tri_idx);
        }

        self.points.push(pt);
        let new_idx = self.points.len() - 1;
        for &(a, b) in &horizon {
            self.tris.push(Tri { a, b, c: new_idx });
        }
    }

    fn expand(&mut self, verts: &[Vec3]) {
        let mut external_verts = verts.to_vec();
        self.remove_internal_points(&mut external_verts);

        while !external_verts.is_empty() {
            let pt_idx = find_point_furthest_in_dir(&external_verts, external_verts[0]);
            let pt = external_verts.remove(pt_idx);
            self.add_point(pt);
            self.remove_internal_points(&mut external_verts);
        }
    }

    fn remove_unreferenced_verts(&mut self) {
        let mut i = 0;
        while i < self.points.len() {
            let used = self
                .tris
                .iter()
                .any(|tri| tri.a == i || tri.b == i || tri.c == i);
            if used {
                i += 1;
                continue;
            }
            for tri in self.tris.iter_mut() {
                if tri.a > i {
                    tri.a -= 1;
                }
                if tri.b > i {
                    tri.b -= 1;
                }
                if tri.c > i {
                    tri.c -= 1;
                }
            }
            self.points.remove(i);
        }
    }

    fn plane(&self, tri: &Tri) -> (Vec3, f32) {
        let a = self.points[tri.a];
        let n = (self.points[tri.b] - a)
            .cross(self.points[tri.c] - a)
            .normalize();
        (n, n.dot(a))
    }

    /// Groups coplanar triangles and walks the boundary of each group.
    fn merge_faces(&self) -> Vec<Vec<usize>> {
        let mut assigned = vec![false; self.tris.len()];
        let mut faces = Vec::new();
        for i in 0..self.tris.len() {
            if assigned[i] {
                continue;
            }
            let (normal, d) = self.plane(&self.tris[i]);
            let group: Vec<usize> = (i..self.tris.len())
                .filter(|&j| {
                    if assigned[j] {
                        return false;
                    }
                    let (n, dj) = self.plane(&self.tris[j]);
                    n.dot(normal) > 1.0 - MERGE_EPSILON && (dj - d).abs() < MERGE_EPSILON
                })
                .collect();
            for &j in &group {
                assigned[j] = true;
            }

            let mut boundary: Vec<(usize, usize)> = Vec::new();
            for &j in &group {
                for &(a, b) in self.tris[j].edges().iter() {
                    if let Some(pos) = boundary.iter().position(|&e| e == (b, a)) {
                        boundary.swap_remove(pos);
                    } else {
                        boundary.push((a, b));
                    }
                }
            }

            if let Some(&(first, _)) = boundary.first() {
                let mut face = Vec::with_capacity(boundary.len());
                let mut current = first;
                while face.len() < boundary.len() {
                    face.push(current);
                    match boundary.iter().find(|e| e.0 == current) {
                        Some(&(_, next)) if next != first => current = next,
                        _ => break,
                    }
                }
                faces.push(face);
            }
        }
        faces
    }
}

/// Builds the convex hull of `verts`, returning the hull vertices and counter clockwise polygon
/// faces. Returns `None` for fewer than four points or a flat point set.
pub(crate) fn build_convex_hull(verts: &[Vec3]) -> Option<(Vec<Vec3>, Vec<Vec<usize>>)> {
    if verts.len() < 4 {
        return None;
    }

    let mut builder = HullBuilder::tetrahedron(verts)?;
    builder.expand(verts);
    builder.remove_unreferenced_verts();
    let faces = builder.merge_faces();
    Some((builder.points, faces))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube_points() -> Vec<Vec3> {
        let mut pts = Vec::new();
        for i in 0..8 {
            pts.push(Vec3::new(
                if i & 1 != 0 { 1.0 } else { -1.0 },
                if i & 2 != 0 { 1.0 } else { -1.0 },
                if i & 4 != 0 { 1.0 } else { -1.0 },
            ));
        }
        pts
    }

    #[test]
    fn test_cube_hull_merges_faces() {
        let mut pts = cube_points();
        // interior points are dropped
        pts.push(Vec3::ZERO);
        pts.push(Vec3::new(0.5, -0.25, 0.1));
        let (verts, faces) = build_convex_hull(&pts).unwrap();
        assert_eq!(verts.len(), 8);
        assert_eq!(faces.len(), 6);
        for face in &faces {
            assert_eq!(face.len(), 4);
        }
    }

    #[test]
    fn test_flat_points_are_rejected() {
        let pts = [Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)];
        assert!(build_convex_hull(&pts).is_none());
        assert!(build_convex_hull(&pts[0..3]).is_none());
    }
}
