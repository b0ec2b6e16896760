use super::{hull_builder::build_convex_hull, MassInfo, Ray, ShapeTrait};
use crate::{bounds::Bounds, error::PhysicsError, math::Pose};
use glam::{Mat3, Vec3};
use std::collections::HashMap;

/// A polygon of the hull with its plane `normal . x + d = 0`, the normal points outwards.
#[derive(Clone, Debug)]
pub struct Face {
    pub vertices: Vec<usize>,
    pub normal: Vec3,
    pub d: f32,
    local_normal: Vec3,
    local_d: f32,
}

impl Face {
    #[inline]
    pub fn distance(&self, pt: Vec3) -> f32 {
        self.normal.dot(pt) + self.d
    }
}

/// Edge between vertices `a < b`. `f1` is the face that walks `a -> b`, `f2` walks `b -> a`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub a: usize,
    pub b: usize,
    pub f1: usize,
    pub f2: usize,
}

#[derive(Clone, Debug)]
pub struct ShapeHull {
    local_vertices: Vec<Vec3>,
    pub vertices: Vec<Vec3>,
    pub faces: Vec<Face>,
    pub edges: Vec<Edge>,
    edge_index: HashMap<(usize, usize), usize>,
    local_center: Vec3,
    pub center: Vec3,
}

fn newell_plane(vertices: &[Vec3], indices: &[usize]) -> (Vec3, f32) {
    let n = indices.len();
    let mut normal = Vec3::ZERO;
    let mut centroid = Vec3::ZERO;
    for i in 0..n {
        let cur = vertices[indices[i]];
        let next = vertices[indices[(i + 1) % n]];
        normal += cur.cross(next);
        centroid += cur;
    }
    centroid /= n as f32;
    let length = normal.length();
    if length < 1e-8 {
        return (Vec3::ZERO, 0.0);
    }
    let normal = normal / length;
    (normal, -normal.dot(centroid))
}

impl ShapeHull {
    /// Builds a hull from vertices and counter clockwise vertex loops.
    pub fn new(vertices: Vec<Vec3>, faces: Vec<Vec<usize>>) -> Result<Self, PhysicsError> {
        if vertices.len() < 4 {
            return Err(PhysicsError::InvalidHull(format!(
                "a hull needs at least 4 vertices, got {}",
                vertices.len()
            )));
        }
        if faces.len() < 4 {
            return Err(PhysicsError::InvalidHull(format!(
                "a hull needs at least 4 faces, got {}",
                faces.len()
            )));
        }

        let mut hull_faces = Vec::with_capacity(faces.len());
        let mut edges: Vec<Edge> = Vec::new();
        let mut edge_index = HashMap::new();
        for (face_idx, indices) in faces.into_iter().enumerate() {
            if indices.len() < 3 {
                return Err(PhysicsError::InvalidHull(format!(
                    "face {} has {} vertices",
                    face_idx,
                    indices.len()
                )));
            }
            if let Some(&bad) = indices.iter().find(|&&i| i >= vertices.len()) {
                return Err(PhysicsError::InvalidHull(format!(
                    "face {} references vertex {} of {}",
                    face_idx,
                    bad,
                    vertices.len()
                )));
            }
            let (normal, d) = newell_plane(&vertices, &indices);
            if normal == Vec3::ZERO {
                return Err(PhysicsError::InvalidHull(format!(
                    "face {} is degenerate",
                    face_idx
                )));
            }

            let n = indices.len();
            for i in 0..n {
                let (a, b) = (indices[i], indices[(i + 1) % n]);
                let key = (a.min(b), a.max(b));
                let edge_idx = *edge_index.entry(key).or_insert_with(|| {
                    edges.push(Edge {
                        a: key.0,
                        b: key.1,
                        f1: usize::MAX,
                        f2: usize::MAX,
                    });
                    edges.len() - 1
                });
                let edge = &mut edges[edge_idx];
                let slot = if a < b { &mut edge.f1 } else { &mut edge.f2 };
                if *slot != usize::MAX {
                    return Err(PhysicsError::InvalidHull(format!(
                        "edge {}-{} is walked twice in the same direction",
                        a, b
                    )));
                }
                *slot = face_idx;
            }

            hull_faces.push(Face {
                vertices: indices,
                normal,
                d,
                local_normal: normal,
                local_d: d,
            });
        }

        if let Some(edge) = edges
            .iter()
            .find(|e| e.f1 == usize::MAX || e.f2 == usize::MAX)
        {
            return Err(PhysicsError::InvalidHull(format!(
                "edge {}-{} has only one face",
                edge.a, edge.b
            )));
        }

        let center = vertices.iter().fold(Vec3::ZERO, |acc, v| acc + *v) / vertices.len() as f32;

        Ok(Self {
            local_vertices: vertices.clone(),
            vertices,
            faces: hull_faces,
            edges,
            edge_index,
            local_center: center,
            center,
        })
    }

    /// Computes the convex hull of a point cloud, coplanar triangles become polygons.
    pub fn from_points(points: &[Vec3]) -> Result<Self, PhysicsError> {
        match build_convex_hull(points) {
            Some((vertices, faces)) => Self::new(vertices, faces),
            None => Err(PhysicsError::InvalidHull(format!(
                "{} points do not span a volume",
                points.len()
            ))),
        }
    }

    pub fn local_vertices(&self) -> &[Vec3] {
        &self.local_vertices
    }

    pub fn local_center(&self) -> Vec3 {
        self.local_center
    }

    pub fn support_index(&self, dir: Vec3) -> usize {
        let mut best = 0;
        let mut best_dist = self.vertices[0].dot(dir);
        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let dist = v.dot(dir);
            if dist > best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best
    }

    pub fn support(&self, dir: Vec3) -> Vec3 {
        self.vertices[self.support_index(dir)]
    }

    /// Looks up the edge between two vertices in either order.
    pub fn edge(&self, a: usize, b: usize) -> Option<usize> {
        self.edge_index.get(&(a.min(b), a.max(b))).copied()
    }

    pub fn edge_points(&self, edge: &Edge) -> (Vec3, Vec3) {
        (self.vertices[edge.a], self.vertices[edge.b])
    }

    pub fn edge_normals(&self, edge: &Edge) -> (Vec3, Vec3) {
        (self.faces[edge.f1].normal, self.faces[edge.f2].normal)
    }

    pub(crate) fn update_pose(&mut self, pose: &Pose) {
        for (v, local) in self.vertices.iter_mut().zip(self.local_vertices.iter()) {
            *v = pose.transform(*local);
        }
        for face in self.faces.iter_mut() {
            face.normal = pose.rotate(face.local_normal);
            face.d = face.local_d - face.normal.dot(pose.p);
        }
        self.center = pose.transform(self.local_center);
    }

    // http://geometrictools.com/Documentation/PolyhedralMassProperties.pdf
    pub(crate) fn polyhedron_mass(&self, density: f32) -> MassInfo {
        let v = &self.local_vertices;
        let mut integrals = [0.0f32; 10];
        for face in &self.faces {
            let vi = &face.vertices;
            let p0 = v[vi[0]];
            for j in 1..vi.len() - 1 {
                let p1 = v[vi[j]];
                let p2 = v[vi[j + 1]];
                let n = (p1 - p0).cross(p2 - p0);

                let sub = |w0: f32, w1: f32, w2: f32| {
                    let t0 = w0 + w1;
                    let t1 = w0 * w0;
                    let t2 = t1 + w1 * t0;
                    let f1 = t0 + w2;
                    let f2 = t2 + w2 * f1;
                    let f3 = w0 * t1 + w1 * t2 + w2 * f2;
                    let g0 = f2 + w0 * (f1 + w0);
                    let g1 = f2 + w1 * (f1 + w1);
                    let g2 = f2 + w2 * (f1 + w2);
                    (f1, f2, f3, g0, g1, g2)
                };
                let (f1x, f2x, f3x, g0x, g1x, g2x) = sub(p0.x, p1.x, p2.x);
                let (_, f2y, f3y, g0y, g1y, g2y) = sub(p0.y, p1.y, p2.y);
                let (_, f2z, f3z, g0z, g1z, g2z) = sub(p0.z, p1.z, p2.z);

                integrals[0] += n.x * f1x;
                integrals[1] += n.x * f2x;
                integrals[2] += n.y * f2y;
                integrals[3] += n.z * f2z;
                integrals[4] += n.x * f3x;
                integrals[5] += n.y * f3y;
                integrals[6] += n.z * f3z;
                integrals[7] += n.x * (p0.y * g0x + p1.y * g1x + p2.y * g2x);
                integrals[8] += n.y * (p0.z * g0y + p1.z * g1y + p2.z * g2y);
                integrals[9] += n.z * (p0.x * g0z + p1.x * g1z + p2.x * g2z);
            }
        }

        let volume = integrals[0] / 6.0;
        if volume <= 1e-12 {
            return MassInfo {
                center: self.local_center,
                ..MassInfo::default()
            };
        }
        let first = Vec3::new(integrals[1], integrals[2], integrals[3]) / 24.0;
        let second = Vec3::new(integrals[4], integrals[5], integrals[6]) / 60.0;
        let (xy, yz, zx) = (
            integrals[7] / 120.0,
            integrals[8] / 120.0,
            integrals[9] / 120.0,
        );

        let c = first / volume;
        let ixx = second.y + second.z - volume * (c.y * c.y + c.z * c.z);
        let iyy = second.z + second.x - volume * (c.z * c.z + c.x * c.x);
        let izz = second.x + second.y - volume * (c.x * c.x + c.y * c.y);
        let ixy = -(xy - volume * c.x * c.y);
        let iyz = -(yz - volume * c.y * c.z);
        let izx = -(zx - volume * c.z * c.x);
        let inertia = Mat3::from_cols(
            Vec3::new(ixx, ixy, izx),
            Vec3::new(ixy, iyy, iyz),
            Vec3::new(izx, iyz, izz),
        ) * density;

        MassInfo {
            mass: volume * density,
            center: c,
            inertia,
        }
    }

    pub(crate) fn ray_cast(&self, ray: &Ray) -> Option<f32> {
        for face in &self.faces {
            let fpos = face.distance(ray.pos);
            let fdir = ray.dir.dot(face.normal);
            if fdir > -1e-4 || fpos < -1e-4 {
                continue;
            }
            let t = (-fpos / fdir).max(0.0);
            let pt = ray.at(t);
            let n = face.vertices.len();
            let inside = (0..n).all(|j| {
                let cur = self.vertices[face.vertices[j]];
                let next = self.vertices[face.vertices[(j + 1) % n]];
                (next - cur).cross(pt - cur).dot(face.normal) >= 0.0
            });
            if inside {
                return Some(t);
            }
        }
        None
    }
}

impl ShapeTrait for ShapeHull {
    fn update(&mut self, pose: &Pose) {
        self.update_pose(pose);
    }

    fn bounds(&self) -> Bounds {
        Bounds::from_points(&self.vertices)
    }

    fn mass_info(&self, density: f32) -> MassInfo {
        self.polyhedron_mass(density)
    }

    fn intersect(&self, ray: &Ray) -> Option<f32> {
        self.ray_cast(ray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Quat;

    fn tetra() -> ShapeHull {
        ShapeHull::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_tetra_structure() {
        let hull = tetra();
        assert_eq!(hull.edges.len(), 6);
        for face in &hull.faces {
            // every vertex lies on or behind every face
            for v in &hull.vertices {
                assert!(face.distance(*v) < 1e-5);
            }
        }
        let e = hull.edge(1, 0).unwrap();
        let edge = hull.edges[e];
        assert_eq!((edge.a, edge.b), (0, 1));
        assert_ne!(edge.f1, edge.f2);
    }

    #[test]
    fn test_tetra_mass() {
        let info = tetra().mass_info(2.0);
        assert!((info.mass - 2.0 / 6.0).abs() < 1e-5);
        assert!(info.center.abs_diff_eq(Vec3::splat(0.25), 1e-5));
        // inertia of the unit tetrahedron about its centroid
        let m = 2.0 / 6.0;
        let ixx = m * (2.0 * 0.1 - 2.0 * 0.0625);
        assert!((info.inertia.x_axis.x - ixx).abs() < 1e-4);
    }

    #[test]
    fn test_invalid_hulls() {
        let err = ShapeHull::new(vec![Vec3::ZERO; 3], vec![]);
        assert!(matches!(err, Err(PhysicsError::InvalidHull(_))));

        let err = ShapeHull::new(
            vec![Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::Z],
            vec![vec![0, 2, 1], vec![0, 1, 3], vec![0, 3, 2], vec![1, 2, 7]],
        );
        assert!(matches!(err, Err(PhysicsError::InvalidHull(_))));

        let err = ShapeHull::from_points(&[Vec3::ZERO, Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0)]);
        assert!(matches!(err, Err(PhysicsError::InvalidHull(_))));
    }

    #[test]
    fn test_update_moves_planes() {
        let mut hull = tetra();
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(0.5));
        hull.update(&pose);
        for face in &hull.faces {
            for v in &face.vertices {
                assert!(face.distance(hull.vertices[*v]).abs() < 1e-5);
            }
        }
        assert!(hull.center.abs_diff_eq(pose.transform(Vec3::splat(0.25)), 1e-5));
    }

    #[test]
    fn test_hull_ray() {
        let hull = ShapeHull::from_points(&[
            Vec3::new(-1.0, -1.0, -1.0),
            Vec3::new(1.0, -1.0, -1.0),
            Vec3::new(-1.0, 1.0, -1.0),
            Vec3::new(1.0, 1.0, -1.0),
            Vec3::new(-1.0, -1.0, 1.0),
            Vec3::new(1.0, -1.0, 1.0),
            Vec3::new(-1.0, 1.0, 1.0),
            Vec3::new(1.0, 1.0, 1.0),
        ])
        .unwrap();
        let t = hull.intersect(&Ray::new(Vec3::new(0.2, 0.3, 5.0), -Vec3::Z));
        assert!((t.unwrap() - 4.0).abs() < 1e-4);
        assert!(hull
            .intersect(&Ray::new(Vec3::new(3.0, 0.0, 5.0), -Vec3::Z))
            .is_none());
    }
}
