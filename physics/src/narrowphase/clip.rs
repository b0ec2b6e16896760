use crate::shapes::ShapeHull;
use glam::Vec3;

const MAX_POINTS: usize = 4;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ClipPoint {
    /// Projected onto the reference face.
    pub position: Vec3,
    pub penetration: f32,
    pub id: u32,
}

/// Clips the incident face polygon against the side planes of the reference face and keeps the
/// points within `delta` of the reference plane. Each point id is derived from `id` and the
/// vertices and edges it came from, so the same point gets the same id on the next frame.
/// At most four points are returned.
pub fn clip_face(
    reference: &ShapeHull,
    ref_face: usize,
    incident: &ShapeHull,
    inc_face: usize,
    id: u32,
    delta: f32,
) -> Vec<ClipPoint> {
    let plane = &reference.faces[ref_face];
    let ref_indices = &plane.vertices;
    let inc_indices = &incident.faces[inc_face].vertices;

    let mut points: Vec<(Vec3, u32)> = inc_indices
        .iter()
        .enumerate()
        .map(|(i, &vi)| (incident.vertices[vi], id.wrapping_add(i as u32)))
        .collect();
    let mut next = Vec::with_capacity(points.len() * 2);

    let n = ref_indices.len();
    for ei in 0..n {
        if points.is_empty() {
            break;
        }
        let va = ref_indices[ei];
        let vb = ref_indices[(ei + 1) % n];
        let edge_id = (va as u32)
            .wrapping_add((vb as u32).wrapping_mul(2351))
            .wrapping_mul(3221);
        // side plane through the edge, facing into the face
        let normal = plane
            .normal
            .cross(reference.vertices[vb] - reference.vertices[va]);
        let offset = normal.dot(reference.vertices[va]) - delta;

        next.clear();
        let (mut prev_pos, mut prev_id) = points[points.len() - 1];
        let mut prev_dist = normal.dot(prev_pos) - offset;
        for &(pos, pid) in points.iter() {
            let dist = normal.dot(pos) - offset;
            if prev_dist * dist < 0.0 {
                let crossing = if (prev_dist - dist).abs() > 1e-4 {
                    prev_pos.lerp(pos, prev_dist / (prev_dist - dist))
                } else {
                    prev_pos
                };
                let crossing_id = prev_id
                    .wrapping_add(pid.wrapping_mul(1877))
                    .wrapping_add(edge_id);
                next.push((crossing, crossing_id));
            }
            if dist >= 0.0 {
                next.push((pos, pid));
            }
            prev_pos = pos;
            prev_id = pid;
            prev_dist = dist;
        }
        std::mem::swap(&mut points, &mut next);
    }

    let mut result: Vec<ClipPoint> = points
        .iter()
        .filter_map(|&(pos, pid)| {
            let dist = plane.distance(pos);
            if dist < delta {
                Some(ClipPoint {
                    position: pos - plane.normal * dist,
                    penetration: -dist,
                    id: pid,
                })
            } else {
                None
            }
        })
        .collect();

    if result.len() > MAX_POINTS {
        result = reduce(result, plane.normal);
    }
    result
}

fn take_max_by<F: Fn(&ClipPoint) -> f32>(points: &mut Vec<ClipPoint>, key: F) -> ClipPoint {
    let mut best = 0;
    let mut best_value = key(&points[0]);
    for (i, point) in points.iter().enumerate().skip(1) {
        let value = key(point);
        if value > best_value {
            best = i;
            best_value = value;
        }
    }
    points.swap_remove(best)
}

// Keeps an extreme point, the point furthest from it and the two extremes on either side of the
// line through both.
fn reduce(mut points: Vec<ClipPoint>, normal: Vec3) -> Vec<ClipPoint> {
    let dir = Vec3::new(1.0, 2.0, 3.0);
    let first = take_max_by(&mut points, |p| p.position.dot(dir));
    let second = take_max_by(&mut points, |p| p.position.distance_squared(first.position));
    let side = normal.cross(second.position - first.position);

    let mut result = vec![first, second];
    let (mut max, mut min) = (0, 0);
    for (i, p) in points.iter().enumerate().skip(1) {
        let value = side.dot(p.position);
        if value > side.dot(points[max].position) {
            max = i;
        }
        if value < side.dot(points[min].position) {
            min = i;
        }
    }
    result.push(points[max]);
    if min != max {
        result.push(points[min]);
    }
    result
}
