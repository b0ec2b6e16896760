use crate::{error::PhysicsError, shapes::ShapeHull};
use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

/// Point cloud of a hull as stored on disk.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct HullPoints {
    pub points: Vec<Vec3>,
}

impl HullPoints {
    pub fn build(&self) -> Result<ShapeHull, PhysicsError> {
        ShapeHull::from_points(&self.points)
    }
}

pub fn load_hull_points<P: AsRef<Path>>(path: P) -> Result<HullPoints, PhysicsError> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let points = serde_json::from_reader(reader)?;
    Ok(points)
}

pub fn save_hull_points<P: AsRef<Path>>(path: P, points: &HullPoints) -> Result<(), PhysicsError> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, points)?;
    Ok(())
}

/// Loads a hull from `path`, building and saving the fallback when the file is missing.
pub fn load_or_create_hull<P, F>(path: P, fallback: F) -> Result<ShapeHull, PhysicsError>
where
    P: AsRef<Path>,
    F: FnOnce() -> HullPoints,
{
    match load_hull_points(&path) {
        Ok(points) => points.build(),
        Err(PhysicsError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
            let points = fallback();
            save_hull_points(&path, &points)?;
            points.build()
        }
        Err(err) => Err(err),
    }
}

/// Eight-fold rotated profile around z, roughly 2 units tall.
pub fn diamond_points() -> HullPoints {
    let quat_half = Quat::from_rotation_z(2.0 * std::f32::consts::PI * 0.125 * 0.5);
    let profile = [
        Vec3::new(0.1, 0.0, -1.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.1),
        Vec3::new(0.4, 0.0, 0.4),
        quat_half * Vec3::new(0.8, 0.0, 0.3),
        quat_half * Vec3::new(1.0, 0.0, 0.0),
        quat_half * Vec3::new(1.0, 0.0, 0.1),
    ];

    let quat = Quat::from_rotation_z(2.0 * std::f32::consts::PI * 0.125);
    let mut points = Vec::with_capacity(profile.len() * 8);
    let mut quat_acc = Quat::IDENTITY;
    for _ in 0..8 {
        points.extend(profile.iter().map(|&pt| quat_acc * pt));
        quat_acc *= quat;
    }
    HullPoints { points }
}

pub fn tetrahedron_points(size: f32) -> HullPoints {
    HullPoints {
        points: vec![
            Vec3::new(size, size, size),
            Vec3::new(size, -size, -size),
            Vec3::new(-size, size, -size),
            Vec3::new(-size, -size, size),
        ],
    }
}

/// Regular prism along z with `sides` faces around it.
pub fn prism_points(sides: usize, radius: f32, half_height: f32) -> HullPoints {
    let sides = sides.max(3);
    let mut points = Vec::with_capacity(sides * 2);
    for i in 0..sides {
        let angle = i as f32 / sides as f32 * 2.0 * std::f32::consts::PI;
        let (sin, cos) = angle.sin_cos();
        points.push(Vec3::new(cos * radius, sin * radius, -half_height));
        points.push(Vec3::new(cos * radius, sin * radius, half_height));
    }
    HullPoints { points }
}

/// Random points on an ellipsoid with the given half extents.
pub fn random_points<R: Rng>(rng: &mut R, count: usize, half_size: Vec3) -> HullPoints {
    let points = (0..count.max(4))
        .map(|_| {
            let dir = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            let dir = if dir.length_squared() < 1e-4 {
                Vec3::Z
            } else {
                dir.normalize()
            };
            dir * half_size
        })
        .collect();
    HullPoints { points }
}
