use crate::{
    body::{Body, BodyHandle},
    config::{Config, Material},
    constraints::ConstraintPoint,
    error::PhysicsError,
    scene_shapes::{diamond_points, prism_points, random_points, tetrahedron_points},
    shapes::{Shape, ShapeBox},
    world::World,
};
use glam::{Quat, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use std::{fmt, str::FromStr};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SceneKind {
    Stack,
    Newton,
    Dominoes,
    Wall,
    Billiard,
    HullRain,
}

impl SceneKind {
    pub const ALL: [SceneKind; 6] = [
        SceneKind::Stack,
        SceneKind::Newton,
        SceneKind::Dominoes,
        SceneKind::Wall,
        SceneKind::Billiard,
        SceneKind::HullRain,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Stack => "stack",
            SceneKind::Newton => "newton",
            SceneKind::Dominoes => "dominoes",
            SceneKind::Wall => "wall",
            SceneKind::Billiard => "billiard",
            SceneKind::HullRain => "hulls",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SceneKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<_> = SceneKind::ALL.iter().map(|kind| kind.name()).collect();
                PhysicsError::InvalidConfig(format!(
                    "unknown scene '{}', expected one of {}",
                    s,
                    names.join(", ")
                ))
            })
    }
}

/// A world with a static ground body and one of the demo setups.
pub struct PhysicsScene {
    pub world: World,
    pub ground: BodyHandle,
    kind: SceneKind,
    config: Config,
    time: f32,
}

impl PhysicsScene {
    pub fn new(kind: SceneKind, config: Config) -> Result<Self, PhysicsError> {
        config.validate()?;
        let mut world = World::new(config.clone());
        let ground = world.add_body(Body::new_static());
        let mut scene = PhysicsScene {
            world,
            ground,
            kind,
            config,
            time: 0.0,
        };
        scene.build()?;
        log::info!(
            "scene {}: {} bodies, {} shapes, {} constraints",
            kind,
            scene.world.bodies().len(),
            scene.world.shapes().len(),
            scene.world.constraints().len()
        );
        Ok(scene)
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    pub fn reset(&mut self) -> Result<(), PhysicsError> {
        *self = Self::new(self.kind, self.config.clone())?;
        Ok(())
    }

    /// Advances the scene clock by `dt` and runs one world update.
    ///
    /// The world receives the accumulated clock, not `dt`. It only records it, every update
    /// steps by `Config::step` whatever the frame length.
    pub fn update(&mut self, dt: f32) {
        self.time += dt;
        self.world.update(self.time);
    }

    fn build(&mut self) -> Result<(), PhysicsError> {
        match self.kind {
            SceneKind::Stack => self.build_stack(),
            SceneKind::Newton => self.build_newton(),
            SceneKind::Dominoes => self.build_dominoes(),
            SceneKind::Wall => self.build_wall(),
            SceneKind::Billiard => self.build_billiard(),
            SceneKind::HullRain => self.build_hull_rain(),
        }
    }

    fn add_ground_plane(&mut self) {
        self.world
            .add_shape(self.ground, Shape::make_plane(Vec3::Z, 0.0));
    }

    fn add_body_with(&mut self, position: Vec3, shape: Shape) -> BodyHandle {
        let body = self.world.add_body(Body::from_translation(position));
        self.world.add_shape(body, shape);
        body
    }

    fn build_stack(&mut self) -> Result<(), PhysicsError> {
        const STACK_HEIGHT: usize = 2;
        const BOX_SIZE: f32 = 0.5;

        self.add_ground_plane();
        let delta = self.config.delta;
        for i in 0..STACK_HEIGHT {
            let corner = Vec3::new(
                -BOX_SIZE / 2.0,
                -BOX_SIZE / 2.0,
                (BOX_SIZE + delta) * i as f32,
            );
            let shape = ShapeBox::from_corner(Vec3::ZERO, Vec3::splat(BOX_SIZE))?;
            self.add_body_with(corner, Shape::make_box(shape));
        }
        Ok(())
    }

    fn build_newton(&mut self) -> Result<(), PhysicsError> {
        const NUM_BALLS: usize = 6;
        const NUM_PULL: usize = 2;
        const RADIUS: f32 = 1.0;
        const STRING_LENGTH: f32 = 5.0;
        const FRAME_WIDTH: f32 = 6.0;
        const PULL_ANGLE: f32 = 1.0;

        let width = (NUM_BALLS + 2) as f32 * RADIUS * 2.0;
        let height = 2.0 * RADIUS + STRING_LENGTH;
        let fx = [-width / 2.0 + RADIUS * 0.5, width / 2.0 - RADIUS * 0.5];
        let fy = [
            -FRAME_WIDTH / 2.0 + RADIUS * 0.5,
            FRAME_WIDTH / 2.0 - RADIUS * 0.5,
        ];

        self.add_ground_plane();
        let base = ShapeBox::from_corner(
            Vec3::new(-width / 2.0, -FRAME_WIDTH / 2.0, 0.0),
            Vec3::new(width, FRAME_WIDTH, RADIUS * 0.5),
        )?;
        self.world.add_shape(self.ground, Shape::make_box(base));
        for &y in fy.iter() {
            for &x in fx.iter() {
                self.world.add_shape(
                    self.ground,
                    Shape::make_capsule(Vec3::new(x, y, 0.0), Vec3::new(x, y, height), RADIUS * 0.2),
                );
            }
            self.world.add_shape(
                self.ground,
                Shape::make_capsule(
                    Vec3::new(fx[0], y, height),
                    Vec3::new(fx[1], y, height),
                    RADIUS * 0.2,
                ),
            );
        }

        let material = Material::default().with_restitution(1.0);
        for i in 0..NUM_BALLS {
            let x = -width / 2.0 + RADIUS * 3.0 + i as f32 * RADIUS * 2.0;
            let position = if i < NUM_PULL {
                Vec3::new(
                    x - STRING_LENGTH * PULL_ANGLE.sin(),
                    0.0,
                    RADIUS * 2.0 + STRING_LENGTH * (1.0 - PULL_ANGLE.cos()),
                )
            } else {
                Vec3::new(x, 0.0, RADIUS * 2.0)
            };
            let ball = self.add_body_with(
                position,
                Shape::make_sphere(Vec3::ZERO, RADIUS).with_material(material),
            );
            for &y in fy.iter() {
                let length = (STRING_LENGTH * STRING_LENGTH + y * y).sqrt();
                self.world.add_constraint(Box::new(
                    ConstraintPoint::new(ball, self.ground, Vec3::ZERO, Vec3::new(x, y, height))
                        .with_distance(0.0, Some(length)),
                ));
            }
        }
        Ok(())
    }

    fn build_dominoes(&mut self) -> Result<(), PhysicsError> {
        const R0: f32 = 1.0;
        const RT: f32 = 0.2;
        const BOX_WIDTH: f32 = 0.5;
        const BOX_DEPTH: f32 = 0.2;
        const BOX_HEIGHT: f32 = 1.0;
        const BOX_DIST: f32 = 0.6;
        const NUM_BOXES: usize = 500;
        const BOX_IMPULSE: f32 = 10.0;

        // points on an Archimedean spiral
        let spiral_pos = |t: f32| {
            let r = R0 + RT * t;
            Vec3::new(t.cos() * r, t.sin() * r, 0.0)
        };
        let spiral_dir = |t: f32| {
            let r = R0 + RT * t;
            let (s, c) = t.sin_cos();
            Vec3::new(-s * r + RT * c, c * r + RT * s, 0.0)
        };
        let next_t = |pos: Vec3, t: f32| {
            let r = R0 + RT * t;
            let (mut t0, mut t1) = (t, t + BOX_DIST / r);
            while r * (t1 - t0) > 0.01 {
                let tm = (t0 + t1) / 2.0;
                if pos.distance(spiral_pos(tm)) > BOX_DIST {
                    t1 = tm;
                } else {
                    t0 = tm;
                }
            }
            (t0 + t1) / 2.0
        };

        self.add_ground_plane();
        let top = Vec3::new(0.0, 0.0, BOX_HEIGHT / 2.0);
        let mut t = 0.0;
        let mut pos = spiral_pos(t);
        for i in 0..NUM_BOXES {
            if i > 0 {
                t = next_t(pos, t);
                pos = spiral_pos(t);
            }
            let dir = spiral_dir(t).normalize();
            let right = dir.cross(top).normalize() * (BOX_WIDTH / 2.0);
            let fwd = dir * (BOX_DEPTH / 2.0);
            let shape = ShapeBox::oriented(Vec3::ZERO, fwd, right, top)?;
            let body = self.add_body_with(
                Vec3::new(pos.x, pos.y, BOX_HEIGHT / 2.0),
                Shape::make_box(shape),
            );
            if i == 0 {
                let at = Vec3::new(pos.x - fwd.x, pos.y - fwd.y, BOX_HEIGHT);
                self.world
                    .body_mut(body)
                    .add_impulse_at(dir * BOX_IMPULSE, at);
            }
        }
        Ok(())
    }

    fn build_wall(&mut self) -> Result<(), PhysicsError> {
        const ROWS: usize = 12;
        const COLS: usize = 16;
        const BOX_WIDTH: f32 = 1.0;
        const BOX_HEIGHT: f32 = 0.4;
        const BOX_DEPTH: f32 = 0.6;
        const BALL_RADIUS: f32 = 2.0;
        const BALL_SPEED: f32 = 10.0;
        const BALL_DENSITY: f32 = 2.0;

        self.add_ground_plane();
        let gap = self.config.delta / 2.0;
        let ew = BOX_WIDTH + gap;
        let eh = BOX_HEIGHT + gap;
        let width = ew * COLS as f32 - gap;

        for i in 0..ROWS {
            let count = COLS + i % 2;
            let start = if i % 2 == 1 { -ew / 2.0 } else { 0.0 };
            for j in 0..count {
                let x0 = (start + j as f32 * ew).max(-gap);
                let x1 = (start + j as f32 * ew + BOX_WIDTH).min(width + gap);
                let mut body = Body::from_translation(Vec3::new(
                    x0 - width / 2.0,
                    -BOX_DEPTH / 2.0,
                    gap + eh * i as f32,
                ));
                // pin the ends of every row
                let pinned = (j as f32) < count as f32 / 4.0 || (j as f32) > count as f32 * 3.0 / 4.0;
                if pinned {
                    body.set_moves(false, false);
                }
                let handle = self.world.add_body(body);
                let shape =
                    ShapeBox::from_corner(Vec3::ZERO, Vec3::new(x1 - x0, BOX_DEPTH, BOX_HEIGHT))?;
                self.world.add_shape(handle, Shape::make_box(shape));
            }
        }

        let ball = self.add_body_with(
            Vec3::new(-6.0, 8.0, BALL_RADIUS),
            Shape::make_sphere(Vec3::ZERO, BALL_RADIUS)
                .with_material(Material::default().with_density(BALL_DENSITY)),
        );
        self.world.body_mut(ball).velocity =
            Vec3::new(3.0 / 5.0 * BALL_SPEED, -4.0 / 5.0 * BALL_SPEED, 0.0);
        Ok(())
    }

    fn build_billiard(&mut self) -> Result<(), PhysicsError> {
        const RADIUS: f32 = 0.4;

        self.add_ground_plane();
        let add_ball = |scene: &mut Self, x: f32, y: f32| {
            scene.add_body_with(
                Vec3::new(x, y, RADIUS),
                Shape::make_sphere(Vec3::ZERO, RADIUS),
            )
        };
        add_ball(self, -RADIUS, 0.0);
        add_ball(self, RADIUS, 0.0);
        let cue = add_ball(self, 0.0, 10.0);
        self.world.body_mut(cue).velocity = Vec3::new(0.0, -5.0, 0.0);
        Ok(())
    }

    fn build_hull_rain(&mut self) -> Result<(), PhysicsError> {
        const COUNT: usize = 40;
        const SEED: u64 = 0x5eed;

        self.add_ground_plane();
        let mut rng = Pcg32::seed_from_u64(SEED);
        for i in 0..COUNT {
            let position = Vec3::new(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                2.0 + i as f32 * 0.75,
            );
            let shape = match rng.gen_range(0..6) {
                0 => Shape::make_hull(diamond_points().build()?),
                1 => Shape::make_hull(tetrahedron_points(0.4).build()?),
                2 => Shape::make_hull(prism_points(rng.gen_range(3..8), 0.4, 0.3).build()?),
                3 => Shape::make_box(ShapeBox::new(Vec3::new(
                    rng.gen_range(0.2..0.6),
                    rng.gen_range(0.2..0.6),
                    rng.gen_range(0.2..0.6),
                ))?),
                4 => Shape::make_capsule(
                    Vec3::new(-0.4, 0.0, 0.0),
                    Vec3::new(0.4, 0.0, 0.0),
                    rng.gen_range(0.15..0.35),
                ),
                _ => Shape::make_hull(
                    random_points(&mut rng, 16, Vec3::new(0.5, 0.4, 0.3)).build()?,
                ),
            };
            let body = self.add_body_with(position, shape);
            let axis = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if axis.length_squared() > 1e-3 {
                let orientation = Quat::from_axis_angle(axis.normalize(), rng.gen_range(0.0..3.0));
                self.world.set_orientation(body, orientation);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scene_names() {
        assert_eq!("stack".parse::<SceneKind>().unwrap(), SceneKind::Stack);
        assert_eq!("Newton".parse::<SceneKind>().unwrap(), SceneKind::Newton);
        assert_eq!("hulls".parse::<SceneKind>().unwrap(), SceneKind::HullRain);
        assert!("pinball".parse::<SceneKind>().is_err());
    }

    #[test]
    fn test_every_scene_builds_and_steps() {
        for &kind in SceneKind::ALL.iter() {
            let mut scene = PhysicsScene::new(kind, Config::default()).unwrap();
            for _ in 0..3 {
                scene.update(1.0 / 60.0);
            }
            scene.world.flush();
            for (_, body) in scene.world.bodies().iter() {
                assert!(body.position.is_finite(), "{} produced a bad body", kind);
            }
        }
    }

    #[test]
    fn test_newton_balls_hang_from_two_strings() {
        let scene = PhysicsScene::new(SceneKind::Newton, Config::default()).unwrap();
        assert_eq!(scene.world.constraints().len(), 12);
        // plane, base and six frame capsules
        assert_eq!(scene.world.body(scene.ground).shapes().len(), 8);
    }

    #[test]
    fn test_world_sees_accumulated_clock() {
        let mut scene = PhysicsScene::new(SceneKind::Stack, Config::default()).unwrap();
        scene.update(0.02);
        assert!((scene.world.time() - 0.02).abs() < 1e-6);
        scene.update(0.03);
        assert!((scene.world.time() - 0.05).abs() < 1e-6);
        assert_eq!(scene.world.frame(), 2);
    }

    #[test]
    fn test_reset_rebuilds() {
        let mut scene = PhysicsScene::new(SceneKind::Billiard, Config::default()).unwrap();
        for _ in 0..10 {
            scene.update(1.0 / 60.0);
        }
        scene.reset().unwrap();
        assert_eq!(scene.world.frame(), 0);
        assert_eq!(scene.world.bodies().len(), 4);
    }
}
