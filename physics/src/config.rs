use crate::error::PhysicsError;
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};

/// Rule used to merge a material property of two touching shapes.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    Average,
    Multiply,
    Minimum,
    Maximum,
}

impl Combine {
    pub fn apply(self, a: f32, b: f32) -> f32 {
        match self {
            Combine::Average => (a + b) * 0.5,
            Combine::Multiply => a * b,
            Combine::Minimum => a.min(b),
            Combine::Maximum => a.max(b),
        }
    }
}

impl Default for Combine {
    fn default() -> Self {
        Combine::Average
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Material {
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
    pub friction_combine: Combine,
    pub restitution_combine: Combine,
}

impl Default for Material {
    fn default() -> Self {
        Material {
            friction: 0.5,
            restitution: 0.0,
            density: 1.0,
            friction_combine: Combine::Average,
            restitution_combine: Combine::Average,
        }
    }
}

impl Material {
    pub fn with_restitution(self, restitution: f32) -> Self {
        Material {
            restitution,
            ..self
        }
    }

    pub fn with_friction(self, friction: f32) -> Self {
        Material { friction, ..self }
    }

    pub fn with_density(self, density: f32) -> Self {
        Material { density, ..self }
    }
}

/// How the world inverse inertia update treats angular motion.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InertiaMode {
    /// Keep angular velocity when the inertia tensor rotates.
    Velocity,
    /// Keep angular momentum instead. Less stable.
    AngularMomentum,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// velocity solver passes
    pub iterations: u32,
    /// position correction passes, zero switches contacts to Baumgarte bias
    pub position_iterations: u32,
    /// fixed step in seconds
    pub step: f32,
    pub gravity: Vec3,
    /// collision slop
    pub delta: f32,
    /// seconds a body has to stay still before sleeping
    pub sleep_time: f32,
    pub sleep_threshold: f32,
    pub sleep_wake_threshold: f32,
    pub inertia_mode: InertiaMode,
    pub broadphase_margin: f32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            iterations: 8,
            position_iterations: 2,
            step: 1.0 / 60.0,
            gravity: Vec3::new(0.0, 0.0, -10.0),
            delta: 0.01,
            sleep_time: 0.5,
            sleep_threshold: 0.08,
            sleep_wake_threshold: 0.15,
            inertia_mode: InertiaMode::Velocity,
            broadphase_margin: 0.1,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), PhysicsError> {
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "step must be positive, got {}",
                self.step
            )));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig(format!(
                "gravity must be finite, got {}",
                self.gravity
            )));
        }
        let non_negative = [
            ("delta", self.delta),
            ("sleep_time", self.sleep_time),
            ("sleep_threshold", self.sleep_threshold),
            ("sleep_wake_threshold", self.sleep_wake_threshold),
            ("broadphase_margin", self.broadphase_margin),
        ];
        for (name, value) in non_negative.iter() {
            if !(value.is_finite() && *value >= 0.0) {
                return Err(PhysicsError::InvalidConfig(format!(
                    "{} must be non-negative, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Config, PhysicsError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, PhysicsError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
