//! Tunable simulation parameters
//!
//! Every field has a default, so a settings file only needs to name the values
//! it overrides.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use squish_physics::{PhysicsConfig, SoftMaterial};

use crate::error::SimError;

/// Top-level simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub gravity: Vec3,
    /// Internal physics step in seconds
    pub fixed_timestep: f32,
    /// Sub-steps allowed per frame before remaining time is dropped
    pub max_substeps: u32,
    /// Initial ball speed along the launch direction
    pub launch_speed: f32,
    /// Distance soft body nodes keep from colliders and from each other.
    /// Rigid shapes collide at their exact surface.
    pub margin: f32,
    pub ball: BallConfig,
    pub soft_body: SoftBodyTuning,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.8, 0.0),
            fixed_timestep: 1.0 / 60.0,
            max_substeps: 10,
            launch_speed: 14.0,
            margin: 0.05,
            ball: BallConfig::default(),
            soft_body: SoftBodyTuning::default(),
        }
    }
}

impl SimConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, SimError> {
        Ok(toml::from_str(source)?)
    }

    pub fn physics_config(&self) -> PhysicsConfig {
        PhysicsConfig {
            gravity: self.gravity,
            timestep: self.fixed_timestep,
        }
    }
}

/// Projectile launched from the camera
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallConfig {
    pub mass: f32,
    pub radius: f32,
    pub friction: f32,
    pub width_segments: u32,
    pub height_segments: u32,
    /// Packed `0xRRGGBB`
    pub color: u32,
}

impl Default for BallConfig {
    fn default() -> Self {
        Self {
            mass: 3.0,
            radius: 0.4,
            friction: 0.5,
            width_segments: 18,
            height_segments: 16,
            color: 0x202020,
        }
    }
}

/// Solver settings applied to every soft body at initialization
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftBodyTuning {
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub dynamic_friction: f32,
    pub damping: f32,
    pub linear_stiffness: f32,
    pub angular_stiffness: f32,
}

impl Default for SoftBodyTuning {
    fn default() -> Self {
        Self {
            velocity_iterations: 40,
            position_iterations: 40,
            dynamic_friction: 0.1,
            damping: 0.01,
            linear_stiffness: 0.9,
            angular_stiffness: 0.9,
        }
    }
}

impl SoftBodyTuning {
    pub fn material(&self) -> SoftMaterial {
        SoftMaterial {
            linear_stiffness: self.linear_stiffness,
            angular_stiffness: self.angular_stiffness,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = SimConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimConfig::default());
        assert_eq!(config.max_substeps, 10);
        assert_eq!(config.launch_speed, 14.0);
    }

    #[test]
    fn partial_toml_overrides() {
        let config = SimConfig::from_toml_str(
            r#"
            launch_speed = 20.0

            [ball]
            radius = 0.25

            [soft_body]
            velocity_iterations = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.launch_speed, 20.0);
        assert_eq!(config.ball.radius, 0.25);
        assert_eq!(config.ball.mass, 3.0);
        assert_eq!(config.soft_body.velocity_iterations, 10);
        assert_eq!(config.soft_body.position_iterations, 40);
    }

    #[test]
    fn malformed_toml_is_a_config_error() {
        let err = SimConfig::from_toml_str("max_substeps = \"many\"").unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn physics_config_follows_settings() {
        let config = SimConfig {
            gravity: Vec3::new(0.0, -1.0, 0.0),
            fixed_timestep: 0.01,
            ..SimConfig::default()
        };
        let physics = config.physics_config();
        assert_eq!(physics.gravity, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(physics.timestep, 0.01);
    }
}
