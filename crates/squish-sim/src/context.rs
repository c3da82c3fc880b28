use squish_core::FrameTime;
use squish_physics::PhysicsWorld;
use squish_render::Scene;

use crate::error::SimError;

/// Singletons shared by every system, owned by the frame driver.
pub struct SimContext {
    /// Created by the simulation system's `init`
    pub physics: Option<PhysicsWorld>,
    pub scene: Option<Scene>,
    pub frame: FrameTime,
}

impl SimContext {
    pub fn new(scene: Scene) -> Self {
        Self {
            physics: None,
            scene: Some(scene),
            frame: FrameTime::default(),
        }
    }

    pub fn physics(&self) -> Result<&PhysicsWorld, SimError> {
        self.physics.as_ref().ok_or(SimError::MissingSingleton("PhysicsWorld"))
    }

    pub fn physics_mut(&mut self) -> Result<&mut PhysicsWorld, SimError> {
        self.physics.as_mut().ok_or(SimError::MissingSingleton("PhysicsWorld"))
    }

    pub fn scene(&self) -> Result<&Scene, SimError> {
        self.scene.as_ref().ok_or(SimError::MissingSingleton("Scene"))
    }

    /// Both singletons at once, for initializers that touch physics and render.
    pub fn physics_and_scene(&mut self) -> Result<(&mut PhysicsWorld, &mut Scene), SimError> {
        match (self.physics.as_mut(), self.scene.as_mut()) {
            (Some(physics), Some(scene)) => Ok((physics, scene)),
            (None, _) => Err(SimError::MissingSingleton("PhysicsWorld")),
            (_, None) => Err(SimError::MissingSingleton("Scene")),
        }
    }
}

impl Default for SimContext {
    fn default() -> Self {
        Self::new(Scene::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_physics_is_reported() {
        let mut ctx = SimContext::default();
        assert!(matches!(ctx.physics_mut(), Err(SimError::MissingSingleton("PhysicsWorld"))));
        assert!(matches!(ctx.physics_and_scene(), Err(SimError::MissingSingleton("PhysicsWorld"))));

        ctx.physics = Some(PhysicsWorld::new());
        assert!(ctx.physics_and_scene().is_ok());

        ctx.scene = None;
        assert!(matches!(ctx.physics_and_scene(), Err(SimError::MissingSingleton("Scene"))));
        assert!(matches!(ctx.scene(), Err(SimError::MissingSingleton("Scene"))));
    }
}
