// src/gfx/lights/manager.rs
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use cgmath::Matrix4;
use log::{debug, warn};

use crate::config::{EngineConfig, MAX_SCENE_LIGHTS, SCENE_LIGHTS};
use crate::error::{GfxError, Result};
use crate::gfx::resources::{ResourceManager, StructResource};

use super::light::{Light, LightData, SceneLightsBlock};

/// Something in the scene that emits a light
pub trait LightSource {
    /// The light in local space
    fn light(&self) -> Light;
    /// Local-to-world matrix of the emitter
    fn world_transform(&self) -> Matrix4<f32>;
}

/// Packs the registered lights into the `SceneLights` block once per frame
///
/// Sources are observed weakly: registration grants the manager visit rights
/// without extending the lifetime of the light.
pub struct LightManager {
    sources: Vec<Weak<dyn LightSource>>,
    mirror: Rc<RefCell<SceneLightsBlock>>,
    resource: StructResource<SceneLightsBlock>,
    capacity_warned: bool,
}

impl LightManager {
    pub fn new(resources: &Rc<ResourceManager>, config: &EngineConfig) -> Result<Self> {
        let resource = StructResource::new(resources, SCENE_LIGHTS, config.scene_lights)?;
        let mirror = Rc::new(RefCell::new(SceneLightsBlock::default()));
        let source = Rc::clone(&mirror);
        resource.set_full_provider(move || *source.borrow());
        Ok(Self {
            sources: Vec::new(),
            mirror,
            resource,
            capacity_warned: false,
        })
    }

    /// Adds `source`; registering the same source twice is a no-op
    pub fn register(&mut self, source: &Rc<dyn LightSource>) -> bool {
        let weak = Rc::downgrade(source);
        if self.sources.iter().any(|s| s.ptr_eq(&weak)) {
            return false;
        }
        self.sources.push(weak);
        debug!("registered light source ({} total)", self.sources.len());
        true
    }

    pub fn unregister(&mut self, source: &Rc<dyn LightSource>) -> bool {
        let weak = Rc::downgrade(source);
        let before = self.sources.len();
        self.sources.retain(|s| !s.ptr_eq(&weak));
        self.sources.len() != before
    }

    /// Rebuilds the CPU mirror from the registered lights and uploads it
    ///
    /// Lights past `MAX_SCENE_LIGHTS` are skipped with a one-time warning.
    /// Returns the number of active lights.
    pub fn apply(&mut self, resources: &ResourceManager) -> usize {
        self.sources.retain(|s| s.strong_count() > 0);

        let count = {
            let mut block = self.mirror.borrow_mut();
            block.clear();
            let mut count = 0;
            for source in self.sources.iter().filter_map(Weak::upgrade) {
                if count == MAX_SCENE_LIGHTS {
                    if !self.capacity_warned {
                        warn!(
                            "{}",
                            GfxError::LightCapacityExceeded {
                                capacity: MAX_SCENE_LIGHTS
                            }
                        );
                        self.capacity_warned = true;
                    }
                    break;
                }
                block.lights[count] = LightData::pack(&source.light(), source.world_transform());
                count += 1;
            }
            block.active_count = count as i32;
            count
        };

        resources.apply_on_demand(SCENE_LIGHTS);
        count
    }

    pub fn active_count(&self) -> usize {
        self.mirror.borrow().active_count as usize
    }

    /// Copy of the CPU mirror as last packed
    pub fn block(&self) -> SceneLightsBlock {
        *self.mirror.borrow()
    }

    pub fn resource(&self) -> &StructResource<SceneLightsBlock> {
        &self.resource
    }

    /// Registered sources that are still alive
    pub fn len(&self) -> usize {
        self.sources.iter().filter(|s| s.strong_count() > 0).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for LightManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LightManager")
            .field("sources", &self.len())
            .field("active_count", &self.active_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GpuContext, HeadlessApi};
    use crate::gfx::lights::{LightColors, LightType};
    use cgmath::{SquareMatrix, Vector3};

    struct Fixed(Light, Matrix4<f32>);

    impl LightSource for Fixed {
        fn light(&self) -> Light {
            self.0
        }

        fn world_transform(&self) -> Matrix4<f32> {
            self.1
        }
    }

    fn directional() -> Rc<dyn LightSource> {
        Rc::new(Fixed(
            Light::Directional {
                colors: LightColors::white(),
                direction: Vector3::new(0.0, -1.0, 0.0),
            },
            Matrix4::identity(),
        ))
    }

    fn setup() -> (HeadlessApi, Rc<ResourceManager>, LightManager) {
        let _ = env_logger::builder().is_test(true).try_init();
        let api = HeadlessApi::new();
        let resources = ResourceManager::new(&GpuContext::new(api.clone()));
        let lights = LightManager::new(&resources, &EngineConfig::default()).unwrap();
        (api, resources, lights)
    }

    #[test]
    fn test_duplicate_registration_is_ignored() {
        let (_api, _resources, mut lights) = setup();
        let light = directional();
        assert!(lights.register(&light));
        assert!(!lights.register(&light));
        assert_eq!(lights.len(), 1);
        assert!(lights.unregister(&light));
        assert!(lights.is_empty());
    }

    #[test]
    fn test_apply_uploads_mirror() {
        let (api, resources, mut lights) = setup();
        let light = directional();
        lights.register(&light);

        assert_eq!(lights.apply(&resources), 1);
        let uploaded: SceneLightsBlock =
            bytemuck::pod_read_unaligned(&api.buffer_contents(lights.resource().buffer()).unwrap());
        assert_eq!(uploaded, lights.block());
        assert_eq!(uploaded.active_count, 1);
        assert_eq!(uploaded.lights[0].light_type, LightType::Directional as i32);
    }

    #[test]
    fn test_capacity_is_enforced() {
        let (_api, resources, mut lights) = setup();
        let sources: Vec<_> = (0..MAX_SCENE_LIGHTS + 3).map(|_| directional()).collect();
        for source in &sources {
            lights.register(source);
        }
        assert_eq!(lights.apply(&resources), MAX_SCENE_LIGHTS);
        assert_eq!(lights.apply(&resources), MAX_SCENE_LIGHTS);
        assert!(lights.capacity_warned);
    }

    #[test]
    fn test_dropped_sources_are_skipped() {
        let (_api, resources, mut lights) = setup();
        let kept = directional();
        let dropped = directional();
        lights.register(&dropped);
        lights.register(&kept);
        drop(dropped);

        assert_eq!(lights.apply(&resources), 1);
        assert_eq!(lights.block().lights[1].light_type, LightType::Inactive as i32);
    }
}
