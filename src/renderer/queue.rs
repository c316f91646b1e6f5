// renderer/queue.rs
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use glam::Mat4;

use crate::asset::{AssetCache, Handle, Mesh};
use crate::renderer::material::{Material, RenderPath};
use crate::scene::{Camera, Light, LocalToWorld, Renderable};

/// material -> mesh -> model matrices of every instance drawn with that pair.
pub type MeshBucket = HashMap<Handle<Material>, HashMap<Handle<Mesh>, Vec<Mat4>>>;

#[derive(Clone, Copy, Debug)]
pub struct CameraSubmission {
    pub transform: LocalToWorld,
    pub camera: Camera,
    sequence: u64,
}

// Min-heap order on (depth, submission sequence) so `BinaryHeap::pop`
// yields the lowest depth first and ties keep submission order.
impl Ord for CameraSubmission {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .camera
            .depth
            .cmp(&self.camera.depth)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for CameraSubmission {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for CameraSubmission {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CameraSubmission {}

#[derive(Clone, Copy, Debug)]
pub struct LightSubmission {
    pub transform: LocalToWorld,
    pub light: Light,
}

/// Per-frame transient input of the renderer. Filled by the render systems,
/// drained by `Renderer::render`, empty again once the frame is over.
#[derive(Default)]
pub struct SubmissionQueue {
    cameras: BinaryHeap<CameraSubmission>,
    lights: Vec<LightSubmission>,
    deferred: MeshBucket,
    forward: MeshBucket,
    transparent: MeshBucket,
    sequence: u64,
    dropped_lights: usize,
}

impl SubmissionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit_camera(&mut self, transform: &LocalToWorld, camera: &Camera) {
        self.cameras.push(CameraSubmission {
            transform: *transform,
            camera: *camera,
            sequence: self.sequence,
        });
        self.sequence += 1;
    }

    pub fn submit_light(&mut self, transform: &LocalToWorld, light: &Light) {
        self.lights.push(LightSubmission {
            transform: *transform,
            light: *light,
        });
    }

    /// Silently ignores renderables with a missing mesh or material.
    pub fn submit_mesh(
        &mut self,
        transform: &LocalToWorld,
        renderable: &Renderable,
        materials: &AssetCache<Material>,
    ) {
        let (Some(mesh), Some(material)) = (renderable.mesh, renderable.material) else {
            return;
        };
        let Some(path) = materials.get(material).map(|m| m.render_path) else {
            log::debug!("Skipping submission with unknown {:?}", material);
            return;
        };

        self.bucket_mut(path)
            .entry(material)
            .or_default()
            .entry(mesh)
            .or_default()
            .push(transform.matrix);
    }

    /// Next camera in ascending depth order.
    pub fn pop_camera(&mut self) -> Option<CameraSubmission> {
        self.cameras.pop()
    }

    /// Cameras in the order `pop_camera` would return them, without draining.
    pub fn cameras_in_order(&self) -> Vec<CameraSubmission> {
        let mut cameras = self.cameras.clone().into_sorted_vec();
        cameras.reverse();
        cameras
    }

    pub fn camera_count(&self) -> usize {
        self.cameras.len()
    }

    pub fn lights(&self) -> &[LightSubmission] {
        &self.lights
    }

    /// Drops every light past `max`, in submission order, and returns what
    /// is left. Logs once each time the number of dropped lights changes.
    pub fn lights_capped(&mut self, max: usize) -> &[LightSubmission] {
        let dropped = self.lights.len().saturating_sub(max);
        if dropped != self.dropped_lights {
            if dropped > 0 {
                log::warn!(
                    "{} lights submitted, only the first {} are rendered",
                    self.lights.len(),
                    max
                );
            }
            self.dropped_lights = dropped;
        }
        self.lights.truncate(max);
        &self.lights
    }

    pub fn bucket(&self, path: RenderPath) -> &MeshBucket {
        match path {
            RenderPath::Deferred => &self.deferred,
            RenderPath::Forward => &self.forward,
            RenderPath::Transparent => &self.transparent,
        }
    }

    fn bucket_mut(&mut self, path: RenderPath) -> &mut MeshBucket {
        match path {
            RenderPath::Deferred => &mut self.deferred,
            RenderPath::Forward => &mut self.forward,
            RenderPath::Transparent => &mut self.transparent,
        }
    }

    /// Number of instances queued for `path`.
    pub fn instance_count(&self, path: RenderPath) -> usize {
        self.bucket(path)
            .values()
            .flat_map(|meshes| meshes.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
            && self.lights.is_empty()
            && self.deferred.is_empty()
            && self.forward.is_empty()
            && self.transparent.is_empty()
    }

    pub fn clear(&mut self) {
        self.cameras.clear();
        self.lights.clear();
        self.deferred.clear();
        self.forward.clear();
        self.transparent.clear();
        self.sequence = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn materials() -> (AssetCache<Material>, [Handle<Material>; 3]) {
        let mut cache = AssetCache::new();
        let deferred = cache.insert(Material::new(RenderPath::Deferred));
        let forward = cache.insert(Material::new(RenderPath::Forward));
        let transparent = cache.insert(Material::new(RenderPath::Transparent));
        (cache, [deferred, forward, transparent])
    }

    fn at(x: f32) -> LocalToWorld {
        LocalToWorld::from_parts(Mat4::from_translation(Vec3::new(x, 0.0, 0.0)), Default::default())
    }

    #[test]
    fn cameras_pop_in_ascending_depth_with_stable_ties() {
        let mut queue = SubmissionQueue::new();
        for (depth, x) in [(2u8, 0.0), (0, 1.0), (2, 2.0), (1, 3.0)] {
            let camera = Camera {
                depth,
                ..Camera::default()
            };
            queue.submit_camera(&at(x), &camera);
        }

        let order: Vec<(u8, f32)> = std::iter::from_fn(|| queue.pop_camera())
            .map(|c| (c.camera.depth, c.transform.position.x))
            .collect();
        assert_eq!(order, vec![(0, 1.0), (1, 3.0), (2, 0.0), (2, 2.0)]);
    }

    #[test]
    fn meshes_bucket_by_render_path_and_pair() {
        let (cache, [deferred, forward, transparent]) = materials();
        let mesh_a = Handle::<Mesh>::new(0);
        let mesh_b = Handle::<Mesh>::new(1);
        let mut queue = SubmissionQueue::new();

        queue.submit_mesh(&at(0.0), &Renderable::new(mesh_a, deferred), &cache);
        queue.submit_mesh(&at(1.0), &Renderable::new(mesh_a, deferred), &cache);
        queue.submit_mesh(&at(2.0), &Renderable::new(mesh_b, deferred), &cache);
        queue.submit_mesh(&at(3.0), &Renderable::new(mesh_a, forward), &cache);
        queue.submit_mesh(&at(4.0), &Renderable::new(mesh_b, transparent), &cache);

        let bucket = queue.bucket(RenderPath::Deferred);
        assert_eq!(bucket[&deferred][&mesh_a].len(), 2);
        assert_eq!(bucket[&deferred][&mesh_b].len(), 1);
        assert_eq!(queue.instance_count(RenderPath::Forward), 1);
        assert_eq!(queue.instance_count(RenderPath::Transparent), 1);
        assert_eq!(
            queue.bucket(RenderPath::Transparent)[&transparent][&mesh_b][0].w_axis.x,
            4.0
        );
    }

    #[test]
    fn incomplete_renderables_are_ignored() {
        let (cache, [deferred, ..]) = materials();
        let mut queue = SubmissionQueue::new();
        let no_mesh = Renderable {
            mesh: None,
            material: Some(deferred),
        };
        let no_material = Renderable {
            mesh: Some(Handle::new(0)),
            material: None,
        };
        let unknown_material = Renderable::new(Handle::new(0), Handle::new(99));

        for renderable in [no_mesh, no_material, unknown_material] {
            queue.submit_mesh(&at(0.0), &renderable, &cache);
        }
        assert!(queue.is_empty());
    }

    #[test]
    fn light_truncation_keeps_submission_order() {
        let mut queue = SubmissionQueue::new();
        for i in 0..6 {
            queue.submit_light(&at(i as f32), &Light::default());
        }
        let xs: Vec<f32> = queue
            .lights_capped(4)
            .iter()
            .map(|l| l.transform.position.x)
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn clear_empties_everything() {
        let (cache, [deferred, ..]) = materials();
        let mut queue = SubmissionQueue::new();
        queue.submit_camera(&at(0.0), &Camera::default());
        queue.submit_light(&at(0.0), &Light::default());
        queue.submit_mesh(&at(0.0), &Renderable::new(Handle::new(0), deferred), &cache);
        assert!(!queue.is_empty());
        queue.clear();
        assert!(queue.is_empty());
    }
}
