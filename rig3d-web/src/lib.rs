/// rig3d Web - WASM bindings for driving a rig from JavaScript
///
/// The page owns rendering. Each frame it calls `update(dt)`, then reads
/// `dirty_parts()` and `local_transform(i)` to move its scene nodes. Parts
/// of the rig come first, followed by the parts of the payload (if any).
use rig3d_core::{Preset, RigError, Simulation, TickReport, Transform};
use wasm_bindgen::prelude::*;

fn to_js(err: RigError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn log(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::log_1(&JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    tracing::info!("{message}");
}

/// `[tx, ty, tz, qx, qy, qz, qw]`
fn pack(transform: &Transform) -> Vec<f32> {
    let t = transform.translation;
    let q = transform.rotation.coords;
    vec![t.x, t.y, t.z, q.x, q.y, q.z, q.w]
}

#[wasm_bindgen]
pub struct WebRig {
    sim: Simulation,
    last: TickReport,
}

impl WebRig {
    pub fn from_preset(preset: Preset) -> rig3d_core::Result<Self> {
        let sim = preset.build()?;
        log(&format!(
            "rig3d: loaded '{}' with {} parts",
            preset,
            sim.rig().part_count() + sim.payload().map_or(0, |p| p.part_count())
        ));
        Ok(Self {
            sim,
            last: TickReport::default(),
        })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    fn rig_parts(&self) -> usize {
        self.sim.rig().part_count()
    }

    fn local(&self, index: usize) -> rig3d_core::Result<Transform> {
        let rig = self.sim.rig();
        match rig.parts().nth(index) {
            Some((id, _)) => rig.local_transform(id),
            None => {
                let payload = self
                    .sim
                    .payload()
                    .ok_or_else(|| RigError::not_found(format!("part #{index}")))?;
                let (id, _) = payload
                    .parts()
                    .nth(index - self.rig_parts())
                    .ok_or_else(|| RigError::not_found(format!("part #{index}")))?;
                payload.local_transform(id)
            }
        }
    }

    fn advance(&mut self, dt: f32) -> rig3d_core::Result<()> {
        self.last = self.sim.tick(dt)?;
        if self.last.docking_started() {
            log("rig3d: docking started");
        }
        if self.last.docking_complete() {
            log("rig3d: docking complete");
        }
        Ok(())
    }
}

#[wasm_bindgen]
impl WebRig {
    /// `preset` is `transformer` or `tower-crane`.
    #[wasm_bindgen(constructor)]
    pub fn new(preset: &str) -> Result<WebRig, JsValue> {
        let preset: Preset = preset.parse().map_err(to_js)?;
        Self::from_preset(preset).map_err(to_js)
    }

    pub fn press(&mut self, event: &str) -> Result<bool, JsValue> {
        self.sim.press(event).map_err(to_js)
    }

    pub fn release(&mut self, event: &str) -> bool {
        self.sim.release(event)
    }

    /// Advance by the browser's frame delta in seconds.
    pub fn update(&mut self, dt: f32) -> Result<(), JsValue> {
        self.advance(dt).map_err(to_js)
    }

    pub fn trigger_transform(&mut self, pose: &str) -> Result<bool, JsValue> {
        self.sim.trigger_transform(pose).map_err(to_js)
    }

    pub fn part_count(&self) -> usize {
        self.rig_parts() + self.sim.payload().map_or(0, |p| p.part_count())
    }

    pub fn part_name(&self, index: usize) -> Option<String> {
        let rig = self.sim.rig();
        match rig.parts().nth(index) {
            Some((_, part)) => Some(part.name().to_string()),
            None => self
                .sim
                .payload()?
                .parts()
                .nth(index.checked_sub(self.rig_parts())?)
                .map(|(_, part)| part.name().to_string()),
        }
    }

    /// Parent part index, or -1 for a root or an unknown part.
    pub fn parent_index(&self, index: usize) -> i32 {
        let rig_parts = self.rig_parts();
        let parent = if index < rig_parts {
            self.sim
                .rig()
                .parts()
                .nth(index)
                .and_then(|(_, part)| part.parent())
                .map(|p| p.index())
        } else {
            self.sim.payload().and_then(|payload| {
                payload
                    .parts()
                    .nth(index - rig_parts)
                    .and_then(|(_, part)| part.parent())
                    .map(|p| p.index() + rig_parts)
            })
        };
        parent.map_or(-1, |p| p as i32)
    }

    /// Parent-relative transform as `[tx, ty, tz, qx, qy, qz, qw]`.
    pub fn local_transform(&self, index: usize) -> Result<Vec<f32>, JsValue> {
        self.local(index).map(|t| pack(&t)).map_err(to_js)
    }

    /// Indices of parts whose local transform changed since the last call.
    pub fn dirty_parts(&mut self) -> Vec<u32> {
        let rig_parts = self.rig_parts();
        let dirty = self.sim.take_dirty();
        dirty
            .rig
            .iter()
            .map(|id| id.index())
            .chain(dirty.payload.iter().map(|id| id.index() + rig_parts))
            .map(|i| i as u32)
            .collect()
    }

    /// `idle`, `animating` or `docking`.
    pub fn state(&self) -> String {
        self.sim.animator().state().label().to_string()
    }

    /// Whether the last `update` finished a pose transition.
    pub fn animation_complete(&self) -> bool {
        self.last.animation_complete()
    }

    /// Whether the last `update` finished docking.
    pub fn docking_complete(&self) -> bool {
        self.last.docking_complete()
    }

    pub fn colliding(&self) -> bool {
        self.last.colliding
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    log("rig3d web ready");
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn transformer() -> WebRig {
        WebRig::from_preset(Preset::Transformer).unwrap()
    }

    #[test]
    fn test_flattened_part_indices() {
        let rig = transformer();
        let robot_parts = rig.simulation().rig().part_count();
        assert_eq!(rig.part_count(), robot_parts + 1);
        assert_eq!(rig.part_name(0).as_deref(), Some("body"));
        assert_eq!(rig.part_name(robot_parts).as_deref(), Some("trailer"));
        assert_eq!(rig.part_name(robot_parts + 1), None);
        assert_eq!(rig.parent_index(0), -1);
        assert_eq!(rig.parent_index(robot_parts), -1);
        assert_eq!(rig.parent_index(1), 0);
    }

    #[test]
    fn test_trailer_transform_packing() {
        let rig = transformer();
        let trailer = rig.local(rig.part_count() - 1).unwrap();
        assert_eq!(pack(&trailer), vec![0.0, 0.6, -3.0, 0.0, 0.0, 0.0, 1.0]);
        assert!(rig.local(rig.part_count()).is_err());
    }

    #[test]
    fn test_update_reports_completion() {
        let mut rig = transformer();
        rig.dirty_parts();
        assert!(rig.trigger_transform("closed").unwrap());
        assert_eq!(rig.state(), "animating");
        rig.update(0.5).unwrap();
        assert!(rig.animation_complete());
        assert!(!rig.docking_complete());
        assert_eq!(rig.state(), "idle");

        let dirty = rig.dirty_parts();
        assert!(!dirty.is_empty());
        assert!(rig.dirty_parts().is_empty());

        let head = rig.simulation().rig().part_id("head").unwrap().index();
        let packed = rig.local_transform(head).unwrap();
        assert_relative_eq!(packed[1], 0.6, epsilon = 1e-6);
        // Half turn about X.
        assert_relative_eq!(packed[3].abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_trailer_moves_and_reports_dirty() {
        let mut rig = transformer();
        rig.dirty_parts();
        assert!(rig.press("trailer-left").unwrap());
        rig.update(0.1).unwrap();
        assert_eq!(rig.dirty_parts(), vec![(rig.part_count() - 1) as u32]);
        assert!(rig.release("trailer-left"));
    }
}
