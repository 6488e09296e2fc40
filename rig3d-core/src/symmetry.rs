/// Mirrored joint pairs (left/right limbs, linked cable and hook)
use crate::error::{Result, RigError};
use crate::joint::JointId;
use crate::rig::Rig;

/// `follower = factor * governing`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mirror {
    pub governing: JointId,
    pub follower: JointId,
    pub factor: f32,
}

/// Static table of joint links supplied by whoever builds the rig.
///
/// The rig never mirrors on its own; callers that write a governing joint
/// call [`SymmetryTable::propagate`] afterwards.
///
/// Links are one level deep: a follower never governs another joint, so a
/// single propagation pass leaves every follower current.
#[derive(Debug, Clone, Default)]
pub struct SymmetryTable {
    mirrors: Vec<Mirror>,
}

impl SymmetryTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, governing: JointId, follower: JointId, factor: f32) -> Result<()> {
        if governing == follower {
            return Err(RigError::invalid_config(format!(
                "joint #{} cannot mirror itself",
                governing.index()
            )));
        }
        if !factor.is_finite() {
            return Err(RigError::invalid_config("mirror factor must be finite"));
        }
        if self.mirrors.iter().any(|m| m.follower == follower) {
            return Err(RigError::invalid_config(format!(
                "joint #{} already follows another joint",
                follower.index()
            )));
        }
        if self.is_follower(governing) {
            return Err(RigError::invalid_config(format!(
                "joint #{} follows another joint and cannot govern",
                governing.index()
            )));
        }
        if self.mirrors.iter().any(|m| m.governing == follower) {
            return Err(RigError::invalid_config(format!(
                "joint #{} governs other joints and cannot follow",
                follower.index()
            )));
        }
        self.mirrors.push(Mirror {
            governing,
            follower,
            factor,
        });
        Ok(())
    }

    pub fn mirrors(&self) -> &[Mirror] {
        &self.mirrors
    }

    pub fn followers(&self, governing: JointId) -> impl Iterator<Item = &Mirror> + '_ {
        self.mirrors.iter().filter(move |m| m.governing == governing)
    }

    pub fn is_follower(&self, joint: JointId) -> bool {
        self.mirrors.iter().any(|m| m.follower == joint)
    }

    /// Copy `governing`'s current value onto its followers.
    pub fn propagate(&self, rig: &mut Rig, governing: JointId) -> Result<()> {
        let value = rig.joint_value(governing)?;
        for mirror in self.followers(governing) {
            rig.set_joint_value(mirror.follower, mirror.factor * value)?;
        }
        Ok(())
    }

    pub fn propagate_all(&self, rig: &mut Rig) -> Result<()> {
        for mirror in &self.mirrors {
            let value = rig.joint_value(mirror.governing)?;
            rig.set_joint_value(mirror.follower, mirror.factor * value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joint::{JointLimits, JointSpec};
    use crate::rig::RigBuilder;
    use nalgebra::Vector3;

    fn arms() -> (Rig, JointId, JointId) {
        let mut b = RigBuilder::new("arms");
        let root = b.add_part("torso", None, Vector3::zeros()).unwrap();
        let left = b.add_part("left-arm", Some(root), Vector3::zeros()).unwrap();
        let right = b.add_part("right-arm", Some(root), Vector3::zeros()).unwrap();
        let l = b
            .add_joint(
                left,
                JointSpec::translation("left-arm-x", Vector3::x())
                    .initial(-0.375)
                    .limits(JointLimits::new(-0.375, -0.225).unwrap()),
            )
            .unwrap();
        let r = b
            .add_joint(
                right,
                JointSpec::translation("right-arm-x", Vector3::x())
                    .initial(0.375)
                    .limits(JointLimits::new(0.225, 0.375).unwrap()),
            )
            .unwrap();
        (b.build().unwrap(), l, r)
    }

    #[test]
    fn test_propagate_negates() {
        let (mut rig, l, r) = arms();
        let mut table = SymmetryTable::new();
        table.add(l, r, -1.0).unwrap();

        rig.set_joint_value(l, -0.3).unwrap();
        table.propagate(&mut rig, l).unwrap();
        assert_eq!(rig.joint_value(r).unwrap(), 0.3);
        assert!(table.is_follower(r));
        assert!(!table.is_follower(l));
    }

    #[test]
    fn test_rejects_bad_links() {
        let (_, l, r) = arms();
        let mut table = SymmetryTable::new();
        assert!(table.add(l, l, -1.0).is_err());
        table.add(l, r, -1.0).unwrap();
        assert!(table.add(l, r, 1.0).is_err());
        assert!(table.add(r, l, f32::INFINITY).is_err());
    }

    #[test]
    fn test_rejects_chained_links() {
        let (_, l, r) = arms();
        let spare = JointId(2);
        let mut table = SymmetryTable::new();
        table.add(l, r, -1.0).unwrap();
        assert!(matches!(table.add(r, spare, 1.0), Err(RigError::InvalidConfig(_))));
        assert!(matches!(table.add(spare, l, 1.0), Err(RigError::InvalidConfig(_))));
        table.add(l, spare, 0.5).unwrap();
        assert_eq!(table.followers(l).count(), 2);
    }

    #[test]
    fn test_propagate_all() {
        let (mut rig, l, r) = arms();
        let mut table = SymmetryTable::new();
        table.add(l, r, -1.0).unwrap();
        rig.set_joint_value(l, -0.25).unwrap();
        table.propagate_all(&mut rig).unwrap();
        assert_eq!(rig.joint_value(r).unwrap(), 0.25);
    }
}
