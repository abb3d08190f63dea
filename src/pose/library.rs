//! Pose registries
//!
//! `HandPoseLibrary` holds the authored poses and is owned by the host,
//! shared read-only between avatars. Each avatar keeps its own
//! `HandPoseCache` of poses baked for its rig.

use std::collections::HashMap;

use super::{HandPoseDescriptor, RuntimeHandPose};
use crate::hand::HandInfo;
use crate::skeleton::BoneSet;
use crate::{Result, RigError};

/// Authored hand poses by name
#[derive(Clone, Debug, Default)]
pub struct HandPoseLibrary {
    poses: Vec<HandPoseDescriptor>,
    name_to_index: HashMap<String, usize>,
}

impl HandPoseLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pose, replacing (and returning) any pose with the same name
    pub fn add(&mut self, pose: HandPoseDescriptor) -> Option<HandPoseDescriptor> {
        match self.name_to_index.get(pose.name()) {
            Some(&index) => Some(std::mem::replace(&mut self.poses[index], pose)),
            None => {
                self.name_to_index.insert(pose.name().to_owned(), self.poses.len());
                self.poses.push(pose);
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<HandPoseDescriptor> {
        let index = self.name_to_index.remove(name)?;
        let pose = self.poses.remove(index);
        for slot in self.name_to_index.values_mut() {
            if *slot > index {
                *slot -= 1;
            }
        }
        Some(pose)
    }

    pub fn get(&self, name: &str) -> Option<&HandPoseDescriptor> {
        self.name_to_index.get(name).map(|&index| &self.poses[index])
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Poses in registration order
    pub fn iter(&self) -> impl Iterator<Item = &HandPoseDescriptor> {
        self.poses.iter()
    }
}

/// Poses baked for one avatar, filled on first use
#[derive(Clone, Debug, Default)]
pub struct HandPoseCache {
    baked: HashMap<String, RuntimeHandPose>,
}

impl HandPoseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Baked pose, baking it from `library` if not cached yet
    pub fn get_or_bake(
        &mut self,
        library: &HandPoseLibrary,
        name: &str,
        skeleton: &BoneSet,
        hands: &[HandInfo; 2],
    ) -> Result<&RuntimeHandPose> {
        if !self.baked.contains_key(name) {
            let pose = library
                .get(name)
                .ok_or_else(|| RigError::UnknownPose(name.to_owned()))?;
            let runtime = RuntimeHandPose::bake(skeleton, hands, pose)?;
            self.baked.insert(name.to_owned(), runtime);
        }
        self.baked
            .get(name)
            .ok_or_else(|| RigError::UnknownPose(name.to_owned()))
    }

    pub fn get(&self, name: &str) -> Option<&RuntimeHandPose> {
        self.baked.get(name)
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.baked.contains_key(name)
    }

    /// Drop one baked pose, e.g. after its descriptor changed
    pub fn invalidate(&mut self, name: &str) -> bool {
        self.baked.remove(name).is_some()
    }

    /// Drop every baked pose. Required after the rig is rebuilt.
    pub fn clear(&mut self) {
        self.baked.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.baked.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.baked.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RigConfig;
    use crate::hand::{build_hand_info, Side};
    use crate::pose::{FingerDescriptor, HandDescriptor};
    use crate::testing::hand_rig;
    use glam::Quat;

    fn curl_pose(name: &str, angle: f32) -> HandPoseDescriptor {
        HandPoseDescriptor::symmetric_fixed(
            name,
            HandDescriptor::uniform(FingerDescriptor::curl(Quat::from_rotation_x(angle))),
        )
    }

    #[test]
    fn test_library_registration() {
        let mut library = HandPoseLibrary::new();
        assert!(library.add(curl_pose("a", 0.1)).is_none());
        assert!(library.add(curl_pose("b", 0.2)).is_none());
        assert!(library.add(curl_pose("c", 0.3)).is_none());

        let replaced = library.add(curl_pose("b", 0.5)).unwrap();
        assert_eq!(replaced, curl_pose("b", 0.2));
        assert_eq!(library.len(), 3);

        assert!(library.remove("a").is_some());
        assert!(!library.contains("a"));
        assert_eq!(library.get("c"), Some(&curl_pose("c", 0.3)));
        assert_eq!(library.get("b"), Some(&curl_pose("b", 0.5)));
        let names: Vec<&str> = library.iter().map(|p| p.name()).collect();
        assert_eq!(names, ["b", "c"]);
    }

    #[test]
    fn test_cache_bakes_once() {
        let rig = hand_rig(Side::Left, Quat::IDENTITY, false);
        let config = RigConfig::default();
        let left = build_hand_info(&rig.skeleton, &rig.mesh, &rig.map, Side::Left, &config);
        let hands = [left, HandInfo::empty(Side::Right)];

        let mut library = HandPoseLibrary::new();
        library.add(curl_pose("fist", 1.0));
        let mut cache = HandPoseCache::new();

        assert!(matches!(
            cache.get_or_bake(&library, "missing", &rig.skeleton, &hands),
            Err(RigError::UnknownPose(_))
        ));
        assert!(cache.is_empty());

        let baked = cache
            .get_or_bake(&library, "fist", &rig.skeleton, &hands)
            .unwrap()
            .clone();
        assert_eq!(cache.len(), 1);

        // A changed library entry is not picked up until invalidated
        library.add(curl_pose("fist", 0.2));
        let again = cache.get_or_bake(&library, "fist", &rig.skeleton, &hands).unwrap();
        assert_eq!(again.evaluate(Side::Left, 0.0), baked.evaluate(Side::Left, 0.0));

        assert!(cache.invalidate("fist"));
        let rebaked = cache.get_or_bake(&library, "fist", &rig.skeleton, &hands).unwrap();
        assert_ne!(rebaked.evaluate(Side::Left, 0.0), baked.evaluate(Side::Left, 0.0));

        cache.clear();
        assert!(!cache.contains("fist"));
    }
}
