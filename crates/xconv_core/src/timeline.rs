//! Dense per-time sample tables for an animation set.
//!
//! Legacy keys are sparse and bone-local. A keyframed-animation sink wants
//! one value per joint at every sampled time, so for each channel kind the
//! key times of all bones are unioned and missing samples are filled with
//! the channel's identity value.

use std::collections::{BTreeSet, HashMap};

use xconv_math::{DQuat, DVec3};

use crate::animation::{AnimationSet, ChannelKind, Keyframe};

/// Samples of one channel: `values[t][j]` is joint `j` at `times[t]`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelSamples<T> {
    /// Sorted, distinct sample times
    pub times: Vec<u32>,

    /// One row per time, one entry per joint
    pub values: Vec<Vec<T>>,
}

impl<T> ChannelSamples<T> {
    /// Check if the channel has no samples.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Last sample time, if any.
    pub fn last_time(&self) -> Option<u32> {
        self.times.last().copied()
    }
}

/// Dense animation table for one set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Timeline {
    /// Joint names in first-seen order
    pub joints: Vec<String>,

    /// Rotation samples
    pub rotations: ChannelSamples<DQuat>,

    /// Scale samples
    pub scales: ChannelSamples<DVec3>,

    /// Translation samples
    pub translations: ChannelSamples<DVec3>,

    /// Playback start, always 0
    pub start_time: u32,

    /// Largest key time over all channels
    pub end_time: u32,
}

impl Timeline {
    /// Build the dense table for an animation set.
    pub fn build(set: &AnimationSet) -> Self {
        let joints: Vec<String> = set.bones().into_iter().map(str::to_string).collect();
        let joint_index: HashMap<&str, usize> = joints
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), i))
            .collect();

        let rotations = build_channel(set, &joint_index, ChannelKind::Rotation, DQuat::IDENTITY, Keyframe::as_quat);
        let scales = build_channel(set, &joint_index, ChannelKind::Scale, DVec3::ONE, Keyframe::as_vec3);
        let translations = build_channel(set, &joint_index, ChannelKind::Position, DVec3::ZERO, Keyframe::as_vec3);

        let end_time = [rotations.last_time(), scales.last_time(), translations.last_time()]
            .into_iter()
            .flatten()
            .max()
            .unwrap_or(0);

        log::debug!(
            "Timeline {}: {} joints, {}/{}/{} rotation/scale/position times, end {}",
            set.name,
            joints.len(),
            rotations.times.len(),
            scales.times.len(),
            translations.times.len(),
            end_time
        );

        Self {
            joints,
            rotations,
            scales,
            translations,
            start_time: 0,
            end_time,
        }
    }

    /// Sample times of one channel kind.
    pub fn times(&self, kind: ChannelKind) -> &[u32] {
        match kind {
            ChannelKind::Rotation => &self.rotations.times,
            ChannelKind::Scale => &self.scales.times,
            ChannelKind::Position => &self.translations.times,
        }
    }
}

fn build_channel<T: Copy>(
    set: &AnimationSet,
    joint_index: &HashMap<&str, usize>,
    kind: ChannelKind,
    identity: T,
    convert: impl Fn(&Keyframe) -> Option<T>,
) -> ChannelSamples<T> {
    let mut times = BTreeSet::new();
    let mut per_joint: Vec<HashMap<u32, T>> = vec![HashMap::new(); joint_index.len()];

    for animation in set.animations().filter(|a| a.kind == kind) {
        let Some(&joint) = joint_index.get(animation.bone.as_str()) else {
            continue;
        };
        for key in &animation.keyframes {
            match convert(key) {
                Some(value) => {
                    times.insert(key.frame);
                    per_joint[joint].insert(key.frame, value);
                }
                None => log::warn!(
                    "Skipping {:?} key at frame {} of bone {}: {} values",
                    kind,
                    key.frame,
                    animation.bone,
                    key.values.len()
                ),
            }
        }
    }

    let times: Vec<u32> = times.into_iter().collect();
    let values = times
        .iter()
        .map(|time| {
            per_joint
                .iter()
                .map(|samples| samples.get(time).copied().unwrap_or(identity))
                .collect()
        })
        .collect();

    ChannelSamples { times, values }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animation, AnimationClip};

    fn key_record(kind: ChannelKind, bone: &str, frame: u32, values: Vec<f64>) -> Animation {
        Animation {
            kind,
            bone: bone.to_string(),
            keyframes: vec![Keyframe::new(frame, values)],
        }
    }

    fn set_with(records: Vec<Animation>) -> AnimationSet {
        let mut clip = AnimationClip::new("Anim");
        clip.animations = records;
        let mut set = AnimationSet::new("Set");
        set.clips.push(clip);
        set
    }

    #[test]
    fn test_single_bone_rotation_only() {
        let set = set_with(vec![
            key_record(ChannelKind::Rotation, "Bone", 0, vec![0.0, 0.0, 0.0, 1.0]),
            key_record(ChannelKind::Rotation, "Bone", 10, vec![0.0, 1.0, 0.0, 0.0]),
        ]);

        let timeline = Timeline::build(&set);

        assert_eq!(timeline.times(ChannelKind::Rotation), &[0, 10]);
        assert!(timeline.times(ChannelKind::Scale).is_empty());
        assert!(timeline.times(ChannelKind::Position).is_empty());
        assert_eq!(timeline.start_time, 0);
        assert_eq!(timeline.end_time, 10);
        assert_eq!(timeline.rotations.values[1][0], DQuat::from_xyzw(0.0, 1.0, 0.0, 0.0));
    }

    #[test]
    fn test_union_and_identity_fill() {
        let set = set_with(vec![
            key_record(ChannelKind::Position, "A", 5, vec![1.0, 2.0, 3.0]),
            key_record(ChannelKind::Position, "B", 2, vec![4.0, 5.0, 6.0]),
            key_record(ChannelKind::Scale, "B", 7, vec![2.0, 2.0, 2.0]),
            key_record(ChannelKind::Rotation, "C", 1, vec![0.0, 0.0, 0.0, 1.0]),
        ]);

        let timeline = Timeline::build(&set);

        assert_eq!(timeline.joints, vec!["A", "B", "C"]);
        assert_eq!(timeline.translations.times, vec![2, 5]);
        // time 2: A missing -> zero, B keyed, C never keyed -> zero
        assert_eq!(
            timeline.translations.values[0],
            vec![DVec3::ZERO, DVec3::new(4.0, 5.0, 6.0), DVec3::ZERO]
        );
        assert_eq!(
            timeline.translations.values[1],
            vec![DVec3::new(1.0, 2.0, 3.0), DVec3::ZERO, DVec3::ZERO]
        );
        assert_eq!(timeline.scales.values[0], vec![DVec3::ONE, DVec3::splat(2.0), DVec3::ONE]);
        assert_eq!(timeline.rotations.values[0][0], DQuat::IDENTITY);
        assert_eq!(timeline.end_time, 7);
    }

    #[test]
    fn test_empty_set() {
        let timeline = Timeline::build(&AnimationSet::new("Empty"));

        assert!(timeline.joints.is_empty());
        assert!(timeline.rotations.is_empty());
        assert_eq!(timeline.end_time, 0);
    }

    #[test]
    fn test_malformed_key_skipped() {
        let set = set_with(vec![key_record(ChannelKind::Rotation, "A", 3, vec![1.0, 0.0])]);
        let timeline = Timeline::build(&set);

        assert!(timeline.rotations.is_empty());
        assert_eq!(timeline.joints, vec!["A"]);
    }
}
