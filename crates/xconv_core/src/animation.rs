//! Keyframed bone animation as stored by the legacy format.
//!
//! The legacy grammar never batches keys: every parsed key becomes its own
//! single-keyframe [`Animation`] sharing bone and channel with its
//! neighbours. Dense per-time tables are produced by [`crate::timeline`].

use xconv_math::{DQuat, DVec3};

/// What an animation key's values mean.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChannelKind {
    /// Quaternion (x, y, z, w)
    Rotation,
    /// Scale vector
    Scale,
    /// Translation vector
    Position,
}

impl ChannelKind {
    /// All kinds in key-code order.
    pub const ALL: [ChannelKind; 3] = [ChannelKind::Rotation, ChannelKind::Scale, ChannelKind::Position];

    /// Decode an `AnimationKey` type code.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(ChannelKind::Rotation),
            1 => Some(ChannelKind::Scale),
            2 => Some(ChannelKind::Position),
            _ => None,
        }
    }

    /// The `AnimationKey` type code.
    pub fn code(self) -> u32 {
        match self {
            ChannelKind::Rotation => 0,
            ChannelKind::Scale => 1,
            ChannelKind::Position => 2,
        }
    }

    /// Number of components one key of this kind carries.
    pub fn dimension(self) -> usize {
        match self {
            ChannelKind::Rotation => 4,
            ChannelKind::Scale | ChannelKind::Position => 3,
        }
    }
}

/// One animation key.
#[derive(Clone, Debug, PartialEq)]
pub struct Keyframe {
    /// Frame number
    pub frame: u32,

    /// Declared value dimensionality
    pub dim: usize,

    /// Raw component values
    pub values: Vec<f64>,
}

impl Keyframe {
    /// Create a key whose dimensionality is the number of values.
    pub fn new(frame: u32, values: Vec<f64>) -> Self {
        Self {
            frame,
            dim: values.len(),
            values,
        }
    }

    /// Interpret the values as an (x, y, z, w) quaternion.
    pub fn as_quat(&self) -> Option<DQuat> {
        match self.values[..] {
            [x, y, z, w] => Some(DQuat::from_xyzw(x, y, z, w)),
            _ => None,
        }
    }

    /// Interpret the values as a vector.
    pub fn as_vec3(&self) -> Option<DVec3> {
        match self.values[..] {
            [x, y, z] => Some(DVec3::new(x, y, z)),
            _ => None,
        }
    }
}

/// Keys of one channel of one bone.
#[derive(Clone, Debug, PartialEq)]
pub struct Animation {
    /// Channel kind
    pub kind: ChannelKind,

    /// Animated bone (frame) name
    pub bone: String,

    /// Keys in storage order
    pub keyframes: Vec<Keyframe>,
}

/// Contents of an `AnimationOptions` block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnimationOptions {
    /// Open animation: plays once instead of looping
    pub play_once: bool,

    /// Position interpolation quality flag
    pub position_quality: u32,
}

/// One `Animation` block of a set.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationClip {
    /// Clip name
    pub name: String,

    /// Bone named by the `{bone}` reference, kept even when the clip has
    /// no keys
    pub bone: Option<String>,

    /// Options, when the block declares them
    pub options: Option<AnimationOptions>,

    /// Single-keyframe animation records
    pub animations: Vec<Animation>,
}

impl AnimationClip {
    /// Create an empty clip.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether the clip plays once. Clips without options loop.
    pub fn play_once(&self) -> bool {
        self.options.map_or(false, |o| o.play_once)
    }
}

/// A named group of clips.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnimationSet {
    /// Set name
    pub name: String,

    /// Clips in document order
    pub clips: Vec<AnimationClip>,
}

impl AnimationSet {
    /// Create an empty set.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up a clip by name.
    pub fn clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    /// Every animation record of every clip.
    pub fn animations(&self) -> impl Iterator<Item = &Animation> {
        self.clips.iter().flat_map(|c| c.animations.iter())
    }

    /// Animated bones in first-seen order, including bones of clips
    /// without keys.
    pub fn bones(&self) -> Vec<&str> {
        let mut bones: Vec<&str> = Vec::new();
        for clip in &self.clips {
            let records = clip.animations.iter().map(|a| a.bone.as_str());
            for bone in clip.bone.as_deref().into_iter().chain(records) {
                if !bones.contains(&bone) {
                    bones.push(bone);
                }
            }
        }
        bones
    }

    /// Number of keys across all records.
    pub fn key_count(&self) -> usize {
        self.animations().map(|a| a.keyframes.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_codes() {
        for kind in ChannelKind::ALL {
            assert_eq!(ChannelKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ChannelKind::from_code(4), None);
    }

    #[test]
    fn test_keyframe_values() {
        let rot = Keyframe::new(0, vec![0.0, 0.0, 0.0, 1.0]);
        assert_eq!(rot.as_quat(), Some(DQuat::IDENTITY));
        assert_eq!(rot.as_vec3(), None);

        let pos = Keyframe::new(5, vec![1.0, 2.0, 3.0]);
        assert_eq!(pos.dim, 3);
        assert_eq!(pos.as_vec3(), Some(DVec3::new(1.0, 2.0, 3.0)));
    }

    #[test]
    fn test_set_bones_first_seen() {
        let mut clip = AnimationClip::new("Anim1");
        for bone in ["B", "A", "B"] {
            clip.animations.push(Animation {
                kind: ChannelKind::Position,
                bone: bone.to_string(),
                keyframes: vec![Keyframe::new(0, vec![0.0, 0.0, 0.0])],
            });
        }
        let mut hold = AnimationClip::new("Anim2");
        hold.bone = Some("C".to_string());
        let mut set = AnimationSet::new("Walk");
        set.clips.push(clip);
        set.clips.push(hold);

        assert_eq!(set.bones(), vec!["B", "A", "C"]);
        assert_eq!(set.key_count(), 3);
        assert!(set.clip("Anim1").is_some());
        assert!(!set.clips[0].play_once());
    }
}
