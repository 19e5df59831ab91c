//! Conversion settings.

use serde::Deserialize;

use crate::hierarchy::DEFAULT_FRAME_PREFIX;
use crate::subsets::MaterialIndexPolicy;

/// Settings shared by both conversion directions.
///
/// Deserializable so host tools can embed it in their own config files;
/// missing keys fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Handling of per-face material indices with no material
    pub material_index_policy: MaterialIndexPolicy,

    /// Prefix stripped from frame names to form their alias
    pub frame_prefix: String,

    /// Frame whose transform is reset to identity when writing legacy text
    pub world_root_frame: String,

    /// Extra root node added by scene editors, removed on import
    pub wrapper_root_name: String,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            material_index_policy: MaterialIndexPolicy::Strict,
            frame_prefix: DEFAULT_FRAME_PREFIX.to_string(),
            world_root_frame: "Frame_World".to_string(),
            wrapper_root_name: "root".to_string(),
        }
    }
}

impl ConvertOptions {
    /// Set the material index policy.
    pub fn with_policy(mut self, policy: MaterialIndexPolicy) -> Self {
        self.material_index_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ConvertOptions::default();
        assert_eq!(options.material_index_policy, MaterialIndexPolicy::Strict);
        assert_eq!(options.frame_prefix, "Frame_");
        assert_eq!(options.wrapper_root_name, "root");
    }

    #[test]
    fn test_partial_config() {
        let options: ConvertOptions =
            serde_json::from_str(r#"{"material_index_policy": "permissive", "frame_prefix": "F_"}"#)
                .unwrap();

        assert_eq!(options.material_index_policy, MaterialIndexPolicy::Permissive);
        assert_eq!(options.frame_prefix, "F_");
        assert_eq!(options.world_root_frame, "Frame_World");
    }
}
