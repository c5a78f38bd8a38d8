//! Quality tags for how a region's data was produced.

use serde::{Deserialize, Serialize};

/// How much of the world generator ran to produce a record, from cheapest to
/// most faithful. Ordering follows quality.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum GenerationMode {
    /// Nothing generated.
    None,
    /// Biome colours only, flat height.
    BiomeOnly,
    /// Biome colours with a height guessed from the biome.
    BiomeOnlySimulateHeight,
    /// Real surface without features.
    #[default]
    Surface,
    /// Surface plus features (trees, structures).
    Features,
    /// Data taken from fully generated chunks.
    Server,
}

impl GenerationMode {
    /// Every mode, cheapest first.
    pub const ALL: [GenerationMode; 6] = [
        GenerationMode::None,
        GenerationMode::BiomeOnly,
        GenerationMode::BiomeOnlySimulateHeight,
        GenerationMode::Surface,
        GenerationMode::Features,
        GenerationMode::Server,
    ];

    /// Whether data of this mode replaces records that already exist.
    pub fn overrides_existing(self) -> bool {
        self == GenerationMode::Server
    }

    /// Stable byte tag used in region files.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse a byte tag written by [`GenerationMode::to_u8`].
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes_are_ordered_by_quality() {
        for pair in GenerationMode::ALL.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_only_server_overrides() {
        let overriding: Vec<_> = GenerationMode::ALL
            .iter()
            .filter(|m| m.overrides_existing())
            .collect();
        assert_eq!(overriding, vec![&GenerationMode::Server]);
    }

    #[test]
    fn test_byte_tag_round_trip() {
        for mode in GenerationMode::ALL {
            assert_eq!(GenerationMode::from_u8(mode.to_u8()), Some(mode));
        }
        assert_eq!(GenerationMode::from_u8(6), None);
    }
}
