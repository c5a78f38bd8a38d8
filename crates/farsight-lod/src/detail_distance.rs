//! Distance-to-detail policy with separate rendering and generation falloff.
//!
//! For every detail level the policy precomputes the minimum viewer distance at
//! which that level is acceptable. The required level at a distance is the
//! coarsest level whose threshold has been reached, so the mapping is
//! monotonically non-decreasing by construction. Generation thresholds are the
//! rendering thresholds scaled by a multiplier `>= 1`, which keeps generated
//! data at least as fine as rendered data at equal distance.

use serde::{Deserialize, Serialize};

use crate::error::LodError;
use crate::level_pos::{CHUNK_WIDTH, DETAIL_LEVEL_COUNT, REGION_DETAIL_LEVEL};

/// Shape of the distance falloff between detail levels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HorizontalQuality {
    /// Each level starts one distance unit further out.
    Linear,
    /// Quadratic falloff with base 1.5.
    Low,
    /// Quadratic falloff with base 2.0.
    #[default]
    Medium,
    /// Quadratic falloff with base 2.2.
    High,
}

impl HorizontalQuality {
    /// Base of the quadratic falloff, `None` for linear.
    pub fn quadratic_base(self) -> Option<f64> {
        match self {
            HorizontalQuality::Linear => None,
            HorizontalQuality::Low => Some(1.5),
            HorizontalQuality::Medium => Some(2.0),
            HorizontalQuality::High => Some(2.2),
        }
    }
}

/// Finest horizontal resolution the renderer draws.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HorizontalResolution {
    /// One record per column.
    #[default]
    Block,
    /// One record per 2x2 columns.
    TwoBlocks,
    /// One record per 4x4 columns.
    FourBlocks,
    /// One record per 8x8 columns.
    HalfChunk,
    /// One record per chunk.
    Chunk,
}

impl HorizontalResolution {
    /// The detail level this resolution corresponds to.
    pub fn detail_level(self) -> u8 {
        match self {
            HorizontalResolution::Block => 0,
            HorizontalResolution::TwoBlocks => 1,
            HorizontalResolution::FourBlocks => 2,
            HorizontalResolution::HalfChunk => 3,
            HorizontalResolution::Chunk => 4,
        }
    }
}

/// Inputs of the distance policy.
#[derive(Clone, Debug, PartialEq)]
pub struct DetailDistanceSettings {
    /// Distance unit in chunks; one unit is `horizontal_scale * 16` columns.
    pub horizontal_scale: u32,
    /// Falloff shape.
    pub quality: HorizontalQuality,
    /// Finest level ever rendered.
    pub draw_resolution: HorizontalResolution,
    /// Finest level ever generated.
    pub min_generation_detail: u8,
    /// Distance multiplier for generation thresholds, `>= 1`.
    pub generation_multiplier: f64,
}

impl Default for DetailDistanceSettings {
    fn default() -> Self {
        Self {
            horizontal_scale: 8,
            quality: HorizontalQuality::Medium,
            draw_resolution: HorizontalResolution::Block,
            min_generation_detail: 0,
            generation_multiplier: 1.5,
        }
    }
}

impl DetailDistanceSettings {
    /// Check that the settings describe a usable policy.
    pub fn validate(&self) -> Result<(), LodError> {
        if self.horizontal_scale == 0 {
            return Err(LodError::InvalidSettings(
                "horizontal_scale must be positive".into(),
            ));
        }
        if !self.generation_multiplier.is_finite() || self.generation_multiplier < 1.0 {
            return Err(LodError::InvalidSettings(format!(
                "generation_multiplier must be >= 1, got {}",
                self.generation_multiplier
            )));
        }
        if self.min_generation_detail > self.draw_resolution.detail_level() {
            return Err(LodError::InvalidSettings(format!(
                "min_generation_detail {} is coarser than the draw resolution {}",
                self.min_generation_detail,
                self.draw_resolution.detail_level()
            )));
        }
        Ok(())
    }

    /// Width of one distance unit in columns.
    pub fn distance_unit(&self) -> f64 {
        f64::from(self.horizontal_scale) * f64::from(CHUNK_WIDTH)
    }

    /// Distance at which `detail` starts, before clamping and multipliers.
    fn base_distance(&self, detail: u8) -> f64 {
        let unit = self.distance_unit();
        match self.quality.quadratic_base() {
            None => f64::from(detail) * unit,
            Some(base) => base.powi(i32::from(detail)) * unit,
        }
    }
}

/// Maps viewer distance to the detail level needed for rendering and generation.
#[derive(Clone, Debug)]
pub struct DetailDistancePolicy {
    settings: DetailDistanceSettings,
    /// `render_thresholds[l]` is the minimum distance at which level `l` may be rendered.
    render_thresholds: [f64; DETAIL_LEVEL_COUNT],
    /// `generation_thresholds[l]` is the minimum distance at which level `l` suffices for generation.
    generation_thresholds: [f64; DETAIL_LEVEL_COUNT],
}

impl Default for DetailDistancePolicy {
    fn default() -> Self {
        Self::build(DetailDistanceSettings::default())
    }
}

impl DetailDistancePolicy {
    /// Build a policy from validated settings.
    pub fn new(settings: DetailDistanceSettings) -> Result<Self, LodError> {
        settings.validate()?;
        Ok(Self::build(settings))
    }

    fn build(settings: DetailDistanceSettings) -> Self {
        let min_draw = settings.draw_resolution.detail_level();
        let min_gen = settings.min_generation_detail;
        let mut render_thresholds = [0.0; DETAIL_LEVEL_COUNT];
        let mut generation_thresholds = [0.0; DETAIL_LEVEL_COUNT];
        for detail in 0..=REGION_DETAIL_LEVEL {
            let base = settings.base_distance(detail);
            if detail > min_draw {
                render_thresholds[detail as usize] = base;
            }
            if detail > min_gen {
                generation_thresholds[detail as usize] = base * settings.generation_multiplier;
            }
        }
        Self {
            settings,
            render_thresholds,
            generation_thresholds,
        }
    }

    /// Settings this policy was built from.
    pub fn settings(&self) -> &DetailDistanceSettings {
        &self.settings
    }

    /// Finest level ever rendered.
    pub fn min_draw_detail(&self) -> u8 {
        self.settings.draw_resolution.detail_level()
    }

    /// Finest level ever generated.
    pub fn min_generation_detail(&self) -> u8 {
        self.settings.min_generation_detail
    }

    /// Detail level to render at `distance` columns from the viewer.
    pub fn required_render_level(&self, distance: f64) -> u8 {
        level_for(&self.render_thresholds, distance)
    }

    /// Detail level to generate at `distance` columns from the viewer.
    pub fn required_generation_level(&self, distance: f64) -> u8 {
        level_for(&self.generation_thresholds, distance)
    }

    /// Finest level a region whose nearest point is `distance` away must keep.
    pub fn required_retained_level(&self, distance: f64) -> u8 {
        self.required_generation_level(distance)
    }

    /// Minimum distance at which `detail` may be rendered.
    pub fn distance_for_render_level(&self, detail: u8) -> f64 {
        self.render_thresholds[detail.min(REGION_DETAIL_LEVEL) as usize]
    }

    /// Minimum distance at which `detail` suffices for generation.
    pub fn distance_for_generation_level(&self, detail: u8) -> f64 {
        self.generation_thresholds[detail.min(REGION_DETAIL_LEVEL) as usize]
    }

    /// Rendering thresholds, finest level first.
    pub fn render_thresholds(&self) -> &[f64] {
        &self.render_thresholds
    }

    /// Generation thresholds, finest level first.
    pub fn generation_thresholds(&self) -> &[f64] {
        &self.generation_thresholds
    }
}

/// Coarsest level whose threshold is within `distance`.
fn level_for(thresholds: &[f64; DETAIL_LEVEL_COUNT], distance: f64) -> u8 {
    debug_assert!(distance >= 0.0, "distance must be non-negative");
    let mut level = 0;
    for (detail, &threshold) in thresholds.iter().enumerate() {
        if distance >= threshold {
            level = detail;
        } else {
            break;
        }
    }
    level as u8
}
