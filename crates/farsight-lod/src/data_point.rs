//! Packed 64-bit terrain-column records.
//!
//! ## Bit Layout
//!
//! | Bits | Field |
//! |------|-------|
//! | 0..8 | blue |
//! | 8..16 | green |
//! | 16..24 | red |
//! | 24..36 | depth (12-bit two's complement) |
//! | 36..48 | height (12-bit two's complement) |
//! | 48..63 | reserved, always zero |
//! | 63 | exists flag |
//!
//! The all-zero record is the *absent* sentinel. A *void* record exists but
//! carries [`VOID_HEIGHT`] and [`VOID_DEPTH`]: the node was generated and
//! holds nothing renderable.

use bytemuck::{Pod, Zeroable};

const BLUE_SHIFT: u32 = 0;
const GREEN_SHIFT: u32 = 8;
const RED_SHIFT: u32 = 16;
const DEPTH_SHIFT: u32 = 24;
const HEIGHT_SHIFT: u32 = 36;
const EXISTS_SHIFT: u32 = 63;

const COLOR_MASK: u64 = 0xFF;
const VERTICAL_BITS: u32 = 12;
const VERTICAL_MASK: u64 = (1 << VERTICAL_BITS) - 1;

/// Reserved height marking a void record. Never a generated height.
pub const VOID_HEIGHT: i16 = -(1 << (VERTICAL_BITS - 1));

/// Depth stored alongside [`VOID_HEIGHT`].
pub const VOID_DEPTH: i16 = VOID_HEIGHT;

/// Lowest height a generated record may carry.
pub const MIN_HEIGHT: i16 = VOID_HEIGHT + 1;

/// Highest height (and depth) a record may carry.
pub const MAX_HEIGHT: i16 = (1 << (VERTICAL_BITS - 1)) - 1;

/// Surface summary of one column or node: the solid interval and its colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TerrainSample {
    /// Top of the solid interval.
    pub height: i16,
    /// Bottom of the solid interval.
    pub depth: i16,
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
}

impl TerrainSample {
    /// Create a sample.
    pub const fn new(height: i16, depth: i16, red: u8, green: u8, blue: u8) -> Self {
        Self {
            height,
            depth,
            red,
            green,
            blue,
        }
    }
}

/// Flat decoded form of a record, mirroring [`DataPoint::encode`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodedPoint {
    /// Height field.
    pub height: i16,
    /// Depth field.
    pub depth: i16,
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Exists flag.
    pub exists: bool,
}

/// Explicit tagged view of a record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointState {
    /// Never generated.
    Absent,
    /// Generated, nothing renderable.
    Void,
    /// Generated terrain.
    Present(TerrainSample),
}

/// One packed terrain record.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[repr(transparent)]
pub struct DataPoint(u64);

impl DataPoint {
    /// The absent sentinel.
    pub const EMPTY: DataPoint = DataPoint(0);

    /// Pack the given fields. `exists == false` always yields [`DataPoint::EMPTY`].
    pub fn encode(height: i16, depth: i16, red: u8, green: u8, blue: u8, exists: bool) -> Self {
        if !exists {
            return Self::EMPTY;
        }
        debug_assert!(
            (VOID_HEIGHT..=MAX_HEIGHT).contains(&height),
            "height {height} out of range"
        );
        debug_assert!(
            (VOID_HEIGHT..=MAX_HEIGHT).contains(&depth),
            "depth {depth} out of range"
        );
        let bits = (u64::from(blue) << BLUE_SHIFT)
            | (u64::from(green) << GREEN_SHIFT)
            | (u64::from(red) << RED_SHIFT)
            | ((depth as u64 & VERTICAL_MASK) << DEPTH_SHIFT)
            | ((height as u64 & VERTICAL_MASK) << HEIGHT_SHIFT)
            | (1 << EXISTS_SHIFT);
        Self(bits)
    }

    /// Pack a generated sample.
    pub fn from_sample(sample: TerrainSample) -> Self {
        debug_assert!(sample.height >= MIN_HEIGHT, "height collides with void sentinel");
        Self::encode(
            sample.height,
            sample.depth,
            sample.red,
            sample.green,
            sample.blue,
            true,
        )
    }

    /// The void record.
    pub fn void() -> Self {
        Self::encode(VOID_HEIGHT, VOID_DEPTH, 0, 0, 0, true)
    }

    /// Reinterpret raw bits, as read from storage.
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// Raw bits, as written to storage.
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    /// Whether this record was generated (void or not).
    #[inline]
    pub const fn exists(self) -> bool {
        self.0 >> EXISTS_SHIFT != 0
    }

    /// Whether this record is the void sentinel.
    #[inline]
    pub fn is_void(self) -> bool {
        self.exists() && self.height() == VOID_HEIGHT
    }

    /// Height field.
    #[inline]
    pub fn height(self) -> i16 {
        sign_extend((self.0 >> HEIGHT_SHIFT) & VERTICAL_MASK)
    }

    /// Depth field.
    #[inline]
    pub fn depth(self) -> i16 {
        sign_extend((self.0 >> DEPTH_SHIFT) & VERTICAL_MASK)
    }

    /// Red channel.
    #[inline]
    pub fn red(self) -> u8 {
        ((self.0 >> RED_SHIFT) & COLOR_MASK) as u8
    }

    /// Green channel.
    #[inline]
    pub fn green(self) -> u8 {
        ((self.0 >> GREEN_SHIFT) & COLOR_MASK) as u8
    }

    /// Blue channel.
    #[inline]
    pub fn blue(self) -> u8 {
        ((self.0 >> BLUE_SHIFT) & COLOR_MASK) as u8
    }

    /// Unpack every field.
    pub fn decode(self) -> DecodedPoint {
        DecodedPoint {
            height: self.height(),
            depth: self.depth(),
            red: self.red(),
            green: self.green(),
            blue: self.blue(),
            exists: self.exists(),
        }
    }

    /// Classify the record as absent, void, or present.
    pub fn state(self) -> PointState {
        if !self.exists() {
            PointState::Absent
        } else if self.is_void() {
            PointState::Void
        } else {
            PointState::Present(TerrainSample::new(
                self.height(),
                self.depth(),
                self.red(),
                self.green(),
                self.blue(),
            ))
        }
    }
}

impl From<PointState> for DataPoint {
    fn from(state: PointState) -> Self {
        match state {
            PointState::Absent => DataPoint::EMPTY,
            PointState::Void => DataPoint::void(),
            PointState::Present(sample) => DataPoint::from_sample(sample),
        }
    }
}

impl std::fmt::Debug for DataPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state() {
            PointState::Absent => write!(f, "DataPoint(absent)"),
            PointState::Void => write!(f, "DataPoint(void)"),
            PointState::Present(s) => write!(
                f,
                "DataPoint(h={}, d={}, rgb=({}, {}, {}))",
                s.height, s.depth, s.red, s.green, s.blue
            ),
        }
    }
}

/// Combine records into one: the truncated mean of every existing non-void
/// record, void when only void records exist, absent when none exist.
pub fn merge_points<I>(points: I) -> DataPoint
where
    I: IntoIterator<Item = DataPoint>,
{
    let mut count = 0i32;
    let mut voids = 0u32;
    let (mut height, mut depth) = (0i32, 0i32);
    let (mut red, mut green, mut blue) = (0i32, 0i32, 0i32);
    for point in points {
        match point.state() {
            PointState::Absent => {}
            PointState::Void => voids += 1,
            PointState::Present(s) => {
                count += 1;
                height += i32::from(s.height);
                depth += i32::from(s.depth);
                red += i32::from(s.red);
                green += i32::from(s.green);
                blue += i32::from(s.blue);
            }
        }
    }
    if count > 0 {
        DataPoint::from_sample(TerrainSample::new(
            (height / count) as i16,
            (depth / count) as i16,
            (red / count) as u8,
            (green / count) as u8,
            (blue / count) as u8,
        ))
    } else if voids > 0 {
        DataPoint::void()
    } else {
        DataPoint::EMPTY
    }
}

#[inline]
fn sign_extend(raw: u64) -> i16 {
    let shift = 64 - VERTICAL_BITS;
    (((raw << shift) as i64) >> shift) as i16
}
