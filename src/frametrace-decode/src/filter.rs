use ffmpeg_next::picture::Type as PictureType;

/// A bitmask over picture types, deciding which decoded frames reach the
/// consumer queue.
///
/// Default is I+P, matching the common "skip B-frames" OCR workload: B-frames
/// rarely carry new on-screen text and roughly double decode volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFilter(u8);

impl FrameFilter {
    pub const I: FrameFilter = FrameFilter(0b001);
    pub const P: FrameFilter = FrameFilter(0b010);
    pub const B: FrameFilter = FrameFilter(0b100);
    pub const ALL: FrameFilter = FrameFilter(0b111);

    pub const fn union(self, other: FrameFilter) -> FrameFilter {
        FrameFilter(self.0 | other.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Build a filter from a raw bitmask, ignoring any bits outside `ALL`.
    pub const fn from_bits(bits: u8) -> FrameFilter {
        FrameFilter(bits & Self::ALL.0)
    }

    /// Parse a combination of `I`/`P`/`B` letters (any case, in any order),
    /// e.g. `"IP"` or `"ipb"`. Unrecognized letters are ignored; an empty or
    /// all-unrecognized input yields an empty filter.
    pub fn parse(spec: &str) -> FrameFilter {
        spec.chars().fold(FrameFilter(0), |acc, c| {
            acc.union(match c.to_ascii_uppercase() {
                'I' => Self::I,
                'P' => Self::P,
                'B' => Self::B,
                _ => FrameFilter(0),
            })
        })
    }

    pub fn contains(self, picture_type: PictureType) -> bool {
        let bit = match picture_type {
            PictureType::I => Self::I.0,
            PictureType::P => Self::P.0,
            PictureType::B => Self::B.0,
            // Still/intra-refresh variants are treated as their closest
            // counterpart for filtering purposes.
            PictureType::S | PictureType::SI => Self::I.0,
            PictureType::SP => Self::P.0,
            PictureType::BI => Self::B.0,
            PictureType::None => return false,
        };
        self.0 & bit != 0
    }
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self::I.union(Self::P)
    }
}
