//! Layout of the unit's configuration memory.
//!
//! The walker never hard-codes an offset or a stride; everything it needs to locate and bound
//! an entry lives in the tables below.

pub const QUADLET: u64 = 4;

/// Where the root directory lives; every offset in it is relative to this.
pub const CONFIG_SPACE_BASE: u64 = 0xffff_e000_0000;

/// (offset, size) pairs for regions A, B, C and D.
pub const ROOT_DIRECTORY_QUADLETS: u32 = 8;

/// Region A: a small directory locating a header followed by length-prefixed records.
#[derive(Debug, Clone, Copy)]
pub struct RecordStreamLayout {
    /// Offset of the directory from the region start.
    pub directory_offset: u64,
    pub directory_quadlets: u32,
    /// Directory quadlet holding the header offset, relative to the region start.
    pub header_offset_index: usize,
    /// Directory quadlet holding the stream length, relative to the directory itself.
    pub stream_length_index: usize,
    pub header_quadlets: u32,
    pub record_header_quadlets: u32,
    /// Bits of the first record header quadlet holding the payload length in bytes.
    pub record_length_mask: u32,
}

pub const REGION_A: RecordStreamLayout = RecordStreamLayout {
    directory_offset: 68,
    directory_quadlets: 3,
    header_offset_index: 1,
    stream_length_index: 2,
    header_quadlets: 5,
    record_header_quadlets: 2,
    record_length_mask: 0xffff,
};

/// Region B starts with a table of section end offsets, relative to the region start.
pub const SECTION_TABLE_QUADLETS: u32 = 4;

/// Section 1 directly follows the section table.
pub const SECTION_1_OFFSET: u64 = SECTION_TABLE_QUADLETS as u64 * QUADLET;

/// Section 1: a leading entry count; each entry is a label offset followed by a fixed number
/// of length-prefixed parameters.
#[derive(Debug, Clone, Copy)]
pub struct ParameterListLayout {
    /// Label offsets are relative to this window.
    pub label_window: u64,
    pub params_per_entry: u32,
}

pub const SECTION_1: ParameterListLayout = ParameterListLayout {
    label_window: CONFIG_SPACE_BASE,
    params_per_entry: 5,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryCount {
    /// `(end - start) / stride`, decided before the first read.
    Span,
    /// Keep going while the entry address is below the end boundary.
    WhileBelowEnd,
    /// A count quadlet precedes the first entry.
    Leading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    None,
    /// An entry whose first quadlet is zero ends the stream; it is not printed.
    ZeroFirstQuadlet,
}

#[derive(Debug, Clone, Copy)]
pub struct FixedStrideLayout {
    pub name: &'static str,
    pub quadlets: u32,
    pub stride: u64,
    pub count: EntryCount,
    pub terminator: Terminator,
    /// Indentation of the entry line in the dump.
    pub indent: usize,
}

pub const SECTION_2: FixedStrideLayout = FixedStrideLayout {
    name: "section 2",
    quadlets: 12,
    stride: 48,
    count: EntryCount::Span,
    terminator: Terminator::None,
    indent: 4,
};

pub const SECTION_3: FixedStrideLayout = FixedStrideLayout {
    name: "section 3",
    quadlets: 7,
    stride: 28,
    count: EntryCount::Span,
    terminator: Terminator::ZeroFirstQuadlet,
    indent: 4,
};

pub const SECTION_4: FixedStrideLayout = FixedStrideLayout {
    name: "section 4",
    quadlets: 6,
    stride: 24,
    count: EntryCount::WhileBelowEnd,
    terminator: Terminator::ZeroFirstQuadlet,
    indent: 4,
};

pub const REGION_D: FixedStrideLayout = FixedStrideLayout {
    name: "region D",
    quadlets: 5,
    stride: 20,
    count: EntryCount::Leading,
    terminator: Terminator::None,
    indent: 2,
};

/// A block read at a fixed offset from the region start.
#[derive(Debug, Clone, Copy)]
pub struct PositionalBlock {
    pub offset: u64,
    pub quadlets: u32,
    /// Blocks not printed are only logged.
    pub printed: bool,
}

pub const REGION_C: [PositionalBlock; 3] = [
    PositionalBlock { offset: 8, quadlets: 7, printed: true },
    PositionalBlock { offset: 36, quadlets: 8, printed: false },
    PositionalBlock { offset: 72, quadlets: 8, printed: false },
];

/// How the address of entry `i` advances in a stream with a leading count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum StridePolicy {
    /// Entry `i` sits at `i * stride` from the first entry.
    #[default]
    Constant,
    /// The cursor grows by `i * stride` before reading entry `i`, so entry `i` sits at
    /// `stride * i * (i + 1) / 2`. This is what some host software does; unverified on hardware.
    Cumulative,
}

impl StridePolicy {
    /// `None` once the offset no longer fits in 64 bits.
    pub fn entry_offset(&self, index: u64, stride: u64) -> Option<u64> {
        match self {
            Self::Constant => index.checked_mul(stride),
            Self::Cumulative => {
                // one of index, index + 1 is even
                let (a, b) = if index % 2 == 0 {
                    (index / 2, index.checked_add(1)?)
                } else {
                    (index, (index + 1) / 2)
                };
                a.checked_mul(b)?.checked_mul(stride)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strides_match_entry_size() {
        for layout in [SECTION_2, SECTION_3, SECTION_4, REGION_D] {
            assert_eq!(layout.stride, layout.quadlets as u64 * QUADLET, "{}", layout.name);
        }
    }

    #[test]
    fn test_region_c_blocks_follow_each_other() {
        assert_eq!(REGION_C[1].offset, REGION_C[0].offset + REGION_C[0].quadlets as u64 * QUADLET);
        assert_eq!(REGION_C[2].offset, REGION_C[1].offset + 36);
    }

    #[test]
    fn test_stride_policy() {
        let offsets: Vec<u64> = (0..4).filter_map(|i| StridePolicy::Constant.entry_offset(i, 20)).collect();
        assert_eq!(offsets, vec![0, 20, 40, 60]);
        let offsets: Vec<u64> = (0..4).filter_map(|i| StridePolicy::Cumulative.entry_offset(i, 20)).collect();
        assert_eq!(offsets, vec![0, 20, 60, 120]);
    }

    #[test]
    fn test_stride_policy_overflow() {
        assert_eq!(StridePolicy::Cumulative.entry_offset(2_000_000_000, 20), None);
        assert_eq!(StridePolicy::Cumulative.entry_offset(u64::MAX, 20), None);
        assert_eq!(StridePolicy::Constant.entry_offset(u64::MAX / 10, 20), None);
        assert_eq!(StridePolicy::Cumulative.entry_offset(1_000_000, 20), Some(20 * 500_000 * 1_000_001));
    }
}
