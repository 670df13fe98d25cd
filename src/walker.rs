//! Layout-driven walk over the unit's configuration memory.
//!
//! Nothing is buffered beyond the current entry: every region and section is fetched and
//! printed incrementally, and the address or count of each read may depend on a previous one.
//! The first failing read ends the walk; whatever was printed before it stays printed.

use std::io::Write;

use log::{debug, info, warn};
use thiserror::Error;

use crate::driver::{ReadTransport, TransportError, TransportErrorKind};
use crate::label::{LabelResolver, Unresolved};
use crate::layout::{self, EntryCount, FixedStrideLayout, StridePolicy, Terminator, QUADLET};

#[derive(Debug, Error)]
pub enum WalkError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("cannot write dump: {0}")]
    Output(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WalkError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionDescriptor {
    pub address: u64,
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegionMap {
    pub a: RegionDescriptor,
    pub b: RegionDescriptor,
    pub c: RegionDescriptor,
    pub d: RegionDescriptor,
}

impl RegionMap {
    /// Pair up the root directory as (offset, size) for A, B, C and D.
    pub fn from_root_directory(base: u64, root: &[u32; layout::ROOT_DIRECTORY_QUADLETS as usize]) -> RegionMap {
        let region = |i: usize| RegionDescriptor {
            address: base + root[i * 2] as u64,
            size: root[i * 2 + 1],
        };
        RegionMap { a: region(0), b: region(1), c: region(2), d: region(3) }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &RegionDescriptor)> {
        [("A", &self.a), ("B", &self.b), ("C", &self.c), ("D", &self.d)].into_iter()
    }
}

/// End addresses of the four sections of region B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionBoundaries {
    pub first: u64,
    pub second: u64,
    pub third: u64,
    pub fourth: u64,
}

impl SectionBoundaries {
    pub fn from_section_table(base: u64, table: &[u32; layout::SECTION_TABLE_QUADLETS as usize]) -> SectionBoundaries {
        SectionBoundaries {
            first: base + table[0] as u64,
            second: base + table[1] as u64,
            third: base + table[2] as u64,
            fourth: base + table[3] as u64,
        }
    }

    pub fn as_array(&self) -> [u64; 4] {
        [self.first, self.second, self.third, self.fourth]
    }

    pub fn is_monotonic(&self) -> bool {
        self.as_array().windows(2).all(|w| w[0] <= w[1])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    pub region_d_stride: StridePolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub regions: RegionMap,
    pub sections: SectionBoundaries,
    pub region_a_records: usize,
    pub section_entries: [usize; 4],
    pub region_d_entries: usize,
}

pub struct RegionWalker<T, W> {
    transport: T,
    out: W,
    labels: Box<dyn LabelResolver>,
    options: WalkOptions,
}

impl<T, W> RegionWalker<T, W>
where
    T: ReadTransport,
    W: Write,
{
    pub fn new(transport: T, out: W) -> RegionWalker<T, W> {
        RegionWalker {
            transport,
            out,
            labels: Box::new(Unresolved),
            options: WalkOptions::default(),
        }
    }

    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_label_resolver(mut self, labels: Box<dyn LabelResolver>) -> Self {
        self.labels = labels;
        self
    }

    pub fn into_parts(self) -> (T, W) {
        (self.transport, self.out)
    }

    fn read(&mut self, address: u64, count: u32) -> Result<Vec<u32>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let quadlets = self.transport.read_quadlets(address, count)?;
        if quadlets.len() != count as usize {
            return Err(TransportError::new(
                TransportErrorKind::Protocol,
                format!("expected {} quadlets at {:016x}, got {}", count, address, quadlets.len())).into());
        }
        Ok(quadlets)
    }

    fn read_array<const N: usize>(&mut self, address: u64) -> Result<[u32; N]> {
        let quadlets = self.read(address, N as u32)?;
        let mut res = [0_u32; N];
        res.copy_from_slice(&quadlets);
        Ok(res)
    }

    fn read_quadlet(&mut self, address: u64) -> Result<u32> {
        Ok(self.read_array::<1>(address)?[0])
    }

    fn print_quadlets(&mut self, indent: usize, quadlets: &[u32]) -> Result<()> {
        for (i, q) in quadlets.iter().enumerate() {
            writeln!(self.out, "{:indent$}{:02}: {:08x}", "", i, q, indent = indent)?;
        }
        Ok(())
    }

    /// Walk the whole configuration memory: root directory, then regions A, B, C and D.
    pub fn walk(&mut self) -> Result<WalkReport> {
        info!("Walking configuration memory at {:016x}", layout::CONFIG_SPACE_BASE);
        let regions = self.read_root_directory()?;
        let region_a_records = self.walk_region_a(&regions.a)?;
        let (sections, section_entries) = self.walk_region_b(&regions.b)?;
        self.walk_region_c(&regions.c)?;
        let region_d_entries = self.walk_region_d(&regions.d)?;
        self.out.flush()?;

        let report = WalkReport { regions, sections, region_a_records, section_entries, region_d_entries };
        info!("Walk finished: {:?}", report);
        Ok(report)
    }

    pub fn read_root_directory(&mut self) -> Result<RegionMap> {
        let root = self.read_array::<{ layout::ROOT_DIRECTORY_QUADLETS as usize }>(layout::CONFIG_SPACE_BASE)?;
        let regions = RegionMap::from_root_directory(layout::CONFIG_SPACE_BASE, &root);
        for (name, region) in regions.iter() {
            writeln!(self.out, "{}: {:016x}: {}", name, region.address, region.size)?;
        }
        Ok(regions)
    }

    /// Returns the number of records seen before the end address or a zero-length record.
    pub fn walk_region_a(&mut self, region: &RegionDescriptor) -> Result<usize> {
        let layout = &layout::REGION_A;
        writeln!(self.out, "Region A:")?;

        let dir_addr = region.address + layout.directory_offset;
        let dir = self.read(dir_addr, layout.directory_quadlets)?;
        let end = dir_addr + dir[layout.stream_length_index] as u64;

        let mut addr = region.address + dir[layout.header_offset_index] as u64;
        debug!("Region A: header at {:016x}, records end at {:016x}", addr, end);
        let header = self.read(addr, layout.header_quadlets)?;
        writeln!(self.out, "{:016x}:", addr)?;
        self.print_quadlets(4, &header)?;
        addr += layout.header_quadlets as u64 * QUADLET;

        let mut records = 0;
        while addr < end {
            let record_header = self.read(addr, layout.record_header_quadlets)?;
            let length = record_header[0] & layout.record_length_mask;
            if length == 0 {
                debug!("Region A: zero length record at {:016x}", addr);
                break;
            }
            addr += layout.record_header_quadlets as u64 * QUADLET;

            for q in &record_header {
                writeln!(self.out, "  {:08x}", q)?;
            }
            let payload = self.read(addr, length / QUADLET as u32)?;
            self.print_quadlets(4, &payload)?;
            addr += length as u64;
            records += 1;
        }
        Ok(records)
    }

    pub fn read_section_table(&mut self, region: &RegionDescriptor) -> Result<SectionBoundaries> {
        let table = self.read_array::<{ layout::SECTION_TABLE_QUADLETS as usize }>(region.address)?;
        let sections = SectionBoundaries::from_section_table(region.address, &table);
        if !sections.is_monotonic() {
            warn!("Region B section boundaries are not monotonic: {:x?}", sections.as_array());
        }
        Ok(sections)
    }

    /// Returns the section boundaries and the number of entries printed for each section.
    pub fn walk_region_b(&mut self, region: &RegionDescriptor) -> Result<(SectionBoundaries, [usize; 4])> {
        writeln!(self.out, "Region B:")?;
        let sections = self.read_section_table(region)?;

        writeln!(self.out, "  Sections:")?;
        for (i, end) in sections.as_array().iter().enumerate() {
            writeln!(self.out, "    {}: {:016x}", i + 1, end)?;
        }

        let mut entries = [0_usize; 4];
        writeln!(self.out, "  section 1:")?;
        entries[0] = self.walk_section_1(region.address + layout::SECTION_1_OFFSET, sections.first)?;
        writeln!(self.out, "  section 2:")?;
        entries[1] = self.walk_fixed_stride(&layout::SECTION_2, sections.first, sections.second,
                                            StridePolicy::Constant)?;
        writeln!(self.out, "  section 3:")?;
        entries[2] = self.walk_fixed_stride(&layout::SECTION_3, sections.second, sections.third,
                                            StridePolicy::Constant)?;
        writeln!(self.out, "  section 4:")?;
        entries[3] = self.walk_fixed_stride(&layout::SECTION_4, sections.third, sections.fourth,
                                            StridePolicy::Constant)?;
        Ok((sections, entries))
    }

    /// Section 1 is bounded by its entry count only; `end` is checked afterwards.
    pub fn walk_section_1(&mut self, start: u64, end: u64) -> Result<usize> {
        let layout = &layout::SECTION_1;
        let mut addr = start;
        let count = self.read_quadlet(addr)?;
        addr += QUADLET;

        for i in 0..count {
            let label_addr = layout.label_window + self.read_quadlet(addr)? as u64;
            match self.labels.resolve(label_addr) {
                Some(label) => writeln!(self.out, "    entry {}: ({:016x}) label {:016x}: '{}'",
                                        i, addr, label_addr, label)?,
                None => writeln!(self.out, "    entry {}: ({:016x}) label {:016x}: unresolved",
                                 i, addr, label_addr)?,
            }
            addr += QUADLET;

            for j in 0..layout.params_per_entry {
                writeln!(self.out, "      param: {:02}", j)?;
                let length = self.read_quadlet(addr)?;
                addr += QUADLET;
                let values = self.read(addr, length / QUADLET as u32)?;
                self.print_quadlets(8, &values)?;
                addr += length as u64;
            }
        }

        if addr != end {
            warn!("Section 1 ends at {:016x} after {} entries, its boundary is {:016x}", addr, count, end);
        }
        Ok(count as usize)
    }

    // entries that fit entirely between start and end; a remainder is flagged, not read
    fn span_entries(&mut self, layout: &FixedStrideLayout, start: u64, end: u64) -> Result<u64> {
        if end < start {
            warn!("{}: end {:016x} precedes start {:016x}", layout.name, end, start);
            return Ok(0);
        }
        let span = end - start;
        let remainder = span % layout.stride;
        if remainder != 0 {
            warn!("{}: {} bytes are not a multiple of the {} byte stride", layout.name, span, layout.stride);
            writeln!(self.out, "{:indent$}({} trailing bytes ignored)", "", remainder, indent = layout.indent)?;
        }
        Ok(span / layout.stride)
    }

    // first entry address and entry limit of a stream; a leading count is read here
    fn entry_bounds(&mut self, layout: &FixedStrideLayout, start: u64, end: u64) -> Result<(u64, Option<u64>)> {
        Ok(match layout.count {
            EntryCount::Span => (start, Some(self.span_entries(layout, start, end)?)),
            EntryCount::WhileBelowEnd => (start, None),
            EntryCount::Leading => (start + QUADLET, Some(self.read_quadlet(start)? as u64)),
        })
    }

    /// Walk fixed size entries from `start`. Returns the number of entries printed; a terminator
    /// entry is not counted.
    pub fn walk_fixed_stride(&mut self, layout: &FixedStrideLayout, start: u64, end: u64,
                             policy: StridePolicy) -> Result<usize> {
        let (first, limit) = self.entry_bounds(layout, start, end)?;
        self.walk_entries(layout, first, end, limit, policy)
    }

    fn walk_entries(&mut self, layout: &FixedStrideLayout, first: u64, end: u64, limit: Option<u64>,
                    policy: StridePolicy) -> Result<usize> {
        debug!("{}: first entry at {:016x}, limit {:?}", layout.name, first, limit);

        let mut index = 0_u64;
        loop {
            if limit.map_or(false, |limit| index >= limit) {
                break;
            }
            let addr = match policy.entry_offset(index, layout.stride).and_then(|o| first.checked_add(o)) {
                Some(addr) => addr,
                None => {
                    warn!("{}: address of entry {} overflows, stopping", layout.name, index);
                    break;
                }
            };
            if layout.count == EntryCount::WhileBelowEnd {
                if addr >= end {
                    break;
                }
                if end - addr < layout.stride {
                    let remainder = end - addr;
                    warn!("{}: {} bytes before {:016x} are shorter than the {} byte stride",
                          layout.name, remainder, end, layout.stride);
                    writeln!(self.out, "{:indent$}({} trailing bytes ignored)", "", remainder,
                             indent = layout.indent)?;
                    break;
                }
            }

            let quadlets = self.read(addr, layout.quadlets)?;
            if layout.terminator == Terminator::ZeroFirstQuadlet && quadlets[0] == 0 {
                debug!("{}: terminator at {:016x}", layout.name, addr);
                break;
            }

            writeln!(self.out, "{:indent$}entry {:02}: {:016x}", "", index, addr, indent = layout.indent)?;
            self.print_quadlets(layout.indent + 2, &quadlets)?;
            index += 1;
        }
        Ok(index as usize)
    }

    pub fn walk_region_c(&mut self, region: &RegionDescriptor) -> Result<()> {
        writeln!(self.out, "Region C:")?;
        for block in layout::REGION_C.iter() {
            let addr = region.address + block.offset;
            let quadlets = self.read(addr, block.quadlets)?;
            if block.printed {
                self.print_quadlets(2, &quadlets)?;
            } else {
                debug!("Region C: {:016x}: {:08x?}", addr, quadlets);
            }
        }
        Ok(())
    }

    /// Returns the number of entries printed.
    pub fn walk_region_d(&mut self, region: &RegionDescriptor) -> Result<usize> {
        let layout = &layout::REGION_D;
        let (first, limit) = self.entry_bounds(layout, region.address, u64::MAX)?;
        writeln!(self.out, "Region D:")?;
        let policy = self.options.region_d_stride;
        self.walk_entries(layout, first, u64::MAX, limit, policy)
    }
}
