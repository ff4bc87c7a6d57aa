//! Minimal PE image reader: headers, data directories and RVA mapping.
//!
//! Every accessor is bounds-checked and returns `None` on malformed input.

/// Data directory index of the resource table.
pub const RESOURCE_DIRECTORY: usize = 2;
/// Data directory index of the CLR runtime header.
pub const CLR_DIRECTORY: usize = 14;

const PE32_MAGIC: u16 = 0x10b;
const PE32_PLUS_MAGIC: u16 = 0x20b;
const SECTION_HEADER_SIZE: usize = 40;

pub(crate) fn read_u8(data: &[u8], offset: usize) -> Option<u8> {
    data.get(offset).copied()
}

pub(crate) fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Rounds `offset` up to the next multiple of four.
pub(crate) fn align4(offset: usize) -> Option<usize> {
    offset.checked_add(3).map(|n| n & !3)
}

/// An entry of the optional header's data directory array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataDirectory {
    /// Relative virtual address of the table.
    pub rva: u32,
    /// Size of the table in bytes.
    pub size: u32,
}

#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    raw_size: u32,
    raw_offset: u32,
}

/// A parsed PE image borrowing the file bytes.
#[derive(Debug)]
pub struct PeImage<'a> {
    data: &'a [u8],
    directories: Vec<DataDirectory>,
    sections: Vec<Section>,
}

impl<'a> PeImage<'a> {
    /// Parses the DOS, COFF and optional headers plus the section table.
    ///
    /// Returns `None` if `data` is not a PE32 or PE32+ image.
    #[must_use]
    pub fn parse(data: &'a [u8]) -> Option<Self> {
        if data.get(0..2)? != b"MZ" {
            return None;
        }
        let pe_offset = read_u32(data, 0x3c)? as usize;
        if data.get(pe_offset..pe_offset.checked_add(4)?)? != b"PE\0\0" {
            return None;
        }

        let coff = pe_offset + 4;
        let section_count = read_u16(data, coff + 2)? as usize;
        let optional_size = read_u16(data, coff + 16)? as usize;
        let optional = coff + 20;

        let (count_offset, directories_offset) = match read_u16(data, optional)? {
            PE32_MAGIC => (92, 96),
            PE32_PLUS_MAGIC => (108, 112),
            _ => return None,
        };
        let directory_count = (read_u32(data, optional + count_offset)? as usize).min(16);
        let directories = (0..directory_count)
            .map(|i| {
                let at = optional + directories_offset + i * 8;
                Some(DataDirectory { rva: read_u32(data, at)?, size: read_u32(data, at + 4)? })
            })
            .collect::<Option<Vec<_>>>()?;

        let table = optional + optional_size;
        let sections = (0..section_count)
            .map(|i| {
                let at = table + i * SECTION_HEADER_SIZE;
                Some(Section {
                    virtual_address: read_u32(data, at + 12)?,
                    raw_size: read_u32(data, at + 16)?,
                    raw_offset: read_u32(data, at + 20)?,
                })
            })
            .collect::<Option<Vec<_>>>()?;

        Some(Self { data, directories, sections })
    }

    /// Returns the data directory at `index` if it is present and non-empty.
    #[must_use]
    pub fn directory(&self, index: usize) -> Option<DataDirectory> {
        self.directories.get(index).copied().filter(|d| d.rva != 0 && d.size != 0)
    }

    /// Maps a relative virtual address to a file offset.
    #[must_use]
    pub fn rva_to_offset(&self, rva: u32) -> Option<usize> {
        self.sections.iter().find_map(|s| {
            let delta = rva.checked_sub(s.virtual_address)?;
            (delta < s.raw_size).then(|| s.raw_offset as usize + delta as usize)
        })
    }

    /// Returns the bytes of a data directory's table.
    #[must_use]
    pub fn directory_bytes(&self, index: usize) -> Option<&'a [u8]> {
        let dir = self.directory(index)?;
        self.slice_at_rva(dir.rva, dir.size as usize)
    }

    /// Returns `len` bytes starting at `rva`, truncated to the end of the file.
    #[must_use]
    pub fn slice_at_rva(&self, rva: u32, len: usize) -> Option<&'a [u8]> {
        let start = self.rva_to_offset(rva)?;
        let end = start.checked_add(len)?.min(self.data.len());
        self.data.get(start..end)
    }
}
