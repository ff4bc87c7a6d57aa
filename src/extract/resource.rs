//! Native version resource (`VS_VERSIONINFO`) reader.

use super::pe::{align4, read_u16, read_u32, PeImage, RESOURCE_DIRECTORY};

const RT_VERSION: u32 = 16;
const SUBDIRECTORY: u32 = 0x8000_0000;
const MAX_BLOCK_DEPTH: usize = 4;

/// Version fields of a native module's version resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionInfo {
    /// `FileVersion` string from the first string table.
    pub file_version: Option<String>,
    /// `ProductVersion` string from the first string table.
    pub product_version: Option<String>,
}

/// Locates and parses the first `RT_VERSION` resource of an image.
#[must_use]
pub fn version_info(image: &PeImage<'_>) -> Option<VersionInfo> {
    let resources = image.directory_bytes(RESOURCE_DIRECTORY)?;

    // type -> name -> language; only the type level is matched by id.
    let mut entry = directory_entry(resources, 0, Some(RT_VERSION))?;
    for _ in 0..2 {
        let subdir = subdirectory(entry)?;
        entry = directory_entry(resources, subdir, None)?;
    }
    if subdirectory(entry).is_some() {
        return None;
    }

    let leaf = entry as usize;
    let data_rva = read_u32(resources, leaf)?;
    let data_size = read_u32(resources, leaf + 4)? as usize;
    version_info_from_blob(image.slice_at_rva(data_rva, data_size)?)
}

fn subdirectory(offset: u32) -> Option<usize> {
    (offset & SUBDIRECTORY != 0).then(|| (offset & !SUBDIRECTORY) as usize)
}

/// Returns the data offset of the entry with id `id`, or of the first entry.
fn directory_entry(resources: &[u8], dir: usize, id: Option<u32>) -> Option<u32> {
    let named = read_u16(resources, dir + 12)? as usize;
    let ids = read_u16(resources, dir + 14)? as usize;
    (0..named + ids).find_map(|i| {
        let at = dir + 16 + i * 8;
        let name = read_u32(resources, at)?;
        let offset = read_u32(resources, at + 4)?;
        match id {
            Some(wanted) if name != wanted => None,
            _ => Some(offset),
        }
    })
}

/// Parses a raw `VS_VERSIONINFO` blob.
///
/// Only the string table is read. The numeric `VS_FIXEDFILEINFO` value of
/// the root block is skipped.
#[must_use]
pub fn version_info_from_blob(blob: &[u8]) -> Option<VersionInfo> {
    let root = parse_block(blob, 0, 0)?;
    if root.key != "VS_VERSION_INFO" {
        return None;
    }

    let strings = root
        .children
        .iter()
        .find(|b| b.key == "StringFileInfo")
        .and_then(|info| info.children.first());
    let lookup = |name: &str| {
        strings?.children.iter().find(|b| b.key == name).map(|b| decode_utf16(b.value))
    };

    Some(VersionInfo {
        file_version: lookup("FileVersion"),
        product_version: lookup("ProductVersion"),
    })
}

/// One node of the version resource tree.
#[derive(Debug)]
struct Block<'a> {
    key: String,
    value: &'a [u8],
    children: Vec<Block<'a>>,
}

fn parse_block(data: &[u8], start: usize, depth: usize) -> Option<Block<'_>> {
    let length = read_u16(data, start)? as usize;
    if length < 6 {
        return None;
    }
    let end = start.checked_add(length)?.min(data.len());
    let value_length = read_u16(data, start + 2)? as usize;
    let is_text = read_u16(data, start + 4)? == 1;

    let key_bytes = data.get(start + 6..end)?;
    let key_units: Vec<u16> = key_bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    let key_end = start + 6 + (key_units.len() + 1) * 2;
    let key = String::from_utf16_lossy(&key_units);

    let value_start = align4(key_end)?.min(end);
    let value_bytes = if is_text { value_length * 2 } else { value_length };
    let value_end = value_start.saturating_add(value_bytes).min(end);
    let value = data.get(value_start..value_end)?;

    let mut children = Vec::new();
    let mut cursor = align4(value_end)?;
    while depth < MAX_BLOCK_DEPTH && cursor + 6 <= end {
        let child_length = read_u16(data, cursor)? as usize;
        if child_length == 0 {
            break;
        }
        if let Some(child) = parse_block(&data[..end], cursor, depth + 1) {
            children.push(child);
        }
        cursor = align4(cursor + child_length)?;
    }

    Some(Block { key, value, children })
}

fn decode_utf16(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .take_while(|unit| *unit != 0)
        .collect();
    String::from_utf16_lossy(&units).trim().to_string()
}
