//! Assembly version lookup in CLI (managed) metadata.
//!
//! Walks CLR header -> metadata root -> `#~` table stream -> `Assembly`
//! table, skipping every table that precedes it. Row widths depend on heap
//! sizes and table row counts, so all of them are computed from the stream
//! header.

use super::pe::{align4, read_u16, read_u32, read_u64, read_u8, PeImage, CLR_DIRECTORY};
use crate::version::StructuredVersion;

const METADATA_SIGNATURE: u32 = 0x424a_5342;
const TABLE_COUNT: usize = 64;

const MODULE: usize = 0x00;
const TYPE_REF: usize = 0x01;
const TYPE_DEF: usize = 0x02;
const FIELD: usize = 0x04;
const METHOD_DEF: usize = 0x06;
const PARAM: usize = 0x08;
const INTERFACE_IMPL: usize = 0x09;
const MEMBER_REF: usize = 0x0a;
const DECL_SECURITY: usize = 0x0e;
const STAND_ALONE_SIG: usize = 0x11;
const EVENT: usize = 0x14;
const PROPERTY: usize = 0x17;
const MODULE_REF: usize = 0x1a;
const TYPE_SPEC: usize = 0x1b;
const ASSEMBLY: usize = 0x20;
const ASSEMBLY_REF: usize = 0x23;
const FILE: usize = 0x26;
const EXPORTED_TYPE: usize = 0x27;
const MANIFEST_RESOURCE: usize = 0x28;
const GENERIC_PARAM: usize = 0x2a;
const METHOD_SPEC: usize = 0x2b;
const GENERIC_PARAM_CONSTRAINT: usize = 0x2c;

const WIDE_STRINGS: u8 = 0x01;
const WIDE_GUIDS: u8 = 0x02;
const WIDE_BLOBS: u8 = 0x04;
const EXTRA_DATA: u8 = 0x40;

/// Reads the assembly version declared in a managed module.
///
/// Returns `None` for native images, netmodules without an `Assembly` row,
/// and anything malformed.
#[must_use]
pub fn assembly_version(image: &PeImage<'_>) -> Option<StructuredVersion> {
    let cor = image.directory_bytes(CLR_DIRECTORY)?;
    let metadata_rva = read_u32(cor, 8)?;
    let metadata_size = read_u32(cor, 12)? as usize;
    let metadata = image.slice_at_rva(metadata_rva, metadata_size)?;
    assembly_version_from_metadata(metadata)
}

/// Same as [`assembly_version`], starting from the metadata root bytes.
#[must_use]
pub fn assembly_version_from_metadata(metadata: &[u8]) -> Option<StructuredVersion> {
    let tables = table_stream(metadata)?;
    let heap_sizes = read_u8(tables, 6)?;
    let valid = read_u64(tables, 8)?;

    let mut rows = [0u32; TABLE_COUNT];
    let mut cursor = 24;
    for (table, count) in rows.iter_mut().enumerate() {
        if valid & (1u64 << table) != 0 {
            *count = read_u32(tables, cursor)?;
            cursor += 4;
        }
    }
    if heap_sizes & EXTRA_DATA != 0 {
        cursor += 4;
    }
    if rows[ASSEMBLY] == 0 {
        return None;
    }

    let sizes = IndexSizes { heap_sizes, rows };
    let mut offset = cursor;
    for (table, count) in rows[..ASSEMBLY].iter().enumerate() {
        let span = (*count as usize).checked_mul(sizes.row_size(table))?;
        offset = offset.checked_add(span)?;
    }

    // Assembly row: HashAlgId (u32), then four u16 version components.
    Some(StructuredVersion::new(
        u32::from(read_u16(tables, offset + 4)?),
        u32::from(read_u16(tables, offset + 6)?),
        u32::from(read_u16(tables, offset + 8)?),
        u32::from(read_u16(tables, offset + 10)?),
    ))
}

/// Locates the `#~` (or unoptimized `#-`) stream inside the metadata root.
fn table_stream(metadata: &[u8]) -> Option<&[u8]> {
    if read_u32(metadata, 0)? != METADATA_SIGNATURE {
        return None;
    }
    let version_len = read_u32(metadata, 12)? as usize;
    let mut cursor = align4(16usize.checked_add(version_len)?)?;
    let stream_count = read_u16(metadata, cursor + 2)?;
    cursor += 4;

    for _ in 0..stream_count {
        let offset = read_u32(metadata, cursor)? as usize;
        let size = read_u32(metadata, cursor + 4)? as usize;
        let name_start = cursor + 8;
        let name_len = metadata.get(name_start..)?.iter().take(32).position(|b| *b == 0)?;
        let name = metadata.get(name_start..name_start + name_len)?;
        if name == b"#~" || name == b"#-" {
            return metadata.get(offset..offset.checked_add(size)?);
        }
        cursor = align4(name_start + name_len + 1)?;
    }
    None
}

/// Index widths for one table stream.
struct IndexSizes {
    heap_sizes: u8,
    rows: [u32; TABLE_COUNT],
}

impl IndexSizes {
    fn heap(&self, flag: u8) -> usize {
        if self.heap_sizes & flag == 0 {
            2
        } else {
            4
        }
    }

    fn string(&self) -> usize {
        self.heap(WIDE_STRINGS)
    }

    fn guid(&self) -> usize {
        self.heap(WIDE_GUIDS)
    }

    fn blob(&self) -> usize {
        self.heap(WIDE_BLOBS)
    }

    /// Width of a plain index into `table`.
    fn table(&self, table: usize) -> usize {
        if self.rows[table] < 1u32 << 16 {
            2
        } else {
            4
        }
    }

    /// Width of a coded index over `tables` using `tag_bits` tag bits.
    fn coded(&self, tag_bits: u32, tables: &[usize]) -> usize {
        let max = tables.iter().map(|t| self.rows[*t]).max().unwrap_or(0);
        if max < 1u32 << (16 - tag_bits) {
            2
        } else {
            4
        }
    }

    fn type_def_or_ref(&self) -> usize {
        self.coded(2, &[TYPE_DEF, TYPE_REF, TYPE_SPEC])
    }

    fn has_constant(&self) -> usize {
        self.coded(2, &[FIELD, PARAM, PROPERTY])
    }

    fn has_custom_attribute(&self) -> usize {
        self.coded(
            5,
            &[
                METHOD_DEF,
                FIELD,
                TYPE_REF,
                TYPE_DEF,
                PARAM,
                INTERFACE_IMPL,
                MEMBER_REF,
                MODULE,
                DECL_SECURITY,
                PROPERTY,
                EVENT,
                STAND_ALONE_SIG,
                MODULE_REF,
                TYPE_SPEC,
                ASSEMBLY,
                ASSEMBLY_REF,
                FILE,
                EXPORTED_TYPE,
                MANIFEST_RESOURCE,
                GENERIC_PARAM,
                GENERIC_PARAM_CONSTRAINT,
                METHOD_SPEC,
            ],
        )
    }

    fn has_field_marshal(&self) -> usize {
        self.coded(1, &[FIELD, PARAM])
    }

    fn has_decl_security(&self) -> usize {
        self.coded(2, &[TYPE_DEF, METHOD_DEF, ASSEMBLY])
    }

    fn member_ref_parent(&self) -> usize {
        self.coded(3, &[TYPE_DEF, TYPE_REF, MODULE_REF, METHOD_DEF, TYPE_SPEC])
    }

    fn has_semantics(&self) -> usize {
        self.coded(1, &[EVENT, PROPERTY])
    }

    fn method_def_or_ref(&self) -> usize {
        self.coded(1, &[METHOD_DEF, MEMBER_REF])
    }

    fn member_forwarded(&self) -> usize {
        self.coded(1, &[FIELD, METHOD_DEF])
    }

    fn custom_attribute_type(&self) -> usize {
        self.coded(3, &[METHOD_DEF, MEMBER_REF])
    }

    fn resolution_scope(&self) -> usize {
        self.coded(2, &[MODULE, MODULE_REF, ASSEMBLY_REF, TYPE_REF])
    }

    /// Row width of the tables that can precede `Assembly`.
    fn row_size(&self, table: usize) -> usize {
        match table {
            0x00 => 2 + self.string() + 3 * self.guid(),
            0x01 => self.resolution_scope() + 2 * self.string(),
            0x02 => {
                4 + 2 * self.string()
                    + self.type_def_or_ref()
                    + self.table(FIELD)
                    + self.table(METHOD_DEF)
            }
            0x03 => self.table(FIELD),
            0x04 => 2 + self.string() + self.blob(),
            0x05 => self.table(METHOD_DEF),
            0x06 => 4 + 2 + 2 + self.string() + self.blob() + self.table(PARAM),
            0x07 => self.table(PARAM),
            0x08 => 2 + 2 + self.string(),
            0x09 => self.table(TYPE_DEF) + self.type_def_or_ref(),
            0x0a => self.member_ref_parent() + self.string() + self.blob(),
            0x0b => 2 + self.has_constant() + self.blob(),
            0x0c => self.has_custom_attribute() + self.custom_attribute_type() + self.blob(),
            0x0d => self.has_field_marshal() + self.blob(),
            0x0e => 2 + self.has_decl_security() + self.blob(),
            0x0f => 2 + 4 + self.table(TYPE_DEF),
            0x10 => 4 + self.table(FIELD),
            0x11 | 0x1b => self.blob(),
            0x12 => self.table(TYPE_DEF) + self.table(EVENT),
            0x13 => self.table(EVENT),
            0x14 => 2 + self.string() + self.type_def_or_ref(),
            0x15 => self.table(TYPE_DEF) + self.table(PROPERTY),
            0x16 => self.table(PROPERTY),
            0x17 => 2 + self.string() + self.blob(),
            0x18 => 2 + self.table(METHOD_DEF) + self.has_semantics(),
            0x19 => self.table(TYPE_DEF) + 2 * self.method_def_or_ref(),
            0x1a => self.string(),
            0x1c => 2 + self.member_forwarded() + self.string() + self.table(MODULE_REF),
            0x1d => 4 + self.table(FIELD),
            0x1e => 8,
            0x1f => 4,
            // Tables after Assembly are never skipped.
            _ => 0,
        }
    }
}
