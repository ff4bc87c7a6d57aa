//! Synthesized PE modules for integration tests.
//!
//! Images have a single section mapping RVA `0x1000` to file offset `0x200`.
//! A managed module carries a CLR header and a metadata root with `Module`,
//! `TypeDef` and `Assembly` rows. A native module carries a resource tree
//! with one `RT_VERSION` entry.

#![allow(dead_code)]

use std::fs;
use std::path::Path;

const PE_OFFSET: usize = 0x80;
const SECTION_RVA: u32 = 0x1000;
const SECTION_FILE_OFFSET: usize = 0x200;
const CLR_DIRECTORY: usize = 14;
const RESOURCE_DIRECTORY: usize = 2;

/// Builder for a test module.
#[derive(Debug, Clone, Default)]
pub struct Module {
    assembly_version: Option<[u16; 4]>,
    strings: Vec<(String, String)>,
    fixed_version: Option<[u16; 4]>,
    pe32_plus: bool,
}

impl Module {
    /// A managed module declaring `version` in its `Assembly` table.
    pub fn managed(version: [u16; 4]) -> Self {
        Self { assembly_version: Some(version), ..Self::default() }
    }

    /// A native module with a version resource and no strings yet.
    pub fn native() -> Self {
        Self::default()
    }

    /// Adds a string to the version resource's string table.
    pub fn string(mut self, key: &str, value: &str) -> Self {
        self.strings.push((key.to_string(), value.to_string()));
        self
    }

    /// Sets the `VS_FIXEDFILEINFO` file version.
    pub fn fixed(mut self, version: [u16; 4]) -> Self {
        self.fixed_version = Some(version);
        self
    }

    /// Emits a PE32+ optional header instead of PE32.
    pub fn pe32_plus(mut self) -> Self {
        self.pe32_plus = true;
        self
    }

    /// Serializes the image.
    pub fn build(&self) -> Vec<u8> {
        let mut section = Vec::new();
        let mut directories = Vec::new();

        if let Some(version) = self.assembly_version {
            let metadata = metadata(version);
            let metadata_rva = SECTION_RVA + 72;
            let mut cor = vec![0u8; 72];
            put_u32(&mut cor, 0, 72);
            put_u32(&mut cor, 8, metadata_rva);
            put_u32(&mut cor, 12, len_u32(&metadata));
            directories.push((CLR_DIRECTORY, SECTION_RVA, 72));
            section.extend(cor);
            section.extend(metadata);
        } else if !self.strings.is_empty() || self.fixed_version.is_some() {
            let resources = resource_tree(SECTION_RVA, &self.version_blob());
            directories.push((RESOURCE_DIRECTORY, SECTION_RVA, len_u32(&resources)));
            section.extend(resources);
        }
        pad_to(&mut section, 0x200);

        self.headers(&directories, &section)
    }

    /// Writes the image to `path`, creating parent directories.
    pub fn write(&self, path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, self.build()).unwrap();
    }

    fn headers(&self, directories: &[(usize, u32, u32)], section: &[u8]) -> Vec<u8> {
        let mut image = vec![0u8; SECTION_FILE_OFFSET];
        image[0..2].copy_from_slice(b"MZ");
        put_u32(&mut image, 0x3c, PE_OFFSET as u32);
        image[PE_OFFSET..PE_OFFSET + 4].copy_from_slice(b"PE\0\0");

        let coff = PE_OFFSET + 4;
        let (magic, optional_size, count_at, dirs_at) =
            if self.pe32_plus { (0x20bu16, 240u16, 108, 112) } else { (0x10b, 224, 92, 96) };
        put_u16(&mut image, coff, if self.pe32_plus { 0x8664 } else { 0x14c });
        put_u16(&mut image, coff + 2, 1);
        put_u16(&mut image, coff + 16, optional_size);

        let optional = coff + 20;
        put_u16(&mut image, optional, magic);
        put_u32(&mut image, optional + count_at, 16);
        for (index, rva, size) in directories {
            put_u32(&mut image, optional + dirs_at + index * 8, *rva);
            put_u32(&mut image, optional + dirs_at + index * 8 + 4, *size);
        }

        let table = optional + usize::from(optional_size);
        image[table..table + 6].copy_from_slice(b".text\0");
        put_u32(&mut image, table + 8, len_u32(section));
        put_u32(&mut image, table + 12, SECTION_RVA);
        put_u32(&mut image, table + 16, len_u32(section));
        put_u32(&mut image, table + 20, SECTION_FILE_OFFSET as u32);

        image.extend_from_slice(section);
        image
    }

    fn version_blob(&self) -> Vec<u8> {
        let mut fixed = vec![0u8; 52];
        if let Some([a, b, c, d]) = self.fixed_version {
            put_u32(&mut fixed, 0, 0xfeef_04bd);
            put_u32(&mut fixed, 8, (u32::from(a) << 16) | u32::from(b));
            put_u32(&mut fixed, 12, (u32::from(c) << 16) | u32::from(d));
        }
        let entries: Vec<Vec<u8>> = self
            .strings
            .iter()
            .map(|(key, value)| {
                let encoded = utf16z(value);
                let chars = u16::try_from(encoded.len() / 2).unwrap();
                block(key, true, &encoded, chars, &[])
            })
            .collect();
        let table = block("040904b0", true, &[], 0, &entries);
        let info = block("StringFileInfo", true, &[], 0, &[table]);
        block("VS_VERSION_INFO", false, &fixed, 52, &[info])
    }
}

fn metadata(version: [u16; 4]) -> Vec<u8> {
    const MODULE: u32 = 0x00;
    const TYPE_DEF: u32 = 0x02;
    const ASSEMBLY: u32 = 0x20;

    let mut stream = vec![0u8; 8];
    stream[4] = 2;
    let valid = (1u64 << MODULE) | (1u64 << TYPE_DEF) | (1u64 << ASSEMBLY);
    stream.extend(valid.to_le_bytes());
    stream.extend(0u64.to_le_bytes());
    for rows in [1u32, 2, 1] {
        stream.extend(rows.to_le_bytes());
    }
    // Module: 10 bytes; TypeDef: 14 bytes each with narrow heaps and indexes.
    stream.extend([0x11u8; 10]);
    stream.extend([0x22u8; 28]);
    stream.extend(0x8004u32.to_le_bytes());
    for part in version {
        stream.extend(part.to_le_bytes());
    }
    stream.extend([0u8; 4 + 2 + 2 + 2]);
    pad_to(&mut stream, 4);

    let mut root = Vec::new();
    root.extend(0x424a_5342u32.to_le_bytes());
    root.extend(1u16.to_le_bytes());
    root.extend(1u16.to_le_bytes());
    root.extend(0u32.to_le_bytes());
    root.extend(12u32.to_le_bytes());
    root.extend(b"v4.0.30319\0\0");
    root.extend(0u16.to_le_bytes());
    root.extend(1u16.to_le_bytes());
    let stream_offset = len_u32(&root) + 12;
    root.extend(stream_offset.to_le_bytes());
    root.extend(len_u32(&stream).to_le_bytes());
    root.extend(b"#~\0\0");
    root.extend(stream);
    root
}

/// Resource tree with one type/name/language path to the version blob.
///
/// Directories at 0, 24 and 48, the data entry at 72, the blob at 88.
fn resource_tree(base_rva: u32, blob: &[u8]) -> Vec<u8> {
    let mut tree = vec![0u8; 88];
    for (dir, id, next) in [(0usize, 16u32, 24u32 | 0x8000_0000), (24, 1, 48 | 0x8000_0000), (48, 0x409, 72)]
    {
        put_u16(&mut tree, dir + 14, 1);
        put_u32(&mut tree, dir + 16, id);
        put_u32(&mut tree, dir + 20, next);
    }
    put_u32(&mut tree, 72, base_rva + 88);
    put_u32(&mut tree, 76, len_u32(blob));
    tree.extend_from_slice(blob);
    tree
}

fn block(key: &str, is_text: bool, value: &[u8], value_length: u16, children: &[Vec<u8>]) -> Vec<u8> {
    let mut out = vec![0, 0];
    out.extend(value_length.to_le_bytes());
    out.extend(u16::from(is_text).to_le_bytes());
    out.extend(utf16z(key));
    pad_to(&mut out, 4);
    out.extend_from_slice(value);
    for child in children {
        pad_to(&mut out, 4);
        out.extend_from_slice(child);
    }
    let length = u16::try_from(out.len()).unwrap();
    out[0..2].copy_from_slice(&length.to_le_bytes());
    out
}

fn utf16z(text: &str) -> Vec<u8> {
    text.encode_utf16().chain([0]).flat_map(u16::to_le_bytes).collect()
}

fn pad_to(out: &mut Vec<u8>, align: usize) {
    while out.len() % align != 0 {
        out.push(0);
    }
}

fn len_u32(bytes: &[u8]) -> u32 {
    u32::try_from(bytes.len()).unwrap()
}

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
}
