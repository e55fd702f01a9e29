//! Container-level metadata scanner for JPEG, PNG and WebP.
//!
//! Walks the file's segment/chunk structure and lists every block that
//! carries metadata rather than pixels:
//!
//! | Container | Blocks reported |
//! |---|---|
//! | JPEG | APP1 Exif / XMP, APP2 ICC, APP13 Photoshop (IPTC), other APPn except JFIF, COM |
//! | PNG | `eXIf`, `iCCP`, `tEXt`, `zTXt`, `iTXt`, `tIME` |
//! | WebP | `EXIF`, `XMP `, `ICCP` |
//!
//! The scanner never decodes pixels and never fails: unreadable or truncated
//! files simply report what was found before the damage.

use std::fmt;
use std::path::Path;

/// Kind of an embedded metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataKind {
    Exif,
    Xmp,
    IccProfile,
    Iptc,
    /// Photoshop resource block without IPTC data, or an unrecognized APPn.
    Application,
    Text,
    Timestamp,
    Comment,
}

impl fmt::Display for MetadataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MetadataKind::Exif => "EXIF",
            MetadataKind::Xmp => "XMP",
            MetadataKind::IccProfile => "ICC profile",
            MetadataKind::Iptc => "IPTC",
            MetadataKind::Application => "application data",
            MetadataKind::Text => "text",
            MetadataKind::Timestamp => "timestamp",
            MetadataKind::Comment => "comment",
        })
    }
}

/// Metadata blocks found in one file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataReport {
    pub blocks: Vec<MetadataKind>,
}

impl MetadataReport {
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, kind: MetadataKind) -> bool {
        self.blocks.contains(&kind)
    }
}

/// Scan a file, dispatching on its magic bytes rather than its extension.
pub fn scan_file(path: &Path) -> std::io::Result<MetadataReport> {
    let bytes = std::fs::read(path)?;
    Ok(scan_bytes(&bytes))
}

/// Scan an in-memory file.
pub fn scan_bytes(data: &[u8]) -> MetadataReport {
    let blocks = if data.starts_with(&[0xFF, 0xD8]) {
        scan_jpeg(data)
    } else if data.starts_with(PNG_SIGNATURE) {
        scan_png(data)
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        scan_webp(data)
    } else {
        Vec::new()
    };
    MetadataReport { blocks }
}

// ---------------------------------------------------------------------------
// JPEG
// ---------------------------------------------------------------------------

const EXIF_HEADER: &[u8] = b"Exif\0";
const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/";
const ICC_HEADER: &[u8] = b"ICC_PROFILE\0";
const PHOTOSHOP_HEADER: &[u8] = b"Photoshop 3.0\0";
const BIM_MARKER: &[u8] = b"8BIM";
const IPTC_RESOURCE_ID: u16 = 0x0404;

/// Walk JPEG marker segments up to the start of scan.
fn scan_jpeg(data: &[u8]) -> Vec<MetadataKind> {
    let mut blocks = Vec::new();
    let mut pos = 2;

    while pos + 4 <= data.len() {
        if data[pos] != 0xFF {
            break;
        }
        let marker = data[pos + 1];
        // Fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        // SOS (0xDA): entropy-coded data follows, no more headers
        if marker == 0xDA || marker == 0xD9 {
            break;
        }
        // Markers without length field
        if marker == 0x01 || (0xD0..=0xD7).contains(&marker) {
            pos += 2;
            continue;
        }

        let seg_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
        if seg_len < 2 {
            break;
        }
        let seg_start = pos + 4;
        let seg_end = (pos + 2 + seg_len).min(data.len());
        let payload = &data[seg_start.min(seg_end)..seg_end];

        match marker {
            0xE0 if payload.starts_with(b"JFIF\0") || payload.starts_with(b"JFXX\0") => {}
            0xE1 if payload.starts_with(EXIF_HEADER) => blocks.push(MetadataKind::Exif),
            0xE1 if payload.starts_with(XMP_HEADER) => blocks.push(MetadataKind::Xmp),
            0xE2 if payload.starts_with(ICC_HEADER) => blocks.push(MetadataKind::IccProfile),
            0xED if has_iptc_resource(payload) => blocks.push(MetadataKind::Iptc),
            0xE0..=0xEF => blocks.push(MetadataKind::Application),
            0xFE => blocks.push(MetadataKind::Comment),
            _ => {}
        }

        pos += 2 + seg_len;
    }

    blocks
}

/// Whether an APP13 payload holds a Photoshop 8BIM IPTC resource (0x0404).
fn has_iptc_resource(segment: &[u8]) -> bool {
    let data = segment.strip_prefix(PHOTOSHOP_HEADER).unwrap_or(segment);

    let mut pos = 0;
    while pos + 12 <= data.len() {
        // Each resource: "8BIM" (4) + resource_id (2) + pascal_string + data_len (4) + data
        if &data[pos..pos + 4] != BIM_MARKER {
            pos += 1;
            continue;
        }
        pos += 4;

        let resource_id = u16::from_be_bytes([data[pos], data[pos + 1]]);
        pos += 2;

        // Pascal string: 1 byte length + string, padded to even total
        let pascal_len = data[pos] as usize;
        pos += 1 + pascal_len + ((1 + pascal_len) % 2);

        if pos + 4 > data.len() {
            break;
        }
        let res_len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        pos += 4;

        if resource_id == IPTC_RESOURCE_ID {
            return pos + res_len <= data.len();
        }

        pos += res_len + (res_len % 2);
    }

    false
}

// ---------------------------------------------------------------------------
// PNG
// ---------------------------------------------------------------------------

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Walk PNG chunks until IEND.
fn scan_png(data: &[u8]) -> Vec<MetadataKind> {
    let mut blocks = Vec::new();
    let mut pos = PNG_SIGNATURE.len();

    // Each chunk: length (4, BE) + type (4) + data + CRC (4)
    while pos + 8 <= data.len() {
        let len =
            u32::from_be_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]]) as usize;
        let chunk_type = &data[pos + 4..pos + 8];

        match chunk_type {
            b"eXIf" => blocks.push(MetadataKind::Exif),
            b"iCCP" => blocks.push(MetadataKind::IccProfile),
            b"tEXt" | b"zTXt" => blocks.push(MetadataKind::Text),
            b"iTXt" => {
                let body = &data[(pos + 8).min(data.len())..(pos + 8 + len).min(data.len())];
                if body.starts_with(b"XML:com.adobe.xmp\0") {
                    blocks.push(MetadataKind::Xmp);
                } else {
                    blocks.push(MetadataKind::Text);
                }
            }
            b"tIME" => blocks.push(MetadataKind::Timestamp),
            b"IEND" => break,
            _ => {}
        }

        pos += 12 + len;
    }

    blocks
}

// ---------------------------------------------------------------------------
// WebP
// ---------------------------------------------------------------------------

/// Walk RIFF chunks after the 12-byte `RIFF....WEBP` header.
fn scan_webp(data: &[u8]) -> Vec<MetadataKind> {
    let mut blocks = Vec::new();
    let mut pos = 12;

    // Each chunk: fourcc (4) + size (4, LE) + payload, padded to even
    while pos + 8 <= data.len() {
        let fourcc = &data[pos..pos + 4];
        let size =
            u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                as usize;

        match fourcc {
            b"EXIF" => blocks.push(MetadataKind::Exif),
            b"XMP " => blocks.push(MetadataKind::Xmp),
            b"ICCP" => blocks.push(MetadataKind::IccProfile),
            _ => {}
        }

        pos += 8 + size + (size % 2);
    }

    blocks
}
