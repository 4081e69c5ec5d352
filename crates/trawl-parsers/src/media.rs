//! Media header parsing: image dimensions straight from header bytes and glTF
//! metadata from the JSON chunk. Nothing here decodes pixel data.

use crate::detect::Format;
use crate::ir::{GltfMeta, MediaCategory, MediaInfo};
use trawl_core::hash::short_hash_bytes;

/// Media content hashes cover at most this many leading bytes.
const HASH_WINDOW: usize = 64 * 1024;

/// Parse a media file's header. `extract_dimensions` and `parse_gltf_metadata`
/// mirror the config knobs.
pub fn parse(
    format: Format,
    bytes: &[u8],
    extract_dimensions: bool,
    parse_gltf_metadata: bool,
) -> MediaInfo {
    let window = &bytes[..bytes.len().min(HASH_WINDOW)];
    let category = match format {
        Format::Gltf | Format::Glb => MediaCategory::ThreeD,
        _ => MediaCategory::Image,
    };

    let mut info = MediaInfo {
        format: format.as_str().to_string(),
        category,
        size: bytes.len() as u64,
        hash: short_hash_bytes(window),
        width: None,
        height: None,
        gltf: None,
        analyzed: false,
        vision_description: None,
    };

    if extract_dimensions {
        let dims = match format {
            Format::Png => png_dimensions(bytes),
            Format::Jpeg => jpeg_dimensions(bytes),
            Format::Gif => gif_dimensions(bytes),
            Format::Webp => webp_dimensions(bytes),
            Format::Bmp => bmp_dimensions(bytes),
            _ => None,
        };
        if let Some((w, h)) = dims {
            info.width = Some(w);
            info.height = Some(h);
        }
    }

    if parse_gltf_metadata {
        info.gltf = match format {
            Format::Gltf => gltf_meta(bytes),
            Format::Glb => glb_meta(bytes),
            _ => None,
        };
    }

    info
}

/// PNG: IHDR is the first chunk; width/height are big-endian u32 at 16 and 20.
fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 24 || !bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return None;
    }
    let width = u32::from_be_bytes(bytes[16..20].try_into().ok()?);
    let height = u32::from_be_bytes(bytes[20..24].try_into().ok()?);
    Some((width, height))
}

/// JPEG: scan segment markers until a start-of-frame carries the dimensions.
fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        return None;
    }
    let mut i = 2;
    while i + 9 < bytes.len() {
        if bytes[i] != 0xFF {
            i += 1;
            continue;
        }
        let marker = bytes[i + 1];
        // SOF0–SOF15 minus the non-frame markers DHT (C4), JPG (C8), DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            let height = u16::from_be_bytes([bytes[i + 5], bytes[i + 6]]) as u32;
            let width = u16::from_be_bytes([bytes[i + 7], bytes[i + 8]]) as u32;
            return Some((width, height));
        }
        // Skip over the segment payload
        let len = u16::from_be_bytes([bytes[i + 2], bytes[i + 3]]) as usize;
        i += 2 + len;
    }
    None
}

/// GIF: logical screen descriptor, little-endian u16 at offsets 6 and 8.
fn gif_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 10 || !bytes.starts_with(b"GIF8") {
        return None;
    }
    let width = u16::from_le_bytes([bytes[6], bytes[7]]) as u32;
    let height = u16::from_le_bytes([bytes[8], bytes[9]]) as u32;
    Some((width, height))
}

/// WebP: RIFF container; VP8 / VP8L / VP8X chunks carry dimensions differently.
fn webp_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 30 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WEBP" {
        return None;
    }
    match &bytes[12..16] {
        b"VP8 " => {
            // Lossy: frame header at 20, dimensions are 14-bit LE at 26/28
            let width = (u16::from_le_bytes([bytes[26], bytes[27]]) & 0x3FFF) as u32;
            let height = (u16::from_le_bytes([bytes[28], bytes[29]]) & 0x3FFF) as u32;
            Some((width, height))
        }
        b"VP8L" => {
            // Lossless: 14-bit fields packed after the signature byte at 20
            let b = &bytes[21..25];
            let width = 1 + (((b[1] as u32 & 0x3F) << 8) | b[0] as u32);
            let height = 1 + (((b[3] as u32 & 0x0F) << 10) | ((b[2] as u32) << 2) | ((b[1] as u32 & 0xC0) >> 6));
            Some((width, height))
        }
        b"VP8X" => {
            // Extended: 24-bit minus-one fields at 24 and 27
            let width = 1 + u32::from_le_bytes([bytes[24], bytes[25], bytes[26], 0]);
            let height = 1 + u32::from_le_bytes([bytes[27], bytes[28], bytes[29], 0]);
            Some((width, height))
        }
        _ => None,
    }
}

/// BMP: BITMAPINFOHEADER, little-endian i32 at offsets 18 and 22.
fn bmp_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.len() < 26 || !bytes.starts_with(b"BM") {
        return None;
    }
    let width = i32::from_le_bytes(bytes[18..22].try_into().ok()?);
    let height = i32::from_le_bytes(bytes[22..26].try_into().ok()?);
    // Height may be negative for top-down bitmaps
    Some((width.unsigned_abs(), height.unsigned_abs()))
}

fn gltf_meta(bytes: &[u8]) -> Option<GltfMeta> {
    let json: serde_json::Value = serde_json::from_slice(bytes).ok()?;
    Some(meta_from_json(&json))
}

/// GLB: 12-byte header, then chunk 0 must be JSON.
fn glb_meta(bytes: &[u8]) -> Option<GltfMeta> {
    if bytes.len() < 20 || !bytes.starts_with(b"glTF") {
        return None;
    }
    let chunk_len = u32::from_le_bytes(bytes[12..16].try_into().ok()?) as usize;
    if &bytes[16..20] != b"JSON" || bytes.len() < 20 + chunk_len {
        return None;
    }
    let json: serde_json::Value = serde_json::from_slice(&bytes[20..20 + chunk_len]).ok()?;
    Some(meta_from_json(&json))
}

fn meta_from_json(json: &serde_json::Value) -> GltfMeta {
    let count_of = |key: &str| json.get(key).and_then(|v| v.as_array()).map_or(0, |a| a.len());
    GltfMeta {
        generator: json
            .pointer("/asset/generator")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        version: json
            .pointer("/asset/version")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        mesh_count: count_of("meshes"),
        material_count: count_of("materials"),
        node_count: count_of("nodes"),
        animation_count: count_of("animations"),
    }
}
