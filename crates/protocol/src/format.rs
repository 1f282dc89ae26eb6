//! Document format sniffing
//!
//! Print jobs carry no format metadata, so the container type is guessed from
//! leading magic bytes. Detection is best effort: a ZIP that happens to
//! contain an OPC content-types entry reads as XPS, and text-vs-binary only
//! looks at the first 50 bytes.

use serde::{Deserialize, Serialize};

use crate::control::ESC;

/// How far into a ZIP container the XPS part markers are searched for
pub const SNIFF_WINDOW: usize = 2000;

/// PCL is only assumed for escape-led buffers longer than this
const PCL_MIN_LEN: usize = 100;

/// Prefix length inspected by the text heuristic
const TEXT_PROBE_LEN: usize = 50;

const PREVIEW_SOURCE_LEN: usize = 200;
const PREVIEW_CHARS: usize = 60;

const XPS_MARKERS: [&[u8]; 2] = [b"[Content_Types].xml", b"_rels/.rels"];

/// Container format detected for a captured job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Empty,
    Xps,
    Zip,
    Pdf,
    #[serde(rename = "postscript")]
    PostScript,
    Pcl,
    Text,
    Binary,
}

/// Output formats the downstream converter can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionTarget {
    Pdf,
    Png,
    Txt,
}

impl std::fmt::Display for ConversionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ConversionTarget::Pdf => "pdf",
            ConversionTarget::Png => "png",
            ConversionTarget::Txt => "txt",
        })
    }
}

impl DocumentFormat {
    /// File extension including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            DocumentFormat::Empty | DocumentFormat::Text => ".txt",
            DocumentFormat::Xps => ".xps",
            DocumentFormat::Zip => ".zip",
            DocumentFormat::Pdf => ".pdf",
            DocumentFormat::PostScript => ".ps",
            DocumentFormat::Pcl => ".pcl",
            DocumentFormat::Binary => ".bin",
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            DocumentFormat::Empty => "Empty",
            DocumentFormat::Xps => "XPS",
            DocumentFormat::Zip => "ZIP",
            DocumentFormat::Pdf => "PDF",
            DocumentFormat::PostScript => "PostScript",
            DocumentFormat::Pcl => "PCL",
            DocumentFormat::Text => "Text",
            DocumentFormat::Binary => "Binary",
        }
    }

    /// Conversions the downstream converter declares for this format
    pub fn conversion_targets(&self) -> &'static [ConversionTarget] {
        match self {
            DocumentFormat::Xps => &[ConversionTarget::Pdf, ConversionTarget::Png],
            DocumentFormat::PostScript => &[
                ConversionTarget::Pdf,
                ConversionTarget::Png,
                ConversionTarget::Txt,
            ],
            DocumentFormat::Pcl => &[ConversionTarget::Pdf, ConversionTarget::Txt],
            _ => &[],
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Guess the container format of a document buffer
///
/// First match wins. Never fails; unrecognised content is `Binary`.
pub fn detect(data: &[u8]) -> DocumentFormat {
    if data.is_empty() {
        return DocumentFormat::Empty;
    }

    if data.starts_with(b"PK") {
        let window = &data[..data.len().min(SNIFF_WINDOW)];
        if XPS_MARKERS.iter().any(|marker| contains(window, marker)) {
            return DocumentFormat::Xps;
        }
        return DocumentFormat::Zip;
    }

    if data.starts_with(b"%PDF") {
        DocumentFormat::Pdf
    } else if data.starts_with(b"%!PS") {
        DocumentFormat::PostScript
    } else if data[0] == ESC && data.len() > PCL_MIN_LEN {
        DocumentFormat::Pcl
    } else if data
        .iter()
        .take(TEXT_PROBE_LEN)
        .filter(|&&b| b != 0)
        .all(|b| b.is_ascii())
    {
        DocumentFormat::Text
    } else {
        DocumentFormat::Binary
    }
}

/// Short operator preview of a text job
///
/// Decodes the first 200 bytes as UTF-8, dropping invalid sequences, and
/// returns at most 60 characters of the trimmed result.
pub fn text_preview(data: &[u8]) -> Option<String> {
    let head = &data[..data.len().min(PREVIEW_SOURCE_LEN)];

    let mut decoded = String::with_capacity(head.len());
    for chunk in head.utf8_chunks() {
        decoded.push_str(chunk.valid());
    }

    let trimmed = decoded.trim();
    if trimmed.is_empty() {
        return None;
    }

    Some(trimmed.chars().take(PREVIEW_CHARS).collect())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty() {
        assert_eq!(detect(b""), DocumentFormat::Empty);
        assert_eq!(DocumentFormat::Empty.extension(), ".txt");
    }

    #[test]
    fn test_xps_marker_beyond_window() {
        let mut data = b"PK\x03\x04".to_vec();
        data.resize(SNIFF_WINDOW, 0);
        data.extend_from_slice(b"[Content_Types].xml");
        assert_eq!(detect(&data), DocumentFormat::Zip);
    }

    #[test]
    fn test_rels_marker() {
        let data = b"PK\x03\x04\x14\x00_rels/.rels".to_vec();
        assert_eq!(detect(&data), DocumentFormat::Xps);
    }

    #[test]
    fn test_short_escape_is_not_pcl() {
        let mut data = vec![ESC];
        data.extend_from_slice(b"E@PJL");
        assert_eq!(detect(&data), DocumentFormat::Text);

        data.resize(101, b'x');
        assert_eq!(detect(&data), DocumentFormat::Pcl);
    }

    #[test]
    fn test_text_ignores_nul() {
        assert_eq!(detect(b"h\0e\0l\0l\0o\0"), DocumentFormat::Text);
    }

    #[test]
    fn test_binary_only_probes_prefix() {
        let mut data = vec![b'a'; TEXT_PROBE_LEN];
        data.push(0xFF);
        assert_eq!(detect(&data), DocumentFormat::Text);

        assert_eq!(detect(&[0x80, 0x81, 0x82]), DocumentFormat::Binary);
    }

    #[test]
    fn test_conversion_table() {
        assert_eq!(
            DocumentFormat::PostScript.conversion_targets(),
            &[ConversionTarget::Pdf, ConversionTarget::Png, ConversionTarget::Txt]
        );
        assert!(DocumentFormat::Pdf.conversion_targets().is_empty());
        assert!(DocumentFormat::Text.conversion_targets().is_empty());
    }

    #[test]
    fn test_preview_drops_invalid_utf8() {
        let preview = text_preview(b"  Hello\xFF World  \n").unwrap();
        assert_eq!(preview, "Hello World");
    }

    #[test]
    fn test_preview_truncates() {
        let data = "x".repeat(500);
        assert_eq!(text_preview(data.as_bytes()).unwrap().len(), PREVIEW_CHARS);
        assert!(text_preview(b"   \n\t").is_none());
    }
}
