//! Shared listing utilities: supported-type filtering, natural ordering,
//! and magic-byte container sniffing.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;

use crate::archive::ArchiveKind;

/// Image formats the viewer layer can display. Payloads are opaque here;
/// the set only drives listing filters and entry classification.
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "avif", "bmp", "dib", "gif", "ico", "jfif", "jpe", "jpeg", "jpg", "png", "svg", "tga", "tif",
    "tiff", "webp",
];

/// Container formats that can be entered as nested archives.
pub const ARCHIVE_EXTENSIONS: &[&str] = &[
    "zip", "cbz", "rar", "cbr", "7z", "cb7", "tar", "gz", "tgz", "pdf",
];

static IMAGE_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| IMAGE_EXTENSIONS.iter().copied().collect());

static ARCHIVE_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ARCHIVE_EXTENSIONS.iter().copied().collect());

fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase())
}

pub fn is_image_path(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| IMAGE_SET.contains(ext.as_str()))
}

pub fn is_archive_path(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| ARCHIVE_SET.contains(ext.as_str()))
}

/// Whether a listed member survives the filter: a displayable image or a
/// nested container.
pub fn is_supported(path: &Path) -> bool {
    extension_of(path).is_some_and(|ext| {
        IMAGE_SET.contains(ext.as_str()) || ARCHIVE_SET.contains(ext.as_str())
    })
}

/// Natural path ordering: per-component, case-insensitive, digit runs
/// compared numerically. Totalized with a byte-order tiebreak so equal-fold
/// names ("A.png" vs "a.png") still sort deterministically.
pub fn natural_cmp(a: &Path, b: &Path) -> Ordering {
    let mut left = a.components();
    let mut right = b.components();
    loop {
        match (left.next(), right.next()) {
            (Some(x), Some(y)) => {
                let xs = x.as_os_str().to_string_lossy();
                let ys = y.as_os_str().to_string_lossy();
                match natord::compare_ignore_case(&xs, &ys) {
                    Ordering::Equal => continue,
                    ord => return ord,
                }
            }
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return a.as_os_str().cmp(b.as_os_str()),
        }
    }
}

/// Detect a container format from leading magic bytes.
///
/// Used for nested archives read out of a parent container, where the member
/// name may carry no usable extension. Signatures:
/// ZIP `50 4B 03 04|05 06|07 08`, RAR4 `Rar!\x1A\x07\x00`,
/// RAR5 `Rar!\x1A\x07\x01\x00`, 7z `37 7A BC AF 27 1C`, PDF `%PDF`,
/// gzip `1F 8B`, POSIX tar `ustar` at offset 257.
pub fn detect_kind_from_bytes(data: &[u8]) -> Option<ArchiveKind> {
    if data.len() >= 4 {
        let magic = &data[0..4];
        if magic == b"PK\x03\x04" || magic == b"PK\x05\x06" || magic == b"PK\x07\x08" {
            return Some(ArchiveKind::Zip);
        }
        if magic == b"%PDF" {
            return Some(ArchiveKind::Pdf);
        }
    }
    if data.len() >= 6 && &data[0..6] == b"7z\xBC\xAF\x27\x1C" {
        return Some(ArchiveKind::SevenZip);
    }
    if data.len() >= 8 && &data[0..8] == b"Rar!\x1A\x07\x01\x00" {
        return Some(ArchiveKind::Rar);
    }
    if data.len() >= 7 && &data[0..7] == b"Rar!\x1A\x07\x00" {
        return Some(ArchiveKind::Rar);
    }
    if data.len() >= 2 && &data[0..2] == b"\x1F\x8B" {
        return Some(ArchiveKind::Tar);
    }
    if data.len() >= 262 && &data[257..262] == b"ustar" {
        return Some(ArchiveKind::Tar);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sorted(names: &[&str]) -> Vec<String> {
        let mut paths: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        paths.sort_by(|a, b| natural_cmp(a, b));
        paths
            .into_iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn digit_runs_compare_numerically() {
        assert_eq!(
            sorted(&["page10.jpg", "page2.jpg", "page1.jpg"]),
            vec!["page1.jpg", "page2.jpg", "page10.jpg"]
        );
    }

    #[test]
    fn ordering_is_case_insensitive() {
        assert_eq!(
            sorted(&["B.jpg", "a10.png", "A2.png", "a1.png"]),
            vec!["a1.png", "A2.png", "a10.png", "B.jpg"]
        );
    }

    #[test]
    fn ordering_is_component_aware() {
        assert_eq!(
            sorted(&["ch10/p1.png", "ch2/p1.png", "ch2/p10.png", "ch2/p2.png"]),
            vec!["ch2/p1.png", "ch2/p2.png", "ch2/p10.png", "ch10/p1.png"]
        );
    }

    #[test]
    fn shorter_path_sorts_first_on_shared_prefix() {
        let a = PathBuf::from("ch1");
        let b = PathBuf::from("ch1/p1.png");
        assert_eq!(natural_cmp(&a, &b), Ordering::Less);
    }

    #[test]
    fn supported_type_filter() {
        assert!(is_supported(Path::new("scan.JPEG")));
        assert!(is_supported(Path::new("inner.cbz")));
        assert!(is_supported(Path::new("book.pdf")));
        assert!(!is_supported(Path::new("readme.txt")));
        assert!(!is_supported(Path::new("noextension")));
    }

    #[test]
    fn image_vs_archive_classification() {
        assert!(is_image_path(Path::new("a.webp")));
        assert!(!is_image_path(Path::new("a.zip")));
        assert!(is_archive_path(Path::new("a.tgz")));
        assert!(!is_archive_path(Path::new("a.png")));
    }

    #[test]
    fn detect_zip() {
        assert_eq!(
            detect_kind_from_bytes(b"PK\x03\x04\x14\x00\x00\x00"),
            Some(ArchiveKind::Zip)
        );
    }

    #[test]
    fn detect_rar_versions() {
        assert_eq!(
            detect_kind_from_bytes(b"Rar!\x1A\x07\x00\x00"),
            Some(ArchiveKind::Rar)
        );
        assert_eq!(
            detect_kind_from_bytes(b"Rar!\x1A\x07\x01\x00"),
            Some(ArchiveKind::Rar)
        );
    }

    #[test]
    fn detect_sevenz_pdf_gzip() {
        assert_eq!(
            detect_kind_from_bytes(b"7z\xBC\xAF\x27\x1C\x00\x04"),
            Some(ArchiveKind::SevenZip)
        );
        assert_eq!(
            detect_kind_from_bytes(b"%PDF-1.5\n"),
            Some(ArchiveKind::Pdf)
        );
        assert_eq!(
            detect_kind_from_bytes(b"\x1F\x8B\x08\x00"),
            Some(ArchiveKind::Tar)
        );
    }

    #[test]
    fn detect_tar_at_offset() {
        let mut data = vec![0u8; 512];
        data[257..262].copy_from_slice(b"ustar");
        assert_eq!(detect_kind_from_bytes(&data), Some(ArchiveKind::Tar));
    }

    #[test]
    fn detect_rejects_unknown_and_short() {
        assert_eq!(detect_kind_from_bytes(b"UNKNOWN\x00\x00"), None);
        assert_eq!(detect_kind_from_bytes(b"PK"), None);
    }
}
