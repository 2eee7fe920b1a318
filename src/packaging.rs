//! Output packaging
//!
//! Bundles per-row outputs into the final deliverable. Naming is
//! deterministic and sequential so repeated runs on the same input
//! produce identical archives; the zip entries carry a fixed timestamp
//! for the same reason.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

use crate::error::RenderResult;

/// One finished per-row output ready for archiving
pub struct RowFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Stable per-row file name: `Certificate-<rowIndex+1>.<ext>`
pub fn row_file_name(row_index: usize, extension: &str) -> String {
    format!("Certificate-{}.{}", row_index + 1, extension)
}

/// Bundle files into an in-memory zip archive
pub fn build_zip(files: &[RowFile]) -> RenderResult<Vec<u8>> {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        let options = SimpleFileOptions::default()
            .unix_permissions(0o644)
            .last_modified_time(zip::DateTime::default());

        for file in files {
            zip.start_file(file.name.as_str(), options)?;
            zip.write_all(&file.bytes)?;
        }

        zip.finish()?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zip::ZipArchive;

    #[test]
    fn test_row_file_names_are_one_based() {
        assert_eq!(row_file_name(0, "pdf"), "Certificate-1.pdf");
        assert_eq!(row_file_name(2, "png"), "Certificate-3.png");
    }

    #[test]
    fn test_zip_preserves_order_and_content() {
        let files = vec![
            RowFile { name: row_file_name(0, "pdf"), bytes: b"first".to_vec() },
            RowFile { name: row_file_name(1, "pdf"), bytes: b"second".to_vec() },
        ];
        let bytes = build_zip(&files).unwrap();

        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.by_index(0).unwrap().name(), "Certificate-1.pdf");
        assert_eq!(archive.by_index(1).unwrap().name(), "Certificate-2.pdf");
    }

    #[test]
    fn test_zip_is_deterministic() {
        let files = vec![RowFile { name: row_file_name(0, "pdf"), bytes: b"same".to_vec() }];
        let a = build_zip(&files).unwrap();
        let b = build_zip(&files).unwrap();
        assert_eq!(a, b);
    }
}
