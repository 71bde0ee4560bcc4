// Export bundle as a gzip-compressed tar archive

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{AnalyzerError, Result};
use crate::report::{ExportBundle, SUMMARY_FILE_NAME, TABLE_FILE_NAME};

/// Write `bundle` as a `.tar.gz` stream; entries carry `generated_at` as mtime
pub fn write_archive<W: Write>(bundle: &ExportBundle, generated_at: DateTime<Utc>, writer: W) -> Result<W> {
    let encoder = GzEncoder::new(writer, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    let mtime = generated_at.timestamp().max(0) as u64;

    for (name, contents) in [
        (SUMMARY_FILE_NAME, bundle.summary_markdown.as_bytes()),
        (TABLE_FILE_NAME, bundle.table_csv.as_bytes()),
    ] {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(mtime);
        header.set_cksum();
        builder.append_data(&mut header, name, contents)?;
    }

    let encoder = builder.into_inner()?;
    Ok(encoder.finish()?)
}

/// Restore a bundle from a `.tar.gz` stream
pub fn read_archive<R: Read>(reader: R) -> Result<ExportBundle> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut summary_markdown = None;
    let mut table_csv = None;

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().into_owned();
        let mut contents = String::new();
        entry.read_to_string(&mut contents)?;

        match name.as_str() {
            SUMMARY_FILE_NAME => summary_markdown = Some(contents),
            TABLE_FILE_NAME => table_csv = Some(contents),
            other => log::warn!("Ignoring unexpected archive entry {}", other),
        }
    }

    match (summary_markdown, table_csv) {
        (Some(summary_markdown), Some(table_csv)) => Ok(ExportBundle {
            summary_markdown,
            table_csv,
        }),
        _ => Err(AnalyzerError::validation(format!(
            "archive must contain {} and {}",
            SUMMARY_FILE_NAME, TABLE_FILE_NAME
        ))),
    }
}

pub fn export_archive(bundle: &ExportBundle, generated_at: DateTime<Utc>, path: &Path) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = write_archive(bundle, generated_at, BufWriter::new(file))?;
    writer.flush()?;
    log::info!("Exported report archive to {}", path.display());
    Ok(())
}

pub fn import_archive(path: &Path) -> Result<ExportBundle> {
    read_archive(BufReader::new(File::open(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle() -> ExportBundle {
        ExportBundle {
            summary_markdown: "AI Customer Feedback Analysis Report Summary\n".to_string(),
            table_csv: "id,feedback_text_cleaned,sentiment,topics,status\n1,ok,Neutral,,classified\n"
                .to_string(),
        }
    }

    #[test]
    fn test_round_trip_in_memory() {
        let bytes = write_archive(&bundle(), Utc::now(), Vec::new()).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);
        assert_eq!(read_archive(bytes.as_slice()).unwrap(), bundle());
    }

    #[test]
    fn test_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feedback_analysis_report.tar.gz");
        export_archive(&bundle(), Utc::now(), &path).unwrap();
        assert_eq!(import_archive(&path).unwrap(), bundle());
    }

    #[test]
    fn test_incomplete_archive() {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        let mut header = tar::Header::new_gnu();
        header.set_size(2);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, SUMMARY_FILE_NAME, &b"hi"[..])
            .unwrap();
        let bytes = builder.into_inner().unwrap().finish().unwrap();

        let result = read_archive(bytes.as_slice());
        assert!(matches!(result, Err(AnalyzerError::Validation(_))));
    }
}
