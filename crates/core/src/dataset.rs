//! Reading the dataset written by the stream writer.

use crate::record::{csv_header, AppointmentRecord};
use crate::{CoreError, CoreResult};
use std::fs;
use std::path::Path;

/// Reads every record of the dataset at `path`.
pub fn read_dataset(path: &Path) -> CoreResult<Vec<AppointmentRecord>> {
    let text = fs::read_to_string(path).map_err(CoreError::DatasetRead)?;
    let records = parse_dataset(&text)?;
    tracing::info!("read {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Parses dataset text: an exact header line followed by one record per line.
///
/// A trailing row without its newline is accepted. Line numbers in errors are 1-based and count
/// the header.
pub fn parse_dataset(text: &str) -> CoreResult<Vec<AppointmentRecord>> {
    let mut lines = text.lines();
    let header = lines.next().unwrap_or_default();
    if header != csv_header() {
        return Err(CoreError::HeaderMismatch {
            found: header.to_string(),
        });
    }

    lines
        .enumerate()
        .filter(|(_, line)| !line.is_empty())
        .map(|(index, line)| {
            AppointmentRecord::parse_csv_row(line)
                .map_err(|reason| CoreError::DatasetParse { line: index + 2, reason })
        })
        .collect()
}

/// Serialises `records` in dataset format, header included.
pub fn encode_records(records: &[AppointmentRecord]) -> String {
    let mut out = csv_header();
    out.push('\n');
    for record in records {
        record.write_csv_row(&mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamWriter;
    use crate::synthesizer::Synthesizer;
    use tempfile::TempDir;

    #[test]
    fn test_written_stream_reencodes_byte_for_byte() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("stream.csv");
        let mut writer = StreamWriter::new(&path, Synthesizer::seeded(5).unwrap());
        let next = writer.seed(200, 1).unwrap();
        writer.append_batch(next, 25).unwrap();

        let original = fs::read_to_string(&path).unwrap();
        let records = read_dataset(&path).unwrap();
        assert_eq!(records.len(), 225);
        assert_eq!(encode_records(&records), original);
    }

    #[test]
    fn test_header_is_checked() {
        let err = parse_dataset("id,age\n1,2\n").unwrap_err();
        assert!(matches!(err, CoreError::HeaderMismatch { found } if found == "id,age"));
        assert!(matches!(
            parse_dataset(""),
            Err(CoreError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let text = format!(
            "{}\n1,40,Femenino,Norte,Fonasa A,Dental,Lunes,Tarde,3,0,0\n2,forty,Femenino,Norte,Fonasa A,Dental,Lunes,Tarde,3,0,0\n",
            csv_header()
        );
        let err = parse_dataset(&text).unwrap_err();
        assert!(matches!(err, CoreError::DatasetParse { line: 3, .. }), "got {err:?}");
    }

    #[test]
    fn test_header_only_is_empty_dataset() {
        let text = format!("{}\n", csv_header());
        assert!(parse_dataset(&text).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let result = read_dataset(&temp.path().join("absent.csv"));
        assert!(matches!(result, Err(CoreError::DatasetRead(_))));
    }
}
