use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use rust_xlsxwriter::Workbook;

use crate::error::ExtractError;
use crate::model::{OUTPUT_HEADERS, TransactionRecord};
use crate::options::OutputFormat;

pub const XLSX_SHEET_NAME: &str = "Sheet1";

/// Writes the statement table: a CSV with the fixed header row, a JSON array
/// of records, or an XLSX workbook laid out like the CSV.
pub fn write_table<W: Write>(
    writer: W,
    records: &[TransactionRecord],
    format: OutputFormat,
    delimiter: u8,
) -> Result<(), ExtractError> {
    match format {
        OutputFormat::Csv => {
            let mut writer = WriterBuilder::new().delimiter(delimiter).from_writer(writer);
            writer.write_record(OUTPUT_HEADERS)?;
            for record in records {
                writer.write_record(record.to_row())?;
            }
            writer.flush()?;
        }
        OutputFormat::Json => {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.write_all(b"\n")?;
            writer.flush()?;
        }
        OutputFormat::Xlsx => {
            let mut writer = writer;
            writer.write_all(&workbook_bytes(records)?)?;
            writer.flush()?;
        }
    }
    Ok(())
}

/// Every cell is written as text, amounts included, so values match the CSV.
fn workbook_bytes(records: &[TransactionRecord]) -> Result<Vec<u8>, ExtractError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(XLSX_SHEET_NAME)?;

    for (col, header) in (0_u16..).zip(OUTPUT_HEADERS) {
        worksheet.write_string(0, col, header)?;
    }
    for (row, record) in (1_u32..).zip(records) {
        for (col, value) in (0_u16..).zip(record.to_row()) {
            if !value.is_empty() {
                worksheet.write_string(row, col, value)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

pub(crate) fn write_table_to_path(
    path: &Path,
    records: &[TransactionRecord],
    format: OutputFormat,
    delimiter: u8,
) -> Result<(), ExtractError> {
    let file = BufWriter::new(File::create(path)?);
    write_table(file, records, format, delimiter)
}

pub fn write_table_to_bytes(
    records: &[TransactionRecord],
    format: OutputFormat,
    delimiter: u8,
) -> Result<Vec<u8>, ExtractError> {
    let mut bytes = Vec::new();
    write_table(&mut bytes, records, format, delimiter)?;
    Ok(bytes)
}

/// Text formats only; XLSX output is binary, use [`write_table_to_bytes`].
pub fn write_table_to_string(
    records: &[TransactionRecord],
    format: OutputFormat,
    delimiter: u8,
) -> Result<String, ExtractError> {
    if format == OutputFormat::Xlsx {
        return Err(ExtractError::InvalidOption(
            "xlsx output is binary and cannot be returned as text".to_string(),
        ));
    }
    utf8_output(write_table_to_bytes(records, format, delimiter)?)
}

fn utf8_output(bytes: Vec<u8>) -> Result<String, ExtractError> {
    String::from_utf8(bytes)
        .map_err(|error| ExtractError::Io(io::Error::new(io::ErrorKind::InvalidData, error)))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use std::io::Cursor;

    use calamine::{Data, Reader, Xlsx};

    use super::{XLSX_SHEET_NAME, utf8_output, write_table_to_bytes, write_table_to_string};
    use crate::error::ExtractError;
    use crate::model::{RecordSource, TransactionRecord};
    use crate::options::OutputFormat;

    fn records() -> Vec<TransactionRecord> {
        vec![TransactionRecord {
            description: "COFFEE SHOP, DOWNTOWN".to_string(),
            debit: "4.50".to_string(),
            credit: String::new(),
            date: "OCT01".to_string(),
            page_number: 1,
            source: RecordSource::Table,
        }]
    }

    #[test]
    fn writes_csv_with_fixed_headers() {
        let csv = write_table_to_string(&records(), OutputFormat::Csv, b',').expect("csv");
        assert_eq!(
            csv,
            "DESCRIPTION,CHEQUE/DEBIT,DEPOSIT/CREDIT,DATE\n\"COFFEE SHOP, DOWNTOWN\",4.50,,OCT01\n"
        );
    }

    #[test]
    fn writes_csv_with_custom_delimiter() {
        let csv = write_table_to_string(&records(), OutputFormat::Csv, b';').expect("csv");
        assert!(csv.starts_with("DESCRIPTION;CHEQUE/DEBIT;DEPOSIT/CREDIT;DATE\n"));
    }

    #[test]
    fn writes_json_records_without_source() {
        let json = write_table_to_string(&records(), OutputFormat::Json, b',').expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(
            value,
            serde_json::json!([{
                "description": "COFFEE SHOP, DOWNTOWN",
                "debit": "4.50",
                "credit": "",
                "date": "OCT01",
                "page": 1
            }])
        );
    }

    #[test]
    fn header_only_csv_for_empty_table() {
        let csv = write_table_to_string(&[], OutputFormat::Csv, b',').expect("csv");
        assert_eq!(csv, "DESCRIPTION,CHEQUE/DEBIT,DEPOSIT/CREDIT,DATE\n");
    }

    #[test]
    fn writes_xlsx_sheet_with_fixed_headers() {
        let bytes = write_table_to_bytes(&records(), OutputFormat::Xlsx, b',').expect("xlsx");

        let mut workbook = Xlsx::new(Cursor::new(bytes)).expect("readable workbook");
        assert_eq!(workbook.sheet_names(), vec![XLSX_SHEET_NAME.to_string()]);

        let range = workbook.worksheet_range(XLSX_SHEET_NAME).expect("sheet");
        let rows = range
            .rows()
            .map(|row| row.iter().map(Data::to_string).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert_eq!(
            rows,
            vec![
                vec!["DESCRIPTION", "CHEQUE/DEBIT", "DEPOSIT/CREDIT", "DATE"],
                vec!["COFFEE SHOP, DOWNTOWN", "4.50", "", "OCT01"],
            ]
        );
    }

    #[test]
    fn xlsx_is_not_returned_as_text() {
        let error = write_table_to_string(&records(), OutputFormat::Xlsx, b',')
            .expect_err("binary output");
        assert!(matches!(error, ExtractError::InvalidOption(_)));
    }

    #[test]
    fn non_utf8_output_is_an_io_fault() {
        let error = utf8_output(vec![0xff, 0xfe]).expect_err("invalid utf-8");
        assert!(matches!(error, ExtractError::Io(_)), "{error:?}");
    }
}
