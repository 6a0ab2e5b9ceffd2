//! Reading the accounts-payable export and writing the ERP import file.

use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "Cannot handle '{}': only xlsx, xlsm, xlsb, xls, ods and csv files are supported",
        .path.display()
    )]
    UnsupportedFormat { path: PathBuf },
    #[error(transparent)]
    Workbook(#[from] calamine::Error),
    #[error("Sheet '{name}' does not exist, available are: {}", .available.join(", "))]
    MissingSheet {
        name: String,
        available: Vec<String>,
    },
    #[error("The workbook does not contain any sheet")]
    NoSheet,
    #[error(
        "The header is expected in row {} but the sheet has only {rows} rows",
        .header_row + 1
    )]
    MissingHeader { header_row: usize, rows: usize },
    #[error("Cannot use '{0}' as delimiter")]
    InvalidDelimiter(char),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// The kind of file to write the converted rows as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Xlsx,
    Csv,
}

impl Format {
    /// Write CSV for `.csv` paths and XLSX for everything else.
    pub fn from_path(path: &Path) -> Self {
        match extension(path).as_deref() {
            Some("csv") => Format::Csv,
            _ => Format::Xlsx,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Options {
    /// The 0-based index of the header row.
    pub header_row: usize,
    /// The worksheet to read, or the first one if unset.
    pub sheet: Option<String>,
    /// The delimiter of CSV input.
    pub delimiter: char,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            header_row: 6,
            sheet: None,
            delimiter: ',',
        }
    }
}

impl From<&crate::convert::Options> for Options {
    fn from(options: &crate::convert::Options) -> Self {
        Options {
            header_row: options.header_row,
            sheet: options.sheet.clone(),
            delimiter: options.csv_delimiter,
        }
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
}

pub(crate) mod function {
    use crate::convert::OutputRow;
    use crate::layout::Layout;
    use crate::sheet::{extension, Error, Format, Options};
    use crate::{Cell, Row, Table};
    use calamine::{Data, Range, Reader};
    use std::path::Path;
    use tracing::{debug, info};

    /// Read the sheet at `path` into a table whose header is at `header_row`.
    ///
    /// Rows above the header are skipped, and so are blank rows below it. A blank row in the
    /// middle of the data thus produces no output row, unlike every other data row.
    pub fn read_table(path: &Path, options: &Options) -> Result<Table, Error> {
        let table = match extension(path).as_deref() {
            Some("csv") => read_csv(std::fs::File::open(path)?, options)?,
            Some("xlsx" | "xlsm" | "xlsb" | "xls" | "ods") => {
                let mut workbook = calamine::open_workbook_auto(path)?;
                let range = match &options.sheet {
                    Some(name) => {
                        let available = workbook.sheet_names();
                        if !available.contains(name) {
                            return Err(Error::MissingSheet {
                                name: name.clone(),
                                available,
                            });
                        }
                        workbook.worksheet_range(name)?
                    }
                    None => workbook.worksheet_range_at(0).ok_or(Error::NoSheet)??,
                };
                table_from_range(&range, options.header_row)?
            }
            _ => {
                return Err(Error::UnsupportedFormat {
                    path: path.to_owned(),
                })
            }
        };
        info!(
            path = %path.display(),
            width = table.width,
            rows = table.rows.len(),
            "read input"
        );
        Ok(table)
    }

    /// Read CSV `data` without any special header handling, each field becoming a text cell.
    pub fn read_csv(data: impl std::io::Read, options: &Options) -> Result<Table, Error> {
        let delimiter = options
            .delimiter
            .try_into()
            .map_err(|_| Error::InvalidDelimiter(options.delimiter))?;
        let mut csv = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(data);
        let mut lines = Vec::new();
        for record in csv.records() {
            let record = record?;
            lines.push(Row(record
                .iter()
                .map(|field| {
                    if field.trim().is_empty() {
                        Cell::Empty
                    } else {
                        Cell::Text(field.into())
                    }
                })
                .collect()));
        }
        let width = lines.iter().map(|row| row.0.len()).max().unwrap_or_default();
        split_at_header(lines, width, options.header_row)
    }

    /// Convert `range` into a table, addressing cells by their absolute position in the sheet.
    pub fn table_from_range(range: &Range<Data>, header_row: usize) -> Result<Table, Error> {
        let Some((last_row, last_col)) = range.end() else {
            return Err(Error::MissingHeader {
                header_row,
                rows: 0,
            });
        };
        let width = last_col as usize + 1;
        let lines = (0..=last_row)
            .map(|row| {
                Row((0..width as u32)
                    .map(|col| range.get_value((row, col)).map_or(Cell::Empty, to_cell))
                    .collect())
            })
            .collect();
        split_at_header(lines, width, header_row)
    }

    fn split_at_header(lines: Vec<Row>, width: usize, header_row: usize) -> Result<Table, Error> {
        if header_row >= lines.len() {
            return Err(Error::MissingHeader {
                header_row,
                rows: lines.len(),
            });
        }
        let mut lines = lines.into_iter().skip(header_row);
        let headers = lines.next().unwrap_or_default();
        let rows = lines.filter(|row| !row.is_blank()).collect();
        Ok(Table {
            headers,
            width,
            rows,
        })
    }

    fn to_cell(data: &Data) -> Cell {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(text) if text.is_empty() => Cell::Empty,
            Data::String(text) => Cell::Text(text.clone()),
            Data::Float(n) => Cell::from(*n),
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(date_time) if date_time.is_duration() => {
                Cell::Number(date_time.as_f64())
            }
            // `as_datetime()` knows whether the workbook counts from 1900 or 1904
            Data::DateTime(date_time) => date_time
                .as_datetime()
                .and_then(|date_time| {
                    time::OffsetDateTime::from_unix_timestamp(date_time.and_utc().timestamp()).ok()
                })
                .map_or(Cell::Number(date_time.as_f64()), |date_time| {
                    Cell::DateTime(time::PrimitiveDateTime::new(date_time.date(), date_time.time()))
                }),
            Data::DateTimeIso(text) | Data::DurationIso(text) => Cell::Text(text.clone()),
            Data::Error(err) => {
                debug!(?err, "treating error cell as empty");
                Cell::Empty
            }
        }
    }

    /// Write a header and one line per row of `rows`, arranged according to `layout`.
    pub fn write_rows(
        rows: &[OutputRow],
        layout: Layout,
        format: Format,
        mut out: impl std::io::Write,
    ) -> Result<(), Error> {
        match format {
            Format::Csv => {
                let mut out = csv::WriterBuilder::new().delimiter(b',').from_writer(out);
                out.write_record(layout.header())?;
                for row in rows {
                    out.write_record(layout.place(row).iter().map(|cell| cell.unwrap_or("")))?;
                }
                out.flush()?;
            }
            Format::Xlsx => {
                let mut workbook = rust_xlsxwriter::Workbook::new();
                let bold = rust_xlsxwriter::Format::new().set_bold();
                let sheet = workbook.add_worksheet();
                for (col, title) in layout.header().iter().enumerate() {
                    sheet.write_string_with_format(0, col as u16, title, &bold)?;
                }
                for (idx, row) in rows.iter().enumerate() {
                    for (col, cell) in layout.place(row).into_iter().enumerate() {
                        if let Some(value) = cell {
                            sheet.write_string(idx as u32 + 1, col as u16, value)?;
                        }
                    }
                }
                out.write_all(&workbook.save_to_buffer()?)?;
                out.flush()?;
            }
        }
        info!(rows = rows.len(), ?layout, ?format, "wrote output");
        Ok(())
    }
}
