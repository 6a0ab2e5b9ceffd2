#![deny(rust_2018_idioms)]

pub mod convert;
pub use convert::function::convert;

pub mod classify;
pub mod layout;
pub mod normalize;

pub mod sheet;
pub use sheet::function::{read_csv, read_table, table_from_range, write_rows};

/// A single value as read from the source spreadsheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// A native date or timestamp, as produced by date-formatted spreadsheet cells.
    DateTime(time::PrimitiveDateTime),
}

static EMPTY: Cell = Cell::Empty;

impl Cell {
    /// Return `true` for absent values, `NaN` and text that is blank after trimming.
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(text) => text.trim().is_empty(),
            Cell::Bool(_) | Cell::DateTime(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        static FORMAT: &[time::format_description::FormatItem<'static>] =
            time::macros::format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(text) => f.write_str(text),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::DateTime(date_time) => match date_time.format(FORMAT) {
                Ok(formatted) => f.write_str(&formatted),
                Err(_) => write!(f, "{date_time}"),
            },
        }
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        if n.is_nan() {
            Cell::Empty
        } else {
            Cell::Number(n)
        }
    }
}

impl From<&str> for Cell {
    fn from(text: &str) -> Self {
        Cell::Text(text.into())
    }
}

impl From<String> for Cell {
    fn from(text: String) -> Self {
        Cell::Text(text)
    }
}

impl From<time::PrimitiveDateTime> for Cell {
    fn from(date_time: time::PrimitiveDateTime) -> Self {
        Cell::DateTime(date_time)
    }
}

/// One record of the source spreadsheet, addressed by 0-based column position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(pub Vec<Cell>);

impl Row {
    /// Return the cell at `index`, or an empty cell if the row is shorter than that.
    pub fn cell(&self, index: usize) -> &Cell {
        self.0.get(index).unwrap_or(&EMPTY)
    }

    pub fn is_blank(&self) -> bool {
        self.0.iter().all(Cell::is_empty)
    }
}

impl From<Vec<Cell>> for Row {
    fn from(cells: Vec<Cell>) -> Self {
        Row(cells)
    }
}

/// The raw input of a conversion: everything below the skipped preamble of a sheet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// The cells of the header row.
    pub headers: Row,
    /// The amount of columns the sheet spans, which bounds all column positions.
    pub width: usize,
    /// The data rows below the header, in sheet order.
    pub rows: Vec<Row>,
}
