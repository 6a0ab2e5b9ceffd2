use crate::{classify, normalize};
use crate::layout::{self, Column, Layout};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(
        "The input has {width} columns, but these required ones are missing: {}",
        describe(.missing)
    )]
    MissingColumn {
        missing: Vec<MissingField>,
        width: usize,
    },
    #[error("Failed to open configuration file for reading")]
    OpenConfig(#[from] std::io::Error),
    #[error("Could not decode the configuration")]
    DecodeConfig(#[from] ron::de::SpannedError),
    #[error("Amounts can have at most {max} decimals, got {decimals}")]
    TooManyDecimals { decimals: usize, max: usize },
}

fn describe(missing: &[MissingField]) -> String {
    missing
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A field whose configured column lies outside of the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField {
    pub field: Field,
    pub position: usize,
}

impl std::fmt::Display for MissingField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (column {} at index {})",
            self.field.name(),
            layout::column_letters(self.position),
            self.position
        )
    }
}

/// The source fields read from every input row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    TaxId,
    Vendor,
    Amount,
    EntryDate,
    DueDate,
    DocumentNumber,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::TaxId,
        Field::Vendor,
        Field::Amount,
        Field::EntryDate,
        Field::DueDate,
        Field::DocumentNumber,
    ];

    /// The name the field goes by in the accounts-payable export.
    pub fn name(self) -> &'static str {
        match self {
            Field::TaxId => "CNPJ/CPF",
            Field::Vendor => "FORNECEDOR",
            Field::Amount => "VALOR",
            Field::EntryDate => "DATA DA ENTRADA",
            Field::DueDate => "VENCTO",
            Field::DocumentNumber => "Nº DOCTO",
        }
    }
}

/// The 0-based column position of each source field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub tax_id: usize,
    pub vendor: usize,
    pub amount: usize,
    pub entry_date: usize,
    pub due_date: usize,
    pub document_number: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        ColumnMap {
            tax_id: 17,
            vendor: 16,
            amount: 8,
            entry_date: 6,
            due_date: 4,
            document_number: 2,
        }
    }
}

impl ColumnMap {
    pub fn position(&self, field: Field) -> usize {
        match field {
            Field::TaxId => self.tax_id,
            Field::Vendor => self.vendor,
            Field::Amount => self.amount,
            Field::EntryDate => self.entry_date,
            Field::DueDate => self.due_date,
            Field::DocumentNumber => self.document_number,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, usize)> + '_ {
        Field::ALL
            .into_iter()
            .map(move |field| (field, self.position(field)))
    }

    /// Fail with all fields whose position doesn't exist in an input of `width` columns.
    pub fn resolve(&self, width: usize) -> Result<(), Error> {
        let missing: Vec<_> = self
            .iter()
            .filter(|(_, position)| *position >= width)
            .map(|(field, position)| MissingField { field, position })
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::MissingColumn { missing, width })
        }
    }
}

/// The fixed codes written into every output row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Codes {
    pub integration_type: String,
    pub issuing_company: String,
    pub branch: String,
    pub paying_company: String,
    pub title_type: String,
    pub currency: String,
    pub collection_type: String,
    pub cash_flow: String,
}

impl Default for Codes {
    fn default() -> Self {
        Codes {
            integration_type: "PP".into(),
            issuing_company: "0001".into(),
            branch: "0001".into(),
            paying_company: "0001".into(),
            title_type: "55".into(),
            currency: "BRL".into(),
            collection_type: "CA".into(),
            cash_flow: "01".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Options {
    /// The 0-based index of the header row. All rows above it are skipped.
    pub header_row: usize,
    /// The name of the worksheet to read, or the first one if unset.
    pub sheet: Option<String>,
    /// The field delimiter of CSV input.
    pub csv_delimiter: char,
    pub columns: ColumnMap,
    pub codes: Codes,
    /// The rules to determine the payment group from the vendor name.
    pub payment_groups: classify::Engine,
    /// If set, amounts are written with exactly this many decimals instead of as they are.
    pub amount_decimals: Option<usize>,
    pub layout: Layout,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            header_row: 6,
            sheet: None,
            csv_delimiter: ',',
            columns: ColumnMap::default(),
            codes: Codes::default(),
            payment_groups: classify::Engine::default(),
            amount_decimals: None,
            layout: Layout::default(),
        }
    }
}

impl Options {
    /// Read options from the RON file at `path`. Settings it doesn't mention keep their default.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, Error> {
        let options: Self = ron::de::from_reader(std::fs::File::open(path)?)?;
        options.validate()?;
        Ok(options)
    }

    /// Fail if settings are out of range, like an `amount_decimals` beyond
    /// [`MAX_AMOUNT_DECIMALS`](crate::normalize::MAX_AMOUNT_DECIMALS).
    pub fn validate(&self) -> Result<(), Error> {
        match self.amount_decimals {
            Some(decimals) if decimals > normalize::MAX_AMOUNT_DECIMALS => {
                Err(Error::TooManyDecimals {
                    decimals,
                    max: normalize::MAX_AMOUNT_DECIMALS,
                })
            }
            _ => Ok(()),
        }
    }
}

/// One line of the ERP import file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRow {
    pub integration_type: String,
    pub vendor_tax_id: Option<String>,
    pub document_number: Option<String>,
    pub fiscal_document: Option<String>,
    pub issuing_company: String,
    pub branch: String,
    pub paying_company: String,
    pub title_type: String,
    pub issue_date: Option<String>,
    pub due_date: Option<String>,
    pub scheduled_date: Option<String>,
    pub currency: String,
    pub collection_type: String,
    pub payment_group: String,
    pub payment_amount: Option<String>,
    pub cash_flow: String,
}

impl OutputRow {
    pub fn get(&self, column: Column) -> Option<&str> {
        match column {
            Column::IntegrationType => Some(self.integration_type.as_str()),
            Column::VendorTaxId => self.vendor_tax_id.as_deref(),
            Column::DocumentNumber => self.document_number.as_deref(),
            Column::FiscalDocument => self.fiscal_document.as_deref(),
            Column::IssuingCompany => Some(self.issuing_company.as_str()),
            Column::Branch => Some(self.branch.as_str()),
            Column::PayingCompany => Some(self.paying_company.as_str()),
            Column::TitleType => Some(self.title_type.as_str()),
            Column::IssueDate => self.issue_date.as_deref(),
            Column::DueDate => self.due_date.as_deref(),
            Column::ScheduledDate => self.scheduled_date.as_deref(),
            Column::Currency => Some(self.currency.as_str()),
            Column::CollectionType => Some(self.collection_type.as_str()),
            Column::PaymentGroup => Some(self.payment_group.as_str()),
            Column::PaymentAmount => self.payment_amount.as_deref(),
            Column::CashFlow => Some(self.cash_flow.as_str()),
        }
    }

    /// All fields in loader order.
    pub fn values(&self) -> [Option<&str>; 16] {
        Column::ALL.map(|column| self.get(column))
    }
}

/// Anomalies that were recovered from, but should be looked at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Nothing was left to convert once the total row was removed.
    EmptyInput,
    /// A date cell that wasn't understood and was passed through as text.
    UnparseableDate {
        /// The 0-based index of the data row below the header.
        row: usize,
        field: Field,
        value: String,
    },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::EmptyInput => f.write_str("The input contains no rows to convert"),
            Warning::UnparseableDate { row, field, value } => write!(
                f,
                "{} '{value}' in data row {} is not a date and was kept as is",
                field.name(),
                row + 1
            ),
        }
    }
}

pub struct Outcome {
    pub rows: Vec<OutputRow>,
    /// The index of the data row that was dropped as total row, if there was one.
    pub total_row: Option<usize>,
    pub warnings: Vec<Warning>,
}

/// Return `true` if `row` looks like the summary line closing the export: it has no CNPJ/CPF,
/// or its vendor mentions `TOTAL`.
pub fn is_total_row(row: &crate::Row, columns: &ColumnMap) -> bool {
    row.cell(columns.tax_id).is_empty()
        || row
            .cell(columns.vendor)
            .to_string()
            .to_uppercase()
            .contains("TOTAL")
}

pub(crate) mod function {
    use crate::convert::{is_total_row, Error, Field, Options, Outcome, OutputRow, Warning};
    use crate::{normalize, Row, Table};
    use tracing::{debug, info, warn};

    pub fn convert(table: &Table, options: &Options) -> Result<Outcome, Error> {
        let Options { columns, .. } = options;
        columns.resolve(table.width)?;
        for (field, position) in columns.iter() {
            debug!(
                field = field.name(),
                position,
                header = %table.headers.cell(position),
                "mapped column"
            );
        }

        let mut rows = table.rows.as_slice();
        let mut total_row = None;
        if let Some((last, rest)) = rows.split_last() {
            if is_total_row(last, columns) {
                debug!(row = rest.len(), "dropping total row");
                total_row = Some(rest.len());
                rows = rest;
            }
        }

        let mut warnings = Vec::new();
        if rows.is_empty() {
            warn!("the input contains no rows to convert");
            warnings.push(Warning::EmptyInput);
        }
        let rows: Vec<_> = rows
            .iter()
            .enumerate()
            .map(|(idx, row)| convert_row(idx, row, options, &mut warnings))
            .collect();

        info!(
            rows = rows.len(),
            total_row_dropped = total_row.is_some(),
            warnings = warnings.len(),
            "conversion done"
        );
        Ok(Outcome {
            rows,
            total_row,
            warnings,
        })
    }

    fn convert_row(
        idx: usize,
        row: &Row,
        Options {
            columns,
            codes,
            payment_groups,
            amount_decimals,
            ..
        }: &Options,
        warnings: &mut Vec<Warning>,
    ) -> OutputRow {
        let cell = move |field: Field| row.cell(columns.position(field));
        let mut date = |field: Field| match normalize::try_date(cell(field)) {
            Ok(date) => date,
            Err(value) => {
                warn!(row = idx, field = field.name(), %value, "keeping unparseable date as is");
                warnings.push(Warning::UnparseableDate {
                    row: idx,
                    field,
                    value: value.clone(),
                });
                Some(value)
            }
        };
        let issue_date = date(Field::EntryDate);
        let due_date = date(Field::DueDate);
        let document_number = normalize::document_number(cell(Field::DocumentNumber));

        OutputRow {
            integration_type: codes.integration_type.clone(),
            vendor_tax_id: normalize::tax_id(cell(Field::TaxId)),
            fiscal_document: document_number.clone(),
            document_number,
            issuing_company: codes.issuing_company.clone(),
            branch: codes.branch.clone(),
            paying_company: codes.paying_company.clone(),
            title_type: codes.title_type.clone(),
            issue_date,
            scheduled_date: due_date.clone(),
            due_date,
            currency: codes.currency.clone(),
            collection_type: codes.collection_type.clone(),
            payment_group: payment_groups.classify(cell(Field::Vendor)).to_owned(),
            payment_amount: normalize::amount_with_decimals(cell(Field::Amount), *amount_decimals),
            cash_flow: codes.cash_flow.clone(),
        }
    }
}
