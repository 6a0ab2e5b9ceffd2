//! Where each output field lands in the file handed to the ERP loader.

use crate::convert::OutputRow;

/// The amount of columns of the legacy loader grid, `A` to `CV`.
pub const SPARSE_WIDTH: usize = 100;

/// The output fields in the order the loader reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    IntegrationType,
    VendorTaxId,
    DocumentNumber,
    FiscalDocument,
    IssuingCompany,
    Branch,
    PayingCompany,
    TitleType,
    IssueDate,
    DueDate,
    ScheduledDate,
    Currency,
    CollectionType,
    PaymentGroup,
    PaymentAmount,
    CashFlow,
}

impl Column {
    pub const ALL: [Column; 16] = [
        Column::IntegrationType,
        Column::VendorTaxId,
        Column::DocumentNumber,
        Column::FiscalDocument,
        Column::IssuingCompany,
        Column::Branch,
        Column::PayingCompany,
        Column::TitleType,
        Column::IssueDate,
        Column::DueDate,
        Column::ScheduledDate,
        Column::Currency,
        Column::CollectionType,
        Column::PaymentGroup,
        Column::PaymentAmount,
        Column::CashFlow,
    ];

    /// The column letter under which the loader expects this field.
    pub fn letter(self) -> &'static str {
        match self {
            Column::IntegrationType => "A",
            Column::VendorTaxId => "B",
            Column::DocumentNumber => "C",
            Column::FiscalDocument => "D",
            Column::IssuingCompany => "E",
            Column::Branch => "F",
            Column::PayingCompany => "G",
            Column::TitleType => "H",
            Column::IssueDate => "I",
            Column::DueDate => "J",
            Column::ScheduledDate => "K",
            Column::Currency => "L",
            Column::CollectionType => "M",
            Column::PaymentGroup => "CE",
            Column::PaymentAmount => "CG",
            Column::CashFlow => "CJ",
        }
    }

    /// A human readable description, as used in the loader documentation.
    pub fn title(self) -> &'static str {
        match self {
            Column::IntegrationType => "Identificação do tipo de integração de título",
            Column::VendorTaxId => "Código do fornecedor",
            Column::DocumentNumber => "Número do título",
            Column::FiscalDocument => "Documento fiscal",
            Column::IssuingCompany => "Empresa emitente",
            Column::Branch => "Código da filial",
            Column::PayingCompany => "Empresa pagadora",
            Column::TitleType => "Tipo de título",
            Column::IssueDate => "Data de emissão do título",
            Column::DueDate => "Data de vencimento do título",
            Column::ScheduledDate => "Data de programação do título",
            Column::Currency => "Código da moeda",
            Column::CollectionType => "Tipo de cobrança",
            Column::PaymentGroup => "Grupo de pagamento",
            Column::PaymentAmount => "Valor do grupo de pagamento",
            Column::CashFlow => "Código do fluxo de caixa",
        }
    }
}

/// The shape of the output grid.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Layout {
    /// The sixteen fields side by side, headed by their column letter.
    #[default]
    Compact,
    /// Every field at its column letter within a grid of [`SPARSE_WIDTH`] columns.
    Sparse,
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown layout '{0}', expected 'compact' or 'sparse'")]
pub struct UnknownLayout(String);

impl std::str::FromStr for Layout {
    type Err = UnknownLayout;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Layout::Compact),
            "sparse" => Ok(Layout::Sparse),
            _ => Err(UnknownLayout(s.into())),
        }
    }
}

impl Layout {
    pub fn width(self) -> usize {
        match self {
            Layout::Compact => Column::ALL.len(),
            Layout::Sparse => SPARSE_WIDTH,
        }
    }

    /// The 0-based position of `column` in the output grid.
    pub fn position(self, column: Column) -> usize {
        match self {
            Layout::Compact => Column::ALL
                .iter()
                .position(|c| *c == column)
                .expect("ALL lists every column"),
            Layout::Sparse => column_index(column.letter()).expect("column letters are valid"),
        }
    }

    pub fn header(self) -> Vec<String> {
        match self {
            Layout::Compact => Column::ALL.iter().map(|c| c.letter().to_owned()).collect(),
            Layout::Sparse => (0..SPARSE_WIDTH).map(column_letters).collect(),
        }
    }

    /// Spread the fields of `row` over a grid row of [`Layout::width()`] cells.
    pub fn place(self, row: &OutputRow) -> Vec<Option<&str>> {
        let mut cells = vec![None; self.width()];
        for column in Column::ALL {
            cells[self.position(column)] = row.get(column);
        }
        cells
    }
}

/// Return the 0-based position of spreadsheet column `letters`, like `A` → 0 or `CE` → 82.
pub fn column_index(letters: &str) -> Option<usize> {
    let mut col: usize = 0;
    for b in letters.bytes() {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        let v = (b.to_ascii_uppercase() - b'A') as usize + 1;
        col = col.checked_mul(26).and_then(|c| c.checked_add(v))?;
    }
    col.checked_sub(1)
}

/// Return the spreadsheet letters of the 0-based column `index`.
pub fn column_letters(index: usize) -> String {
    let mut n = index + 1;
    let mut out = Vec::<u8>::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        out.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    out.into_iter().rev().map(char::from).collect()
}
