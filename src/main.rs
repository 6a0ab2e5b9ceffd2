use crate::options::{Args, Settings};
use anyhow::Context;
use clap::Parser;
use payables::convert::{Options, Outcome};
use payables::{layout, sheet};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

mod options {
    use payables::layout::Layout;
    use std::path::PathBuf;

    #[derive(Debug, clap::Parser)]
    #[command(
        name = "payables",
        about = "A tool to turn accounts-payable exports into ERP import files"
    )]
    pub enum Args {
        /// Convert an accounts-payable export into a file for the ERP loader.
        Convert {
            #[command(flatten)]
            settings: Settings,
            /// Where to write the result. `.csv` files are written as CSV, everything else as XLSX.
            ///
            /// Defaults to `<input>_convertida.xlsx` next to the input file.
            #[arg(long, short = 'o')]
            output: Option<PathBuf>,
            /// The spreadsheet exported by the accounts-payable system.
            input: PathBuf,
        },
        /// Show which columns would be read and how the first rows would be converted.
        Preview {
            #[command(flatten)]
            settings: Settings,
            /// The amount of converted rows to show.
            #[arg(long, short = 'n', default_value = "10")]
            rows: usize,
            /// The spreadsheet exported by the accounts-payable system.
            input: PathBuf,
        },
        /// Print the default configuration, as starting point for a custom one.
        Config,
    }

    #[derive(Debug, clap::Args)]
    pub struct Settings {
        /// A RON file with the configuration to use instead of the defaults.
        #[arg(long, short = 'c')]
        pub config: Option<PathBuf>,
        /// The worksheet to read instead of the first one.
        #[arg(long, short = 's')]
        pub sheet: Option<String>,
        /// The 0-based index of the header row.
        #[arg(long)]
        pub header_row: Option<usize>,
        /// The field delimiter of CSV input.
        #[arg(long, short = 'd')]
        pub delimiter: Option<char>,
        /// The code of the branch to write into every row.
        #[arg(long, short = 'b')]
        pub branch_code: Option<String>,
        /// Write amounts with exactly this many decimals instead of as they are.
        #[arg(long)]
        pub decimals: Option<usize>,
        /// The output grid, `compact` or `sparse`.
        #[arg(long, short = 'l')]
        pub layout: Option<Layout>,
    }
}

fn main() -> anyhow::Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = options::Args::parse();
    match args {
        Args::Convert {
            settings,
            output,
            input,
        } => {
            let options = into_options(settings)?;
            let (_, outcome) = convert_file(&input, &options)?;
            let output = output.unwrap_or_else(|| default_output(&input));
            let out = std::fs::File::create(&output).with_context(|| {
                format!("Could not create output file at '{}'", output.display())
            })?;
            payables::write_rows(
                &outcome.rows,
                options.layout,
                sheet::Format::from_path(&output),
                std::io::BufWriter::new(out),
            )
            .with_context(|| format!("Could not write converted rows to '{}'", output.display()))?;
            info!(
                output = %output.display(),
                rows = outcome.rows.len(),
                warnings = outcome.warnings.len(),
                "conversion written"
            );
        }
        Args::Preview {
            settings,
            rows,
            input,
        } => {
            let options = into_options(settings)?;
            let (headers, outcome) = convert_file(&input, &options)?;
            write_preview(std::io::stdout().lock(), &headers, &options, &outcome, rows)?;
        }
        Args::Config => {
            let config = ron::ser::to_string_pretty(
                &Options::default(),
                ron::ser::PrettyConfig::new().struct_names(true),
            )?;
            println!("{config}");
        }
    };
    Ok(())
}

fn into_options(
    Settings {
        config,
        sheet,
        header_row,
        delimiter,
        branch_code,
        decimals,
        layout,
    }: Settings,
) -> anyhow::Result<Options> {
    let mut options = match config {
        Some(path) => Options::from_path(&path)
            .with_context(|| format!("Could not load configuration from '{}'", path.display()))?,
        None => Options::default(),
    };
    if sheet.is_some() {
        options.sheet = sheet;
    }
    if let Some(header_row) = header_row {
        options.header_row = header_row;
    }
    if let Some(delimiter) = delimiter {
        options.csv_delimiter = delimiter;
    }
    if let Some(branch_code) = branch_code {
        options.codes.branch = branch_code;
    }
    if decimals.is_some() {
        options.amount_decimals = decimals;
    }
    if let Some(layout) = layout {
        options.layout = layout;
    }
    options.validate()?;
    Ok(options)
}

/// Describe the column mapping and outcome, followed by the first `rows` converted rows as CSV.
fn write_preview(
    mut out: impl Write,
    headers: &payables::Row,
    options: &Options,
    outcome: &Outcome,
    rows: usize,
) -> anyhow::Result<()> {
    writeln!(out, "Mapped columns:")?;
    for (field, position) in options.columns.iter() {
        writeln!(
            out,
            "  {:<16} {:>3} {:<3} {}",
            field.name(),
            position,
            layout::column_letters(position),
            headers.cell(position)
        )?;
    }
    if let Some(row) = outcome.total_row {
        writeln!(out, "Dropped total row at data row {}", row + 1)?;
    }
    for warning in &outcome.warnings {
        writeln!(out, "Warning: {warning}")?;
    }
    writeln!(out)?;
    let shown = &outcome.rows[..rows.min(outcome.rows.len())];
    payables::write_rows(shown, options.layout, sheet::Format::Csv, out)?;
    Ok(())
}

fn convert_file(input: &Path, options: &Options) -> anyhow::Result<(payables::Row, Outcome)> {
    let table = payables::read_table(input, &options.into())
        .with_context(|| format!("Could not read spreadsheet at '{}'", input.display()))?;
    let outcome = payables::convert(&table, options)
        .with_context(|| format!("Could not convert '{}'", input.display()))?;
    Ok((table.headers, outcome))
}

fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "planilha".into());
    input.with_file_name(format!("{stem}_convertida.xlsx"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use payables::convert::{OutputRow, Warning};

    fn settings(args: &[&str]) -> Settings {
        let args = ["payables", "convert"]
            .iter()
            .chain(args)
            .chain(&["contas.xlsx"])
            .copied();
        match Args::try_parse_from(args).unwrap() {
            Args::Convert { settings, .. } => settings,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn default_output_is_next_to_the_input() {
        assert_eq!(
            default_output(Path::new("dir/contas.xlsx")),
            Path::new("dir/contas_convertida.xlsx")
        );
        assert_eq!(
            default_output(Path::new("export.csv")),
            Path::new("export_convertida.xlsx")
        );
    }

    #[test]
    fn arguments_override_the_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("payables.ron");
        std::fs::write(
            &config,
            r#"(header_row: 3, codes: (branch: "0002"), amount_decimals: Some(1))"#,
        )
        .unwrap();
        let config = config.to_str().unwrap();

        let options = into_options(settings(&["-c", config])).unwrap();
        assert_eq!(options.codes.branch, "0002");
        assert_eq!(options.amount_decimals, Some(1));
        assert_eq!(options.header_row, 3);

        let options = into_options(settings(&[
            "-c",
            config,
            "--branch-code",
            "01",
            "--decimals",
            "3",
            "--layout",
            "sparse",
        ]))
        .unwrap();
        assert_eq!(options.codes.branch, "01");
        assert_eq!(options.amount_decimals, Some(3));
        assert_eq!(options.layout, layout::Layout::Sparse);
        assert_eq!(options.header_row, 3, "unset arguments keep the configured value");
    }

    #[test]
    fn too_many_decimals_on_the_command_line() {
        assert!(into_options(settings(&["--decimals", "100000"])).is_err());
        assert!(into_options(settings(&["--decimals", "32"])).is_ok());
    }

    #[test]
    fn preview() {
        let mut headers = payables::Row(vec![payables::Cell::Empty; 18]);
        headers.0[17] = "CNPJ/CPF".into();
        let row = OutputRow {
            integration_type: "PP".into(),
            vendor_tax_id: Some("00000000000191".into()),
            document_number: Some("12".into()),
            fiscal_document: Some("12".into()),
            issuing_company: "0001".into(),
            branch: "0001".into(),
            paying_company: "0001".into(),
            title_type: "55".into(),
            issue_date: Some("15032024".into()),
            due_date: Some("15032024".into()),
            scheduled_date: Some("15032024".into()),
            currency: "BRL".into(),
            collection_type: "CA".into(),
            payment_group: "1106010000".into(),
            payment_amount: Some("10,50".into()),
            cash_flow: "01".into(),
        };
        let outcome = Outcome {
            rows: vec![row.clone(), row],
            total_row: Some(2),
            warnings: vec![Warning::EmptyInput],
        };

        let mut out = Vec::<u8>::new();
        write_preview(&mut out, &headers, &Options::default(), &outcome, 1).unwrap();
        let out = String::from_utf8(out).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines[0], "Mapped columns:");
        assert!(lines[1].starts_with("  CNPJ/CPF "), "{out}");
        assert!(lines[1].ends_with(" 17 R   CNPJ/CPF"), "{out}");
        assert!(out.contains("Dropped total row at data row 3\n"), "{out}");
        assert!(out.contains(&format!("Warning: {}\n", Warning::EmptyInput)), "{out}");
        assert!(out.contains("A,B,C,D,E,F,G,H,I,J,K,L,M,CE,CG,CJ\n"), "{out}");
        assert_eq!(
            out.matches("PP,00000000000191").count(),
            1,
            "only the requested amount of rows is shown"
        );
    }
}
