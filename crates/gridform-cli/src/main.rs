//! gridform CLI - formula parsing, rendering and reference patching

use anyhow::{bail, Context, Result};
use clap::{Parser as ClapParser, Subcommand, ValueEnum};
use gridform_core::{validate_sheet_name, CellAddress};
use gridform_formula::{
    render, Locale, ParseResult, Parser, ParserOptions, ReferenceKind, ReferencePatcher,
    RenderOptions, StructuralEdit,
};
use std::io::{self, BufRead};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "gridform")]
#[command(
    author,
    version,
    about = "Spreadsheet formula parsing, rendering and reference patching tool"
)]
struct Cli {
    /// Parser options as JSON (locale, r1c1, fractions, dimensioned, max_depth)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Locale the input formulas are written in
    #[arg(long, global = true, value_enum, default_value = "en")]
    locale: LocaleArg,

    /// Read input formulas as R1C1
    #[arg(long, global = true)]
    r1c1: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LocaleArg {
    /// `.` decimal mark, `,` argument separator
    En,
    /// `,` decimal mark, `;` argument separator
    Eu,
}

impl LocaleArg {
    fn locale(self) -> Locale {
        match self {
            LocaleArg::En => Locale::en_us(),
            LocaleArg::Eu => Locale::european(),
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Edit {
    InsertRows,
    DeleteRows,
    InsertColumns,
    DeleteColumns,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse formulas and report their references (`-` reads stdin)
    Parse {
        formula: String,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-render formulas in canonical form
    Render {
        formula: String,

        /// Output locale (default: the input locale)
        #[arg(long, value_enum)]
        to: Option<LocaleArg>,

        /// Rows added to relative references
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        rows: i64,

        /// Columns added to relative references
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        columns: i64,

        /// Write R1C1 references relative to this cell
        #[arg(long)]
        base: Option<String>,

        /// Text for omitted call arguments
        #[arg(long, default_value = "")]
        missing: String,
    },

    /// Adjust references for inserted or deleted rows/columns
    Shift {
        formula: String,

        #[arg(long, value_enum)]
        edit: Edit,

        /// Sheet the rows/columns are inserted into or deleted from
        #[arg(long, default_value = "Sheet1")]
        sheet: String,

        /// Sheet the formula lives on (default: the edited sheet)
        #[arg(long)]
        host: Option<String>,

        /// 0-based index of the first row/column affected
        #[arg(long)]
        before: u32,

        #[arg(long, default_value = "1")]
        count: u32,
    },

    /// Point references at a renamed sheet
    RenameSheet {
        formula: String,

        #[arg(long)]
        from: String,

        #[arg(long)]
        to: String,
    },

    /// Turn references to a deleted sheet into #REF!
    DeleteSheet {
        formula: String,

        #[arg(long)]
        sheet: String,
    },

    /// Rewrite R1C1 formulas as A1 relative to an anchor cell
    Resolve {
        formula: String,

        /// Cell the formula lives in, e.g. B2
        #[arg(long)]
        anchor: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let options = parser_options(&cli)?;
    let parser = Parser::new(options);

    match cli.command {
        Commands::Parse { formula, json } => {
            for_each_formula(&formula, |text| parse(&parser, text, json))
        }
        Commands::Render {
            formula,
            to,
            rows,
            columns,
            base,
            missing,
        } => {
            let locale = to.map_or_else(|| parser.options().locale.clone(), LocaleArg::locale);
            let mut render_options = RenderOptions::for_locale(locale)
                .with_offset(rows, columns)
                .with_missing(missing);
            if let Some(base) = base {
                render_options = render_options.with_r1c1(Some(cell(&base)?));
            }
            for_each_formula(&formula, |text| {
                let root = checked(parser.parse(text), text)?;
                println!("{}", root.map(|root| render(&root, &render_options)).unwrap_or_default());
                Ok(())
            })
        }
        Commands::Shift {
            formula,
            edit,
            sheet,
            host,
            before,
            count,
        } => {
            let edit = structural_edit(edit, &sheet, before, count)?;
            let host = host.unwrap_or(sheet);
            let patcher = ReferencePatcher::new(parser);
            for_each_formula(&formula, |text| {
                print_patched(text, patcher.shift_formula(text, &host, &edit));
                Ok(())
            })
        }
        Commands::RenameSheet { formula, from, to } => {
            validate_sheet_name(&to).context("Cannot rename sheet")?;
            let patcher = ReferencePatcher::new(parser);
            for_each_formula(&formula, |text| {
                print_patched(text, patcher.rename_sheet_in_formula(text, &from, &to));
                Ok(())
            })
        }
        Commands::DeleteSheet { formula, sheet } => {
            let patcher = ReferencePatcher::new(parser);
            for_each_formula(&formula, |text| {
                print_patched(text, patcher.invalidate_sheet_in_formula(text, &sheet));
                Ok(())
            })
        }
        Commands::Resolve { formula, anchor } => {
            let anchor = cell(&anchor)?;
            let patcher = ReferencePatcher::new(parser);
            for_each_formula(&formula, |text| {
                print_patched(text, patcher.resolve_r1c1_formula(text, anchor));
                Ok(())
            })
        }
    }
}

fn parser_options(cli: &Cli) -> Result<ParserOptions> {
    let mut options = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read '{}'", path.display()))?;
            ParserOptions::from_json(&json)
                .with_context(|| format!("Invalid parser options in '{}'", path.display()))?
        }
        None => ParserOptions::default().with_locale(cli.locale.locale()),
    };
    if cli.r1c1 {
        options = options.with_r1c1(true);
    }
    Ok(options)
}

/// Run `f` on the argument, or on every non-empty stdin line for `-`
fn for_each_formula<F>(formula: &str, mut f: F) -> Result<()>
where
    F: FnMut(&str) -> Result<()>,
{
    if formula != "-" {
        return f(formula);
    }
    for line in io::stdin().lock().lines() {
        let line = line.context("Failed to read from stdin")?;
        if !line.trim().is_empty() {
            f(line.trim_end())?;
        }
    }
    Ok(())
}

fn checked(result: ParseResult, text: &str) -> Result<Option<gridform_formula::Unit>> {
    result
        .into_root()
        .with_context(|| format!("Failed to parse {text:?}"))
}

fn parse(parser: &Parser, text: &str, json: bool) -> Result<()> {
    let result = parser.parse(text);
    if let Some(error) = &result.error {
        eprintln!("{text}");
        eprintln!("{}^", " ".repeat(error.position));
        bail!("{error}");
    }

    if json {
        let output = serde_json::to_string_pretty(&result.root)
            .context("Failed to serialize the formula tree")?;
        println!("{output}");
        return Ok(());
    }

    if let Some(root) = &result.root {
        println!("Formula: {root}");
    }
    for reference in &result.references {
        let span = reference.span;
        let source: String = text
            .chars()
            .skip(span.start)
            .take(span.end - span.start)
            .collect();
        let kind = match &reference.kind {
            ReferenceKind::Address(_) => "address",
            ReferenceKind::Range(_) => "range",
            ReferenceKind::Identifier(_) => "name",
            ReferenceKind::StructuredReference(_) => "table",
        };
        println!("  {kind:<8}{source}");
    }

    let mut cells: Vec<_> = result.addresses.keys().collect();
    cells.sort();
    let mut ranges: Vec<_> = result.ranges.keys().collect();
    ranges.sort();
    println!("Cells: {}", join(&cells));
    println!("Ranges: {}", join(&ranges));
    Ok(())
}

fn join(labels: &[&String]) -> String {
    labels
        .iter()
        .map(|label| label.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_patched(original: &str, patched: Option<String>) {
    match patched {
        Some(text) => println!("{text}"),
        None => println!("{original}"),
    }
}

fn cell(text: &str) -> Result<CellAddress> {
    CellAddress::parse(text).with_context(|| format!("Invalid cell address '{text}'"))
}

fn structural_edit(edit: Edit, sheet: &str, before: u32, count: u32) -> Result<StructuralEdit> {
    let columns = |value: u32, what: &str| {
        u16::try_from(value).with_context(|| format!("{what} {value} is past the last column"))
    };
    Ok(match edit {
        Edit::InsertRows => StructuralEdit::insert_rows(sheet, before, count),
        Edit::DeleteRows => StructuralEdit::delete_rows(sheet, before, count),
        Edit::InsertColumns => {
            StructuralEdit::insert_columns(sheet, columns(before, "column")?, columns(count, "count")?)
        }
        Edit::DeleteColumns => {
            StructuralEdit::delete_columns(sheet, columns(before, "column")?, columns(count, "count")?)
        }
    })
}
