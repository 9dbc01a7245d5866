use clap::{Parser, Subcommand};

/// Extended help shown after `facturo import create --help`.
/// Documents the accepted formats and the recognized columns.
pub const IMPORT_CREATE_AFTER_HELP: &str = "\
How import works:
  Facturo reads one invoice-line export per run. Each data row becomes one
  draft invoice; customers and products are looked up by their identifiers
  and created when nothing matches.

  Accepted formats:
    CSV   — one header row with the column names below
    Excel — .xlsx/.xls, first worksheet, header row first

  <path> is a local file path.
  To read CSV from stdin explicitly, use `-` as the path.
  Example: cat lines.csv | facturo import create -
  Excel files must be passed by path; stdin is CSV only.

What to do next:
  1. Run `facturo import create <path>`.
  2. Review the summary; line errors name the row and the reason.
  3. Run `facturo import show <batch-id>` to inspect every line.

Recognized columns (unknown columns are ignored, missing ones are blank):
  fecha                 Document date (YYYY-MM-DD, DD/MM/YYYY, or MM/DD/YYYY)
  comprobante           Document label; anything not mentioning `factura`
                        is treated as a credit note
  n_interno, n_fiscal   Internal and fiscal document numbers
  cliente_codigo        Customer reference code
  nombre_cliente        Customer display name
  razon_social          Customer legal name
  tipo_identificacion   Tax identification type
  identificacion        Tax identification number (strongest customer key)
  sucursal, vendedor    Branch office and salesperson
  codigo_articulo       Product code (strongest product key)
  nombre_articulo       Product name
  referencia            Product reference
  codigo_barra          Product barcode
  proveedor             Supplier
  cuenta                Income account code
  cantidad              Quantity; blank defaults to 1, zero fails the line
  precio                Unit price
  descuento             Discount amount (wins over the percentage)
  descuento_porcentaje  Discount percentage
  subtotal_descuento    Subtotal after discount
  impuesto, impuesto_2  Tax amounts
  total                 Line total
  comentario            Free-form comment

Sign rule:
  Credit-note rows may arrive with negative quantities or amounts; they are
  stored positive, with the credit polarity kept on the invoice itself.
";

#[derive(Debug, Parser)]
#[command(
    name = "facturo",
    version,
    about = "batch invoice importer for dirty spreadsheet exports",
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage invoice import batches
    #[command(arg_required_else_help = true)]
    Import {
        #[command(subcommand)]
        command: ImportCommand,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum ImportCommand {
    /// Import an invoice-line file and emit one draft invoice per line
    #[command(after_long_help = IMPORT_CREATE_AFTER_HELP)]
    Create {
        /// Company scope for lookups and created records
        #[arg(long)]
        company: Option<String>,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
        /// Path to a CSV or Excel file (use `-` for stdin CSV)
        path: Option<String>,
    },
    /// List all import batches with their state and line counts
    List {
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Show one batch with every staged line and its outcome
    Show {
        /// The batch ID to inspect (e.g. imp_abc123)
        batch_id: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
    /// Return a batch to draft and clear its staged lines
    Reset {
        /// The batch ID to reset (e.g. imp_abc123)
        batch_id: String,
        /// Emit machine-readable JSON output
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
pub fn parse_from<I, T>(itr: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(itr)
}
