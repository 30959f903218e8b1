//! kicad-qr command-line entrypoint

use clap::Parser;
use kicad_qr::{
    Board, Error, FitMode, InsertOptions, InsertionReport, KicadQrConfig, QrInserter, Result,
    logging,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "kicad-qr",
    version,
    about = "Insert a QR code into a KiCad PCB in place of a textbox placeholder"
)]
struct Cli {
    /// Input KiCad PCB file
    #[arg(value_name = "INPUT_FILE")]
    input_file: PathBuf,

    /// Output file (defaults to overwriting the input)
    #[arg(
        short = 'o',
        long = "output_file",
        visible_alias = "output-file",
        value_name = "PATH"
    )]
    output_file: Option<PathBuf>,

    /// Text content of the placeholder textbox
    #[arg(
        short = 't',
        long = "textbox_identifier",
        visible_alias = "textbox-identifier",
        alias = "text_identifier",
        value_name = "TEXT"
    )]
    textbox_identifier: String,

    /// Data to encode in the QR code
    #[arg(short = 'd', long, value_name = "TEXT")]
    data: String,

    /// Suppress all non-error output
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Optional configuration file (toml/yaml). Defaults to kicad-qr.{toml,yaml} in cwd/XDG config.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Error-correction level (L, M, Q or H)
    #[arg(short = 'e', long, value_name = "LEVEL")]
    ecc: Option<String>,

    /// Light modules added around the symbol
    #[arg(long, value_name = "N")]
    border: Option<usize>,

    /// Scaling for non-square textboxes (contain, stretch or average)
    #[arg(long, value_name = "MODE")]
    fit: Option<String>,

    /// Draw on this layer instead of the textbox's own layer
    #[arg(long, value_name = "NAME")]
    layer: Option<String>,

    /// Leave the placeholder textbox on the board
    #[arg(long)]
    keep_textbox: bool,

    /// Replace every textbox with the identifier, not just the first
    #[arg(long)]
    all: bool,

    /// Draw one shape per horizontal run of dark modules
    #[arg(long)]
    merge_runs: bool,

    /// Decode the generated symbol before writing the board
    #[arg(long)]
    verify: bool,

    /// Do everything except writing the output file
    #[arg(long)]
    dry_run: bool,

    /// Output the result as JSON instead of human-readable text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = KicadQrConfig::load(cli.config.as_deref())?;
    apply_cli_overrides(&mut config, cli)?;
    if cli.quiet {
        config.logging.level = "error".to_string();
    }

    logging::init(&config.logging)?;

    let board = Board::load(&cli.input_file)?;
    let output = cli
        .output_file
        .clone()
        .unwrap_or_else(|| cli.input_file.clone());

    let mut options = InsertOptions::from(&config);
    options.replace_all = cli.all;
    let inserter = QrInserter::new(options);
    let insertion = inserter.prepare(&board, &cli.textbox_identifier, &cli.data)?;

    if cli.dry_run {
        tracing::info!(output = %output.display(), "dry run, not writing");
    } else {
        board.save(&insertion.patches, &output)?;
    }

    let report = InsertionReport {
        input: cli.input_file.clone(),
        output,
        written: !cli.dry_run,
        data: cli.data.clone(),
        version: insertion.matrix.version(),
        ecc: insertion.matrix.ecc(),
        verified: inserter.options().verify,
        placed: insertion.placed,
    };

    if cli.quiet {
        return Ok(());
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        for line in report.human_lines() {
            println!("{line}");
        }
    }
    Ok(())
}

fn apply_cli_overrides(config: &mut KicadQrConfig, cli: &Cli) -> Result<()> {
    if let Some(ref ecc) = cli.ecc {
        config.qr.ecc = ecc.parse().map_err(Error::Config)?;
    }
    if let Some(border) = cli.border {
        config.qr.border = border;
    }
    if let Some(ref fit) = cli.fit {
        config.qr.fit = fit.parse::<FitMode>().map_err(Error::Config)?;
    }
    if let Some(ref layer) = cli.layer {
        config.placement.layer = Some(layer.clone());
    }
    if cli.keep_textbox {
        config.placement.keep_textbox = true;
    }
    if cli.merge_runs {
        config.qr.merge_runs = true;
    }
    if cli.verify {
        config.qr.verify = true;
    }
    Ok(())
}
