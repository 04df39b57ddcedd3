use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the gerber2png client.
#[derive(Debug, Parser)]
#[command(
    name = "gerber2png",
    version,
    about = "Convert Gerber layouts into printer-ready PNG masks"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(
        long = "config-file",
        env = "GERBER2PNG_CONFIG_FILE",
        value_name = "PATH",
        global = true
    )]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// List the printer profiles offered by the conversion service.
    Printers,
    /// Remember a printer profile for later conversions.
    Select(SelectArgs),
    /// Show or change the remembered mirroring flags.
    Flip(FlipArgs),
    /// Upload a layout and drill file and save the rendered image.
    Convert(Box<ConvertArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the conversion service base URL.
    #[arg(long = "api-url", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,

    /// Override where preferences are stored.
    #[arg(
        long = "preferences-file",
        value_name = "PATH",
        value_hint = ValueHint::FilePath,
        global = true
    )]
    pub preferences_file: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct SelectArgs {
    /// Identifier of the printer profile, as listed by `printers`.
    #[arg(value_name = "PRINTER_ID")]
    pub printer_id: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct FlipArgs {
    /// Mirror the image horizontally.
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub horizontal: Option<bool>,

    /// Mirror the image vertically.
    #[arg(long, value_name = "BOOL", value_parser = BoolishValueParser::new())]
    pub vertical: Option<bool>,
}

#[derive(Debug, Args, Clone)]
pub struct ConvertArgs {
    /// Primary layout file (`.gbr`).
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub gerber: PathBuf,

    /// Drill file.
    #[arg(long, value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub drill: PathBuf,

    /// Printer profile to use instead of the remembered one.
    #[arg(long = "printer", value_name = "PRINTER_ID")]
    pub printer_id: Option<String>,

    #[arg(
        long = "flip-horizontal",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub flip_horizontal: Option<bool>,

    #[arg(
        long = "flip-vertical",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub flip_vertical: Option<bool>,

    /// Directory the rendered image is written to.
    #[arg(long, value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output: Option<PathBuf>,
}
