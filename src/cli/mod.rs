mod args;
mod manifest;
mod parse;
mod restore;

use std::{fmt::Display, process::ExitCode};

use clap::{
    builder::{styling::AnsiColor, Styles},
    Parser, Subcommand,
};
use log::error;
use serde::Serialize;

use crate::{error::Result, logger, outcome::BatchStatus};

use self::args::{GlobalArgs, RestoreArgs};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None, propagate_version = true, styles = cli_styles())]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore versioned files from an archive host
    Restore(RestoreArgs),
}

impl Command {
    fn global(&self) -> &GlobalArgs {
        match self {
            Command::Restore(args) => &args.global,
        }
    }
}

pub async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.command.global());

    let result = match cli.command {
        Command::Restore(args) => restore::main(args).await,
    };

    match result {
        Ok(status) => ExitCode::from(exit_status(status)),
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn exit_status(status: BatchStatus) -> u8 {
    u8::try_from(status.code()).unwrap_or(1)
}

fn init_logger(args: &GlobalArgs) {
    let level = logger::level_from_args(args.logger.verbose, args.logger.quiet);
    logger::init(level, args.logger.color);
}

fn print_stat<T: Display>(name: &str, value: T) {
    let style = AnsiColor::BrightBlack.on_default();
    println!("{style}{name}:{style:#} {value}");
}

fn print_stats_json<T: Serialize>(stats: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(stats)?;
    println!("{json}");
    Ok(())
}

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightMagenta.on_default())
        .usage(AnsiColor::BrightMagenta.on_default())
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
}
