//! gerber2png: terminal front end for the conversion service.

mod context;
mod handlers;
mod print;
mod render;

use std::process;

use gerber2png_client::{application::error::AppError, config, infra::telemetry};
use tracing::{Dispatch, Level, dispatcher, error};
use tracing_subscriber::fmt as tracing_fmt;

use context::Context;
use handlers::{convert, preferences, printers};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(std::io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;
    telemetry::init(&settings.logging)?;

    let ctx = Context::new(settings);
    match cli_args.command {
        config::Command::Printers => printers::handle(&ctx).await,
        config::Command::Select(args) => preferences::select(&ctx, args),
        config::Command::Flip(args) => preferences::flip(&ctx, args),
        config::Command::Convert(args) => convert::handle(&ctx, *args).await,
    }
}
