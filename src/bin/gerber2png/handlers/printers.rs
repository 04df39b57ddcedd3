use gerber2png_client::{application::error::AppError, domain::profiles::DeviceProfile};
use serde::Serialize;

use crate::context::Context;
use crate::print::print_json;

#[derive(Serialize)]
struct PrinterListing<'a> {
    selected: Option<&'a str>,
    printers: Vec<PrinterRow<'a>>,
}

#[derive(Serialize)]
struct PrinterRow<'a> {
    id: &'a str,
    selected: bool,
    #[serde(flatten)]
    profile: &'a DeviceProfile,
}

pub async fn handle(ctx: &Context) -> Result<(), AppError> {
    let orchestrator = ctx.orchestrator().await?;
    let selected = orchestrator.selected_profile();
    let selected = selected.as_ref();

    let printers = orchestrator
        .catalog()
        .iter()
        .map(|(id, profile)| PrinterRow {
            id: id.as_str(),
            selected: selected == Some(id),
            profile,
        })
        .collect();

    print_json(&PrinterListing {
        selected: selected.map(|id| id.as_str()),
        printers,
    })
}
