use gerber2png_client::{
    application::error::{AppError, MISSING_PROFILE_MESSAGE},
    config::{FlipArgs, SelectArgs},
    domain::profiles::ProfileId,
};
use serde::Serialize;
use tracing::info;

use crate::context::Context;
use crate::print::print_json;

#[derive(Serialize)]
struct Selection<'a> {
    selected: &'a str,
}

#[derive(Serialize)]
struct Flips {
    flip_horizontal: bool,
    flip_vertical: bool,
}

pub fn select(ctx: &Context, args: SelectArgs) -> Result<(), AppError> {
    let id = ProfileId::new(args.printer_id.trim())
        .ok_or_else(|| AppError::validation(MISSING_PROFILE_MESSAGE))?;
    ctx.preferences().save_selected_profile(&id);
    info!(profile_id = %id, "printer profile selected");
    print_json(&Selection {
        selected: id.as_str(),
    })
}

pub fn flip(ctx: &Context, args: FlipArgs) -> Result<(), AppError> {
    let preferences = ctx.preferences();
    if let Some(value) = args.horizontal {
        preferences.save_flip_horizontal(value);
    }
    if let Some(value) = args.vertical {
        preferences.save_flip_vertical(value);
    }
    let flips = preferences.flips();
    print_json(&Flips {
        flip_horizontal: flips.horizontal,
        flip_vertical: flips.vertical,
    })
}
