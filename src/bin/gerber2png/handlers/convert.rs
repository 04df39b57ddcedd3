use std::path::Path;

use gerber2png_client::{
    application::{
        error::{AppError, MISSING_PROFILE_MESSAGE, REQUEST_BUILD_MESSAGE, SubmitRejected},
        job::JobState,
        orchestrator::AttemptOutcome,
    },
    config::ConvertArgs,
    domain::{
        files::{FileSlot, SelectedFile},
        profiles::ProfileId,
    },
};
use serde::Serialize;
use tracing::{info, warn};

use crate::context::Context;
use crate::print::print_json;
use crate::render::follow_progress;

#[derive(Serialize)]
struct Saved<'a> {
    file: String,
    file_name: &'a str,
    size_bytes: u64,
}

pub async fn handle(ctx: &Context, args: ConvertArgs) -> Result<(), AppError> {
    let gerber = read_selection(&args.gerber).await?;
    let drill = read_selection(&args.drill).await?;

    let orchestrator = ctx.orchestrator().await?;
    if let Some(raw) = args.printer_id {
        let id = ProfileId::new(raw.trim())
            .ok_or_else(|| AppError::validation(MISSING_PROFILE_MESSAGE))?;
        orchestrator.select_profile(id);
    }
    if let Some(value) = args.flip_horizontal {
        orchestrator.set_flip_horizontal(value);
    }
    if let Some(value) = args.flip_vertical {
        orchestrator.set_flip_vertical(value);
    }
    orchestrator.set_file(FileSlot::Gerber, gerber);
    orchestrator.set_file(FileSlot::Drill, drill);

    let task = match orchestrator.submit() {
        Ok(task) => task,
        Err(SubmitRejected::NotReady(issue)) => {
            let snapshot = orchestrator.snapshot();
            let message = snapshot
                .state()
                .failure()
                .map(|failure| failure.message().to_string())
                .unwrap_or_else(|| format!("{issue:?}"));
            return Err(AppError::Conversion(message));
        }
        Err(SubmitRejected::InFlight) => {
            return Err(AppError::unexpected("a conversion is already running"));
        }
    };

    let progress = tokio::spawn(follow_progress(orchestrator.subscribe()));
    let outcome = task.wait().await;
    if let Err(err) = progress.await {
        warn!(error = %err, "progress renderer stopped unexpectedly");
    }

    match outcome {
        AttemptOutcome::Settled(JobState::Succeeded { artifact }) => {
            let path = orchestrator
                .presenter()
                .save(&artifact, &ctx.settings.output.directory)
                .await
                .map_err(|err| AppError::unexpected(err.to_string()))?;
            info!(path = %path.display(), "image saved");
            print_json(&Saved {
                file: path.display().to_string(),
                file_name: &artifact.file_name,
                size_bytes: artifact.size_bytes,
            })
        }
        AttemptOutcome::Settled(JobState::Failed { failure }) => {
            Err(AppError::Conversion(failure.message().to_string()))
        }
        AttemptOutcome::Settled(state) => Err(AppError::unexpected(format!(
            "conversion settled in unexpected state {state:?}"
        ))),
        AttemptOutcome::Superseded | AttemptOutcome::Interrupted => {
            Err(AppError::unexpected("conversion did not complete"))
        }
    }
}

async fn read_selection(path: &Path) -> Result<SelectedFile, AppError> {
    let data = tokio::fs::read(path).await.map_err(|err| {
        warn!(path = %path.display(), error = %err, "failed to read input file");
        AppError::Conversion(REQUEST_BUILD_MESSAGE.to_string())
    })?;
    Ok(SelectedFile::from_path(path, data)?)
}
