use gerber2png_client::application::job::{JobRecord, JobState};
use tokio::sync::watch;

/// Draw upload progress on stderr until the job leaves `Uploading`.
pub async fn follow_progress(mut job: watch::Receiver<JobRecord>) {
    let mut shown = None;
    loop {
        let progress = match job.borrow_and_update().state() {
            JobState::Uploading { progress } => Some(*progress),
            _ => None,
        };
        let Some(progress) = progress else { break };
        if shown != Some(progress) {
            eprint!("\rUploading... {progress}%");
            shown = Some(progress);
        }
        if job.changed().await.is_err() {
            break;
        }
    }
    if shown.is_some() {
        eprintln!();
    }
}
