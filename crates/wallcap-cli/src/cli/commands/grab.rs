//! `wallcap grab` – capture one image per source page over a single browser connection.

use anyhow::{Context, Result};
use wallcap_core::config::WallcapConfig;
use wallcap_core::connection::{Connection, RetryPolicy};
use wallcap_core::session::{CaptureOptions, DownloadSession};

use crate::cli::{destination_for, GrabArgs};

pub async fn run_grab(mut cfg: WallcapConfig, args: &GrabArgs) -> Result<()> {
    args.apply(&mut cfg);
    let options = CaptureOptions::from_config(&cfg)?;
    let sources = args.sources(&cfg);
    let policy = RetryPolicy::from(&cfg.connection);

    let connection = Connection::open(&cfg.browser, &policy)
        .await
        .context("connect to browser")?;
    let (transport, browser) = connection.into_parts();
    let mut session = DownloadSession::new(transport, options);

    let mut outcome = Ok(());
    for (index, source) in sources.iter().enumerate() {
        let destination = destination_for(args.output.as_deref(), index, sources.len());
        match session.download(destination, source).await {
            Ok(report) => {
                println!(
                    "Image saved: {} ({}x{}, {} bytes)",
                    report.destination.display(),
                    report.photo.width,
                    report.photo.height,
                    report.bytes_written
                );
            }
            Err(e) => {
                outcome = Err(e).with_context(|| format!("capture from {}", source));
                break;
            }
        }
    }

    // Torn down on success and failure alike.
    Connection::from_parts(session.into_inner(), browser)
        .close()
        .await;
    outcome
}
