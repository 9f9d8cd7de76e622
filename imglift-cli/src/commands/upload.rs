//! The upload command.

use tokio_util::sync::CancellationToken;

use imglift::EngineClient;

use crate::cli::Cli;

pub async fn execute(cli: Cli) -> anyhow::Result<()> {
    // Ctrl-C cancels the convergence waits instead of killing the process
    // mid-request.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling");
            signal_cancel.cancel();
        }
    });

    let engine = EngineClient::new(&cli.engine.to_options())?;
    let options = cli.upload.to_options(cancel);

    let outcome = imglift::upload_image(&engine, &options).await?;
    tracing::info!(
        disk_id = %outcome.disk_id,
        transfer_id = %outcome.transfer_id,
        bytes = outcome.bytes_sent,
        "upload complete"
    );
    println!("{}", outcome.disk_id);
    Ok(())
}
