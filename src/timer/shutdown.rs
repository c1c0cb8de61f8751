use tokio::select;
use tokio_util::sync::CancellationToken;

/// Waits for Ctrl-C or for the timer finishing on its own. Either way the token ends up
/// cancelled, which stops the ticker and through it the processing module.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
