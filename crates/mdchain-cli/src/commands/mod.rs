pub mod coupling;
pub mod prepare;
pub mod run;
pub mod status;
pub mod template;

use mdchain::engine::cancel::CancellationToken;
use tokio::task::JoinHandle;
use tracing::warn;

/// Cancels `token` on Ctrl-C. Abort the returned handle once the workflow has returned.
pub(crate) fn spawn_interrupt_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping the running engine.");
            token.cancel();
        }
    })
}
