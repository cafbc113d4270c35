use tokio::signal;

pub use load_tunnel_core::prelude::{DelegatedShutdownListener, ShutdownHandle};

/// Fire a shutdown on Ctrl-C. Must be called from within a Tokio runtime.
pub fn start_shutdown_listener() -> ShutdownHandle {
    let handle = ShutdownHandle::default();

    let listener_handle = handle.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("Received shutdown signal, stopping the load test...");
                listener_handle.shutdown();
            }
            Err(e) => log::error!("Failed to listen for Ctrl-C, the run cannot be interrupted: {e}"),
        }
    });

    handle
}
