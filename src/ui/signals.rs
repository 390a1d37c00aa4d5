use crate::error::{PdfTablesError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cooperative cancel flag. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Ctrl+C handling: the first press cancels the batch cooperatively, the
/// second exits immediately.
pub struct GracefulShutdown {
    token: CancellationToken,
    shutdown_message_shown: Arc<AtomicBool>,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let token = CancellationToken::new();
        let shutdown_message_shown = Arc::new(AtomicBool::new(false));

        let token_clone = token.clone();
        let message_shown_clone = shutdown_message_shown.clone();

        ctrlc::set_handler(move || {
            token_clone.cancel();

            if !message_shown_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\n🛑 Finishing the current file, then stopping... (press Ctrl+C again to force exit)");
            } else {
                eprintln!("\n💀 Force stopping...");
                std::process::exit(130);
            }
        })
        .map_err(|e| PdfTablesError::Config {
            message: format!("Failed to set signal handler: {}", e),
        })?;

        Ok(Self {
            token,
            shutdown_message_shown,
        })
    }

    /// Create a GracefulShutdown instance for testing (no signal handler registration)
    pub fn new_for_test() -> Self {
        Self {
            token: CancellationToken::new(),
            shutdown_message_shown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    pub fn check_shutdown(&self) -> Result<()> {
        if !self.is_running() {
            return Err(PdfTablesError::Cancelled);
        }
        Ok(())
    }

    pub fn request_shutdown(&self) {
        self.token.cancel();
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        Self::new().unwrap_or_else(|_| Self::new_for_test())
    }
}
