use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;

use crate::error::{HushmixError, Result};

const SPINNER_TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

/// Spinner-per-stage progress display for the command line
pub struct ProgressOperation {
    multi: MultiProgress,
    enabled: bool,
}

impl ProgressOperation {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            enabled,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Create an indeterminate spinner, or nothing when disabled
    pub fn create_spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.enabled {
            return None;
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(SPINNER_TICKS),
        );
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    fn finish<T>(pb: Option<ProgressBar>, message: &str, result: &Result<T>) {
        if let Some(pb) = pb {
            match result {
                Ok(_) => pb.finish_with_message(format!("✓ {}", message)),
                Err(_) => pb.abandon_with_message(format!("✗ {}", message)),
            }
        }
    }

    /// Await a future under a spinner
    pub async fn with_spinner<F, T>(&self, message: &str, operation: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let pb = self.create_spinner(message);
        let result = operation.await;
        Self::finish(pb, message, &result);
        result
    }

    /// Run CPU-bound work on the blocking pool under a spinner
    pub async fn with_blocking<F, T>(&self, message: &str, operation: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        self.with_spinner(message, async move {
            tokio::task::spawn_blocking(operation)
                .await
                .map_err(|e| HushmixError::Processing {
                    message: format!("Worker task failed: {}", e),
                })?
        })
        .await
    }
}

impl Default for ProgressOperation {
    fn default() -> Self {
        Self::new(true)
    }
}
