//! `tracing` subscriber setup and the per-epoch training logger

use std::time::Instant;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::utils::error::{DetectorError, Result};
use crate::utils::format_duration;

/// Subscriber settings for [`init_logging`]
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: LogLevel,
    /// Print the module path of each event
    pub include_target: bool,
    pub include_thread_ids: bool,
    pub ansi_colors: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::at(LogLevel::Info)
    }
}

impl LogConfig {
    fn at(level: LogLevel) -> Self {
        Self {
            level,
            include_target: false,
            include_thread_ids: false,
            ansi_colors: true,
        }
    }

    /// Debug level with module paths and thread ids
    pub fn verbose() -> Self {
        Self {
            include_target: true,
            include_thread_ids: true,
            ..Self::at(LogLevel::Debug)
        }
    }

    /// Errors only
    pub fn quiet() -> Self {
        Self::at(LogLevel::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    /// Directive name understood by `EnvFilter`
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Case-insensitive level name; unknown names give `Info`
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_ascii_lowercase();
        if s == "warning" {
            return LogLevel::Warn;
        }
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .unwrap_or(LogLevel::Info)
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `config.level` when it is set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let layer = fmt::layer()
        .compact()
        .with_ansi(config.ansi_colors)
        .with_target(config.include_target)
        .with_thread_ids(config.include_thread_ids);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| DetectorError::Config(format!("logging already initialised: {}", e)))
}

/// Epoch-level progress logger for the training loop
pub struct TrainingLogger {
    epoch: usize,
    total_epochs: usize,
    /// Epochs actually run in this process (resumed runs skip some)
    epochs_run: usize,
    epoch_start: Instant,
    training_start: Instant,
}

impl TrainingLogger {
    pub fn new(total_epochs: usize) -> Self {
        Self {
            epoch: 0,
            total_epochs,
            epochs_run: 0,
            epoch_start: Instant::now(),
            training_start: Instant::now(),
        }
    }

    pub fn start_epoch(&mut self, epoch: usize) {
        self.epoch = epoch;
        self.epoch_start = Instant::now();
        tracing::info!("Epoch {}/{} started", epoch, self.total_epochs);
    }

    /// Logs the finished epoch with an ETA averaged over the epochs run here
    pub fn end_epoch(&mut self, train_loss: f64, val_loss: f64, val_accuracy: f64) {
        self.epochs_run += 1;
        let epoch_time = self.epoch_start.elapsed().as_secs_f64();
        let avg_epoch_time =
            self.training_start.elapsed().as_secs_f64() / self.epochs_run as f64;
        let eta = self.total_epochs.saturating_sub(self.epoch) as f64 * avg_epoch_time;

        tracing::info!(
            "Epoch {}/{} completed in {} | Train loss: {:.5} | Val loss: {:.5} | Val acc: {:.3}% | ETA: {}",
            self.epoch,
            self.total_epochs,
            format_duration(epoch_time),
            train_loss,
            val_loss,
            val_accuracy,
            format_duration(eta)
        );
    }

    pub fn log_skipped(&self, epoch: usize, checkpoint_epoch: usize) {
        tracing::debug!(
            "Skipping epoch {} (already covered by checkpoint at epoch {})",
            epoch,
            checkpoint_epoch
        );
    }

    pub fn log_complete(&self) {
        tracing::info!(
            "Training complete: {} epochs run in {}",
            self.epochs_run,
            format_duration(self.training_start.elapsed().as_secs_f64())
        );
    }

    /// Number of epochs run so far in this process
    pub fn epochs_run(&self) -> usize {
        self.epochs_run
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::parse("Warning"), LogLevel::Warn);
        assert_eq!(LogLevel::parse(" error "), LogLevel::Error);
        assert_eq!(LogLevel::parse("unknown"), LogLevel::Info);
    }

    #[test]
    fn test_log_level_names_match_filter_directives() {
        for level in LogLevel::ALL {
            assert_eq!(LogLevel::parse(&level.to_string()), level);
        }
    }

    #[test]
    fn test_log_config_default() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert!(!config.include_target);
        assert_eq!(LogConfig::quiet().level, LogLevel::Error);
        assert!(LogConfig::verbose().include_thread_ids);
    }

    #[test]
    fn test_training_logger_counts_epochs() {
        let mut logger = TrainingLogger::new(3);
        logger.start_epoch(2);
        logger.end_epoch(0.7, 0.6, 55.0);
        logger.start_epoch(3);
        logger.end_epoch(0.5, 0.5, 60.0);
        assert_eq!(logger.epochs_run(), 2);
    }
}
