//! Per-epoch training history with JSON and SVG export

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::metrics::EpochMetrics;
use crate::utils::charts::{
    render_line_chart, DataSeries, YAxis, COLOR_PRIMARY, COLOR_SECONDARY, COLOR_TERTIARY,
};
use crate::utils::error::Result;

pub const HISTORY_FILE: &str = "history.json";
pub const CURVES_FILE: &str = "training_curves.svg";
pub const LOSS_CURVES_FILE: &str = "loss_curves.svg";

/// Metrics for every epoch that ran
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
    /// Epoch of the checkpoint the run resumed from
    pub resumed_from: Option<usize>,
}

impl TrainingHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, metrics: EpochMetrics) {
        self.epochs.push(metrics);
    }

    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }

    /// Epoch with the highest validation accuracy
    pub fn best_epoch(&self) -> Option<&EpochMetrics> {
        self.epochs
            .iter()
            .max_by(|a, b| a.val_accuracy.total_cmp(&b.val_accuracy))
    }

    pub fn save_json(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load_json(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&fs::read_to_string(path)?)?)
    }

    /// Accuracy and loss curves as two SVG documents
    pub fn render_charts(&self) -> (String, String) {
        let x = |m: &EpochMetrics| m.epoch as f64;

        let mut accuracy = vec![
            DataSeries::new("Train", COLOR_PRIMARY, self.epochs.iter().map(|m| (x(m), m.train_accuracy))),
            DataSeries::new("Validation", COLOR_SECONDARY, self.epochs.iter().map(|m| (x(m), m.val_accuracy))),
        ];
        let test_points: Vec<(f64, f64)> = self
            .epochs
            .iter()
            .filter_map(|m| m.test_accuracy.map(|acc| (x(m), acc)))
            .collect();
        if !test_points.is_empty() {
            accuracy.push(DataSeries::new("Test", COLOR_TERTIARY, test_points));
        }

        let loss = vec![
            DataSeries::new("Train", COLOR_PRIMARY, self.epochs.iter().map(|m| (x(m), m.train_loss))),
            DataSeries::new("Validation", COLOR_SECONDARY, self.epochs.iter().map(|m| (x(m), m.val_loss))),
        ];

        (
            render_line_chart("Accuracy per Epoch", "Epoch", "Accuracy (%)", &accuracy, YAxis::Percent),
            render_line_chart("Loss per Epoch", "Epoch", "Loss", &loss, YAxis::Auto),
        )
    }

    /// Write `history.json` and the SVG curves into `dir`
    pub fn save_artifacts(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        self.save_json(&dir.join(HISTORY_FILE))?;

        let (accuracy_svg, loss_svg) = self.render_charts();
        fs::write(dir.join(CURVES_FILE), accuracy_svg)?;
        fs::write(dir.join(LOSS_CURVES_FILE), loss_svg)?;

        info!("Training history written to {:?}", dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(epoch: usize, val_accuracy: f64, test_accuracy: Option<f64>) -> EpochMetrics {
        EpochMetrics {
            epoch,
            train_loss: 0.7 / epoch as f64,
            train_accuracy: 50.0 + epoch as f64,
            val_loss: 0.8 / epoch as f64,
            val_accuracy,
            test_accuracy,
            duration_secs: 1.0,
        }
    }

    #[test]
    fn test_best_epoch() {
        let mut history = TrainingHistory::new();
        history.push(metrics(1, 55.0, None));
        history.push(metrics(2, 71.0, None));
        history.push(metrics(3, 64.0, None));

        assert_eq!(history.best_epoch().map(|m| m.epoch), Some(2));
        assert_eq!(history.last().map(|m| m.epoch), Some(3));
    }

    #[test]
    fn test_charts_include_test_series_when_present() {
        let mut history = TrainingHistory::new();
        history.push(metrics(1, 55.0, Some(52.0)));
        history.push(metrics(2, 60.0, None));

        let (accuracy, loss) = history.render_charts();
        assert_eq!(accuracy.matches("<path").count(), 3);
        assert_eq!(loss.matches("<path").count(), 2);
    }

    #[test]
    fn test_save_artifacts() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut history = TrainingHistory::new();
        history.push(metrics(1, 55.0, Some(50.0)));
        history.resumed_from = Some(10);

        history.save_artifacts(dir.path()).unwrap();

        assert!(dir.path().join(CURVES_FILE).exists());
        assert!(dir.path().join(LOSS_CURVES_FILE).exists());
        let loaded = TrainingHistory::load_json(&dir.path().join(HISTORY_FILE)).unwrap();
        assert_eq!(loaded, history);
    }
}
