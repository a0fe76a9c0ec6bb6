//! Dataset Discovery
//!
//! Lists training and test images with glob patterns and pairs them with
//! labels. Training labels come from the folder an image lives in; test
//! labels come from a semicolon-separated CSV file.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use colored::Colorize;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Label, Sample};
use crate::utils::error::{DetectorError, Result};

/// Glob for real training images
pub const REAL_PATTERN: &str = "*.jpg";

/// Glob for generated training images (any extension)
pub const GENERATED_PATTERN: &str = "*.*";

/// Glob for test images
pub const TEST_PATTERN: &str = "*.jpg";

/// Default label file name inside `<test_root>/test/`
pub const TEST_LABELS_FILE: &str = "test_labels.csv";

/// CSV columns that may carry the image file name, checked in order
const NAME_COLUMNS: [&str; 4] = ["filename", "file", "image", "id"];

/// List the files in `dir` matching `pattern`, sorted by path
pub fn glob_images(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(DetectorError::PathNotFound(dir.to_path_buf()));
    }

    let full_pattern = dir.join(pattern);
    let mut paths: Vec<PathBuf> = glob::glob(&full_pattern.to_string_lossy())?
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    debug!("{} files match {:?}", paths.len(), full_pattern);
    Ok(paths)
}

/// Assemble the training samples.
///
/// Real images are randomly subsampled down to `real_samples` (`0` keeps all
/// of them) and come first, followed by every generated image.
pub fn discover_training_samples<R: Rng + ?Sized>(
    train_dir: &Path,
    real_folder: &str,
    fake_folder: &str,
    real_samples: usize,
    rng: &mut R,
) -> Result<Vec<Sample>> {
    info!("Discovering training images under {:?}", train_dir);

    let real_paths = glob_images(&train_dir.join(real_folder), REAL_PATTERN)?;
    let generated_paths = glob_images(&train_dir.join(fake_folder), GENERATED_PATTERN)?;

    let real_paths = if real_samples == 0 {
        real_paths
    } else if real_paths.len() < real_samples {
        warn!(
            "Requested {} real images but only {} exist; using all of them",
            real_samples,
            real_paths.len()
        );
        real_paths
    } else {
        real_paths
            .choose_multiple(rng, real_samples)
            .cloned()
            .collect()
    };

    info!(
        "Using {} real and {} generated training images",
        real_paths.len(),
        generated_paths.len()
    );

    let samples: Vec<Sample> = real_paths
        .into_iter()
        .map(|path| Sample::new(path, Label::Real))
        .chain(
            generated_paths
                .into_iter()
                .map(|path| Sample::new(path, Label::Generated)),
        )
        .collect();

    if samples.is_empty() {
        return Err(DetectorError::Dataset(format!(
            "no training images found under {:?}",
            train_dir
        )));
    }

    Ok(samples)
}

/// One row of the test label file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRow {
    /// File name or stem, when the CSV has a name column
    pub name: Option<String>,
    pub label: Label,
}

/// Read the `label` column (and a file-name column, if present) of a
/// semicolon-separated CSV file
pub fn read_label_rows(csv_path: &Path) -> Result<Vec<LabelRow>> {
    if !csv_path.is_file() {
        return Err(DetectorError::PathNotFound(csv_path.to_path_buf()));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b';')
        .trim(csv::Trim::All)
        .from_path(csv_path)?;

    let headers = reader.headers()?.clone();
    let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

    let label_idx = find("label").ok_or_else(|| {
        DetectorError::Csv(format!("{:?} has no 'label' column", csv_path))
    })?;
    let name_idx = NAME_COLUMNS.iter().find_map(|&column| find(column));

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let raw = record.get(label_idx).ok_or_else(|| {
            DetectorError::Csv(format!("row {} is missing the label field", line + 1))
        })?;
        let label = raw.parse::<Label>()?;
        let name = name_idx
            .and_then(|idx| record.get(idx))
            .map(str::to_string);
        rows.push(LabelRow { name, label });
    }

    debug!("Read {} label rows from {:?}", rows.len(), csv_path);
    Ok(rows)
}

/// Assemble the test samples from `<test_root>/test/*.jpg` and the label file.
///
/// `labels_csv` defaults to `<test_root>/test/test_labels.csv`.
pub fn discover_test_samples(test_root: &Path, labels_csv: Option<&Path>) -> Result<Vec<Sample>> {
    let test_dir = test_root.join("test");
    info!("Discovering test images under {:?}", test_dir);

    let images = glob_images(&test_dir, TEST_PATTERN)?;
    let csv_path = labels_csv
        .map(Path::to_path_buf)
        .unwrap_or_else(|| test_dir.join(TEST_LABELS_FILE));
    let rows = read_label_rows(&csv_path)?;

    let samples = if rows.iter().all(|row| row.name.is_some()) && !rows.is_empty() {
        match_by_name(images, &rows)?
    } else {
        match_by_position(images, rows)?
    };

    info!("Loaded {} labelled test images", samples.len());
    Ok(samples)
}

fn match_by_position(images: Vec<PathBuf>, rows: Vec<LabelRow>) -> Result<Vec<Sample>> {
    if images.len() != rows.len() {
        return Err(DetectorError::LabelMismatch {
            images: images.len(),
            labels: rows.len(),
        });
    }

    Ok(images
        .into_iter()
        .zip(rows)
        .map(|(path, row)| Sample::new(path, row.label))
        .collect())
}

fn match_by_name(images: Vec<PathBuf>, rows: &[LabelRow]) -> Result<Vec<Sample>> {
    let by_name: HashMap<&str, Label> = rows
        .iter()
        .filter_map(|row| row.name.as_deref().map(|name| (name, row.label)))
        .collect();

    images
        .into_iter()
        .map(|path| {
            let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            let stem = path.file_stem().and_then(|n| n.to_str()).unwrap_or_default();
            let label = by_name
                .get(file_name)
                .or_else(|| by_name.get(stem))
                .copied()
                .ok_or_else(|| {
                    DetectorError::Dataset(format!("no label row for test image {:?}", path))
                })?;
            Ok(Sample::new(path, label))
        })
        .collect()
}

/// Per-label sample counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub real: usize,
    pub generated: usize,
}

impl DatasetStats {
    pub fn from_samples(samples: &[Sample]) -> Self {
        samples.iter().fold(Self::default(), |mut stats, sample| {
            match sample.label {
                Label::Real => stats.real += 1,
                Label::Generated => stats.generated += 1,
            }
            stats
        })
    }

    pub fn total(&self) -> usize {
        self.real + self.generated
    }

    /// Bar width out of `width` for `count`
    pub fn bar_len(&self, count: usize, width: usize) -> usize {
        match self.total() {
            0 => 0,
            total => count * width / total,
        }
    }

    /// Print the counts with a proportional bar per label
    pub fn print(&self, title: &str) {
        println!("\n{}", format!("{}:", title).cyan().bold());
        println!("  Total samples: {}", self.total().to_string().bold());
        for (label, count) in [(Label::Real, self.real), (Label::Generated, self.generated)] {
            let bar = "█".repeat(self.bar_len(count, 40));
            let bar = match label {
                Label::Real => bar.green(),
                Label::Generated => bar.magenta(),
            };
            println!("    {:10} {:6} {}", label.name(), count, bar);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use tempfile::TempDir;

    fn create_test_image(path: &Path) {
        let img = image::ImageBuffer::from_fn(8, 8, |_, _| image::Rgb([200u8, 10u8, 10u8]));
        img.save(path).unwrap();
    }

    fn make_train_dir(real: usize, generated: usize) -> TempDir {
        let temp = TempDir::new().unwrap();
        let real_dir = temp.path().join("real");
        let gen_dir = temp.path().join("generated");
        fs::create_dir_all(&real_dir).unwrap();
        fs::create_dir_all(&gen_dir).unwrap();
        for i in 0..real {
            create_test_image(&real_dir.join(format!("r{:03}.jpg", i)));
        }
        for i in 0..generated {
            let ext = if i % 2 == 0 { "png" } else { "jpg" };
            create_test_image(&gen_dir.join(format!("g{:03}.{}", i, ext)));
        }
        temp
    }

    #[test]
    fn test_glob_images_filters_and_sorts() {
        let temp = TempDir::new().unwrap();
        create_test_image(&temp.path().join("b.jpg"));
        create_test_image(&temp.path().join("a.jpg"));
        create_test_image(&temp.path().join("c.png"));

        let jpgs = glob_images(temp.path(), "*.jpg").unwrap();
        assert_eq!(jpgs.len(), 2);
        assert!(jpgs[0].ends_with("a.jpg"));
        assert!(jpgs[1].ends_with("b.jpg"));

        let all = glob_images(temp.path(), "*.*").unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_glob_images_missing_dir() {
        let result = glob_images(Path::new("/definitely/not/here"), "*.jpg");
        assert!(matches!(result, Err(DetectorError::PathNotFound(_))));
    }

    #[test]
    fn test_training_samples_subsample_real() {
        let temp = make_train_dir(10, 3);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let samples =
            discover_training_samples(temp.path(), "real", "generated", 4, &mut rng).unwrap();

        assert_eq!(samples.len(), 7);
        assert!(samples[..4].iter().all(|s| s.label == Label::Real));
        assert!(samples[4..].iter().all(|s| s.label == Label::Generated));
    }

    #[test]
    fn test_training_samples_keep_all_when_short() {
        let temp = make_train_dir(2, 2);
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let samples =
            discover_training_samples(temp.path(), "real", "generated", 1000, &mut rng).unwrap();
        assert_eq!(DatasetStats::from_samples(&samples), DatasetStats { real: 2, generated: 2 });

        let samples =
            discover_training_samples(temp.path(), "real", "generated", 0, &mut rng).unwrap();
        assert_eq!(samples.len(), 4);
    }

    #[test]
    fn test_stats_bar_lengths() {
        let stats = DatasetStats { real: 30, generated: 10 };
        assert_eq!(stats.total(), 40);
        assert_eq!(stats.bar_len(stats.real, 40), 30);
        assert_eq!(stats.bar_len(stats.generated, 40), 10);
        assert_eq!(DatasetStats::default().bar_len(0, 40), 0);
        stats.print("Training set");
    }

    #[test]
    fn test_training_samples_same_seed_same_selection() {
        let temp = make_train_dir(12, 1);

        let a = discover_training_samples(
            temp.path(),
            "real",
            "generated",
            5,
            &mut ChaCha8Rng::seed_from_u64(3),
        )
        .unwrap();
        let b = discover_training_samples(
            temp.path(),
            "real",
            "generated",
            5,
            &mut ChaCha8Rng::seed_from_u64(3),
        )
        .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_read_label_rows_semicolon() {
        let temp = TempDir::new().unwrap();
        let csv_path = temp.path().join("labels.csv");
        fs::write(&csv_path, "id;label\n1;real\n2;generated\n3;1\n").unwrap();

        let rows = read_label_rows(&csv_path).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].name.as_deref(), Some("1"));
        assert_eq!(rows[1].label, Label::Generated);
        assert_eq!(rows[2].label, Label::Generated);
    }

    #[test]
    fn test_read_label_rows_requires_label_column() {
        let temp = TempDir::new().unwrap();
        let csv_path = temp.path().join("labels.csv");
        fs::write(&csv_path, "name;class\na.jpg;real\n").unwrap();

        assert!(matches!(read_label_rows(&csv_path), Err(DetectorError::Csv(_))));
    }

    #[test]
    fn test_test_samples_positional() {
        let temp = TempDir::new().unwrap();
        let test_dir = temp.path().join("test");
        fs::create_dir_all(&test_dir).unwrap();
        create_test_image(&test_dir.join("001.jpg"));
        create_test_image(&test_dir.join("002.jpg"));
        fs::write(test_dir.join(TEST_LABELS_FILE), "label\ngenerated\nreal\n").unwrap();

        let samples = discover_test_samples(temp.path(), None).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].label, Label::Generated);
        assert_eq!(samples[1].label, Label::Real);
    }

    #[test]
    fn test_test_samples_by_name() {
        let temp = TempDir::new().unwrap();
        let test_dir = temp.path().join("test");
        fs::create_dir_all(&test_dir).unwrap();
        create_test_image(&test_dir.join("cat.jpg"));
        create_test_image(&test_dir.join("dog.jpg"));
        fs::write(
            test_dir.join(TEST_LABELS_FILE),
            "filename;label\ndog;real\ncat.jpg;generated\n",
        )
        .unwrap();

        let samples = discover_test_samples(temp.path(), None).unwrap();
        assert!(samples[0].path.ends_with("cat.jpg"));
        assert_eq!(samples[0].label, Label::Generated);
        assert_eq!(samples[1].label, Label::Real);
    }

    #[test]
    fn test_test_samples_count_mismatch() {
        let temp = TempDir::new().unwrap();
        let test_dir = temp.path().join("test");
        fs::create_dir_all(&test_dir).unwrap();
        create_test_image(&test_dir.join("001.jpg"));
        fs::write(test_dir.join(TEST_LABELS_FILE), "label\nreal\nreal\n").unwrap();

        let result = discover_test_samples(temp.path(), None);
        assert!(matches!(
            result,
            Err(DetectorError::LabelMismatch { images: 1, labels: 2 })
        ));
    }
}
