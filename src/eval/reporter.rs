// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Report generation (CSV tables, JSON summary, console output)

use super::dataset::ModelInfo;
use super::evaluator::MetricSet;
use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One evaluation result: identity fields plus metric columns.
///
/// Created once per instance and immutable afterwards; metric names carry a
/// ` (mesh)` or ` (pcl)` suffix to disambiguate modality.
#[derive(Debug, Clone, Serialize)]
pub struct MetricRow {
    pub idx: usize,
    pub class_id: String,
    pub class_name: String,
    pub modelname: String,
    pub metrics: Vec<(String, f64)>,
}

impl MetricRow {
    pub fn new(info: &ModelInfo) -> Self {
        Self {
            idx: info.idx,
            class_id: info.category_id.clone(),
            class_name: info.category_name.clone(),
            modelname: info.model_name.clone(),
            metrics: Vec::new(),
        }
    }

    /// Append one modality's metrics under a suffixed name
    pub fn extend(&mut self, suffix: &str, set: &MetricSet) {
        for (name, value) in set.iter() {
            self.metrics.push((format!("{name} ({suffix})"), value));
        }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| *v)
    }
}

/// Per-class means plus the trailing `mean` row
#[derive(Debug, Clone)]
pub struct ClassSummary {
    pub columns: Vec<String>,
    /// `(class name, per-column mean)`; NaN marks a column with no usable
    /// values for that class. The last row is named `mean`.
    pub rows: Vec<(String, Vec<f64>)>,
}

/// All evaluation rows, ready for persistence
pub struct ReportTable {
    rows: Vec<MetricRow>,
}

impl ReportTable {
    /// Rows are keyed by instance index; sorting here restores dataset
    /// order after a parallel run.
    pub fn from_rows(mut rows: Vec<MetricRow>) -> Self {
        rows.sort_by_key(|row| row.idx);
        Self { rows }
    }

    pub fn rows(&self) -> &[MetricRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Metric columns in first-seen order across all rows
    fn metric_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for row in &self.rows {
            for (name, _) in &row.metrics {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.clone());
                }
            }
        }
        columns
    }

    /// Write the full per-instance table
    pub fn write_full_csv(&self, path: &Path) -> Result<()> {
        let columns = self.metric_columns();

        let mut csv = String::from("idx,class id,class name,modelname");
        for column in &columns {
            csv.push(',');
            csv.push_str(&escape_csv(column));
        }
        csv.push('\n');

        for row in &self.rows {
            csv.push_str(&row.idx.to_string());
            csv.push(',');
            csv.push_str(&escape_csv(&row.class_id));
            csv.push(',');
            csv.push_str(&escape_csv(&row.class_name));
            csv.push(',');
            csv.push_str(&escape_csv(&row.modelname));
            for column in &columns {
                csv.push(',');
                match row.metric(column) {
                    Some(value) if !value.is_nan() => csv.push_str(&value.to_string()),
                    _ => {} // empty cell, like a dataframe NaN
                }
            }
            csv.push('\n');
        }

        fs::write(path, csv)?;
        Ok(())
    }

    /// Group rows by class name and average each metric column, skipping
    /// missing/NaN entries per column. The trailing `mean` row averages the
    /// class rows, not the instances, so small classes weigh as much as
    /// large ones.
    pub fn class_summary(&self) -> ClassSummary {
        let columns = self.metric_columns();

        let mut groups: BTreeMap<String, Vec<&MetricRow>> = BTreeMap::new();
        for row in &self.rows {
            groups.entry(row.class_name.clone()).or_default().push(row);
        }

        let mut rows: Vec<(String, Vec<f64>)> = Vec::new();
        for (class_name, members) in groups {
            let means = columns
                .iter()
                .map(|column| {
                    nan_mean(members.iter().filter_map(|row| row.metric(column)))
                })
                .collect();
            rows.push((class_name, means));
        }

        let grand_means: Vec<f64> = (0..columns.len())
            .map(|i| nan_mean(rows.iter().map(|(_, means)| means[i])))
            .collect();
        rows.push(("mean".to_string(), grand_means));

        ClassSummary { columns, rows }
    }

    /// Write the per-class summary table
    pub fn write_class_csv(&self, path: &Path) -> Result<()> {
        let summary = self.class_summary();

        let mut csv = String::from("class name");
        for column in &summary.columns {
            csv.push(',');
            csv.push_str(&escape_csv(column));
        }
        csv.push('\n');

        for (class_name, means) in &summary.rows {
            csv.push_str(&escape_csv(class_name));
            for mean in means {
                csv.push(',');
                if !mean.is_nan() {
                    csv.push_str(&mean.to_string());
                }
            }
            csv.push('\n');
        }

        fs::write(path, csv)?;
        Ok(())
    }

    /// Write a machine-readable copy of the class summary
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let summary = self.class_summary();

        let mut classes = serde_json::Map::new();
        for (class_name, means) in &summary.rows {
            let mut metrics = serde_json::Map::new();
            for (column, mean) in summary.columns.iter().zip(means) {
                // NaN serializes as null
                metrics.insert(column.clone(), serde_json::Value::from(*mean));
            }
            classes.insert(class_name.clone(), serde_json::Value::Object(metrics));
        }

        let report = serde_json::json!({
            "timestamp": Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            "instances": self.rows.len(),
            "classes": classes,
        });

        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        Ok(())
    }

    /// Print the class summary to the console
    pub fn print_summary(&self) {
        let summary = self.class_summary();

        println!("\n{}", "═".repeat(72).bright_black());
        println!("{}", "Evaluation Summary".bold());
        println!("{}", "═".repeat(72).bright_black());

        for (class_name, means) in &summary.rows {
            println!("  {}", class_name.cyan().bold());
            for (column, mean) in summary.columns.iter().zip(means) {
                if mean.is_nan() {
                    println!("    {:<24} {}", column.bright_black(), "n/a".yellow());
                } else {
                    println!("    {:<24} {:.6}", column.bright_black(), mean);
                }
            }
        }

        println!("{}", "═".repeat(72).bright_black());
    }
}

/// Mean that skips NaN entries; NaN when nothing remains
fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for value in values {
        if !value.is_nan() {
            sum += value;
            count += 1;
        }
    }
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

fn escape_csv(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(idx: usize, class_name: &str, chamfer: f64) -> MetricRow {
        MetricRow {
            idx,
            class_id: format!("c{idx}"),
            class_name: class_name.to_string(),
            modelname: format!("model_{idx}"),
            metrics: vec![("chamfer-L1 (mesh)".to_string(), chamfer)],
        }
    }

    #[test]
    fn test_mean_of_class_means() {
        // Two classes with 3 and 1 instances: the trailing mean row must
        // weight the classes equally, not the instances
        let table = ReportTable::from_rows(vec![
            row(0, "chair", 0.1),
            row(1, "chair", 0.1),
            row(2, "chair", 0.1),
            row(3, "sofa", 0.2),
        ]);

        let summary = table.class_summary();
        assert_eq!(summary.rows.len(), 3);
        assert_eq!(summary.rows[0].0, "chair");
        assert!((summary.rows[0].1[0] - 0.1).abs() < 1e-12);
        assert_eq!(summary.rows[1].0, "sofa");
        assert!((summary.rows[1].1[0] - 0.2).abs() < 1e-12);
        assert_eq!(summary.rows[2].0, "mean");
        assert!((summary.rows[2].1[0] - 0.15).abs() < 1e-12);
    }

    #[test]
    fn test_nan_excluded_from_means() {
        let table = ReportTable::from_rows(vec![
            row(0, "chair", 0.1),
            row(1, "chair", f64::NAN),
        ]);
        let summary = table.class_summary();
        assert!((summary.rows[0].1[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_rows_sorted_by_idx() {
        let table = ReportTable::from_rows(vec![row(2, "a", 0.1), row(0, "a", 0.1)]);
        assert_eq!(table.rows()[0].idx, 0);
        assert_eq!(table.rows()[1].idx, 2);
    }

    #[test]
    fn test_full_csv_with_missing_metrics() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("full.csv");

        let mut with_metrics = row(0, "chair", 0.5);
        with_metrics.metrics.push(("iou (mesh)".to_string(), 0.9));
        let mut without = row(1, "chair", f64::NAN);
        without.metrics.clear();

        ReportTable::from_rows(vec![with_metrics, without]).write_full_csv(&path)?;

        let csv = fs::read_to_string(&path)?;
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "idx,class id,class name,modelname,chamfer-L1 (mesh),iou (mesh)"
        );
        assert_eq!(lines[1], "0,c0,chair,model_0,0.5,0.9");
        // Identity populated, metric cells empty
        assert_eq!(lines[2], "1,c1,chair,model_1,,");
        Ok(())
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
    }
}
