// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Meshbench Contributors

//! Meshbench CLI
//! Evaluates generated meshes / point clouds against dataset ground truth

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use meshbench::config::load_config;
use meshbench::eval::{evaluate, CLASS_REPORT_FILE, FULL_REPORT_FILE, JSON_REPORT_FILE};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "meshbench")]
#[command(about = "Evaluate 3D reconstructions against ground truth", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    config: Option<PathBuf>,

    /// Directory holding the generated meshes / point clouds
    #[arg(long)]
    generation_dir: Option<String>,

    /// Root directory of the evaluation dataset
    #[arg(long)]
    dataset_folder: Option<String>,

    /// File extension of generated meshes (obj, off, stl, ply)
    #[arg(long)]
    suffix: Option<String>,

    /// Also evaluate generated point clouds
    #[arg(long)]
    pointcloud: bool,

    /// RNG seed for surface sampling
    #[arg(long)]
    seed: Option<u64>,

    /// Evaluate instances in parallel
    #[arg(short, long)]
    parallel: bool,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{} {err:#}", "Error:".red().bold());
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(generation_dir) = cli.generation_dir {
        cfg.generation.generation_dir = generation_dir;
    }
    if let Some(dataset_folder) = cli.dataset_folder {
        cfg.data.dataset_folder = dataset_folder;
    }
    if let Some(suffix) = cli.suffix {
        cfg.generation.mesh_suffix = suffix;
    }
    if cli.pointcloud {
        cfg.test.eval_pointcloud = true;
    }
    if cli.seed.is_some() {
        cfg.eval.seed = cli.seed;
    }

    println!(
        "{} {}",
        "Evaluating generations in".bold(),
        cfg.generation.generation_dir
    );

    let (table, stats) = evaluate(&cfg, cli.parallel)?;

    table.print_summary();

    println!(
        "\n{} {} evaluated, {} skipped, {} missing / {} unevaluable meshes, {} missing / {} unevaluable point clouds",
        "Done:".green().bold(),
        stats.evaluated,
        stats.skipped,
        stats.missing_meshes,
        stats.invalid_meshes,
        stats.missing_pointclouds,
        stats.invalid_pointclouds
    );
    println!(
        "Reports written to {}, {} and {}",
        FULL_REPORT_FILE, CLASS_REPORT_FILE, JSON_REPORT_FILE
    );

    Ok(())
}
