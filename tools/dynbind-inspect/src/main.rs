// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! dynbind inspector
//!
//! Loads description files and prints what the registry ends up holding.
//!
//! # Usage
//!
//! ```bash
//! # Load two descriptions (modules resolved through the system path)
//! dynbind-inspect load enesim.ender ./local/eina.ender
//!
//! # Load everything in the configured descriptions directory
//! dynbind-inspect load --all --config dynbind.toml
//!
//! # Configuration helpers
//! dynbind-inspect gen-config --output dynbind.toml
//! dynbind-inspect validate --config dynbind.toml
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dynbind::{Loader, LoaderConfig, Registry};
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Inspect dynbind descriptions
#[derive(Parser, Debug)]
#[command(name = "dynbind-inspect")]
#[command(about = "Load dynbind descriptions and print the resulting types")]
#[command(version)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Load descriptions and print namespaces, types, properties, functions
    Load {
        /// Description files or unit names
        files: Vec<PathBuf>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Load every description in the descriptions directory
        #[arg(long)]
        all: bool,

        /// Also print the built-in primitive namespace
        #[arg(long)]
        builtin: bool,
    },

    /// Generate a default configuration file
    GenConfig {
        /// Output file path
        #[arg(short, long, default_value = "dynbind.toml")]
        output: PathBuf,
    },

    /// Validate a configuration file
    Validate {
        /// Configuration file path
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    let config_level = match &args.command {
        Commands::Load {
            config: Some(path), ..
        } => LoaderConfig::from_file(path).ok().map(|c| c.log_level),
        _ => None,
    };
    let level = args
        .log_level
        .clone()
        .or(config_level)
        .unwrap_or_else(|| "warn".to_string());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let result = match args.command {
        Commands::Load {
            files,
            config,
            all,
            builtin,
        } => cmd_load(&files, config, all, builtin),
        Commands::GenConfig { output } => cmd_gen_config(&output),
        Commands::Validate { config } => cmd_validate(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn cmd_load(files: &[PathBuf], config: Option<PathBuf>, all: bool, builtin: bool) -> Result<()> {
    let config = match config {
        Some(path) => LoaderConfig::from_file(&path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if files.is_empty() && !all {
        bail!("nothing to load: pass description files or --all");
    }

    let registry = Rc::new(Registry::new());
    let loader = Loader::new(registry.clone(), config);

    if all {
        let count = loader.load_all()?;
        log::info!("{} descriptions loaded", count);
    }
    for file in files {
        let unit = file.to_string_lossy();
        loader
            .load(&unit)
            .with_context(|| format!("loading {}", unit))?;
    }

    for name in registry.namespace_names() {
        let Some(namespace) = registry.namespace(&name) else {
            continue;
        };
        if namespace.is_builtin() && !builtin {
            continue;
        }
        println!("{}", namespace.dump());
    }
    Ok(())
}

fn cmd_gen_config(output: &Path) -> Result<()> {
    let config = LoaderConfig {
        library_dirs: vec![PathBuf::from("/usr/local/lib")],
        ..LoaderConfig::default()
    };
    let toml_str = toml::to_string_pretty(&config)?;
    let content = format!(
        r#"# dynbind loader configuration
# Generated by dynbind-inspect gen-config

{}
"#,
        toml_str
    );
    std::fs::write(output, content)
        .with_context(|| format!("writing {}", output.display()))?;
    println!("Generated configuration file: {}", output.display());
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let config = LoaderConfig::from_file(path)
        .with_context(|| format!("configuration {} invalid", path.display()))?;
    println!("Configuration valid!");
    println!();
    println!("Descriptions: {}", config.descriptions_dir.display());
    println!("Extension:    .{}", config.extension);
    for dir in &config.library_dirs {
        println!("Library dir:  {}", dir.display());
    }
    if !config.preload.is_empty() {
        println!("Preload:      {}", config.preload.join(", "));
    }
    Ok(())
}
