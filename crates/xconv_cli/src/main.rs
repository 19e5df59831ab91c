//! `xconv <file> [--permissive]`
//!
//! `model.x` becomes `model.scene.json` plus its sidecars;
//! `model.scene.json` becomes `model.x`.

use std::env;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use xconv_core::{convert_path, ConvertOptions, MaterialIndexPolicy};

fn usage() {
    println!("Usage: xconv <file.x | file.scene.json> [--permissive]");
    println!("\nOptions:");
    println!("  --permissive   drop faces whose material index has no material instead of failing");
    println!("\nSet RUST_LOG=debug for parser details.");
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut input: Option<PathBuf> = None;
    let mut options = ConvertOptions::default();

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--permissive" => options = options.with_policy(MaterialIndexPolicy::Permissive),
            "-h" | "--help" => {
                usage();
                return Ok(());
            }
            flag if flag.starts_with("--") => bail!("unknown option {}", flag),
            path if input.is_none() => input = Some(PathBuf::from(path)),
            extra => bail!("unexpected argument {}", extra),
        }
    }

    let Some(input) = input else {
        usage();
        return Ok(());
    };

    let report = convert_path(&input, &options)
        .with_context(|| format!("failed to convert {}", input.display()))?;

    if let Some(output) = &report.output {
        println!("{} created.", output.display());
    }
    for sidecar in &report.sidecars {
        println!("Sidecar written: {}", sidecar.display());
    }
    if !report.warnings.is_empty() {
        println!("{} warnings:", report.warnings.len());
        for warning in &report.warnings {
            println!("  - {}", warning);
        }
    }

    Ok(())
}
