// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use xcopy_testing::lab::orchestrator;
use xcopy_testing::spec;

#[derive(Debug, Parser)]
#[command(name = "xcopy-lab")]
#[command(about = "Runs clone workflows against in-memory storage arrays")]
struct LabCli {
    #[command(subcommand)]
    command: LabCommand,
}

#[derive(Debug, Subcommand)]
enum LabCommand {
    /// Run the full map/unmap workflow for a spec
    Run {
        spec_name: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Backend settings TOML; `XCOPY_STORAGE_*` variables override it
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a parsed spec
    Show { spec_name: String },
    /// List the specs under resources/lab-specs
    List,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("xcopy_adapters=info,xcopy_testing=info,warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let cli = LabCli::parse();
    match cli.command {
        LabCommand::Run {
            spec_name,
            json,
            config,
        } => {
            let report = match config {
                Some(path) => {
                    let config = orchestrator::load_config(&path)
                        .with_context(|| format!("loading {}", path.display()))?;
                    orchestrator::run_spec_with_config(&spec::load_by_name(&spec_name)?, &config)
                }
                None => orchestrator::run_by_name(&spec_name),
            }
            .with_context(|| format!("workflow for spec '{spec_name}' failed"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("run {} on {}", report.run_id, report.backend);
                for step in &report.steps {
                    let marker = if step.mutating { '*' } else { ' ' };
                    println!("  {marker} {:<22} {}", step.operation.as_str(), step.detail);
                }
                println!("mapped groups after map:   [{}]", report.groups_after_map.join(", "));
                println!("mapped groups after unmap: [{}]", report.groups_after_unmap.join(", "));
            }
            Ok(())
        }
        LabCommand::Show { spec_name } => {
            let loaded = spec::load_by_name(&spec_name)?;
            println!("{}", toml::to_string_pretty(&loaded)?);
            Ok(())
        }
        LabCommand::List => {
            for name in spec::list_names()? {
                println!("{name}");
            }
            Ok(())
        }
    }
}
