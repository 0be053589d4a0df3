use clap::Parser;
use kubefix::{
    cli::{Cli, Commands},
    config::ScanConfig,
    fix::{EnrichmentConfig, Fixer, HttpEnrichment, OfflineEnrichment},
    report::{self, OutputFormat},
    scan,
};
use std::process;

fn main() {
    let cli = Cli::parse();
    cli.init_logging();

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn run(cli: Cli) -> kubefix::Result<i32> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            path,
            format,
            threshold,
            no_fail,
        } => {
            let mut config = config;
            if let Some(threshold) = threshold {
                config.failure_threshold = threshold.into();
            }
            if no_fail {
                config.no_fail = true;
            }

            let report = scan::scan(&path, &config)?;
            print!("{}", report::format_scan(&report, format.into()));

            Ok(if report.should_fail(&config) { 1 } else { 0 })
        }
        Commands::Fix {
            path,
            output,
            dry_run,
            enrich,
            format,
        } => {
            let report = scan::scan(&path, &config)?;
            let fixer = build_fixer(&config, enrich);
            let fixes = scan::fix_sources(&report, &fixer, output.as_deref(), dry_run)?;

            let format: OutputFormat = format.into();
            print!("{}", report::format_scan(&report, format));
            print!("{}", report::format_fixes(&fixes, format));

            Ok(0)
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> kubefix::Result<ScanConfig> {
    match path {
        Some(path) => Ok(ScanConfig::load_from_file(path)?),
        None => Ok(ScanConfig::load_from_default().unwrap_or_default()),
    }
}

fn build_fixer(config: &ScanConfig, enrich: bool) -> Fixer {
    if enrich || config.enrichment.enabled {
        match HttpEnrichment::new(EnrichmentConfig::from(&config.enrichment)) {
            Ok(client) => {
                return Fixer::with_enrichment(config.fix.clone(), Box::new(client));
            }
            Err(e) => {
                log::warn!("enrichment client unavailable ({}); using deterministic fixes", e);
            }
        }
    }
    Fixer::with_enrichment(config.fix.clone(), Box::new(OfflineEnrichment))
}
