use anyhow::{bail, Context, Result};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dossier_core::{
    validate_file, EngineConfig, FallbackChainCoordinator, FileReportRegistry, TemplateRef,
};
use dossier_model::ReportDocument;
use dossier_strategy::StrategySelector;
use dossier_template::TemplateIntrospector;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("dossier")
        .version(dossier_core::VERSION)
        .about("Assemble report documents from templates, with fallback formats")
        .subcommand_required(true)
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(
            Command::new("generate")
                .about("Generate an artifact for a report")
                .arg(
                    Arg::new("report")
                        .long("report")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Report snapshot as JSON"),
                )
                .arg(
                    Arg::new("template")
                        .long("template")
                        .value_parser(value_parser!(PathBuf))
                        .help("Template container to fill"),
                )
                .arg(
                    Arg::new("scratch")
                        .long("scratch")
                        .action(ArgAction::SetTrue)
                        .help("Ignore any template and compose from scratch"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("Engine configuration (TOML)"),
                )
                .arg(
                    Arg::new("out")
                        .long("out")
                        .value_parser(value_parser!(PathBuf))
                        .help("Artifact directory, overriding the configured storage root"),
                )
                .arg(
                    Arg::new("registry")
                        .long("registry")
                        .value_parser(value_parser!(PathBuf))
                        .help("Directory of report pointer files [default: <storage root>/records]"),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print a template's placeholders, blocks and selected strategies")
                .arg(
                    Arg::new("template")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Structurally validate a stored artifact")
                .arg(
                    Arg::new("artifact")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let matches = cli().get_matches();
    let json = matches.get_flag("json")
        || matches
            .subcommand()
            .is_some_and(|(_, args)| args.get_flag("json"));
    init_tracing(json);

    match matches.subcommand() {
        Some(("generate", args)) => generate(args),
        Some(("inspect", args)) => inspect(args),
        Some(("validate", args)) => validate(args),
        Some((other, _)) => bail!("unknown command {other}"),
        None => bail!("a command is required"),
    }
}

fn generate(args: &ArgMatches) -> Result<()> {
    let mut config = match args.get_one::<PathBuf>("config") {
        Some(path) => EngineConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::new(),
    };
    if let Some(out) = args.get_one::<PathBuf>("out") {
        config = config.with_storage_root(out);
    }
    config.validate().context("invalid configuration")?;

    let report_path = args
        .get_one::<PathBuf>("report")
        .context("--report is required")?;
    let raw = std::fs::read(report_path)
        .with_context(|| format!("reading report {}", report_path.display()))?;
    let mut report: ReportDocument = serde_json::from_slice(&raw)
        .with_context(|| format!("parsing report {}", report_path.display()))?;
    if args.get_flag("scratch") {
        report.generate_without_template = true;
    }
    tracing::info!(
        report_id = %report.id,
        findings = report.findings.len(),
        methodologies = report.methodologies.len(),
        "report loaded"
    );

    let registry_dir = args
        .get_one::<PathBuf>("registry")
        .cloned()
        .unwrap_or_else(|| config.storage_root.join("records"));
    let coordinator = FallbackChainCoordinator::new(config)
        .with_registry(Arc::new(FileReportRegistry::new(registry_dir)));

    let template = args
        .get_one::<PathBuf>("template")
        .map(|p| TemplateRef::Path(p.clone()));
    let outcome = coordinator.run(&report, template.as_ref());

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    if !outcome.is_done() {
        std::process::exit(1);
    }
    Ok(())
}

fn inspect(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("template")
        .context("template path is required")?;
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let descriptor = TemplateIntrospector::new()
        .introspect(&bytes)
        .with_context(|| format!("introspecting {}", path.display()))?;
    let plan = StrategySelector::new().select_all(&descriptor);

    let report = serde_json::json!({
        "template": path,
        "placeholders": descriptor.placeholders.iter().collect::<Vec<_>>(),
        "blocks": descriptor.blocks,
        "plan": plan,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn validate(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("artifact")
        .context("artifact path is required")?;
    if !path.is_file() {
        bail!("{} is not a file", path.display());
    }
    let hash = validate_file(path).with_context(|| format!("validating {}", path.display()))?;
    println!("valid {} content-hash={hash}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn generate_accepts_scratch_flag() {
        let matches = cli()
            .try_get_matches_from(["dossier", "generate", "--report", "r.json", "--scratch", "--json"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "generate");
        assert!(args.get_flag("scratch"));
        assert!(args.get_flag("json"));
    }
}
