//! Output formatting for CLI

use booking_etl::pipeline::{PipelineConfig, PipelineReport, PipelineStage};

/// Print a run report: JSON on stdout, or a summary on stderr
pub fn print_report(report: &PipelineReport, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", report.to_json()?);
        return Ok(());
    }

    report.print_summary();
    let artifacts: Vec<_> = report.loads.iter().flat_map(|l| l.artifacts()).collect();
    if !artifacts.is_empty() {
        eprintln!("Written:");
        for path in artifacts {
            eprintln!("  {}", path.display());
        }
    }
    Ok(())
}

/// Describe a validated configuration
pub fn format_config_summary(config: &PipelineConfig) -> String {
    let mut output = String::new();
    if let Some(name) = &config.name {
        output.push_str(&format!("Pipeline: {name}\n"));
    }
    output.push_str(&format!(
        "Bookings: {}\n",
        config.extract.bookings_path.display()
    ));
    output.push_str(&format!("Users:    {}\n", config.extract.users.display()));
    output.push_str(&format!("Output:   {}\n", config.load.output_dir.display()));
    if let Some(db) = &config.load.database {
        output.push_str(&format!("Database: {}\n", db.path.display()));
    }
    match config.transform.seed {
        Some(seed) => output.push_str(&format!("Seed:     {seed}\n")),
        None => output.push_str("Seed:     random\n"),
    }
    output.push_str("Stages:\n");
    for stage in config.effective_stages() {
        output.push_str(&format!(
            "  {}. {} - {}\n",
            stage.index(),
            stage.name(),
            PipelineStage::description(&stage)
        ));
    }
    output
}
