use anyhow::Result;
use console::style;

use crate::config::CliConfig;

pub fn run(url: Option<&str>) -> Result<()> {
    let mut config = CliConfig::load()?;

    let Some(url) = url else {
        match &config.endpoint {
            Some(endpoint) => println!("{endpoint}"),
            None => println!("{}", style("no endpoint configured").dim()),
        }
        return Ok(());
    };

    let url = url.trim();
    if !url.contains("/api/ingest") {
        eprintln!(
            "  {} {url} does not look like a pointrake ingest endpoint",
            style("!").yellow()
        );
    }
    config.endpoint = Some(url.to_string());
    config.save()?;
    eprintln!("  {} endpoint saved", style("✓").green());
    Ok(())
}
