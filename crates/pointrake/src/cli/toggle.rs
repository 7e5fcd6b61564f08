use anyhow::{bail, Result};
use console::style;

use crate::config::CliConfig;

const TOGGLES: &[&str] = &["includePontaManagement", "includeVPointInvestment"];

pub fn run(name: Option<&str>, value: Option<&str>) -> Result<()> {
    let mut config = CliConfig::load()?;

    let Some(name) = name else {
        for toggle in TOGGLES {
            let enabled = config.options.is_enabled(toggle);
            let state = if enabled {
                style("on").green()
            } else {
                style("off").dim()
            };
            println!("{toggle:<26} {state}");
        }
        return Ok(());
    };

    if !TOGGLES.contains(&name) {
        bail!(
            "unknown toggle: '{name}' (expected: {})",
            TOGGLES.join(", ")
        );
    }

    let Some(value) = value else {
        let enabled = config.options.is_enabled(name);
        println!("{}", if enabled { "on" } else { "off" });
        return Ok(());
    };

    let enabled = match value {
        "on" | "true" | "1" => true,
        "off" | "false" | "0" => false,
        other => bail!("invalid value: '{other}' (expected on or off)"),
    };

    match name {
        "includePontaManagement" => config.options.include_ponta_management = enabled,
        "includeVPointInvestment" => config.options.include_v_point_investment = enabled,
        _ => unreachable!("validated against TOGGLES above"),
    }
    config.save()?;
    eprintln!("  {} {name} set to {value}", style("✓").green());
    Ok(())
}
