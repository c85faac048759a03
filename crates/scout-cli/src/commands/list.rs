//! `scout list` -- print the registered tool table.

use anyhow::Result;

use scout_broker::ToolRegistry;

pub fn run() -> Result<()> {
    let registry = ToolRegistry::builtin();

    println!(
        "{:<12} {:<42} {:>9}  {}",
        "TOOL", "TARGET", "TIMEOUT", "DESCRIPTION"
    );
    for spec in registry.list() {
        let target = if let Some(image) = &spec.official_image {
            image.clone()
        } else if let Some(image) = &spec.shared_image {
            format!("{image} (shared)")
        } else {
            "host binary only".to_string()
        };

        println!(
            "{:<12} {:<42} {:>8}s  {}",
            spec.name,
            target,
            spec.default_timeout.as_secs(),
            spec.description
        );
    }

    Ok(())
}
