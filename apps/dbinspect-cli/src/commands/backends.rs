//! Backend catalogue command

use dbinspect_core::OutputFormat;
use dbinspect_inspectors::catalogue;
use serde_json::json;

pub fn run(format: OutputFormat) -> anyhow::Result<()> {
    let backends = catalogue();

    if format == OutputFormat::Json {
        let value: Vec<_> = backends
            .iter()
            .map(|info| {
                json!({
                    "backend": info.kind.as_str(),
                    "available": info.available,
                    "checks": info.checks.iter().map(|c| json!({
                        "id": c.id,
                        "title": c.title,
                    })).collect::<Vec<_>>(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    println!("Supported Backends");
    println!("==================\n");

    for info in &backends {
        let availability = if info.available {
            "driver compiled in"
        } else if info.checks.is_empty() {
            "not implemented"
        } else {
            "driver not compiled in"
        };
        println!("{} ({})", info.kind, availability);
        for check in info.checks {
            println!("  {:<8} {}", check.id, check.title);
        }
    }

    Ok(())
}
