use std::path::Path;

use sm3drbg_core::{Result, SourceSet, estimate_all};

pub fn run(bits: usize, output: Option<&Path>) -> Result<()> {
    let mut sources = SourceSet::system()?;
    for kind in sources.unavailable() {
        eprintln!("warning: {kind} source unavailable, samples will be zero-filled");
    }

    println!("Markov min-entropy, about {bits} bits per source");
    println!();
    println!(
        "{:<14} {:<10} {:<6} {:>9} {:>9} {:>9} {:>11} {:>10}",
        "Source", "Category", "OS", "Bits", "Samples", "Failures", "us/sample", "H (bit)"
    );
    println!("{}", "-".repeat(85));

    let report = estimate_all(&mut sources, bits);
    for est in &report {
        println!(
            "{:<14} {:<10} {:<6} {:>9} {:>9} {:>9} {:>11.2} {:>10.6}",
            est.source.to_string(),
            est.category.to_string(),
            est.platform.to_string(),
            est.bits,
            est.samples,
            est.failures,
            est.mean_collect_us,
            est.min_entropy
        );
    }

    println!();
    for est in &report {
        println!("  {:<14} {}", est.source.to_string(), est.description);
        println!("  {:<14} layout: {}", "", est.layout);
    }

    if let Some(path) = output {
        let json = serde_json::to_string_pretty(&report)?;
        std::fs::write(path, json)?;
        println!();
        println!("Report written to {}", path.display());
    }
    Ok(())
}
