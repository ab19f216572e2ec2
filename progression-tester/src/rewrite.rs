use anyhow::{Context, Result};
use colored::Colorize;
use progression_core::{EncounterRewriter, RewriteSummary};
use std::fs;
use std::path::Path;

/// Rewrite the wild-encounter document at `input` into `output` and
/// return the usage summary.
pub fn rewrite_encounter_file(input: &Path, output: &Path, seed: u64) -> Result<RewriteSummary> {
    let raw = fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let mut rewriter = EncounterRewriter::new(seed);
    let (doc, summary) = rewriter
        .rewrite_json(&raw)
        .with_context(|| format!("failed to rewrite {}", input.display()))?;

    let mut rendered = serde_json::to_string_pretty(&doc)?;
    rendered.push('\n');
    fs::write(output, rendered).with_context(|| format!("failed to write {}", output.display()))?;

    Ok(summary)
}

pub fn print_summary(summary: &RewriteSummary, output: &Path) {
    println!(
        "{} {} slots -> {}",
        "🔀 Rewrote".bright_green().bold(),
        summary.slots_rewritten,
        output.display()
    );
    println!("{}", "Species usage:".cyan());
    for (species, count) in &summary.usage {
        println!("  {species:30} {count}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(label: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!(
            "progression-rewrite-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn rewrites_file_and_keeps_unknown_fields() {
        let input = temp_path("in");
        let output = temp_path("out");
        fs::write(
            &input,
            r#"{
                "label": "gWildMonHeaders",
                "wild_encounter_groups": [{
                    "for_maps": true,
                    "encounters": [{
                        "map": "MAP_ROUTE101",
                        "land_mons": {
                            "encounter_rate": 20,
                            "mons": [{ "min_level": 2, "max_level": 3, "species": "SPECIES_WURMPLE" }]
                        }
                    }]
                }]
            }"#,
        )
        .unwrap();

        let summary = rewrite_encounter_file(&input, &output, 7).unwrap();
        assert_eq!(summary.slots_rewritten, 1);

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["label"], "gWildMonHeaders");
        let encounter = &written["wild_encounter_groups"][0]["encounters"][0];
        assert_eq!(encounter["map"], "MAP_ROUTE101");
        assert_eq!(encounter["land_mons"]["encounter_rate"], 20);
        let species = encounter["land_mons"]["mons"][0]["species"].as_str().unwrap();
        assert!(summary.usage.contains_key(species));
    }

    #[test]
    fn missing_input_reports_path() {
        let missing = temp_path("missing");
        let err = rewrite_encounter_file(&missing, &temp_path("unused"), 1).unwrap_err();
        assert!(format!("{err:#}").contains("failed to read"));
    }
}
