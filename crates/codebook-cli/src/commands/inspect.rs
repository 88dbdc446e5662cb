//! Inspect command - parse a dictionary and show fields and mappings.

use std::path::PathBuf;

use codebook::{Codebook, CodebookConfig, ParserConfig, SourceFormat};
use colored::Colorize;

pub fn run(
    dictionary: PathBuf,
    format: Option<SourceFormat>,
    generic: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !dictionary.exists() {
        return Err(format!("File not found: {}", dictionary.display()).into());
    }

    let mut parser = ParserConfig::default().with_clinical_formats(!generic);
    if let Some(format) = format {
        parser = parser.with_format(format);
    }
    let codebook = Codebook::with_config(CodebookConfig::default().with_parser(parser));

    let inspection = codebook.inspect(&dictionary)?;
    let outcome = &inspection.outcome;
    let dict = &outcome.dictionary;

    if json_output {
        let output = serde_json::json!({
            "format": outcome.format,
            "flavor": outcome.flavor,
            "parser": outcome.parser,
            "dictionary": dict,
            "mapping": inspection.mapping,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!(
        "{} {} ({} via {} parser)",
        "Dictionary".cyan().bold(),
        dict.name.white(),
        outcome.format,
        outcome.parser
    );
    println!(
        "{} fields, mean confidence {:.2}",
        dict.len().to_string().white().bold(),
        dict.mean_confidence()
    );
    println!();

    println!("{}", "Fields:".yellow().bold());
    for field in dict.fields.values() {
        let required = if field.required { "required".red() } else { "".normal() };
        let confidence = format!("{:.2}", field.confidence_score);
        let confidence = if field.confidence_score >= 0.8 {
            confidence.green()
        } else if field.confidence_score >= 0.5 {
            confidence.yellow()
        } else {
            confidence.red()
        };
        println!(
            "  {:24} {:12} {}  {}",
            field.name,
            field.field_type.to_string(),
            confidence,
            required
        );
    }
    println!();

    println!("{}", "Archetype mappings:".yellow().bold());
    for (archetype, candidates) in &inspection.mapping {
        if candidates.is_empty() {
            println!("  {:14} {}", archetype, "-".dimmed());
            continue;
        }
        let listed: Vec<String> = candidates
            .iter()
            .map(|c| format!("{} ({:.2})", c.field_name, c.score))
            .collect();
        println!("  {:14} {}", archetype, listed.join(", "));
    }

    Ok(())
}
