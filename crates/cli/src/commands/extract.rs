//! `roundtable extract` — run the extractor over a saved reply.

use roundtable_agent::ArtifactExtractor;
use std::path::Path;

pub async fn run(file: &Path, min_chars: usize) -> Result<(), Box<dyn std::error::Error>> {
    let text = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;

    let extractor = ArtifactExtractor::new(min_chars);
    if !ArtifactExtractor::triggers(&text) {
        println!("No artifact markers in {}", file.display());
        return Ok(());
    }

    match extractor.best_candidate(0, &text) {
        Some(candidate) => {
            println!("Pattern:  {} (rank {})", candidate.pattern, candidate.pattern_rank);
            println!("Length:   {} chars", candidate.length);
        }
        None => println!("No artifact found (minimum {min_chars} chars)"),
    }
    Ok(())
}
