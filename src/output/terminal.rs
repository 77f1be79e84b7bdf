// Colored terminal output for pair outcomes, batch summaries and reports.
//
// main.rs display calls delegate here; nothing in this module touches the
// scoring pipeline.

use colored::Colorize;

use super::truncate_chars;
use crate::pipeline::batch::BatchSummary;
use crate::pipeline::PairOutcome;
use crate::report::rows;
use crate::report::StoredRow;
use crate::scoring::features::NOT_COMPUTED;

/// Display one pair's feature breakdown, verdict and notes.
pub fn display_outcome(outcome: &PairOutcome) {
    println!(
        "\n{}",
        format!("=== {} vs {} ===", outcome.first, outcome.second).bold()
    );

    let v = &outcome.features.vector;
    println!("  Topic similarity:  {}  ({})", feature(v.topic_similarity), outcome.features.topic);
    println!("  Name similarity:   {}", feature(v.name_similarity));
    match &outcome.features.friends {
        Some(f) => println!(
            "  Friend similarity: {}  ({} / {} matched, raw {:.2})",
            feature(v.friend_similarity),
            f.count_a,
            f.count_b,
            f.raw_score
        ),
        None => println!("  Friend similarity: {}  (no friends on one side)", feature(v.friend_similarity)),
    }
    println!("  Best distance:     {}", feature(v.best_distance));

    let comparisons = &outcome.features.topic_comparisons;
    if !comparisons.is_empty() {
        println!("  Segments compared: {}", comparisons.len());
        for c in comparisons {
            println!(
                "    #{:<3} {} matches  {}",
                c.index,
                c.matches,
                truncate_chars(&c.keywords_a.join(", "), 60).dimmed()
            );
        }
    }

    println!();
    match &outcome.prediction {
        Some(p) if p.is_match() => println!(
            "  {} (match probability {:.1}%)",
            "IDENTICAL USERS".green().bold(),
            p.prob1 * 100.0
        ),
        Some(p) => println!(
            "  {} (match probability {:.1}%)",
            "NON-IDENTICAL USERS".red().bold(),
            p.prob1 * 100.0
        ),
        None => println!("  {}", "No verdict".yellow()),
    }

    if !outcome.notes.is_empty() {
        println!("\n  Notes:");
        for note in &outcome.notes {
            println!("    {} {}", "~".yellow(), note);
        }
    }
}

/// Display totals after a batch run.
pub fn display_batch_summary(summary: &BatchSummary) {
    println!("\n{}", "=== Batch Summary ===".bold());
    println!("  Evaluated:    {}", summary.outcomes.len());
    println!("  Matches:      {}", summary.matches().to_string().green());
    println!("  Non-matches:  {}", summary.non_matches());
    if summary.unclassified() > 0 {
        println!("  No verdict:   {}", summary.unclassified().to_string().yellow());
    }
    if !summary.failed.is_empty() {
        println!("  Failed:       {}", summary.failed.len().to_string().red());
        for (pair, error) in &summary.failed {
            println!("    {} {}: {}", "!".red(), pair, truncate_chars(error, 100));
        }
    }
}

/// Display recent classification rows.
pub fn display_report_rows(rows_read: &[StoredRow]) {
    if rows_read.is_empty() {
        println!("No classifications recorded yet. Run `crossmatch compare` first.");
        return;
    }

    println!(
        "\n{}",
        format!("=== Recent Classifications ({}) ===", rows_read.len()).bold()
    );
    println!(
        "  {:<24} {:<24} {:>7}  {:<10}  {}",
        "First".dimmed(),
        "Second".dimmed(),
        "P(1)".dimmed(),
        "Verdict".dimmed(),
        "Sheet".dimmed(),
    );
    println!("  {}", "-".repeat(90).dimmed());

    for row in rows_read {
        let first = row.values.first().map(|v| v.to_string()).unwrap_or_default();
        let second = row.values.get(1).map(|v| v.to_string()).unwrap_or_default();
        let prob = row
            .get(rows::PROBABILITY_1)
            .and_then(|v| v.as_f64())
            .map(|p| format!("{:.3}", p))
            .unwrap_or_else(|| "-".to_string());
        let verdict = match row.get(rows::PREDICTION).and_then(|v| v.as_f64()) {
            Some(l) if l == 1.0 => "match".green().to_string(),
            Some(_) => "no match".red().to_string(),
            None => "-".yellow().to_string(),
        };

        println!(
            "  {:<24} {:<24} {:>7}  {:<10}  {}",
            truncate_chars(&first, 22),
            truncate_chars(&second, 22),
            prob,
            verdict,
            row.sheet.dimmed()
        );
    }
}

/// Display an auxiliary route distance.
pub fn display_route(from: &str, to: &str, km: f64) {
    println!("  {} -> {}: {:.1} km by road", from, to, km);
}

/// Feature values with the not-computed sentinel called out.
fn feature(value: f64) -> String {
    if value == NOT_COMPUTED {
        format!("{:>7}", "-1.0").yellow().to_string()
    } else {
        format!("{:>7.4}", value)
    }
}
