use chrono::Local;

use crate::types::{DetectionEvent, ScanResult};

/// Human-readable status line for one cycle.
pub fn status_line(result: &ScanResult, flagged: usize) -> String {
    let mut line = format!(
        "[{}] #{} | {} coins | {}ms | Hackathon: {}",
        Local::now().format("%H:%M:%S"),
        result.cycle,
        result.item_count(),
        result.elapsed.as_millis(),
        flagged,
    );
    if result.pages_failed > 0 {
        line.push_str(&format!(" | failed pages: {}", result.pages_failed));
    }
    line
}

/// Print the per-cycle status line to stdout.
pub fn report_cycle(result: &ScanResult, flagged: usize) {
    println!("{}", status_line(result, flagged));
}

/// Emit a detection as a single JSON line to stdout.
pub fn report_detection(event: &DetectionEvent) {
    if let Ok(json) = serde_json::to_string(event) {
        println!("{json}");
    }
}
