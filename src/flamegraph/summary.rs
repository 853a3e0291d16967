//! Plain-text rendering of a flame graph for terminals.

use crate::flamegraph::levels::{percentage, FlameGraph};

const TITLE_WIDTH: usize = 48;

fn truncate(title: &str) -> String {
    let chars: Vec<char> = title.chars().collect();
    if chars.len() > TITLE_WIDTH {
        let tail: String = chars[chars.len() - (TITLE_WIDTH - 3)..].iter().collect();
        format!("...{}", tail)
    } else {
        title.to_string()
    }
}

/// Table of the widest frames of every depth, plus a bar chart of depth 1
pub fn flame_text_summary(graph: &FlameGraph, per_level: usize) -> String {
    let mut lines = Vec::new();
    let total = graph.total;

    lines.push("  FLAME GRAPH SUMMARY".to_string());
    lines.push(format!(
        "  ┏━━━━━━━┳━{}━┳━━━━━━━━━━━━━━┳━━━━━━━━━┓",
        "━".repeat(TITLE_WIDTH)
    ));
    lines.push(format!(
        "  ┃ {:^5} ┃ {:<w$} ┃ {:^12} ┃ {:^7} ┃",
        "DEPTH",
        "Frame (widest first)",
        "SAMPLES",
        "%",
        w = TITLE_WIDTH
    ));
    lines.push(format!(
        "  ┣━━━━━━━╋━{}━╋━━━━━━━━━━━━━━╋━━━━━━━━━┫",
        "━".repeat(TITLE_WIDTH)
    ));

    for (depth, level) in graph.levels.iter().enumerate() {
        let mut widest: Vec<_> = level.iter().collect();
        widest.sort_by(|a, b| b.width.cmp(&a.width).then(a.left.cmp(&b.left)));
        for rect in widest.into_iter().take(per_level.max(1)) {
            lines.push(format!(
                "  ┃ {:>5} ┃ {:<w$} ┃ {:>12} ┃ {:>6}% ┃",
                depth,
                truncate(&rect.title),
                rect.width,
                percentage(rect.width, total),
                w = TITLE_WIDTH
            ));
        }
    }
    lines.push(format!(
        "  ┗━━━━━━━┻━{}━┻━━━━━━━━━━━━━━┻━━━━━━━━━┛",
        "━".repeat(TITLE_WIDTH)
    ));

    if let Some(top) = graph.levels.get(1) {
        lines.push(String::new());
        lines.push("  TOP FRAMES".to_string());
        let mut widest: Vec<_> = top.iter().collect();
        widest.sort_by(|a, b| b.width.cmp(&a.width));
        for rect in widest.into_iter().take(5) {
            let share = if total == 0 {
                0.0
            } else {
                rect.width as f64 / total as f64
            };
            let bar = "█".repeat((share * 50.0) as usize);
            lines.push(format!(
                "  └─ {:<24} {:<50} {:>6}%",
                truncate(&rect.title).chars().take(24).collect::<String>(),
                bar,
                percentage(rect.width, total)
            ));
        }
    }

    if !graph.complete {
        lines.push(String::new());
        lines.push(format!("  (partial: {} levels delivered)", graph.depth()));
    }

    lines.join("\n")
}
