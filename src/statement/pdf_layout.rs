//! PDF visual layout reconstruction.
//!
//! PDF text carries no column or table structure, only glyph positions. This
//! module rebuilds approximate tabular lines from word bounding boxes: words
//! are clustered into visual lines by vertical position, laid out on a fixed
//! character grid using a page-wide median character width, and finally split
//! into pipe-delimited columns on runs of spaces.

use regex::Regex;

/// Vertical tolerance for grouping words into one visual line.
pub const LINE_TOP_TOLERANCE: f64 = 3.0;

/// Wider tolerance for re-attaching stray punctuation-only lines.
pub const STRAY_MERGE_TOLERANCE: f64 = 6.0;

/// A word with its bounding box, in top-down page coordinates.
#[derive(Debug, Clone)]
pub struct PositionedWord {
    pub text: String,
    pub left: f64,
    pub right: f64,
    pub top: f64,
}

/// Words of a single page.
#[derive(Debug, Clone, Default)]
pub struct PageWords {
    pub words: Vec<PositionedWord>,
}

#[derive(Debug)]
struct VisualLine {
    top: f64,
    words: Vec<PositionedWord>,
}

/// Rebuild the fixed-width text lines of one page from its words.
pub fn reconstruct_page_lines(page: &PageWords) -> Vec<String> {
    let mut lines = cluster_lines(&page.words);
    merge_stray_punctuation(&mut lines);

    let char_width = median_char_width(&page.words);
    let page_right = page
        .words
        .iter()
        .map(|w| w.right)
        .fold(0.0_f64, f64::max);

    lines
        .iter()
        .map(|line| layout_line(line, char_width, page_right))
        .collect()
}

/// Split a fixed-width line on runs of `min_space_run` or more spaces and
/// rejoin the fields with a pipe, so downstream templates can tokenize the
/// line regardless of the original PDF layout.
pub fn columnize(line: &str, min_space_run: usize) -> String {
    let run = min_space_run.max(1);
    let splitter = Regex::new(&format!(" {{{run},}}")).expect("valid split pattern");
    splitter
        .split(line.trim())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("|")
}

/// Cluster words into visual lines by sequential vertical proximity.
///
/// Proximity grouping on floats is not transitive, so words are sorted by
/// their top coordinate and chained: a word starts a new line only when it
/// sits more than the tolerance below the previous word.
fn cluster_lines(words: &[PositionedWord]) -> Vec<VisualLine> {
    let mut sorted: Vec<PositionedWord> = words.to_vec();
    sorted.sort_by(|a, b| a.top.total_cmp(&b.top));

    let mut lines: Vec<VisualLine> = Vec::new();
    let mut last_top = f64::NEG_INFINITY;

    for word in sorted {
        if lines.is_empty() || word.top - last_top > LINE_TOP_TOLERANCE {
            lines.push(VisualLine {
                top: word.top,
                words: Vec::new(),
            });
        }
        last_top = word.top;
        if let Some(line) = lines.last_mut() {
            line.words.push(word);
        }
    }

    for line in &mut lines {
        line.words.sort_by(|a, b| a.left.total_cmp(&b.left));
    }
    lines
}

/// Re-attach isolated punctuation-only "lines" (e.g. a stray hyphen whose
/// baseline drifted) to the nearest vertically adjacent line within the
/// wider tolerance.
fn merge_stray_punctuation(lines: &mut Vec<VisualLine>) {
    let mut index = 0;
    while index < lines.len() {
        let is_stray = lines[index].words.len() == 1
            && is_punctuation_only(&lines[index].words[0].text);
        if !is_stray {
            index += 1;
            continue;
        }

        let stray_top = lines[index].top;
        let nearest = lines
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != index)
            .map(|(i, line)| (i, (line.top - stray_top).abs()))
            .min_by(|a, b| a.1.total_cmp(&b.1));

        match nearest {
            Some((target, distance)) if distance <= STRAY_MERGE_TOLERANCE => {
                let mut removed = lines.remove(index);
                let target = if target > index { target - 1 } else { target };
                if let Some(word) = removed.words.pop() {
                    lines[target].words.push(word);
                    lines[target].words.sort_by(|a, b| a.left.total_cmp(&b.left));
                }
                // removed the current line, do not advance
            }
            _ => index += 1,
        }
    }
}

fn is_punctuation_only(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|c| c.is_ascii_punctuation())
}

/// Page-wide median of per-word character widths.
fn median_char_width(words: &[PositionedWord]) -> f64 {
    let mut widths: Vec<f64> = words
        .iter()
        .filter(|w| !w.text.is_empty() && w.right > w.left)
        .map(|w| (w.right - w.left) / w.text.chars().count() as f64)
        .collect();

    if widths.is_empty() {
        return 1.0;
    }
    widths.sort_by(f64::total_cmp);
    let median = widths[widths.len() / 2];
    if median > 0.0 {
        median
    } else {
        1.0
    }
}

/// Map each word onto a character grid, keeping one space between words that
/// would otherwise overlap after rounding, and right-pad to the page edge.
fn layout_line(line: &VisualLine, char_width: f64, page_right: f64) -> String {
    let mut text = String::new();

    for word in &line.words {
        let mut column = (word.left / char_width).round() as usize;
        let current = text.chars().count();
        if current > 0 && column <= current {
            column = current + 1;
        }
        for _ in text.chars().count()..column {
            text.push(' ');
        }
        text.push_str(&word.text);
    }

    let total = (page_right / char_width).round() as usize;
    while text.chars().count() < total {
        text.push(' ');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, left: f64, right: f64, top: f64) -> PositionedWord {
        PositionedWord {
            text: text.to_string(),
            left,
            right,
            top,
        }
    }

    #[test]
    fn test_cluster_within_tolerance() {
        let words = vec![
            word("Betrag", 100.0, 130.0, 50.0),
            word("Datum", 10.0, 40.0, 51.5),
            word("Saldo", 10.0, 40.0, 70.0),
        ];
        let lines = cluster_lines(&words);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].words.len(), 2);
        // sorted left-to-right within the line
        assert_eq!(lines[0].words[0].text, "Datum");
        assert_eq!(lines[1].words[0].text, "Saldo");
    }

    #[test]
    fn test_stray_hyphen_merged() {
        let page = PageWords {
            words: vec![
                word("Verwendungszweck", 10.0, 170.0, 50.0),
                word("-", 180.0, 185.0, 55.0),
                word("Saldo", 10.0, 60.0, 200.0),
            ],
        };
        let lines = reconstruct_page_lines(&page);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("Verwendungszweck"));
        assert!(lines[0].contains('-'));
    }

    #[test]
    fn test_stray_hyphen_too_far_kept() {
        let words = vec![
            word("Text", 10.0, 50.0, 50.0),
            word("-", 180.0, 185.0, 80.0),
        ];
        let mut lines = cluster_lines(&words);
        merge_stray_punctuation(&mut lines);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_fixed_width_columns() {
        // Two words at character columns 5 and 40, char width 10pt.
        let page = PageWords {
            words: vec![
                word("01.02.2025", 50.0, 150.0, 50.0),
                word("-5,00", 400.0, 450.0, 50.0),
            ],
        };
        let lines = reconstruct_page_lines(&page);
        assert_eq!(lines.len(), 1);
        let columnized = columnize(&lines[0], 2);
        let fields: Vec<&str> = columnized.split('|').collect();
        assert_eq!(fields, vec!["01.02.2025", "-5,00"]);
    }

    #[test]
    fn test_overlap_keeps_single_space() {
        // Rounding would place the second word on top of the first.
        let page = PageWords {
            words: vec![
                word("Gutschrift", 0.0, 100.0, 10.0),
                word("Miete", 90.0, 140.0, 10.0),
            ],
        };
        let lines = reconstruct_page_lines(&page);
        assert!(lines[0].contains("Gutschrift Miete"));
    }

    #[test]
    fn test_columnize_respects_min_run() {
        assert_eq!(columnize("a  b c", 2), "a|b c");
        assert_eq!(columnize("a  b c", 1), "a|b|c");
        assert_eq!(columnize("  lead   tail  ", 3), "lead|tail");
    }
}
