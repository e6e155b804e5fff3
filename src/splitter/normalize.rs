//! Block normalization: repair imperfect LLM partitions.
//!
//! The model frequently returns partitions with out-of-range lines, gaps,
//! or overlaps. Normalization guarantees that the output blocks are sorted,
//! disjoint, contiguous, and cover exactly `[1..N]`; every repair is logged
//! and counted in a diagnostic report that never affects the output.

use tracing::{debug, warn};

use super::block::{Block, BlockMetadata, RawBlock};

/// Diagnostics for one normalization run. Log-only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizeReport {
    /// Raw blocks received from the model.
    pub input_blocks: usize,
    /// Blocks after normalization.
    pub output_blocks: usize,
    /// Blocks whose lines had to be clamped into `[1..N]`.
    pub out_of_bounds: usize,
    /// Blocks dropped (inverted after clamping, or emptied by overlap
    /// repair).
    pub dropped: usize,
    /// Gaps repaired (including a late first block).
    pub gaps: usize,
    /// Total lines the gaps spanned.
    pub gap_lines: u64,
    /// Overlaps repaired.
    pub overlaps: usize,
    /// Total lines the overlaps spanned.
    pub overlap_lines: u64,
    /// Percentage of `[1..N]` the raw (clamped) blocks covered.
    pub raw_coverage_pct: f64,
}

/// Normalizes raw blocks for a file of `total_lines` lines.
///
/// Post-conditions, for any input and any `total_lines ≥ 1`:
/// - output is non-empty (a synthetic block covers everything if the input
///   reduces to nothing),
/// - blocks are sorted and every block satisfies
///   `1 ≤ start_line ≤ end_line ≤ total_lines`,
/// - consecutive blocks are contiguous (`next.start == prev.end + 1`),
/// - the first block starts at 1 and the last ends at `total_lines`.
#[must_use]
pub fn normalize_blocks(raw: &[RawBlock], total_lines: u32) -> (Vec<Block>, NormalizeReport) {
    let n = total_lines.max(1);
    let mut report = NormalizeReport {
        input_blocks: raw.len(),
        ..NormalizeReport::default()
    };

    // Clamp into [1..n], dropping blocks that invert.
    let mut clamped: Vec<Block> = Vec::with_capacity(raw.len());
    for block in raw {
        let start = block.start_line.max(1);
        let end = block.end_line.min(i64::from(n));
        if start != block.start_line || end != block.end_line {
            report.out_of_bounds += 1;
            debug!(
                start = block.start_line,
                end = block.end_line,
                clamped_start = start,
                clamped_end = end,
                total_lines = n,
                "clamped block lines"
            );
        }
        if start > end {
            report.dropped += 1;
            warn!(
                start = block.start_line,
                end = block.end_line,
                title = %block.title,
                "dropped inverted block"
            );
            continue;
        }
        clamped.push(Block {
            start_line: u32::try_from(start).unwrap_or(1),
            end_line: u32::try_from(end).unwrap_or(n),
            meta: BlockMetadata::from_raw(block),
        });
    }

    clamped.sort_by_key(|b| (b.start_line, b.end_line));
    report.raw_coverage_pct = coverage_pct(&clamped, n);

    // Walk left to right, repairing gaps at the midpoint and overlaps by
    // advancing the start.
    let mut blocks: Vec<Block> = Vec::with_capacity(clamped.len());
    for mut block in clamped {
        let Some(prev) = blocks.last_mut() else {
            if block.start_line > 1 {
                report.gaps += 1;
                report.gap_lines += u64::from(block.start_line - 1);
                debug!(start = block.start_line, "first block pulled back to line 1");
                block.start_line = 1;
            }
            blocks.push(block);
            continue;
        };

        let prev_end = prev.end_line;
        if block.start_line > prev_end + 1 {
            let midpoint = (prev_end + block.start_line) / 2;
            report.gaps += 1;
            report.gap_lines += u64::from(block.start_line - prev_end - 1);
            debug!(
                gap_start = prev_end + 1,
                gap_end = block.start_line - 1,
                midpoint,
                "repaired gap at midpoint"
            );
            prev.end_line = midpoint - 1;
            block.start_line = midpoint;
        } else if block.start_line <= prev_end {
            report.overlaps += 1;
            report.overlap_lines += u64::from(prev_end - block.start_line + 1);
            debug!(
                start = block.start_line,
                previous_end = prev_end,
                "repaired overlap"
            );
            block.start_line = prev_end + 1;
            if block.start_line > block.end_line {
                report.dropped += 1;
                warn!(title = %block.meta.title, "dropped block emptied by overlap repair");
                continue;
            }
        }
        blocks.push(block);
    }

    if let Some(last) = blocks.last_mut() {
        if last.end_line < n {
            debug!(end = last.end_line, total_lines = n, "extended last block to end of file");
            last.end_line = n;
        }
    } else {
        warn!(total_lines = n, "normalization produced no blocks, emitting fallback");
        blocks.push(Block::fallback(n));
    }

    report.output_blocks = blocks.len();
    (blocks, report)
}

/// Fraction of `[1..n]` covered by the sorted, clamped blocks, as a percent.
fn coverage_pct(sorted: &[Block], n: u32) -> f64 {
    let mut covered: u64 = 0;
    let mut highest: u32 = 0;
    for block in sorted {
        let start = block.start_line.max(highest + 1);
        if start <= block.end_line {
            covered += u64::from(block.end_line - start + 1);
            highest = block.end_line;
        } else {
            highest = highest.max(block.end_line);
        }
    }
    covered as f64 * 100.0 / f64::from(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn raw(start: i64, end: i64) -> RawBlock {
        RawBlock {
            start_line: start,
            end_line: end,
            title: format!("b{start}"),
            kind: "code".to_string(),
            symbols: Vec::new(),
            graph_questions: Vec::new(),
            graph_answers: Vec::new(),
        }
    }

    fn spans(blocks: &[Block]) -> Vec<(u32, u32)> {
        blocks.iter().map(|b| (b.start_line, b.end_line)).collect()
    }

    fn assert_covers(blocks: &[Block], n: u32) {
        assert!(!blocks.is_empty());
        assert_eq!(blocks[0].start_line, 1);
        assert_eq!(blocks[blocks.len() - 1].end_line, n);
        for pair in blocks.windows(2) {
            assert_eq!(pair[1].start_line, pair[0].end_line + 1);
        }
        for block in blocks {
            assert!(block.start_line >= 1);
            assert!(block.start_line <= block.end_line);
            assert!(block.end_line <= n);
        }
    }

    #[test]
    fn test_clean_partition_unchanged() {
        let (blocks, report) =
            normalize_blocks(&[raw(1, 10), raw(11, 25), raw(26, 42)], 42);
        assert_eq!(spans(&blocks), vec![(1, 10), (11, 25), (26, 42)]);
        assert_eq!(report.gaps, 0);
        assert_eq!(report.overlaps, 0);
        assert_eq!(report.out_of_bounds, 0);
        assert!((report.raw_coverage_pct - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_gap_repaired_at_midpoint() {
        let (blocks, report) = normalize_blocks(&[raw(1, 10), raw(20, 42)], 42);
        assert_eq!(spans(&blocks), vec![(1, 14), (15, 42)]);
        assert_eq!(report.gaps, 1);
        assert_eq!(report.gap_lines, 9);
        assert_covers(&blocks, 42);
    }

    #[test]
    fn test_overlap_repaired() {
        let (blocks, report) = normalize_blocks(&[raw(1, 20), raw(15, 42)], 42);
        assert_eq!(spans(&blocks), vec![(1, 20), (21, 42)]);
        assert_eq!(report.overlaps, 1);
        assert_eq!(report.overlap_lines, 6);
    }

    #[test]
    fn test_out_of_range_clamped() {
        let (blocks, report) = normalize_blocks(&[raw(-4, 10), raw(11, 90)], 42);
        assert_eq!(spans(&blocks), vec![(1, 10), (11, 42)]);
        assert_eq!(report.out_of_bounds, 2);
    }

    #[test]
    fn test_contained_block_dropped() {
        // The second block lies entirely inside the first; overlap repair
        // empties it.
        let (blocks, report) = normalize_blocks(&[raw(1, 30), raw(5, 12), raw(31, 42)], 42);
        assert_eq!(spans(&blocks), vec![(1, 30), (31, 42)]);
        assert_eq!(report.dropped, 1);
    }

    #[test]
    fn test_empty_input_yields_fallback() {
        let (blocks, report) = normalize_blocks(&[], 42);
        assert_eq!(spans(&blocks), vec![(1, 42)]);
        assert_eq!(blocks[0].meta.title, "logic");
        assert_eq!(blocks[0].meta.kind, "logic_block");
        assert_eq!(report.output_blocks, 1);
    }

    #[test]
    fn test_everything_dropped_yields_fallback() {
        let (blocks, _) = normalize_blocks(&[raw(50, 60), raw(0, -1)], 42);
        // (50,60) clamps to start=50 > end=42 and inverts; (0,-1) inverts.
        assert_eq!(spans(&blocks), vec![(1, 42)]);
    }

    #[test]
    fn test_late_first_block_pulled_to_line_one() {
        let (blocks, report) = normalize_blocks(&[raw(5, 42)], 42);
        assert_eq!(spans(&blocks), vec![(1, 42)]);
        assert_eq!(report.gaps, 1);
        assert_eq!(report.gap_lines, 4);
    }

    #[test]
    fn test_short_last_block_extended() {
        let (blocks, _) = normalize_blocks(&[raw(1, 10), raw(11, 30)], 42);
        assert_eq!(spans(&blocks), vec![(1, 10), (11, 42)]);
    }

    #[test]
    fn test_unsorted_input_sorted() {
        let (blocks, _) = normalize_blocks(&[raw(26, 42), raw(1, 10), raw(11, 25)], 42);
        assert_eq!(spans(&blocks), vec![(1, 10), (11, 25), (26, 42)]);
    }

    #[test]
    fn test_metadata_survives_normalization() {
        let mut block = raw(3, 40);
        block.title = "parser".to_string();
        block.symbols = vec!["parse".to_string()];
        let (blocks, _) = normalize_blocks(&[block], 42);
        assert_eq!(blocks[0].meta.title, "parser");
        assert_eq!(blocks[0].meta.symbols, vec!["parse".to_string()]);
    }

    #[test_case(1; "single line file")]
    #[test_case(2; "two line file")]
    #[test_case(1000; "large file")]
    fn test_fallback_covers_any_size(n: u32) {
        let (blocks, _) = normalize_blocks(&[], n);
        assert_covers(&blocks, n);
    }

    #[test]
    fn test_raw_coverage_reported_for_partial_input() {
        let (_, report) = normalize_blocks(&[raw(1, 21)], 42);
        assert!((report.raw_coverage_pct - 50.0).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn prop_output_always_covers_file(
            n in 1u32..200,
            raws in prop::collection::vec((-10i64..250, -10i64..250), 0..12)
        ) {
            let raw_blocks: Vec<RawBlock> =
                raws.into_iter().map(|(s, e)| raw(s, e)).collect();
            let (blocks, report) = normalize_blocks(&raw_blocks, n);
            assert_covers(&blocks, n);
            prop_assert_eq!(report.output_blocks, blocks.len());
        }

        #[test]
        fn prop_clean_contiguous_input_is_identity(
            splits in prop::collection::vec(1u32..50, 0..6)
        ) {
            // Build a contiguous partition from random segment lengths.
            let mut start = 1u32;
            let mut raw_blocks = Vec::new();
            for len in splits {
                raw_blocks.push(raw(i64::from(start), i64::from(start + len - 1)));
                start += len;
            }
            if raw_blocks.is_empty() {
                return Ok(());
            }
            let n = start - 1;
            let expected: Vec<(u32, u32)> = raw_blocks
                .iter()
                .map(|b| {
                    (
                        u32::try_from(b.start_line).unwrap_or(1),
                        u32::try_from(b.end_line).unwrap_or(1),
                    )
                })
                .collect();
            let (blocks, report) = normalize_blocks(&raw_blocks, n);
            prop_assert_eq!(spans(&blocks), expected);
            prop_assert_eq!(report.gaps, 0);
            prop_assert_eq!(report.overlaps, 0);
            prop_assert_eq!(report.dropped, 0);
        }
    }
}
