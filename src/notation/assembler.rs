// Notation assembler - recorded notes to a gapless, bar-respecting token sequence
//
// Single left-to-right scan over the subdivision timeline. Each step emits one
// token whose duration is snapped down to an allowed value and never crosses
// the next bar line, so every measure closes on exactly its subdivision count.

use crate::notation::token::{NotationToken, TokenMetadata, snap_duration};
use crate::sequencer::note::RecordedNote;
use crate::sequencer::timeline::SessionConfig;

/// Notes closer than this to the cursor (in subdivisions) start at the cursor
const ONSET_TOLERANCE: f64 = 0.1;

/// Assembled notation for one take
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Notation {
    pub tokens: Vec<NotationToken>,
    /// Index-aligned with `tokens`
    pub metadata: Vec<TokenMetadata>,
    /// Token counts at which a bar line is drawn
    pub bar_breaks: Vec<usize>,
}

impl Notation {
    /// Tokens grouped by measure
    pub fn measures(&self) -> Vec<&[NotationToken]> {
        let mut start = 0;
        self.bar_breaks
            .iter()
            .map(|&end| {
                let measure = &self.tokens[start..end];
                start = end;
                measure
            })
            .collect()
    }

    /// Summed token durations of each measure
    pub fn measure_totals(&self) -> Vec<u32> {
        self.measures()
            .iter()
            .map(|m| m.iter().map(|t| t.duration_subdivisions).sum())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Build the token sequence for a take. Pure: same input, same output.
pub fn assemble(notes: &[RecordedNote], config: &SessionConfig) -> Notation {
    let per_measure = config.subdivisions_per_measure();
    let total = config.total_subdivisions();

    let mut sorted: Vec<(f64, RecordedNote)> = notes
        .iter()
        .filter(|n| {
            let inside = n.position().is_within(config);
            if !inside {
                log::warn!(
                    "Dropping note {} in measure {}: session has {} measures",
                    n.pitch,
                    n.measure,
                    config.measure_count
                );
            }
            inside
        })
        .map(|n| (n.absolute_subdivision(config) as f64, *n))
        .collect();
    // Stable: notes on the same slot keep capture order
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut notation = Notation::default();
    let mut next = 0;
    let mut pos: u32 = 0;

    while pos < total {
        let cursor = pos as f64;
        let remaining_in_measure = per_measure - pos % per_measure;

        // Notes swallowed by an earlier, longer token
        while next < sorted.len() && sorted[next].0 < cursor - ONSET_TOLERANCE {
            log::debug!(
                "Note {} at subdivision {} overlaps the previous token, skipped",
                sorted[next].1.pitch,
                sorted[next].0
            );
            next += 1;
        }

        let group_end = sorted[next..]
            .iter()
            .position(|(start, _)| (start - cursor).abs() >= ONSET_TOLERANCE)
            .map_or(sorted.len(), |offset| next + offset);

        let duration = if group_end > next {
            let group: Vec<RecordedNote> = sorted[next..group_end].iter().map(|(_, n)| *n).collect();
            next = group_end;

            let held = group
                .iter()
                .map(|n| n.duration_subdivisions)
                .max()
                .unwrap_or(1)
                .min(remaining_in_measure);
            let duration = snap_duration(held).unwrap_or(1);

            notation.metadata.push(TokenMetadata {
                deviation_ms: Some(group[0].deviation_ms),
            });
            notation.tokens.push(NotationToken::from_group(group, duration));
            duration
        } else {
            let gap = sorted
                .get(next)
                .map_or(remaining_in_measure, |(start, _)| {
                    (start - cursor).ceil().max(1.0) as u32
                });
            let duration = snap_duration(gap.min(remaining_in_measure)).unwrap_or(1);

            notation.metadata.push(TokenMetadata { deviation_ms: None });
            notation.tokens.push(NotationToken::rest(duration));
            duration
        };

        pos += duration;
        if pos % per_measure == 0 {
            notation.bar_breaks.push(notation.tokens.len());
        }
    }

    notation
}
