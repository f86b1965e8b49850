//! Contig consensus
//!
//! Column-wise vote over the reads of a contig, weighted by base quality.
//! Gap-majority columns are dropped, ties between bases become `N` and the consensus
//! quality is the winning weight minus the opposing weight, clamped to 0..=100.

use crate::core::data_structures::Sequence;

use super::{AlignedRead, Contig, PAD};

const MAX_CONSENSUS_QUALITY: i64 = 100;

/// Per padded position: symbol and vote weight, `None` outside the clip range
fn read_votes(read: &AlignedRead) -> Vec<Option<(u8, i64)>> {
    let bases = read.padded_bases.as_bytes();

    let mut base_index = 0;
    let qualities: Vec<Option<i64>> = bases
        .iter()
        .map(|&b| {
            if b == PAD {
                return None;
            }
            let q = read
                .quality
                .as_ref()
                .and_then(|q| q.get(base_index).copied())
                .map_or(1, |q| i64::from(q.max(1)));
            base_index += 1;
            Some(q)
        })
        .collect();

    // Gaps weigh as much as the nearest preceding base, or the following one
    let mut votes = Vec::with_capacity(bases.len());
    let mut previous: Option<i64> = None;
    for (index, &symbol) in bases.iter().enumerate() {
        let weight = match qualities[index] {
            Some(q) => {
                previous = Some(q);
                q
            }
            None => previous
                .or_else(|| qualities[index..].iter().flatten().next().copied())
                .unwrap_or(1),
        };
        votes.push(read.in_clip(index).then_some((symbol, weight)));
    }
    votes
}

/// Build the consensus of a contig; columns without coverage are skipped
pub fn build_consensus(contig: &Contig) -> Sequence {
    let (Some(first), Some(last)) = (
        contig.reads.iter().map(|r| r.offset).min(),
        contig.reads.iter().map(AlignedRead::end).max(),
    ) else {
        return Sequence::new(&contig.name, "");
    };

    let votes: Vec<(i64, Vec<Option<(u8, i64)>>)> = contig
        .reads
        .iter()
        .map(|read| (read.offset, read_votes(read)))
        .collect();

    let mut bases = String::new();
    let mut quality = Vec::new();

    for column in first..last {
        let mut tally = [0_i64; 256];
        for (offset, column_votes) in &votes {
            let position = column - offset;
            if position < 0 {
                continue;
            }
            if let Some(Some((symbol, weight))) = column_votes.get(position as usize) {
                tally[usize::from(*symbol)] += weight;
            }
        }

        let total: i64 = tally.iter().sum();
        if total == 0 {
            continue;
        }
        let gap = tally[usize::from(PAD)];
        tally[usize::from(PAD)] = 0;

        let best = tally.iter().copied().max().unwrap_or(0);
        if gap > best {
            continue;
        }
        let winners: Vec<usize> = (0..tally.len()).filter(|&s| tally[s] == best).collect();
        let symbol = match winners.as_slice() {
            [single] => *single as u8 as char,
            _ => 'N',
        };
        let support = if winners.len() == 1 { best } else { 0 };

        bases.push(symbol);
        quality.push((support - (total - support)).clamp(0, MAX_CONSENSUS_QUALITY) as i32);
    }

    let read_count = contig.reads.len();
    Sequence {
        quality: Some(quality),
        ..Sequence::new(&contig.name, &bases)
    }
    .with_description(format!("consensus of {read_count} reads"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(name: &str, offset: i64, padded: &str, quality: Option<Vec<i32>>) -> AlignedRead {
        AlignedRead {
            name: name.to_string(),
            offset,
            padded_bases: padded.to_string(),
            quality,
            reverse_complemented: false,
            clip: None,
        }
    }

    fn contig(reads: Vec<AlignedRead>) -> Contig {
        Contig {
            name: "Contig1".to_string(),
            padded_consensus: String::new(),
            reads,
        }
    }

    #[test]
    fn test_single_read() {
        let consensus = build_consensus(&contig(vec![read("a", 0, "ACGT", Some(vec![10, 20, 30, 40]))]));
        assert_eq!(consensus.bases, "ACGT");
        assert_eq!(consensus.quality, Some(vec![10, 20, 30, 40]));
    }

    #[test]
    fn test_overlapping_reads() {
        let consensus = build_consensus(&contig(vec![
            read("a", 0, "ACGTA", Some(vec![30; 5])),
            read("b", 2, "GTAC", Some(vec![40; 4])),
        ]));
        assert_eq!(consensus.bases, "ACGTAC");
        assert_eq!(consensus.quality, Some(vec![30, 30, 70, 70, 70, 40]));
    }

    #[test]
    fn test_disagreement() {
        let consensus = build_consensus(&contig(vec![
            read("a", 0, "ACG", Some(vec![30, 30, 30])),
            read("b", 0, "ATG", Some(vec![10, 10, 10])),
            read("c", 0, "AGG", Some(vec![10, 10, 10])),
        ]));
        assert_eq!(consensus.bases, "ACG");
        // 30 for C against 20
        assert_eq!(consensus.quality.as_ref().unwrap()[1], 10);

        let tie = build_consensus(&contig(vec![
            read("a", 0, "ACG", None),
            read("b", 0, "ATG", None),
        ]));
        assert_eq!(tie.bases, "ANG");
        assert_eq!(tie.quality.as_ref().unwrap()[1], 0);
    }

    #[test]
    fn test_gap_majority_dropped() {
        let consensus = build_consensus(&contig(vec![
            read("a", 0, "AC-GT", None),
            read("b", 0, "AC-GT", None),
            read("c", 0, "ACTGT", None),
        ]));
        assert_eq!(consensus.bases, "ACGT");
    }

    #[test]
    fn test_clipped_bases_do_not_vote() {
        let mut clipped = read("b", 0, "TTTT", Some(vec![60; 4]));
        clipped.clip = Some((3, 4));
        let consensus = build_consensus(&contig(vec![read("a", 0, "ACGT", Some(vec![20; 4])), clipped]));
        assert_eq!(consensus.bases, "ACTT");
    }

    #[test]
    fn test_empty_contig() {
        assert!(build_consensus(&contig(Vec::new())).is_empty());
    }
}
