//! Similarity primitives shared by the classifiers.
//!
//! Instruction comparison works on opcode sequences only: operand payloads
//! embed obfuscated names and constant-pool ordering, so excluding them is
//! what keeps rename-only edits at similarity 1.0.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::model::{CacheKey, ClassId, Insn, InsnOperand, MatchGraph, MethodId, Side};

/// Similarity of two counts: 1.0 when equal, falling off linearly.
#[must_use]
pub fn count_similarity(a: usize, b: usize) -> f64 {
    if a == b {
        return 1.0;
    }
    let max = a.max(b) as f64;
    1.0 - (a.abs_diff(b) as f64) / max
}

/// Similarity of two positions within containers of possibly different size.
#[must_use]
pub fn position_similarity(pos_a: u32, count_a: usize, pos_b: u32, count_b: usize) -> f64 {
    if count_a <= 1 && count_b <= 1 {
        return 1.0;
    }
    let norm = |pos: u32, count: usize| {
        if count <= 1 {
            0.0
        } else {
            f64::from(pos) / (count - 1) as f64
        }
    };
    1.0 - (norm(pos_a, count_a) - norm(pos_b, count_b)).abs()
}

/// Overlap of two half-open spans: intersection over union.
#[must_use]
pub fn span_overlap(a: (u32, u32), b: (u32, u32)) -> f64 {
    let len_a = a.1.saturating_sub(a.0);
    let len_b = b.1.saturating_sub(b.0);
    if len_a == 0 && len_b == 0 {
        return 1.0;
    }
    let start = a.0.max(b.0);
    let end = a.1.min(b.1);
    let intersection = end.saturating_sub(start);
    let union = a.1.max(b.1) - a.0.min(b.0);
    if union == 0 {
        0.0
    } else {
        f64::from(intersection) / f64::from(union)
    }
}

/// Jaccard index over two sets; double emptiness counts as agreement.
#[must_use]
pub fn set_jaccard<T: std::hash::Hash + Eq>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}

/// Multiset overlap: sum of per-key minima over sum of per-key maxima.
#[must_use]
pub fn multiset_overlap(a: &HashMap<String, u32>, b: &HashMap<String, u32>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let mut min_sum: u64 = 0;
    let mut max_sum: u64 = 0;
    for (key, &ca) in a {
        let cb = b.get(key).copied().unwrap_or(0);
        min_sum += u64::from(ca.min(cb));
        max_sum += u64::from(ca.max(cb));
    }
    for (key, &cb) in b {
        if !a.contains_key(key) {
            max_sum += u64::from(cb);
        }
    }
    if max_sum == 0 {
        0.0
    } else {
        min_sum as f64 / max_sum as f64
    }
}

/// Overlap of two opcode frequency histograms.
#[must_use]
pub fn histogram_overlap(a: &[u32], b: &[u32]) -> f64 {
    let mut min_sum: u64 = 0;
    let mut max_sum: u64 = 0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        min_sum += u64::from(x.min(y));
        max_sum += u64::from(x.max(y));
    }
    if max_sum == 0 {
        1.0
    } else {
        min_sum as f64 / max_sum as f64
    }
}

/// Similarity of two opcode sequences: normalized Levenshtein distance.
#[must_use]
pub fn opcode_similarity(a: &[u8], b: &[u8]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let max_len = a.len().max(b.len());
    let distance = strsim::generic_levenshtein(&a.to_vec(), &b.to_vec());
    1.0 - distance as f64 / max_len as f64
}

/// Compare two instruction streams, returning a similarity in [0, 1].
///
/// Identical streams yield 1.0 and fully disjoint streams 0.0; the function
/// is symmetric, and edits confined to local-variable renames or
/// constant-pool reordering leave the opcode sequence intact.
#[must_use]
pub fn compare_insns(a: &[Insn], b: &[Insn]) -> f64 {
    let ops_a: Vec<u8> = a.iter().map(|i| i.opcode).collect();
    let ops_b: Vec<u8> = b.iter().map(|i| i.opcode).collect();
    opcode_similarity(&ops_a, &ops_b)
}

/// Erase object-type names from a descriptor: every `L...;` becomes `L;`.
///
/// Obfuscation renames classes, so only the descriptor's shape carries
/// signal across sides.
#[must_use]
pub fn erase_desc(desc: &str) -> String {
    let mut out = String::with_capacity(desc.len());
    let mut chars = desc.chars();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == 'L' {
            for skipped in chars.by_ref() {
                if skipped == ';' {
                    out.push(';');
                    break;
                }
            }
        }
    }
    out
}

// ============================================================================
// Cached per-entity features
// ============================================================================

pub(crate) fn method_opcodes(graph: &MatchGraph, side: Side, method: MethodId) -> Arc<Vec<u8>> {
    graph
        .cache()
        .get_or_insert_with(CacheKey::entity("m.opcodes", side, method.raw()), || {
            graph
                .side(side)
                .method(method)
                .insns()
                .iter()
                .map(|i| i.opcode)
                .collect()
        })
}

pub(crate) fn method_opcode_histogram(
    graph: &MatchGraph,
    side: Side,
    method: MethodId,
) -> Arc<Vec<u32>> {
    graph
        .cache()
        .get_or_insert_with(CacheKey::entity("m.histogram", side, method.raw()), || {
            let mut histogram = vec![0u32; 256];
            for insn in graph.side(side).method(method).insns() {
                histogram[insn.opcode as usize] += 1;
            }
            histogram
        })
}

pub(crate) fn method_strings(
    graph: &MatchGraph,
    side: Side,
    method: MethodId,
) -> Arc<HashSet<String>> {
    graph
        .cache()
        .get_or_insert_with(CacheKey::entity("m.strings", side, method.raw()), || {
            graph
                .side(side)
                .method(method)
                .insns()
                .iter()
                .filter_map(|i| match &i.operand {
                    InsnOperand::Str(s) => Some(s.clone()),
                    _ => None,
                })
                .collect()
        })
}

pub(crate) fn class_strings(graph: &MatchGraph, side: Side, class: ClassId) -> Arc<HashSet<String>> {
    graph
        .cache()
        .get_or_insert_with(CacheKey::entity("c.strings", side, class.raw()), || {
            let set = graph.side(side);
            let mut strings = HashSet::new();
            for &m in set.class(class).methods() {
                for insn in set.method(m).insns() {
                    if let InsnOperand::Str(s) = &insn.operand {
                        strings.insert(s.clone());
                    }
                }
            }
            strings
        })
}

pub(crate) fn class_opcode_histogram(
    graph: &MatchGraph,
    side: Side,
    class: ClassId,
) -> Arc<Vec<u32>> {
    graph
        .cache()
        .get_or_insert_with(CacheKey::entity("c.histogram", side, class.raw()), || {
            let set = graph.side(side);
            let mut histogram = vec![0u32; 256];
            for &m in set.class(class).methods() {
                for insn in set.method(m).insns() {
                    histogram[insn.opcode as usize] += 1;
                }
            }
            histogram
        })
}

pub(crate) fn class_erased_descs(
    graph: &MatchGraph,
    side: Side,
    class: ClassId,
) -> Arc<HashMap<String, u32>> {
    graph
        .cache()
        .get_or_insert_with(CacheKey::entity("c.descs", side, class.raw()), || {
            let set = graph.side(side);
            let mut descs: HashMap<String, u32> = HashMap::new();
            for &m in set.class(class).methods() {
                *descs.entry(erase_desc(set.method(m).desc())).or_default() += 1;
            }
            for &f in set.class(class).fields() {
                *descs.entry(erase_desc(set.field(f).desc())).or_default() += 1;
            }
            descs
        })
}

pub(crate) fn class_insn_total(graph: &MatchGraph, side: Side, class: ClassId) -> usize {
    let set = graph.side(side);
    set.class(class)
        .methods()
        .iter()
        .map(|&m| set.method(m).insns().len())
        .sum()
}
