use crate::plate::normalize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub plate: String,
    pub distance: u32,
}

/// Levenshtein distance with unit costs for insertion, deletion and
/// substitution.
pub fn edit_distance(a: &str, b: &str) -> u32 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len() as u32;
    }
    if b.is_empty() {
        return a.len() as u32;
    }

    let mut prev: Vec<u32> = (0..=b.len() as u32).collect();
    let mut cur = vec![0u32; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        cur[0] = i as u32 + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = if ca == cb { 0 } else { 1 };
            cur[j + 1] = (prev[j + 1] + 1).min(cur[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Finds the watch-list entry closest to `candidate`, accepted only when its
/// distance is within `tolerance`. Among entries at the same distance the
/// lexicographically smallest wins, since the set iterates in order.
pub fn find_match(candidate: &str, watchlist: &BTreeSet<String>, tolerance: u32) -> Option<Match> {
    let candidate = normalize(candidate);
    if candidate.is_empty() {
        return None;
    }

    let mut best: Option<Match> = None;
    for entry in watchlist {
        let distance = edit_distance(&candidate, entry);
        if best.as_ref().map_or(true, |b| distance < b.distance) {
            best = Some(Match {
                plate: entry.clone(),
                distance,
            });
            if distance == 0 {
                break;
            }
        }
    }
    best.filter(|m| m.distance <= tolerance)
}
