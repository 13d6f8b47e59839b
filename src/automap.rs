use anyhow::{bail, Result};

use crate::character::ShapeLibrary;
use crate::viseme::{Viseme, VisemeBinding};
use crate::VISEME_COUNT;

/// Candidate alias tokens per viseme, most standard naming convention first:
/// VRChat namespaced, VRM dotted, bare phonetic, then a coarse vowel letter
/// (or nothing) as a last resort. Ordered list so the priority is well defined.
const CANDIDATES: [(Viseme, [&str; 4]); VISEME_COUNT] = [
    (Viseme::Sil, ["vrc/sil", "vrc.v_sil", "sil", ""]),
    (Viseme::PP, ["vrc/pp", "vrc.v_pp", "pp", ""]),
    (Viseme::FF, ["vrc/ff", "vrc.v_ff", "ff", ""]),
    (Viseme::TH, ["vrc/th", "vrc.v_th", "th", ""]),
    (Viseme::DD, ["vrc/dd", "vrc.v_dd", "dd", ""]),
    (Viseme::KK, ["vrc/kk", "vrc.v_kk", "kk", ""]),
    (Viseme::CH, ["vrc/ch", "vrc.v_ch", "ch", ""]),
    (Viseme::SS, ["vrc/ss", "vrc.v_ss", "ss", ""]),
    (Viseme::NN, ["vrc/nn", "vrc.v_nn", "nn", ""]),
    (Viseme::RR, ["vrc/rr", "vrc.v_rr", "rr", ""]),
    (Viseme::AA, ["vrc/aa", "vrc.v_aa", "aa", "a"]),
    (Viseme::E, ["vrc/e", "vrc.v_e", "e", "e"]),
    (Viseme::IH, ["vrc/ih", "vrc.v_ih", "ih", "i"]),
    (Viseme::OH, ["vrc/oh", "vrc.v_oh", "oh", "o"]),
    (Viseme::OU, ["vrc/ou", "vrc.v_ou", "ou", "u"]),
];

/// Scores at or above this count as "no match"; the binding is left empty
/// for the user to fill in by hand.
const SEARCH_CEILING: usize = 200;

/// Classic dynamic-programming edit distance, unit cost for substitution,
/// insertion and deletion.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut matrix = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for (i, row) in matrix.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=b.len() {
        matrix[0][j] = j;
    }

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
            matrix[i][j] = (matrix[i - 1][j] + 1)
                .min(matrix[i][j - 1] + 1)
                .min(matrix[i - 1][j - 1] + cost);
        }
    }

    matrix[a.len()][b.len()]
}

/// Guess a blend shape for every canonical viseme by case-insensitive fuzzy
/// matching of the character's shape names against the candidate table.
///
/// Pure function: scans to completion and returns a complete fresh binding
/// set, replacing whatever the user had. An exact match for any candidate
/// token wins immediately; otherwise the globally closest shape across all
/// meshes and tokens is kept. Requires a character to be selected.
pub fn auto_map(library: Option<&ShapeLibrary>) -> Result<Vec<VisemeBinding>> {
    let Some(library) = library else {
        bail!("no character selected");
    };

    let mut bindings = Vec::with_capacity(CANDIDATES.len());

    for (viseme, tokens) in CANDIDATES {
        let mut best = String::new();
        let mut best_dist = SEARCH_CEILING;

        'meshes: for (_, shapes) in library.meshes() {
            for shape in shapes {
                if shape.is_empty() {
                    continue;
                }

                for token in tokens {
                    let dist = levenshtein(&token.to_lowercase(), &shape.to_lowercase());

                    if dist == 0 {
                        best = shape.clone();
                        break 'meshes;
                    }

                    if dist < best_dist {
                        best = shape.clone();
                        best_dist = dist;
                    }
                }
            }
        }

        bindings.push(VisemeBinding::with_shape(viseme, best));
    }

    Ok(bindings)
}
