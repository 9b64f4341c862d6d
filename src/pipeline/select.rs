//! Uniform random choice of one candidate

use crate::error::{PipelineError, Result};
use crate::types::{CandidateSet, SelectedCandidate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Pick one candidate uniformly from `set` and build its download URL by
/// appending the name to `raw_base_url` verbatim.
pub fn select_candidate<R: Rng>(
    set: &CandidateSet,
    rng: &mut R,
    raw_base_url: &str,
) -> Result<SelectedCandidate> {
    if set.is_empty() {
        return Err(PipelineError::EmptyDirectory);
    }
    let index = rng.random_range(0..set.len());
    let entry = set.nth(index).ok_or(PipelineError::EmptyDirectory)?;
    Ok(SelectedCandidate {
        index,
        name: entry.name.clone(),
        url: format!("{}{}", raw_base_url, entry.name),
    })
}

/// Fixed seed for reproducible selection, otherwise seeded from the OS.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::listing::parse_listing;

    const BASE: &str = "https://raw.example.test/images/";

    fn three_files() -> CandidateSet {
        parse_listing(
            br#"[{"name":"a.png","type":"file"},
                 {"name":"b.txt","type":"file"},
                 {"name":"c.png","type":"file"}]"#,
        )
        .unwrap()
    }

    #[test]
    fn url_is_base_plus_name() {
        let mut rng = seeded_rng(Some(7));
        let selected = select_candidate(&three_files(), &mut rng, BASE).unwrap();
        assert!(selected.name.ends_with(".png"));
        assert_eq!(selected.url, format!("{}{}", BASE, selected.name));
    }

    #[test]
    fn names_are_not_escaped() {
        let set = parse_listing(br#"[{"name":"my cat#1.png","type":"file"}]"#).unwrap();
        let mut rng = seeded_rng(Some(1));
        let selected = select_candidate(&set, &mut rng, BASE).unwrap();
        assert_eq!(selected.url, "https://raw.example.test/images/my cat#1.png");
    }

    #[test]
    fn empty_set_is_rejected() {
        let set = parse_listing(b"[]").unwrap();
        let mut rng = seeded_rng(Some(1));
        let err = select_candidate(&set, &mut rng, BASE).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyDirectory));
    }

    #[test]
    fn selection_is_roughly_uniform() {
        let names: Vec<String> = (0..6)
            .map(|i| format!(r#"{{"name":"{}.png","type":"file"}}"#, i))
            .collect();
        let set = parse_listing(format!("[{}]", names.join(",")).as_bytes()).unwrap();
        let mut rng = seeded_rng(Some(42));
        let trials = 60_000;
        let mut counts = [0usize; 6];
        for _ in 0..trials {
            let selected = select_candidate(&set, &mut rng, BASE).unwrap();
            assert_eq!(selected.name, format!("{}.png", selected.index));
            counts[selected.index] += 1;
        }
        let expected = trials / 6;
        for count in counts {
            assert!(
                count.abs_diff(expected) < expected / 20,
                "bucket count {} too far from {}",
                count,
                expected
            );
        }
    }

    #[test]
    fn fixed_seed_repeats_selection() {
        let set = three_files();
        let pick = |seed| {
            let mut rng = seeded_rng(Some(seed));
            (0..8)
                .map(|_| select_candidate(&set, &mut rng, BASE).unwrap().index)
                .collect::<Vec<_>>()
        };
        assert_eq!(pick(9), pick(9));
    }

    #[test]
    fn os_seeded_generators_diverge() {
        let mut a = seeded_rng(None);
        let mut b = seeded_rng(None);
        let xs: Vec<u64> = (0..4).map(|_| a.random()).collect();
        let ys: Vec<u64> = (0..4).map(|_| b.random()).collect();
        assert_ne!(xs, ys);
    }
}
