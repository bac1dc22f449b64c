//! Reproducible train/test selection of paper folders.

use std::path::Path;

use rand::{seq::index::sample, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{FigSplitError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DatasetSplit {
    pub train: Vec<String>,
    pub test: Vec<String>,
}

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Sorted names of the sub-directories of `dir`.
pub fn list_papers(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let mut papers = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            papers.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    papers.sort();
    Ok(papers)
}

/// Draw `n_train + n_test` distinct papers, the first `n_train` for training.
///
/// Drawn papers whose name contains `exclude` are dropped afterwards, so the
/// two sides may come out smaller than requested.
pub fn train_test_split<R>(
    papers: &[String],
    n_train: usize,
    n_test: usize,
    exclude: Option<&str>,
    rng: &mut R,
) -> Result<DatasetSplit>
where
    R: Rng + ?Sized,
{
    let wanted = n_train.checked_add(n_test).ok_or_else(|| {
        FigSplitError::InvalidParameter(format!("cannot draw {n_train} + {n_test} papers"))
    })?;
    if wanted > papers.len() {
        return Err(FigSplitError::InvalidParameter(format!(
            "cannot draw {wanted} papers from {}",
            papers.len()
        )));
    }

    let chosen: Vec<&String> = sample(rng, papers.len(), wanted)
        .into_iter()
        .map(|i| &papers[i])
        .collect();
    let kept = |names: &[&String]| -> Vec<String> {
        names
            .iter()
            .filter(|name| exclude.is_none_or(|term| !name.contains(term)))
            .map(|name| name.to_string())
            .collect()
    };

    Ok(DatasetSplit {
        train: kept(&chosen[..n_train]),
        test: kept(&chosen[n_train..]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn papers(n: usize) -> Vec<String> {
        (0..n)
            .map(|i| if i % 4 == 0 { format!("arxiv_{i}") } else { format!("chemrxiv_{i}") })
            .collect()
    }

    #[test]
    fn test_same_seed_same_split() {
        let papers = papers(50);
        let a = train_test_split(&papers, 10, 20, None, &mut seeded_rng(2189)).unwrap();
        let b = train_test_split(&papers, 10, 20, None, &mut seeded_rng(2189)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.train.len(), 10);
        assert_eq!(a.test.len(), 20);
    }

    #[test]
    fn test_sides_are_disjoint() {
        let papers = papers(30);
        let split = train_test_split(&papers, 10, 20, None, &mut seeded_rng(7)).unwrap();
        assert!(split.train.iter().all(|p| !split.test.contains(p)));
    }

    #[test]
    fn test_exclude_term() {
        let papers = papers(40);
        // every paper is drawn, so exactly the ten arxiv ones are dropped
        let split = train_test_split(&papers, 20, 20, Some("arxiv_"), &mut seeded_rng(1)).unwrap();
        let all: Vec<&String> = split.train.iter().chain(&split.test).collect();
        assert_eq!(all.len(), 30);
        assert!(all.iter().all(|p| p.starts_with("chemrxiv_")));
    }

    #[test]
    fn test_too_many_requested() {
        let papers = papers(5);
        assert!(matches!(
            train_test_split(&papers, 3, 3, None, &mut seeded_rng(0)),
            Err(FigSplitError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_huge_request_is_rejected() {
        let papers = papers(5);
        assert!(matches!(
            train_test_split(&papers, usize::MAX, 2, None, &mut seeded_rng(0)),
            Err(FigSplitError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_list_papers_sorted_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        assert_eq!(list_papers(dir.path()).unwrap(), vec!["a", "b"]);
    }
}
