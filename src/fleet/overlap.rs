//! File-ownership overlap analysis: which issues target the same files, and
//! the transitive clusters that forms.

use super::union_find::UnionFind;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct IssueFiles {
    pub issue: u64,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileOverlap {
    pub file: String,
    pub issues: Vec<u64>,
}

#[derive(Debug, Clone)]
pub struct Cluster {
    pub issues: Vec<u64>,
    pub shared_files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct OverlapOutput {
    pub clean: bool,
    pub overlaps: Vec<FileOverlap>,
    pub clusters: Vec<Cluster>,
}

/// Pure computation: no forge access needed once target files are known.
pub fn compute(inputs: Vec<IssueFiles>) -> OverlapOutput {
    let mut owners: HashMap<String, Vec<u64>> = HashMap::new();
    for issue_files in &inputs {
        for file in &issue_files.files {
            owners.entry(file.clone()).or_default().push(issue_files.issue);
        }
    }

    let mut overlaps: Vec<FileOverlap> = owners
        .iter()
        .filter(|(_, issues)| issues.len() >= 2)
        .map(|(file, issues)| {
            let mut issues = issues.clone();
            issues.sort_unstable();
            issues.dedup();
            FileOverlap {
                file: file.clone(),
                issues,
            }
        })
        .filter(|o| o.issues.len() >= 2)
        .collect();
    overlaps.sort_by(|a, b| a.file.cmp(&b.file));

    let mut uf: UnionFind<u64> = UnionFind::new();
    for issue_files in &inputs {
        uf.add(&issue_files.issue);
    }
    for overlap in &overlaps {
        for pair in overlap.issues.windows(2) {
            uf.union(&pair[0], &pair[1]);
        }
        // windows(2) only links adjacent pairs; union every issue against the
        // first so sharing a file transitively joins the whole set.
        if let Some(&first) = overlap.issues.first() {
            for &other in &overlap.issues[1..] {
                uf.union(&first, &other);
            }
        }
    }

    let file_for = |issues: &[u64]| -> Vec<String> {
        let set: std::collections::HashSet<u64> = issues.iter().copied().collect();
        overlaps
            .iter()
            .filter(|o| o.issues.iter().all(|i| set.contains(i)))
            .map(|o| o.file.clone())
            .collect()
    };

    let clusters: Vec<Cluster> = uf
        .clusters()
        .into_iter()
        .filter(|c| c.len() >= 2)
        .map(|mut issues| {
            issues.sort_unstable();
            let shared_files = file_for(&issues);
            Cluster { issues, shared_files }
        })
        .collect();

    OverlapOutput {
        clean: overlaps.is_empty(),
        overlaps,
        clusters,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_shared_files_is_clean() {
        let output = compute(vec![
            IssueFiles { issue: 1, files: vec!["a.rs".into()] },
            IssueFiles { issue: 2, files: vec!["b.rs".into()] },
        ]);
        assert!(output.clean);
        assert!(output.clusters.is_empty());
    }

    #[test]
    fn transitive_sharing_forms_one_cluster() {
        let output = compute(vec![
            IssueFiles { issue: 1, files: vec!["a.rs".into()] },
            IssueFiles { issue: 2, files: vec!["a.rs".into(), "b.rs".into()] },
            IssueFiles { issue: 3, files: vec!["b.rs".into()] },
        ]);
        assert!(!output.clean);
        assert_eq!(output.clusters.len(), 1);
        assert_eq!(output.clusters[0].issues, vec![1, 2, 3]);
    }

    #[test]
    fn disjoint_overlaps_form_separate_clusters() {
        let output = compute(vec![
            IssueFiles { issue: 1, files: vec!["a.rs".into()] },
            IssueFiles { issue: 2, files: vec!["a.rs".into()] },
            IssueFiles { issue: 3, files: vec!["c.rs".into()] },
            IssueFiles { issue: 4, files: vec!["c.rs".into()] },
        ]);
        assert_eq!(output.clusters.len(), 2);
    }
}
