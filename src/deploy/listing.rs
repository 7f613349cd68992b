// ABOUTME: Parsing of remote release listings and target selection.
// ABOUTME: Picks rollback targets and prune candidates from `ls -1tp` output.

use crate::types::DirName;

/// Release directories on the target, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseListing {
    releases: Vec<String>,
}

impl ReleaseListing {
    /// Parse `ls -1tp` output.
    ///
    /// Only directories count as releases; the live symlink and plain files
    /// carry no trailing `/` and are skipped, as is the dependency holding
    /// directory.
    pub fn parse(output: &str, holding: Option<&DirName>) -> Self {
        let releases = output
            .lines()
            .map(str::trim)
            .filter_map(|line| line.strip_suffix('/'))
            .filter(|name| !name.is_empty())
            .filter(|name| holding.is_none_or(|dir| dir.as_str() != *name))
            .map(str::to_string)
            .collect();
        Self { releases }
    }

    pub fn from_releases(releases: Vec<String>) -> Self {
        Self { releases }
    }

    pub fn releases(&self) -> &[String] {
        &self.releases
    }

    pub fn len(&self) -> usize {
        self.releases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }

    pub fn contains(&self, release: &str) -> bool {
        self.releases.iter().any(|r| r == release)
    }

    /// Newest release other than `live`.
    pub fn previous_of(&self, live: Option<&str>) -> Option<&str> {
        self.releases
            .iter()
            .map(String::as_str)
            .find(|release| Some(*release) != live)
    }

    /// The single oldest release to delete once more than `keep + 1` exist.
    ///
    /// Releases named in `protected` are never chosen.
    pub fn prune_candidate(&self, keep: usize, protected: &[&str]) -> Option<&str> {
        if self.releases.len() <= keep.saturating_add(1) {
            return None;
        }
        self.releases
            .iter()
            .rev()
            .map(String::as_str)
            .find(|release| !protected.contains(release))
    }
}

/// Release name from `readlink` output, which may be relative or absolute.
pub fn live_release(readlink_output: &str) -> Option<String> {
    let target = readlink_output.trim().trim_end_matches('/');
    let name = target.rsplit('/').next().unwrap_or(target);
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const LISTING: &str = "current\n202401040000/\nnode_modules/\n202401030000/\nnotes.txt\n202401020000/\n";

    #[test]
    fn parse_keeps_directories_only() {
        let dir = DirName::new("node_modules").unwrap();
        let listing = ReleaseListing::parse(LISTING, Some(&dir));
        assert_eq!(
            listing.releases(),
            &["202401040000", "202401030000", "202401020000"]
        );
    }

    #[test]
    fn holding_dir_counts_without_dependency_handling() {
        let listing = ReleaseListing::parse(LISTING, None);
        assert_eq!(listing.len(), 4);
        assert!(listing.contains("node_modules"));
    }

    #[test]
    fn previous_skips_live_release() {
        let listing = ReleaseListing::parse(LISTING, None);
        assert_eq!(listing.previous_of(Some("202401040000")), Some("node_modules"));

        let dir = DirName::new("node_modules").unwrap();
        let listing = ReleaseListing::parse(LISTING, Some(&dir));
        assert_eq!(listing.previous_of(Some("202401040000")), Some("202401030000"));
    }

    #[test]
    fn previous_is_independent_of_live_position() {
        // The live release is not always the newest directory, e.g. after a
        // dependency move touched an older one.
        let listing = ReleaseListing::from_releases(vec![
            "b".to_string(),
            "c".to_string(),
            "a".to_string(),
        ]);
        assert_eq!(listing.previous_of(Some("c")), Some("b"));
        assert_eq!(listing.previous_of(Some("b")), Some("c"));
    }

    #[test]
    fn no_previous_with_single_release() {
        let listing = ReleaseListing::from_releases(vec!["a".to_string()]);
        assert_eq!(listing.previous_of(Some("a")), None);
        assert_eq!(ReleaseListing::default().previous_of(None), None);
    }

    #[test]
    fn prune_targets_oldest_beyond_keep() {
        let listing = ReleaseListing::from_releases(
            ["new", "r4", "r3", "r2", "r1"].map(String::from).to_vec(),
        );
        assert_eq!(listing.prune_candidate(2, &["new", "r4"]), Some("r1"));
        assert_eq!(listing.prune_candidate(4, &["new", "r4"]), None);
        assert_eq!(listing.prune_candidate(3, &["new", "r4"]), Some("r1"));
    }

    #[test]
    fn prune_never_touches_protected() {
        let listing = ReleaseListing::from_releases(["new", "live"].map(String::from).to_vec());
        assert_eq!(listing.prune_candidate(0, &["new", "live"]), None);
    }

    #[test]
    fn live_release_from_readlink() {
        assert_eq!(live_release("202401011200\n"), Some("202401011200".to_string()));
        assert_eq!(live_release("/srv/app/202401011200/\n"), Some("202401011200".to_string()));
        assert_eq!(live_release(""), None);
        assert_eq!(live_release("  \n"), None);
    }

    fn releases() -> impl Strategy<Value = Vec<String>> {
        proptest::collection::hash_set("[a-z0-9]{1,8}", 0..12)
            .prop_map(|set| set.into_iter().collect())
    }

    proptest! {
        #[test]
        fn previous_is_stable_and_never_live(list in releases(), pick in any::<prop::sample::Index>()) {
            let listing = ReleaseListing::from_releases(list.clone());
            let live = if list.is_empty() { None } else { Some(list[pick.index(list.len())].clone()) };

            let first = listing.previous_of(live.as_deref()).map(str::to_string);
            let second = listing.previous_of(live.as_deref()).map(str::to_string);
            prop_assert_eq!(&first, &second);
            prop_assert!(first.as_deref() != live.as_deref() || first.is_none());
            if list.len() >= 2 {
                prop_assert!(first.is_some());
            }
        }

        #[test]
        fn prune_picks_at_most_one_unprotected(list in releases(), keep in 0usize..6) {
            let listing = ReleaseListing::from_releases(list.clone());
            let protected: Vec<&str> = list.iter().take(2).map(String::as_str).collect();

            match listing.prune_candidate(keep, &protected) {
                Some(candidate) => {
                    prop_assert!(list.len() > keep + 1);
                    prop_assert!(!protected.contains(&candidate));
                    let oldest_unprotected = list
                        .iter()
                        .rev()
                        .map(String::as_str)
                        .find(|r| !protected.contains(r));
                    prop_assert_eq!(Some(candidate), oldest_unprotected);
                }
                None => prop_assert!(list.len() <= keep + 1 || list.len() <= protected.len()),
            }
        }
    }
}
