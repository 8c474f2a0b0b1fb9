use crate::error::VersionError;

/// The token resolving to the most recent (or oldest) available version.
pub const LATEST: &str = "latest";

/// How many of the matching versions a request resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    /// The single most recent match.
    #[default]
    Newest,
    /// The single oldest match.
    Oldest,
    /// Every match, used for range downloads.
    All,
}

impl Selection {
    pub fn from_flags(oldest: bool, full_range: bool) -> Self {
        if oldest {
            Selection::Oldest
        } else if full_range {
            Selection::All
        } else {
            Selection::Newest
        }
    }
}

/// Resolve `requested` against the `available` version partitions.
///
/// `"latest"` resolves to the newest or oldest available version, or to all
/// of them for a full range. Any other token must name an available version
/// exactly, except for a full range where it selects every version starting
/// with it, so `2024-01` covers every partition of that month. Versions are
/// fixed width timestamps, so lexicographic order is chronological order.
pub fn match_versions(
    requested: &str,
    available: &[String],
    selection: Selection,
) -> Result<Vec<String>, VersionError> {
    let not_found = || VersionError::NotFound {
        requested: requested.to_string(),
        available: available.to_vec(),
    };

    if requested != LATEST && selection != Selection::All {
        return available
            .iter()
            .find(|v| v.as_str() == requested)
            .map(|v| vec![v.clone()])
            .ok_or_else(not_found);
    }

    let matches: Vec<&String> = available
        .iter()
        .filter(|v| requested == LATEST || v.starts_with(requested))
        .collect();
    let picked = match selection {
        Selection::All => matches,
        Selection::Newest => matches.into_iter().max().into_iter().collect(),
        Selection::Oldest => matches.into_iter().min().into_iter().collect(),
    };
    if picked.is_empty() {
        return Err(not_found());
    }
    Ok(picked.into_iter().cloned().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn versions(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn latest_picks_extremes() {
        let available = versions(&["2024-01-02", "2024-02-10", "2024-01-01"]);
        assert_eq!(
            match_versions(LATEST, &available, Selection::Newest).unwrap(),
            vec!["2024-02-10"]
        );
        assert_eq!(
            match_versions(LATEST, &available, Selection::Oldest).unwrap(),
            vec!["2024-01-01"]
        );
    }

    #[test]
    fn latest_with_full_range_is_identity() {
        let available = versions(&["2024-01-02", "2024-02-10", "2024-01-01"]);
        assert_eq!(
            match_versions(LATEST, &available, Selection::All).unwrap(),
            available
        );
    }

    #[test]
    fn exact_version_is_returned() {
        let available = versions(&["2024-01-01T10-00-00", "2024-01-01", "2024-01-02"]);
        assert_eq!(
            match_versions("2024-01-01", &available, Selection::Newest).unwrap(),
            vec!["2024-01-01"]
        );
    }

    #[test]
    fn prefix_token_selects_a_range() {
        let available = versions(&[
            "2024-01-01T10-00-00",
            "2024-01-01T12-30-00",
            "2024-02-01T08-00-00",
        ]);
        assert_eq!(
            match_versions("2024-01", &available, Selection::All).unwrap(),
            vec!["2024-01-01T10-00-00", "2024-01-01T12-30-00"]
        );
        assert!(match_versions("2023", &available, Selection::All).is_err());
    }

    #[test]
    fn single_pick_requires_an_exact_version() {
        let available = versions(&["2024-01-31", "2024-01-02"]);
        for selection in [Selection::Newest, Selection::Oldest] {
            let err = match_versions("2024-01", &available, selection).unwrap_err();
            assert_eq!(
                err,
                VersionError::NotFound {
                    requested: "2024-01".to_string(),
                    available: available.clone(),
                }
            );
        }
        assert_eq!(
            match_versions("2024-01-02", &available, Selection::Oldest).unwrap(),
            vec!["2024-01-02"]
        );
    }

    #[test]
    fn missing_version_lists_alternatives() {
        let available = versions(&["2024-01-01"]);
        let err = match_versions("2023-12-31", &available, Selection::Newest).unwrap_err();
        assert_eq!(
            err,
            VersionError::NotFound {
                requested: "2023-12-31".to_string(),
                available: available.clone(),
            }
        );
        assert!(err.to_string().contains("2024-01-01"));
    }

    #[test]
    fn nothing_available_is_not_found() {
        assert!(match_versions(LATEST, &[], Selection::Newest).is_err());
    }

    #[test]
    fn flags_map_to_selection() {
        assert_eq!(Selection::from_flags(false, false), Selection::Newest);
        assert_eq!(Selection::from_flags(true, true), Selection::Oldest);
        assert_eq!(Selection::from_flags(false, true), Selection::All);
    }
}
