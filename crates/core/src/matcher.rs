//! Local matcher: case-insensitive substring filter over the catalogue.

use crate::catalogue::MedicineRecord;
use medinfo_types::QueryText;

/// Result of running the local matcher.
///
/// `NoQuery` and `NoMatches` are kept apart because only the latter may trigger the
/// remote fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome<'a> {
    NoQuery,
    NoMatches(QueryText),
    Matches(Vec<&'a MedicineRecord>),
}

impl<'a> MatchOutcome<'a> {
    pub fn records(&self) -> &[&'a MedicineRecord] {
        match self {
            MatchOutcome::Matches(records) => records,
            _ => &[],
        }
    }
}

/// Returns the records whose name, category or uses contain the query, in catalogue order.
///
/// The query is trimmed; a blank query yields [`MatchOutcome::NoQuery`].
pub fn match_query<'a>(records: &'a [MedicineRecord], raw: &str) -> MatchOutcome<'a> {
    let Ok(query) = QueryText::new(raw) else {
        return MatchOutcome::NoQuery;
    };

    let matches = filter_records(records, &query);
    if matches.is_empty() {
        MatchOutcome::NoMatches(query)
    } else {
        MatchOutcome::Matches(matches)
    }
}

pub fn filter_records<'a>(records: &'a [MedicineRecord], query: &QueryText) -> Vec<&'a MedicineRecord> {
    let needle = query.folded();
    records
        .iter()
        .filter(|m| {
            [m.name, m.category, m.uses]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue::MEDICINES;

    fn ids(outcome: &MatchOutcome<'_>) -> Vec<u32> {
        outcome.records().iter().map(|m| m.id).collect()
    }

    #[test]
    fn test_blank_query_is_no_query() {
        assert_eq!(match_query(&MEDICINES, ""), MatchOutcome::NoQuery);
        assert_eq!(match_query(&MEDICINES, "   \t"), MatchOutcome::NoQuery);
    }

    #[test]
    fn test_paracetamol_matches_single_record() {
        assert_eq!(ids(&match_query(&MEDICINES, "Paracetamol")), vec![1]);
    }

    #[test]
    fn test_lowercase_aspirin_matches_case_insensitively() {
        assert_eq!(ids(&match_query(&MEDICINES, "aspirin")), vec![5]);
        assert_eq!(ids(&match_query(&MEDICINES, "ASPIRIN")), vec![5]);
    }

    #[test]
    fn test_malaria_has_no_matches() {
        match match_query(&MEDICINES, "Malaria") {
            MatchOutcome::NoMatches(q) => assert_eq!(q.as_str(), "Malaria"),
            other => panic!("expected NoMatches, got {other:?}"),
        }
    }

    #[test]
    fn test_matches_category_and_uses_fields() {
        // category only
        assert_eq!(ids(&match_query(&MEDICINES, "statins")), vec![4]);
        // uses only
        assert_eq!(ids(&match_query(&MEDICINES, "asthma")), vec![8]);
    }

    #[test]
    fn test_multiple_matches_keep_catalogue_order() {
        // "pain" appears in the uses of Paracetamol and Aspirin.
        assert_eq!(ids(&match_query(&MEDICINES, "pain")), vec![1, 5]);
        assert_eq!(ids(&match_query(&MEDICINES, "infections")), vec![2]);
    }

    #[test]
    fn test_side_effects_and_dosage_are_not_searched() {
        // "tinnitus" only appears in Aspirin's side effects.
        assert!(matches!(
            match_query(&MEDICINES, "tinnitus"),
            MatchOutcome::NoMatches(_)
        ));
        // "puffs" only appears in Albuterol's dosage.
        assert!(matches!(
            match_query(&MEDICINES, "puffs"),
            MatchOutcome::NoMatches(_)
        ));
    }

    #[test]
    fn test_matching_is_repeatable() {
        let first = ids(&match_query(&MEDICINES, "Diabetes"));
        let second = ids(&match_query(&MEDICINES, "Diabetes"));
        assert_eq!(first, vec![3]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_result_equals_brute_force_subset() {
        for query in ["a", "in", "heart", "ace", "(", "zzz"] {
            let expected: Vec<u32> = MEDICINES
                .iter()
                .filter(|m| {
                    let q = query.to_lowercase();
                    m.name.to_lowercase().contains(&q)
                        || m.category.to_lowercase().contains(&q)
                        || m.uses.to_lowercase().contains(&q)
                })
                .map(|m| m.id)
                .collect();
            assert_eq!(ids(&match_query(&MEDICINES, query)), expected, "query {query:?}");
        }
    }
}
