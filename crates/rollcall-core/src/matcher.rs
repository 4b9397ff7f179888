//! Nearest-neighbour identity resolution.

use crate::types::{PersonRecord, Signature};

/// Reference Euclidean threshold for 128-d face descriptors.
/// Lower values are stricter.
pub const DEFAULT_MATCH_THRESHOLD: f32 = 0.6;

/// A resolved identity and its distance to the probe.
#[derive(Debug, Clone, Copy)]
pub struct Match<'a> {
    pub person: &'a PersonRecord,
    pub distance: f32,
}

/// Strategy for resolving a probe signature against the registry.
///
/// Implementations perform no I/O and never mutate the registry.
pub trait Matcher {
    /// Return the closest person if their distance is `<= threshold`.
    fn find_match<'a>(
        &self,
        probe: &Signature,
        registry: &'a [PersonRecord],
        threshold: f32,
    ) -> Option<Match<'a>>;
}

/// Exhaustive scan over every reference signature of every person.
///
/// O(total reference signatures) per call. Ties resolve to the first
/// person encountered in registry order: an incumbent is only replaced
/// by a strictly smaller distance.
pub struct EuclideanMatcher;

impl EuclideanMatcher {
    /// Closest person regardless of threshold.
    pub fn nearest<'a>(&self, probe: &Signature, registry: &'a [PersonRecord]) -> Option<Match<'a>> {
        let mut best: Option<Match<'a>> = None;

        for person in registry {
            for reference in &person.signatures {
                if reference.len() != probe.len() {
                    tracing::debug!(
                        person = %person.id,
                        expected = probe.len(),
                        actual = reference.len(),
                        "skipping reference signature with mismatched dimension"
                    );
                    continue;
                }
                let distance = probe.euclidean_distance(reference);
                let is_better = match &best {
                    None => !distance.is_nan(),
                    Some(prev) => distance < prev.distance,
                };
                if is_better {
                    best = Some(Match { person, distance });
                }
            }
        }

        best
    }
}

impl Matcher for EuclideanMatcher {
    fn find_match<'a>(
        &self,
        probe: &Signature,
        registry: &'a [PersonRecord],
        threshold: f32,
    ) -> Option<Match<'a>> {
        self.nearest(probe, registry)
            .filter(|m| m.distance <= threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PersonId;
    use chrono::NaiveDate;

    fn person(id: &str, sigs: &[&[f32]]) -> PersonRecord {
        PersonRecord {
            id: PersonId::new(id),
            name: format!("name-{id}"),
            role: None,
            signatures: sigs.iter().map(|s| Signature::new(s.to_vec())).collect(),
            registered_at: NaiveDate::from_ymd_opt(2026, 1, 5)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        }
    }

    fn probe(values: &[f32]) -> Signature {
        Signature::new(values.to_vec())
    }

    #[test]
    fn test_empty_registry_never_matches() {
        let result = EuclideanMatcher.find_match(&probe(&[0.0, 0.0]), &[], 100.0);
        assert!(result.is_none());
    }

    #[test]
    fn test_scans_every_reference_signature() {
        // Best match is the last signature of the last person.
        let registry = vec![
            person("A", &[&[5.0, 5.0], &[4.0, 4.0]]),
            person("B", &[&[3.0, 3.0], &[0.1, 0.0]]),
        ];
        let m = EuclideanMatcher
            .find_match(&probe(&[0.0, 0.0]), &registry, 0.6)
            .unwrap();
        assert_eq!(m.person.id.as_str(), "B");
        assert!((m.distance - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let registry = vec![person("A", &[&[0.5, 0.0]])];
        let at = EuclideanMatcher.find_match(&probe(&[0.0, 0.0]), &registry, 0.5);
        assert!(at.is_some());
        let below = EuclideanMatcher.find_match(&probe(&[0.0, 0.0]), &registry, 0.49);
        assert!(below.is_none());
    }

    #[test]
    fn test_match_iff_min_distance_within_threshold() {
        let registry = vec![
            person("A", &[&[1.0, 0.0]]),
            person("B", &[&[0.0, 2.0]]),
        ];
        let p = probe(&[0.0, 0.0]);
        for t in [0.0f32, 0.5, 0.99, 1.0, 1.5, 2.0, 3.0] {
            let result = EuclideanMatcher.find_match(&p, &registry, t);
            assert_eq!(result.is_some(), 1.0 <= t, "threshold {t}");
            if let Some(m) = result {
                assert_eq!(m.person.id.as_str(), "A");
            }
        }
    }

    #[test]
    fn test_tie_resolves_to_first_encountered() {
        let registry = vec![
            person("first", &[&[1.0, 0.0]]),
            person("second", &[&[0.0, 1.0]]),
        ];
        for _ in 0..10 {
            let m = EuclideanMatcher
                .find_match(&probe(&[0.0, 0.0]), &registry, 1.0)
                .unwrap();
            assert_eq!(m.person.id.as_str(), "first");
        }

        let reversed: Vec<_> = registry.into_iter().rev().collect();
        let m = EuclideanMatcher
            .find_match(&probe(&[0.0, 0.0]), &reversed, 1.0)
            .unwrap();
        assert_eq!(m.person.id.as_str(), "second");
    }

    #[test]
    fn test_mismatched_dimension_is_skipped() {
        let registry = vec![
            person("short", &[&[0.0]]),
            person("full", &[&[0.2, 0.0]]),
        ];
        let m = EuclideanMatcher
            .find_match(&probe(&[0.0, 0.0]), &registry, 0.6)
            .unwrap();
        assert_eq!(m.person.id.as_str(), "full");
    }
}
