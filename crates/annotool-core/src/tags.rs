//! Tag-based AND/OR filtering over resources.
//!
//! Matching is exact string equality on both key and value. An empty filter
//! never removes anything.

use crate::resource::{Entity, Tags};

/// How the required tags of a [`TagFilter`] combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TagMatch {
    /// Every required pair must be present.
    #[default]
    All,
    /// At least one required pair must be present.
    Any,
}

/// Predicate over a resource's tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagFilter {
    pub mode: TagMatch,
    pub required: Tags,
}

impl TagFilter {
    /// AND-mode filter.
    pub fn all(required: Tags) -> Self {
        Self {
            mode: TagMatch::All,
            required,
        }
    }

    /// OR-mode filter.
    pub fn any(required: Tags) -> Self {
        Self {
            mode: TagMatch::Any,
            required,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }

    /// Evaluate the filter against one tag set.
    pub fn matches(&self, tags: &Tags) -> bool {
        if self.required.is_empty() {
            return true;
        }
        let mut hits = self
            .required
            .iter()
            .map(|(key, value)| tags.get(key) == Some(value));
        match self.mode {
            TagMatch::All => hits.all(|hit| hit),
            TagMatch::Any => hits.any(|hit| hit),
        }
    }

    /// Keep the entities whose tags match. Order is preserved.
    pub fn apply<E: Entity>(&self, items: Vec<E>) -> Vec<E> {
        if self.is_empty() {
            return items;
        }
        items
            .into_iter()
            .filter(|item| self.matches(&item.resource().tags))
            .collect()
    }
}

/// Apply the AND filter, then the OR filter, as list queries do.
pub fn filter_by_tags<E: Entity>(items: Vec<E>, tags_and: &Tags, tags_or: &Tags) -> Vec<E> {
    let items = TagFilter::all(tags_and.clone()).apply(items);
    TagFilter::any(tags_or.clone()).apply(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Track;
    use uuid::Uuid;

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn track(name: &str, pairs: &[(&str, &str)]) -> Track {
        let mut track = Track::new(Uuid::nil(), name);
        track.resource.tags = tags(pairs);
        track
    }

    fn names(tracks: &[Track]) -> Vec<&str> {
        tracks.iter().map(|t| t.name.as_str()).collect()
    }

    fn sample() -> Vec<Track> {
        vec![
            track("both", &[("lang", "de"), ("kind", "lecture")]),
            track("lang-only", &[("lang", "de")]),
            track("kind-only", &[("kind", "lecture")]),
            track("other", &[("lang", "en")]),
            track("untagged", &[]),
        ]
    }

    #[test]
    fn test_and_requires_every_pair() {
        let filter = TagFilter::all(tags(&[("lang", "de"), ("kind", "lecture")]));
        let result = filter.apply(sample());
        assert_eq!(names(&result), vec!["both"]);
    }

    #[test]
    fn test_or_requires_one_pair() {
        let filter = TagFilter::any(tags(&[("lang", "de"), ("kind", "lecture")]));
        let result = filter.apply(sample());
        assert_eq!(names(&result), vec!["both", "lang-only", "kind-only"]);
    }

    #[test]
    fn test_empty_filter_is_noop() {
        let input = sample();
        assert_eq!(TagFilter::all(Tags::new()).apply(input.clone()), input);
        assert_eq!(TagFilter::any(Tags::new()).apply(input.clone()), input);
    }

    #[test]
    fn test_and_result_is_subset_of_or_result() {
        let required = tags(&[("lang", "de"), ("kind", "lecture"), ("lang2", "x")]);
        let and_result = TagFilter::all(required.clone()).apply(sample());
        let or_result = TagFilter::any(required).apply(sample());
        for item in &and_result {
            assert!(or_result.contains(item));
        }
    }

    #[test]
    fn test_matching_is_exact() {
        let filter = TagFilter::all(tags(&[("lang", "DE")]));
        assert!(filter.apply(sample()).is_empty());

        let filter = TagFilter::all(tags(&[("Lang", "de")]));
        assert!(filter.apply(sample()).is_empty());
    }

    #[test]
    fn test_filter_by_tags_applies_both() {
        let result = filter_by_tags(
            sample(),
            &tags(&[("lang", "de")]),
            &tags(&[("kind", "lecture"), ("missing", "x")]),
        );
        assert_eq!(names(&result), vec!["both"]);
    }
}
