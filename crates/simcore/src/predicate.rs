//! Event predicates used for selective event delivery and cancellation.

use crate::component::Id;
use crate::event::{Event, Tag};

/// Condition on event source and tag.
///
/// # Examples
///
/// ```rust
/// use simcore::EventPredicate;
///
/// // events with tag 3 or 4 which were not sent by component 0
/// let pred = EventPredicate::AllOf(vec![
///     EventPredicate::OfTag(vec![3, 4]),
///     EventPredicate::NotFromSource(vec![0]),
/// ]);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub enum EventPredicate {
    /// Matches any event.
    Any,
    /// Matches events produced by one of the listed components.
    FromSource(Vec<Id>),
    /// Matches events not produced by any of the listed components.
    NotFromSource(Vec<Id>),
    /// Matches events with one of the listed tags.
    OfTag(Vec<Tag>),
    /// Matches events whose tag is not listed.
    NotOfTag(Vec<Tag>),
    /// Matches events satisfying all nested predicates.
    AllOf(Vec<EventPredicate>),
}

impl EventPredicate {
    /// Checks whether the event satisfies the predicate.
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            EventPredicate::Any => true,
            EventPredicate::FromSource(ids) => ids.contains(&event.src),
            EventPredicate::NotFromSource(ids) => !ids.contains(&event.src),
            EventPredicate::OfTag(tags) => tags.contains(&event.tag),
            EventPredicate::NotOfTag(tags) => !tags.contains(&event.tag),
            EventPredicate::AllOf(preds) => preds.iter().all(|p| p.matches(event)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(src: Id, tag: Tag) -> Event {
        Event {
            id: 0,
            time: 0.,
            src,
            dst: 1,
            tag,
            data: Box::new(()),
        }
    }

    #[test]
    fn test_simple_predicates() {
        let e = event(2, 5);
        assert!(EventPredicate::Any.matches(&e));
        assert!(EventPredicate::FromSource(vec![1, 2]).matches(&e));
        assert!(!EventPredicate::FromSource(vec![1]).matches(&e));
        assert!(EventPredicate::NotFromSource(vec![1]).matches(&e));
        assert!(!EventPredicate::NotFromSource(vec![2]).matches(&e));
        assert!(EventPredicate::OfTag(vec![5]).matches(&e));
        assert!(!EventPredicate::OfTag(vec![4, 6]).matches(&e));
        assert!(EventPredicate::NotOfTag(vec![4]).matches(&e));
        assert!(!EventPredicate::NotOfTag(vec![5]).matches(&e));
    }

    #[test]
    fn test_conjunction() {
        let pred = EventPredicate::AllOf(vec![
            EventPredicate::OfTag(vec![5]),
            EventPredicate::NotFromSource(vec![3]),
        ]);
        assert!(pred.matches(&event(2, 5)));
        assert!(!pred.matches(&event(3, 5)));
        assert!(!pred.matches(&event(2, 6)));
        assert!(EventPredicate::AllOf(Vec::new()).matches(&event(0, 0)));
    }
}
