//! Batch job model
//!
//! A `BatchJob` is the ordered list of items handed to the runner plus the
//! outcomes appended as each item is attempted. Jobs can only be built
//! through the eligibility filter, so every item in a job carries media and
//! targets the job's destination.

use serde::{Deserialize, Serialize};

use crate::types::{ContentItem, Destination, ItemOutcome, OutcomeKind};

#[derive(Debug, Clone)]
pub struct BatchJob {
    destination: Destination,
    items: Vec<ContentItem>,
    outcomes: Vec<ItemOutcome>,
}

impl BatchJob {
    /// Build a job from the items eligible for `destination`, keeping their
    /// order
    pub fn eligible<I>(items: I, destination: Destination) -> Self
    where
        I: IntoIterator<Item = ContentItem>,
    {
        let items: Vec<ContentItem> = items
            .into_iter()
            .filter(|item| item.is_eligible(destination))
            .collect();

        Self {
            destination,
            outcomes: Vec::with_capacity(items.len()),
            items,
        }
    }

    /// One-item job for publishing a single item on its own destination
    ///
    /// The job is empty when the item carries no media.
    pub fn single(item: ContentItem) -> Self {
        let destination = item.destination;
        Self::eligible(std::iter::once(item), destination)
    }

    pub fn destination(&self) -> Destination {
        self.destination
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn outcomes(&self) -> &[ItemOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_single(&self) -> bool {
        self.items.len() == 1
    }

    /// Append the outcome for the next unattempted item
    pub(crate) fn record(&mut self, outcome: ItemOutcome) {
        debug_assert!(self.outcomes.len() < self.items.len());
        debug_assert_eq!(outcome.item_id, self.items[self.outcomes.len()].id);
        self.outcomes.push(outcome);
    }
}

/// Aggregate result of a finished run
///
/// Partial or total item failure is still a completed run; callers read the
/// counts to learn the business outcome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BatchSummary {
    pub success_count: usize,
    pub fail_count: usize,
    pub total_count: usize,
    pub outcomes: Vec<ItemOutcome>,
    /// Run stopped early on request; `outcomes` holds only attempted items
    pub cancelled: bool,
}

impl BatchSummary {
    pub(crate) fn from_job(job: &BatchJob, cancelled: bool) -> Self {
        let success_count = job
            .outcomes
            .iter()
            .filter(|o| o.result == OutcomeKind::Success)
            .count();

        Self {
            success_count,
            fail_count: job.outcomes.len() - success_count,
            total_count: job.items.len(),
            outcomes: job.outcomes.clone(),
            cancelled,
        }
    }

    pub fn attempted(&self) -> usize {
        self.success_count + self.fail_count
    }

    pub fn all_succeeded(&self) -> bool {
        !self.cancelled && self.fail_count == 0 && self.success_count == self.total_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MediaRef;

    fn item(title: &str, media: Option<&str>, destination: Destination) -> ContentItem {
        ContentItem::new(
            title.to_string(),
            String::new(),
            media.map(MediaRef::new),
            destination,
        )
    }

    #[test]
    fn test_eligible_filters_and_keeps_order() {
        let items = vec![
            item("a", Some("a.jpg"), Destination::Instagram),
            item("b", None, Destination::Instagram),
            item("c", Some("c.jpg"), Destination::Facebook),
            item("d", Some("d.mp4"), Destination::Instagram),
        ];

        let job = BatchJob::eligible(items, Destination::Instagram);

        let titles: Vec<&str> = job.items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "d"]);
        assert_eq!(job.destination(), Destination::Instagram);
        assert!(job.outcomes().is_empty());
    }

    #[test]
    fn test_eligible_can_be_empty() {
        let job = BatchJob::eligible(
            vec![item("a", None, Destination::Twitter)],
            Destination::Twitter,
        );
        assert!(job.is_empty());
    }

    #[test]
    fn test_single_uses_item_destination() {
        let job = BatchJob::single(item("solo", Some("s.png"), Destination::Linkedin));
        assert!(job.is_single());
        assert_eq!(job.destination(), Destination::Linkedin);

        let job = BatchJob::single(item("no media", None, Destination::Linkedin));
        assert!(job.is_empty());
    }

    #[test]
    fn test_summary_counts_from_outcomes() {
        let mut job = BatchJob::eligible(
            vec![
                item("a", Some("a.jpg"), Destination::Instagram),
                item("b", Some("b.jpg"), Destination::Instagram),
                item("c", Some("c.jpg"), Destination::Instagram),
            ],
            Destination::Instagram,
        );
        let ids: Vec<String> = job.items().iter().map(|i| i.id.clone()).collect();
        job.record(ItemOutcome::success(&ids[0]));
        job.record(ItemOutcome::failure(&ids[1], "boom"));

        let summary = BatchSummary::from_job(&job, true);
        assert_eq!(summary.success_count, 1);
        assert_eq!(summary.fail_count, 1);
        assert_eq!(summary.total_count, 3);
        assert_eq!(summary.attempted(), 2);
        assert!(summary.cancelled);
        assert!(!summary.all_succeeded());
    }
}
