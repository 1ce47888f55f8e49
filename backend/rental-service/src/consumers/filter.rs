use super::envelope::{BookEvent, Delivery};
use crate::config::PipelineConfig;
use std::collections::HashSet;
use tracing::info;

/// Category whitelist applied before any store access
#[derive(Debug, Clone)]
pub struct RecordFilter {
    accepted: HashSet<String>,
}

impl RecordFilter {
    pub fn new<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            accepted: categories.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.accepted_categories.iter().cloned())
    }

    /// `true` iff the category is whitelisted. Absent categories are rejected.
    pub fn accepts(&self, category: Option<&str>) -> bool {
        category.is_some_and(|c| self.accepted.contains(c))
    }

    /// Decide whether a delivery enters reconciliation.
    ///
    /// Undecodable payloads carry no category at all and are let through so
    /// they fail and end up on the dead-letter topic instead of vanishing.
    /// Everything that decoded, valid or not, is judged by its category.
    pub fn admits(&self, delivery: &Delivery) -> bool {
        if let BookEvent::Undecodable { .. } = delivery.event {
            return true;
        }

        let category = delivery.event.category();
        if self.accepts(category) {
            return true;
        }

        info!(
            isbn = delivery.event.isbn().unwrap_or_default(),
            category = category.unwrap_or("<none>"),
            topic = %delivery.raw.topic,
            offset = delivery.raw.offset,
            "Event skipped: category is not accepted"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumers::envelope::{RawRecord, TopicRoutes};

    #[test]
    fn test_whitelisted_categories_are_accepted() {
        let filter = RecordFilter::from_config(&PipelineConfig::default());

        for category in ["FANTASY", "SCIENCE-FICTION", "NON-FICTION"] {
            assert!(filter.accepts(Some(category)), "{} should pass", category);
        }
    }

    #[test]
    fn test_other_categories_are_rejected() {
        let filter = RecordFilter::from_config(&PipelineConfig::default());

        for category in ["HORROR", "fantasy", "", " FANTASY"] {
            assert!(!filter.accepts(Some(category)), "{:?} should be dropped", category);
        }
        assert!(!filter.accepts(None));
    }

    #[test]
    fn test_only_undecodable_records_bypass_the_whitelist() {
        let filter = RecordFilter::new(["FANTASY"]);
        let routes = TopicRoutes::new("rented-books", "returned-books");

        let undecodable = routes.decode(RawRecord::new("rented-books", 0, 0, b"{oops"));
        let horror = routes.decode(RawRecord::new(
            "rented-books",
            0,
            1,
            br#"{"isbn":"222","category":"HORROR","borrower":"Bob"}"#,
        ));
        let uncategorised_return =
            routes.decode(RawRecord::new("returned-books", 0, 2, br#"{"isbn":"111"}"#));
        let horror_without_isbn =
            routes.decode(RawRecord::new("rented-books", 0, 3, br#"{"category":"HORROR"}"#));
        let fantasy_without_isbn =
            routes.decode(RawRecord::new("rented-books", 0, 4, br#"{"category":"FANTASY"}"#));

        assert!(filter.admits(&undecodable));
        assert!(!filter.admits(&horror));
        assert!(!filter.admits(&uncategorised_return));
        assert!(!filter.admits(&horror_without_isbn));
        assert!(filter.admits(&fantasy_without_isbn));
    }
}
