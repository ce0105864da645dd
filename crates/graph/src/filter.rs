use crate::store::RecordStore;
use crate::types::{normalize_tag, ChatRecord};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive calendar-day bounds on `modified_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_set(&self) -> bool {
        self.start.is_some() || self.end.is_some()
    }

    /// 00:00:00.000 UTC of the start day.
    pub fn start_bound(&self) -> Option<DateTime<Utc>> {
        self.start
            .and_then(|d| d.and_hms_milli_opt(0, 0, 0, 0))
            .map(|dt| dt.and_utc())
    }

    /// 23:59:59.999 UTC of the end day.
    pub fn end_bound(&self) -> Option<DateTime<Utc>> {
        self.end
            .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
            .map(|dt| dt.and_utc())
    }
}

/// Active filters for one pipeline cycle. Every field at its default means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterCriteria {
    pub text_query: String,
    pub tag: Option<String>,
    pub favorites_only: bool,
    pub has_branch_only: bool,
    pub date_range: DateRange,
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        self.query().is_none()
            && self.tag().is_none()
            && !self.favorites_only
            && !self.has_branch_only
            && !self.date_range.is_set()
    }

    fn query(&self) -> Option<&str> {
        let q = self.text_query.trim();
        (!q.is_empty()).then_some(q)
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref().and_then(normalize_tag)
    }
}

/// Criteria prepared once per cycle and evaluated against each record.
pub struct RecordFilter<'a> {
    store: &'a RecordStore,
    query: Option<String>,
    tag: Option<&'a str>,
    favorites_only: bool,
    has_branch_only: bool,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    dated: bool,
}

impl<'a> RecordFilter<'a> {
    pub fn new(store: &'a RecordStore, criteria: &'a FilterCriteria) -> Self {
        Self {
            store,
            query: criteria.query().map(str::to_lowercase),
            tag: criteria.tag(),
            favorites_only: criteria.favorites_only,
            has_branch_only: criteria.has_branch_only,
            start: criteria.date_range.start_bound(),
            end: criteria.date_range.end_bound(),
            dated: criteria.date_range.is_set(),
        }
    }

    /// All sub-predicates are evaluated; the record passes when every one holds.
    pub fn matches(&self, idx: usize) -> bool {
        let Some(record) = self.store.get(idx) else {
            return false;
        };
        let checks = [
            self.text_matches(record),
            self.tag_matches(record),
            self.favorite_matches(record),
            self.branch_matches(idx),
            self.date_matches(record),
        ];
        checks.iter().all(|ok| *ok)
    }

    fn text_matches(&self, record: &ChatRecord) -> bool {
        match &self.query {
            Some(q) => record.search_key.contains(q.as_str()),
            None => true,
        }
    }

    fn tag_matches(&self, record: &ChatRecord) -> bool {
        match self.tag {
            Some(tag) => self.store.overlay().has_tag(&record.id, tag),
            None => true,
        }
    }

    fn favorite_matches(&self, record: &ChatRecord) -> bool {
        !self.favorites_only || self.store.is_favorite(&record.id)
    }

    fn branch_matches(&self, idx: usize) -> bool {
        !self.has_branch_only || self.store.has_branch(idx)
    }

    fn date_matches(&self, record: &ChatRecord) -> bool {
        if !self.dated {
            return true;
        }
        let Some(modified) = record.modified else {
            return false;
        };
        let after_start = self.start.map_or(true, |start| modified >= start);
        let before_end = self.end.map_or(true, |end| modified <= end);
        after_start && before_end
    }
}

/// Single-record evaluation.
pub fn matches(store: &RecordStore, idx: usize, criteria: &FilterCriteria) -> bool {
    RecordFilter::new(store, criteria).matches(idx)
}

/// Indices of all records passing `criteria`, in load order.
pub fn filter_records(store: &RecordStore, criteria: &FilterCriteria) -> Vec<usize> {
    let filter = RecordFilter::new(store, criteria);
    (0..store.len()).filter(|&idx| filter.matches(idx)).collect()
}
