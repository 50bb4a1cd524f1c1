use crate::common::Date;
use std::collections::BTreeMap;

/// The value of a dated history field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryValue {
    /// A scalar such as `yes` or `"roman"`
    Text(String),

    /// A nested block whose contents were not kept
    Block,
}

impl HistoryValue {
    /// The scalar text, if any
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HistoryValue::Text(x) => Some(x.as_str()),
            HistoryValue::Block => None,
        }
    }
}

/// One `field = value` inside a dated block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub field: String,
    pub value: HistoryValue,
}

/// Field changes keyed by the date they happen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct History {
    entries: BTreeMap<Date, Vec<HistoryEntry>>,
}

impl History {
    /// Record a field change on a date. Entries on the same date keep their
    /// order.
    pub fn add(&mut self, date: Date, field: &str, value: HistoryValue) {
        self.entries.entry(date).or_default().push(HistoryEntry {
            field: String::from(field),
            value,
        });
    }

    /// Entries recorded on a date
    pub fn entries_at(&self, date: Date) -> &[HistoryEntry] {
        self.entries.get(&date).map(|x| x.as_slice()).unwrap_or(&[])
    }

    /// All dated blocks in chronological order
    pub fn iter(&self) -> impl Iterator<Item = (Date, &[HistoryEntry])> {
        self.entries.iter().map(|(d, e)| (*d, e.as_slice()))
    }

    /// Returns true if nothing was recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn first_date_of(&self, field: &str) -> Option<Date> {
        self.iter().find_map(|(date, entries)| {
            entries
                .iter()
                .any(|e| e.field == field && e.value.as_text() != Some("no"))
                .then_some(date)
        })
    }

    /// Earliest date with a `birth` entry. `birth = no` does not count.
    ///
    /// ```
    /// use rome_loader::common::Date;
    /// use rome_loader::model::{History, HistoryValue};
    ///
    /// let mut history = History::default();
    /// history.add(Date::from_ymd(10, 1, 1), "birth", HistoryValue::Text("no".into()));
    /// assert_eq!(history.birth_date(), None);
    /// history.add(Date::from_ymd(12, 1, 1), "birth", HistoryValue::Text("yes".into()));
    /// assert_eq!(history.birth_date(), Some(Date::from_ymd(12, 1, 1)));
    /// ```
    pub fn birth_date(&self) -> Option<Date> {
        self.first_date_of("birth")
    }

    /// Earliest date with a `death` entry
    pub fn death_date(&self) -> Option<Date> {
        self.first_date_of("death")
    }
}
