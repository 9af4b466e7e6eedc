use crate::record::Record;

/// Append-only collection of records that also acts as the run's quota.
///
/// The number of records still wanted is always `target - len`. Appends are
/// refused once the target is reached, so the collection never exceeds it.
#[derive(Debug, Clone)]
pub struct RecordSink {
    target: usize,
    records: Vec<Record>,
}

impl RecordSink {
    pub fn new(target: usize) -> Self {
        Self {
            target,
            records: Vec::with_capacity(target.min(1024)),
        }
    }

    /// Records still needed to reach the target.
    pub fn papers_left(&self) -> usize {
        self.target.saturating_sub(self.records.len())
    }

    pub fn is_full(&self) -> bool {
        self.papers_left() == 0
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append one record. Returns `false` (dropping the record) when the quota
    /// is already met.
    pub fn push(&mut self, record: Record) -> bool {
        if self.is_full() {
            return false;
        }
        self.records.push(record);
        true
    }

    /// Append records in order until the iterator ends or the quota is met.
    /// Items past the quota are discarded. Returns how many were appended.
    pub fn extend_until_full<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = Record>,
    {
        let mut appended = 0;
        for record in records {
            if !self.push(record) {
                break;
            }
            appended += 1;
        }
        appended
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Source;

    fn rec(title: &str) -> Record {
        Record {
            title: title.to_string(),
            ..Record::empty(Source::Core)
        }
    }

    #[test]
    fn test_papers_left_counts_down() {
        let mut sink = RecordSink::new(3);
        assert_eq!(sink.papers_left(), 3);
        assert!(sink.push(rec("a")));
        assert_eq!(sink.papers_left(), 2);
    }

    #[test]
    fn test_push_refused_when_full() {
        let mut sink = RecordSink::new(1);
        assert!(sink.push(rec("a")));
        assert!(!sink.push(rec("b")));
        assert_eq!(sink.len(), 1);
        assert!(sink.is_full());
    }

    #[test]
    fn test_extend_stops_mid_batch() {
        let mut sink = RecordSink::new(5);
        let page: Vec<Record> = (0..10).map(|i| rec(&i.to_string())).collect();
        assert_eq!(sink.extend_until_full(page), 5);
        assert_eq!(sink.len(), 5);
        assert_eq!(sink.records()[4].title, "4");
    }

    #[test]
    fn test_zero_target_is_full() {
        let mut sink = RecordSink::new(0);
        assert!(sink.is_full());
        assert_eq!(sink.extend_until_full(vec![rec("a")]), 0);
        assert!(sink.is_empty());
    }
}
