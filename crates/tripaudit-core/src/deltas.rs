use chrono::{DateTime, Utc};
use tripaudit_parser::Record;

#[derive(Debug, Clone, PartialEq)]
pub struct DeltaRecord {
    pub record: Record,
    pub elapsed_since_prev_s: Option<f64>,
    pub gap_flag: bool,
}

/// Annotates one trip's chronologically ordered records with the elapsed time
/// since the previous record. The first record carries no delta and never
/// flags a gap; a delta must strictly exceed the threshold to flag one.
pub fn annotate_trip(records: Vec<Record>, gap_threshold_s: f64) -> Vec<DeltaRecord> {
    let mut annotated = Vec::with_capacity(records.len());
    let mut prev: Option<DateTime<Utc>> = None;

    for record in records {
        let elapsed = prev
            .map(|prev_ts| (record.timestamp - prev_ts).num_milliseconds() as f64 / 1000.0);
        let gap_flag = elapsed.is_some_and(|delta| delta > gap_threshold_s);
        prev = Some(record.timestamp);
        annotated.push(DeltaRecord {
            record,
            elapsed_since_prev_s: elapsed,
            gap_flag,
        });
    }

    annotated
}
