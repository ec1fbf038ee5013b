use std::collections::BTreeMap;

use tripaudit_parser::Record;

/// Partitions accepted records by trip and sorts each partition by timestamp.
/// The sort is stable, so records sharing a timestamp keep their input order.
pub fn group_by_trip(records: Vec<Record>) -> BTreeMap<String, Vec<Record>> {
    let mut trips: BTreeMap<String, Vec<Record>> = BTreeMap::new();
    for record in records {
        trips
            .entry(record.trip_id.clone())
            .or_default()
            .push(record);
    }
    for records in trips.values_mut() {
        records.sort_by_key(|record| record.timestamp);
    }
    trips
}
