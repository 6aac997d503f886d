use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{HourKey, HourRecord};

/// Hour-indexed view over everything both sources reported.
///
/// Built fresh for every render; holds at most one [`HourRecord`] per hour.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    records: BTreeMap<HourKey, HourRecord>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `partial` at `key`, or fold it into the record already there.
    pub fn merge_into(&mut self, key: HourKey, partial: HourRecord) {
        self.records
            .entry(key)
            .and_modify(|existing| existing.merge(&partial))
            .or_insert(partial);
    }

    /// Merge a batch of partial records as produced by one parser pass.
    pub fn extend<I>(&mut self, partials: I)
    where
        I: IntoIterator<Item = (HourKey, HourRecord)>,
    {
        for (key, partial) in partials {
            self.merge_into(key, partial);
        }
    }

    pub fn get(&self, key: &HourKey) -> Option<&HourRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (&HourKey, &HourRecord)> {
        self.records.iter()
    }

    pub fn first_hour(&self) -> Option<HourKey> {
        self.records.keys().next().copied()
    }

    pub fn last_hour(&self) -> Option<HourKey> {
        self.records.keys().next_back().copied()
    }

    /// Pretty JSON array of every record, oldest first.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct Entry<'a> {
            hour: String,
            #[serde(flatten)]
            record: &'a HourRecord,
        }

        let entries: Vec<Entry<'_>> = self
            .records
            .iter()
            .map(|(hour, record)| Entry { hour: hour.to_rfc3339(), record })
            .collect();

        serde_json::to_string_pretty(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};
    use chrono_tz::America::Los_Angeles;

    fn at(hour: u32) -> HourKey {
        Los_Angeles.with_ymd_and_hms(2024, 1, 10, hour, 0, 0).unwrap()
    }

    #[test]
    fn telemetry_then_forecast_share_one_record() {
        let mut timeline = Timeline::new();
        timeline.merge_into(at(10), HourRecord { observed_snow: Some(5.0), ..Default::default() });
        timeline.merge_into(at(10), HourRecord { predicted_temp: Some(40.0), ..Default::default() });

        assert_eq!(timeline.len(), 1);
        let record = timeline.get(&at(10)).unwrap();
        assert_eq!(record.observed_snow, Some(5.0));
        assert_eq!(record.predicted_temp, Some(40.0));
    }

    #[test]
    fn same_instant_from_another_zone_hits_the_same_key() {
        let mut timeline = Timeline::new();
        timeline.merge_into(at(10), HourRecord { observed_snow: Some(5.0), ..Default::default() });

        let utc_key = at(10).with_timezone(&chrono::Utc).with_timezone(&Los_Angeles);
        timeline.merge_into(utc_key, HourRecord { observed_temp: Some(30.0), ..Default::default() });

        assert_eq!(timeline.len(), 1);
    }

    #[test]
    fn iteration_is_chronological() {
        let mut timeline = Timeline::new();
        timeline.extend([
            (at(14), HourRecord::default()),
            (at(3), HourRecord::default()),
            (at(9), HourRecord::default()),
        ]);

        let hours: Vec<_> = timeline.iter().map(|(k, _)| *k).collect();
        assert_eq!(hours, vec![at(3), at(9), at(14)]);
        assert_eq!(timeline.first_hour(), Some(at(3)));
        assert_eq!(timeline.last_hour(), Some(at(14)));
        assert_eq!(at(14) - at(9), TimeDelta::hours(5));
    }

    #[test]
    fn dump_contains_hour_and_set_fields_only() {
        let mut timeline = Timeline::new();
        timeline.merge_into(at(10), HourRecord { observed_snow: Some(5.0), ..Default::default() });

        let json = timeline.to_json_pretty().unwrap();
        assert!(json.contains("\"hour\": \"2024-01-10T10:00:00-08:00\""));
        assert!(json.contains("\"observed_snow\": 5.0"));
        assert!(!json.contains("predicted_temp"));
    }
}
