// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Helpers to create a report for faillible processes.
use serde::Serialize;

/// Each report record will be categorized with a type implementing this
/// `ReportCategory` trait.
pub trait ReportCategory: Serialize + PartialEq {}

/// Type of the records of a network construction
#[derive(Debug, Serialize, PartialEq, Eq, Clone, Copy)]
pub enum BuildReportCategory {
    /// A trip without any stop time is skipped
    TripWithoutStopTimes,
    /// A trip with a stop sequence above the largest one accepted is skipped
    StopSequenceOutOfRange,
    /// A declared transfer touches a stop with no station node
    TransferOnUnknownStop,
    /// A declared transfer leaves a stop without matching arrival platform
    TransferFromMissingPlatform,
}

impl ReportCategory for BuildReportCategory {}

/// A report record.
#[derive(Debug, Serialize, PartialEq)]
struct ReportRow<R: ReportCategory> {
    category: R,
    message: String,
}

/// A report is the list of the problems skipped by a process, as warnings.
/// Fatal problems are returned as errors instead.
#[derive(Debug, Serialize)]
pub struct Report<R: ReportCategory> {
    warnings: Vec<ReportRow<R>>,
}

impl<R: ReportCategory> Default for Report<R> {
    fn default() -> Self {
        Report {
            warnings: Vec::new(),
        }
    }
}

impl<R: ReportCategory> Report<R> {
    /// Add a warning report record.
    pub fn add_warning(&mut self, warning: String, warning_type: R) {
        let report_row = ReportRow {
            category: warning_type,
            message: warning,
        };
        if !self.warnings.contains(&report_row) {
            self.warnings.push(report_row);
        }
    }
    /// Number of warnings of a category
    pub fn warning_count(&self, category: &R) -> usize {
        self.warnings
            .iter()
            .filter(|row| &row.category == category)
            .count()
    }
    /// No warning recorded
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn records_are_deduplicated() {
        let mut report = Report::default();
        report.add_warning("trip t1".into(), BuildReportCategory::TripWithoutStopTimes);
        report.add_warning("trip t1".into(), BuildReportCategory::TripWithoutStopTimes);
        report.add_warning("stop A".into(), BuildReportCategory::TransferOnUnknownStop);
        assert_eq!(1, report.warning_count(&BuildReportCategory::TripWithoutStopTimes));
        assert_eq!(
            r#"{"warnings":[{"category":"TripWithoutStopTimes","message":"trip t1"},{"category":"TransferOnUnknownStop","message":"stop A"}]}"#,
            serde_json::to_string(&report).unwrap()
        );
    }
}
