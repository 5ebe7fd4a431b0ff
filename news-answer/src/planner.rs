use chrono::{DateTime, Duration, Utc};

/// Temporal qualifier recognized in a user query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalWindow {
    PastMonth,
    PastWeek,
}

impl TemporalWindow {
    pub fn days(self) -> i64 {
        match self {
            TemporalWindow::PastMonth => 30,
            TemporalWindow::PastWeek => 7,
        }
    }

    /// Earliest publication instant still inside the window.
    pub fn cutoff(self) -> DateTime<Utc> {
        Utc::now() - Duration::days(self.days())
    }
}

/// A free-text query split into its searchable text and an optional
/// temporal restriction.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedQuery {
    pub semantic_query: String,
    pub window: Option<TemporalWindow>,
}

/// Parse a raw user query.
///
/// "past month" and "past week" are matched case-insensitively, in that
/// order; the first hit wins and the phrase is stripped from the text used
/// for similarity search. If stripping leaves nothing, the original trimmed
/// query is searched instead so the search string is never empty.
pub fn plan(raw_query: &str) -> PlannedQuery {
    let trimmed = raw_query.trim();
    let lowered = trimmed.to_lowercase();

    let (window, phrase) = if lowered.contains("past month") {
        (TemporalWindow::PastMonth, "past month")
    } else if lowered.contains("past week") {
        (TemporalWindow::PastWeek, "past week")
    } else {
        return PlannedQuery {
            semantic_query: trimmed.to_string(),
            window: None,
        };
    };

    let stripped = lowered.replace(phrase, "").trim().to_string();
    let semantic_query = if stripped.is_empty() {
        trimmed.to_string()
    } else {
        stripped
    };

    PlannedQuery {
        semantic_query,
        window: Some(window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_without_qualifier() {
        let planned = plan("  earnings report  ");
        assert_eq!(planned.semantic_query, "earnings report");
        assert_eq!(planned.window, None);
    }

    #[test]
    fn test_plan_past_week_strips_phrase() {
        let planned = plan("past week earnings report");
        assert_eq!(planned.semantic_query, "earnings report");
        assert_eq!(planned.window, Some(TemporalWindow::PastWeek));
    }

    #[test]
    fn test_plan_qualifier_only_falls_back_to_original() {
        let planned = plan("past week");
        assert_eq!(planned.semantic_query, "past week");
        assert_eq!(planned.window, Some(TemporalWindow::PastWeek));
    }

    #[test]
    fn test_plan_is_case_insensitive() {
        let planned = plan("Past Month tech layoffs");
        assert_eq!(planned.semantic_query, "tech layoffs");
        assert_eq!(planned.window, Some(TemporalWindow::PastMonth));
    }

    #[test]
    fn test_plan_month_checked_before_week() {
        let planned = plan("past month and past week news");
        assert_eq!(planned.window, Some(TemporalWindow::PastMonth));
        // Only the month phrase is stripped.
        assert_eq!(planned.semantic_query, "and past week news");
    }

    #[test]
    fn test_cutoff_is_in_the_past() {
        let week = TemporalWindow::PastWeek.cutoff();
        let month = TemporalWindow::PastMonth.cutoff();
        assert!(week < Utc::now());
        assert!(month < week);
    }
}
