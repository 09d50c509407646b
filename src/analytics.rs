/*
Analytics over execution history: range summaries, per-category and
per-day grouping, completion streaks, the cross-user daily leaderboard,
and the per-task rolling-stat recompute.
Module was independently written from HTTP / Axum for testing
*/

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{ExecutionRecord, ExecutionStatus, Task, TaskStats};
use crate::reconcile::DayStatistics;

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExecutionSummary {
    pub total: u32,
    pub completed: u32,
    pub skipped: u32,
    /// Completed / total, percent.
    pub completion_rate: f64,
    /// Mean over records with a measured duration only; zero-duration
    /// records are excluded from the mean, not averaged in as zero.
    pub average_actual_duration_minutes: f64,
}

pub fn summarize<'a>(records: impl IntoIterator<Item = &'a ExecutionRecord>) -> ExecutionSummary {
    let mut out = ExecutionSummary::default();
    let mut measured_total = 0i64;
    let mut measured_count = 0u32;

    for rec in records {
        out.total += 1;
        match rec.status {
            ExecutionStatus::Completed => out.completed += 1,
            ExecutionStatus::Skipped => out.skipped += 1,
            _ => {}
        }
        if rec.actual_duration_minutes > 0 {
            measured_total += rec.actual_duration_minutes;
            measured_count += 1;
        }
    }

    if out.total > 0 {
        out.completion_rate = out.completed as f64 / out.total as f64 * 100.0;
    }
    if measured_count > 0 {
        out.average_actual_duration_minutes = measured_total as f64 / measured_count as f64;
    }
    out
}

/// Group by the owning task's category. Records whose task has no category
/// (or no longer exists) are excluded.
pub fn by_category(records: &[ExecutionRecord], tasks: &[Task]) -> BTreeMap<String, ExecutionSummary> {
    let categories: BTreeMap<Uuid, &str> = tasks
        .iter()
        .filter_map(|t| t.category.as_deref().map(|c| (t.id, c)))
        .collect();

    let mut groups: BTreeMap<String, Vec<&ExecutionRecord>> = BTreeMap::new();
    for rec in records {
        if let Some(cat) = categories.get(&rec.task_id) {
            groups.entry(cat.to_string()).or_default().push(rec);
        }
    }
    groups
        .into_iter()
        .map(|(cat, recs)| (cat, summarize(recs)))
        .collect()
}

pub fn by_day(records: &[ExecutionRecord]) -> BTreeMap<NaiveDate, ExecutionSummary> {
    let mut groups: BTreeMap<NaiveDate, Vec<&ExecutionRecord>> = BTreeMap::new();
    for rec in records {
        groups.entry(rec.execution_date).or_default().push(rec);
    }
    groups
        .into_iter()
        .map(|(date, recs)| (date, summarize(recs)))
        .collect()
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct StreakReport {
    /// Length of the consecutive-day run ending at today or yesterday;
    /// 0 if the latest run ended earlier.
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Scan the distinct dates that have at least one completed execution for
/// maximal runs of consecutive calendar days.
pub fn streaks(records: &[ExecutionRecord], today: NaiveDate) -> StreakReport {
    let mut dates: Vec<NaiveDate> = records
        .iter()
        .filter(|r| r.status == ExecutionStatus::Completed)
        .map(|r| r.execution_date)
        .collect();
    dates.sort();
    dates.dedup();

    let mut report = StreakReport::default();
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;

    for date in dates {
        run = match prev {
            Some(p) if date - p == Duration::days(1) => run + 1,
            _ => 1,
        };
        report.longest_streak = report.longest_streak.max(run);
        if date == today || date + Duration::days(1) == today {
            report.current_streak = run;
        }
        prev = Some(date);
    }
    report
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    Gold,
    Silver,
    Bronze,
    Participant,
}

pub fn badge_for(completion_rate: f64) -> Badge {
    if completion_rate >= 95.0 {
        Badge::Gold
    } else if completion_rate >= 85.0 {
        Badge::Silver
    } else if completion_rate >= 70.0 {
        Badge::Bronze
    } else {
        Badge::Participant
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub user_name: String,
    pub statistics: DayStatistics,
    pub badge: Badge,
    pub achieved_daily_goal: bool,
}

/// Rank one day's per-user statistics: completion rate descending, then
/// completed-task count descending. The daily goal is an 80% rate.
pub fn rank_leaderboard(rows: Vec<(Uuid, String, DayStatistics)>) -> Vec<LeaderboardEntry> {
    let mut rows = rows;
    rows.sort_by(|a, b| {
        b.2.completion_rate
            .partial_cmp(&a.2.completion_rate)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.2.completed_tasks.cmp(&a.2.completed_tasks))
    });

    rows.into_iter()
        .enumerate()
        .map(|(i, (user_id, user_name, statistics))| LeaderboardEntry {
            rank: i as u32 + 1,
            user_id,
            user_name,
            badge: badge_for(statistics.completion_rate),
            achieved_daily_goal: statistics.completion_rate >= 80.0,
            statistics,
        })
        .collect()
}

/// Full recompute of a task's rolling stats from its entire execution
/// history. O(history) per completion or skip; runs off the request path.
pub fn recompute_task_stats(
    stats: &mut TaskStats,
    history: &[ExecutionRecord],
    now: DateTime<Utc>,
) {
    let completed: Vec<&ExecutionRecord> = history
        .iter()
        .filter(|r| r.status == ExecutionStatus::Completed)
        .collect();
    let skips = history
        .iter()
        .filter(|r| r.status == ExecutionStatus::Skipped)
        .count() as u32;

    stats.total_completions = completed.len() as u32;
    stats.total_skips = skips;

    let measured: Vec<i64> = completed
        .iter()
        .filter(|r| r.actual_duration_minutes > 0)
        .map(|r| r.actual_duration_minutes)
        .collect();
    stats.average_completion_time_minutes = if measured.is_empty() {
        0.0
    } else {
        measured.iter().sum::<i64>() as f64 / measured.len() as f64
    };

    stats.completion_rate_percent = if history.is_empty() {
        0.0
    } else {
        completed.len() as f64 / history.len() as f64 * 100.0
    };
    stats.recomputed_at = Some(now);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, Recurrence};

    fn record(
        task_id: Uuid,
        date: NaiveDate,
        status: ExecutionStatus,
        duration: i64,
    ) -> ExecutionRecord {
        ExecutionRecord {
            task_id,
            owner_id: Uuid::nil(),
            execution_date: date,
            status,
            actual_start_time: None,
            actual_end_time: None,
            expected_duration_minutes: 30,
            actual_duration_minutes: duration,
            completion_percentage: 0.0,
            efficiency_score: 0.0,
            interruption_count: 0,
            notes: None,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[test]
    fn summary_excludes_unmeasured_durations_from_the_mean() {
        let t = Uuid::new_v4();
        let records = vec![
            record(t, day(2), ExecutionStatus::Completed, 30),
            record(t, day(3), ExecutionStatus::Completed, 0),
            record(t, day(4), ExecutionStatus::Skipped, 0),
            record(t, day(5), ExecutionStatus::Completed, 60),
        ];
        let s = summarize(&records);
        assert_eq!(s.total, 4);
        assert_eq!(s.completed, 3);
        assert_eq!(s.skipped, 1);
        assert!((s.completion_rate - 75.0).abs() < 1e-9);
        // (30 + 60) / 2, not / 3.
        assert!((s.average_actual_duration_minutes - 45.0).abs() < 1e-9);
    }

    #[test]
    fn by_category_skips_uncategorized_tasks() {
        let mut math = Task {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: "algebra".to_string(),
            description: None,
            start_time: "08:00".to_string(),
            end_time: "09:00".to_string(),
            recurrence: Recurrence::Daily,
            custom_days: Vec::new(),
            from_date: day(1),
            to_date: day(31),
            is_active: true,
            priority: Priority::Medium,
            category: Some("math".to_string()),
            tags: Vec::new(),
            color_hex: None,
            icon_name: None,
            created_at: Utc::now(),
            stats: TaskStats::default(),
        };
        let mut chores = math.clone();
        chores.id = Uuid::new_v4();
        chores.category = None;
        math.id = Uuid::new_v4();

        let records = vec![
            record(math.id, day(2), ExecutionStatus::Completed, 20),
            record(chores.id, day(2), ExecutionStatus::Completed, 20),
        ];
        let grouped = by_category(&records, &[math, chores]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped["math"].completed, 1);
    }

    #[test]
    fn by_day_groups_on_execution_date() {
        let t = Uuid::new_v4();
        let records = vec![
            record(t, day(2), ExecutionStatus::Completed, 10),
            record(t, day(2), ExecutionStatus::Skipped, 0),
            record(t, day(3), ExecutionStatus::Completed, 10),
        ];
        let grouped = by_day(&records);
        assert_eq!(grouped[&day(2)].total, 2);
        assert_eq!(grouped[&day(3)].total, 1);
    }

    // Completions Mon..Wed, gap Thu, completion Fri; viewed from Saturday
    // the Friday run is stale: longest 3, current 0.
    #[test]
    fn streak_gap_breaks_current_run() {
        let t = Uuid::new_v4();
        let records = vec![
            record(t, day(2), ExecutionStatus::Completed, 10), // Mon
            record(t, day(3), ExecutionStatus::Completed, 10), // Tue
            record(t, day(4), ExecutionStatus::Completed, 10), // Wed
            record(t, day(6), ExecutionStatus::Completed, 10), // Fri
        ];
        let saturday = day(7);
        let report = streaks(&records, saturday);
        assert_eq!(report.longest_streak, 3);
        assert_eq!(report.current_streak, 0);

        // Same history seen on Friday: the one-day run is current.
        let report = streaks(&records, day(6));
        assert_eq!(report.current_streak, 1);
    }

    #[test]
    fn streak_counts_run_ending_yesterday() {
        let t = Uuid::new_v4();
        let records = vec![
            record(t, day(4), ExecutionStatus::Completed, 10),
            record(t, day(5), ExecutionStatus::Completed, 10),
            record(t, day(6), ExecutionStatus::Completed, 10),
        ];
        let report = streaks(&records, day(7));
        assert_eq!(report.current_streak, 3);
        assert_eq!(report.longest_streak, 3);
    }

    #[test]
    fn streak_ignores_skips_and_duplicate_dates() {
        let t = Uuid::new_v4();
        let u = Uuid::new_v4();
        let records = vec![
            record(t, day(5), ExecutionStatus::Completed, 10),
            record(u, day(5), ExecutionStatus::Completed, 10),
            record(t, day(6), ExecutionStatus::Skipped, 0),
        ];
        let report = streaks(&records, day(6));
        assert_eq!(report.longest_streak, 1);
        assert_eq!(report.current_streak, 1);
    }

    #[test]
    fn badges_follow_thresholds() {
        assert_eq!(badge_for(100.0), Badge::Gold);
        assert_eq!(badge_for(95.0), Badge::Gold);
        assert_eq!(badge_for(94.9), Badge::Silver);
        assert_eq!(badge_for(85.0), Badge::Silver);
        assert_eq!(badge_for(70.0), Badge::Bronze);
        assert_eq!(badge_for(69.9), Badge::Participant);
    }

    #[test]
    fn leaderboard_ranks_rate_then_completed_count() {
        let stats = |rate: f64, completed: u32| DayStatistics {
            completion_rate: rate,
            completed_tasks: completed,
            ..Default::default()
        };
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let c = Uuid::new_v4();

        let ranked = rank_leaderboard(vec![
            (a, "a".to_string(), stats(80.0, 4)),
            (b, "b".to_string(), stats(90.0, 2)),
            (c, "c".to_string(), stats(80.0, 8)),
        ]);

        assert_eq!(ranked[0].user_id, b);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].user_id, c); // same rate as a, more completed
        assert_eq!(ranked[2].user_id, a);
        assert!(ranked[0].achieved_daily_goal);
        assert!(ranked[1].achieved_daily_goal);
        assert_eq!(ranked[2].badge, Badge::Bronze);
    }

    #[test]
    fn recompute_rolls_up_full_history() {
        let t = Uuid::new_v4();
        let history = vec![
            record(t, day(2), ExecutionStatus::Completed, 30),
            record(t, day(3), ExecutionStatus::Completed, 50),
            record(t, day(4), ExecutionStatus::Skipped, 0),
            record(t, day(5), ExecutionStatus::Completed, 0),
        ];
        let mut stats = TaskStats::default();
        let now = Utc::now();
        recompute_task_stats(&mut stats, &history, now);

        assert_eq!(stats.total_completions, 3);
        assert_eq!(stats.total_skips, 1);
        assert!((stats.average_completion_time_minutes - 40.0).abs() < 1e-9);
        assert!((stats.completion_rate_percent - 75.0).abs() < 1e-9);
        assert_eq!(stats.recomputed_at, Some(now));
    }
}
