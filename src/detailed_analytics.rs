use crate::access::AdminGuard;
use crate::services::{AdminError, ContentStore, ServiceResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Reputation histogram band floors; everything at or above the last floor
/// lands in the overflow band.
const REPUTATION_BANDS: [i64; 7] = [0, 100, 500, 1000, 5000, 10000, 50000];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TimeRange {
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeRange {
    pub fn start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TimeRange::Week => now - Duration::days(7),
            TimeRange::Month => now - Duration::days(30),
            TimeRange::Quarter => now - Duration::days(90),
            TimeRange::Year => now - Duration::days(365),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Week => "7d",
            TimeRange::Month => "30d",
            TimeRange::Quarter => "90d",
            TimeRange::Year => "1y",
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Month
    }
}

impl FromStr for TimeRange {
    type Err = AdminError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "7d" => Ok(TimeRange::Week),
            "30d" => Ok(TimeRange::Month),
            "90d" => Ok(TimeRange::Quarter),
            "1y" => Ok(TimeRange::Year),
            other => Err(AdminError::Validation(format!(
                "unknown time range: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCount {
    pub date: String,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub users: Vec<DailyCount>,
    pub questions: Vec<DailyCount>,
    pub answers: Vec<DailyCount>,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementMetrics {
    pub total_users: i64,
    /// Users with at least one authored question or answer.
    pub active_users: i64,
    pub average_reputation: f64,
    pub average_questions: f64,
    pub average_answers: f64,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewStats {
    pub average_views: f64,
    pub max_views: i64,
    pub total_views: i64,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub unanswered_questions: i64,
    pub answered_questions: i64,
    pub view_stats: ViewStats,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReputationBand {
    pub band: String,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailedAnalytics {
    pub time_range: &'static str,
    pub daily_stats: DailyStats,
    pub engagement: EngagementMetrics,
    pub quality: QualityMetrics,
    pub reputation_distribution: Vec<ReputationBand>,
}

/// Time-ranged platform analytics: daily creation counts, engagement ratios,
/// content quality, and a reputation histogram over fixed bands.
pub fn detailed_analytics<S: ContentStore>(
    store: &S,
    guard: &AdminGuard,
    auth_id: &str,
    range: TimeRange,
) -> ServiceResult<DetailedAnalytics> {
    guard.ensure_admin(store, auth_id)?;

    let now = Utc::now();
    let start = range.start(now);

    let users = store.list_users()?;
    let questions = store.list_questions()?;
    let answers = store.list_answers()?;

    let daily_stats = DailyStats {
        users: daily_counts(users.iter().map(|user| user.joined_at), start, now),
        questions: daily_counts(
            questions.iter().map(|question| question.created_at),
            start,
            now,
        ),
        answers: daily_counts(answers.iter().map(|answer| answer.created_at), start, now),
    };

    let total_users = users.len() as i64;
    let active_users = users
        .iter()
        .filter(|user| {
            questions.iter().any(|question| question.author == user.id)
                || answers.iter().any(|answer| answer.author == user.id)
        })
        .count() as i64;
    let engagement = EngagementMetrics {
        total_users,
        active_users,
        average_reputation: average(users.iter().map(|user| user.reputation)),
        average_questions: if total_users == 0 {
            0.0
        } else {
            questions.len() as f64 / total_users as f64
        },
        average_answers: if total_users == 0 {
            0.0
        } else {
            answers.len() as f64 / total_users as f64
        },
    };

    let unanswered = questions
        .iter()
        .filter(|question| question.answers.is_empty())
        .count() as i64;
    let quality = QualityMetrics {
        unanswered_questions: unanswered,
        answered_questions: questions.len() as i64 - unanswered,
        view_stats: ViewStats {
            average_views: average(questions.iter().map(|question| question.views)),
            max_views: questions.iter().map(|question| question.views).max().unwrap_or(0),
            total_views: questions.iter().map(|question| question.views).sum(),
        },
    };

    let reputation_distribution = reputation_histogram(users.iter().map(|user| user.reputation));

    Ok(DetailedAnalytics {
        time_range: range.as_str(),
        daily_stats,
        engagement,
        quality,
        reputation_distribution,
    })
}

fn average<I: Iterator<Item = i64>>(values: I) -> f64 {
    let collected: Vec<i64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<i64>() as f64 / collected.len() as f64
}

fn daily_counts<I>(dates: I, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DailyCount>
where
    I: Iterator<Item = DateTime<Utc>>,
{
    let mut buckets: BTreeMap<String, i64> = BTreeMap::new();
    for date in dates {
        if date >= start && date <= end {
            *buckets.entry(date.format("%Y-%m-%d").to_string()).or_default() += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

fn reputation_histogram<I: Iterator<Item = i64>>(reputations: I) -> Vec<ReputationBand> {
    let mut counts = vec![0i64; REPUTATION_BANDS.len()];
    for reputation in reputations {
        let mut slot = 0;
        for (index, floor) in REPUTATION_BANDS.iter().enumerate() {
            if reputation >= *floor {
                slot = index;
            }
        }
        counts[slot] += 1;
    }
    REPUTATION_BANDS
        .iter()
        .enumerate()
        .map(|(index, floor)| ReputationBand {
            band: if index == REPUTATION_BANDS.len() - 1 {
                format!("{floor}+")
            } else {
                floor.to_string()
            },
            count: counts[index],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{InMemoryStore, UserRecord};

    fn guard() -> AdminGuard {
        AdminGuard::new(["admin@stackit.com"])
    }

    #[test]
    fn time_range_parses_and_defaults() {
        assert_eq!("7d".parse::<TimeRange>().unwrap(), TimeRange::Week);
        assert_eq!("1y".parse::<TimeRange>().unwrap(), TimeRange::Year);
        assert!(matches!(
            "2w".parse::<TimeRange>(),
            Err(AdminError::Validation(_))
        ));
        assert_eq!(TimeRange::default(), TimeRange::Month);
    }

    #[test]
    fn daily_counts_respect_range() {
        let store = InMemoryStore::default();
        let payload = detailed_analytics(&store, &guard(), "idp_dana", TimeRange::Week).unwrap();
        // The newest sample signup is 20 days old, so the week range holds
        // no user signups.
        assert!(payload.daily_stats.users.is_empty());
        let month = detailed_analytics(&store, &guard(), "idp_dana", TimeRange::Month).unwrap();
        let signup_total: i64 = month.daily_stats.users.iter().map(|day| day.count).sum();
        assert_eq!(signup_total, 1);
    }

    #[test]
    fn engagement_counts_authors() {
        let store = InMemoryStore::default();
        let payload = detailed_analytics(&store, &guard(), "idp_dana", TimeRange::Month).unwrap();
        // Alice and Bruno authored questions, Bruno and Dana answers; Carmen
        // only voted and viewed.
        assert_eq!(payload.engagement.total_users, 4);
        assert_eq!(payload.engagement.active_users, 3);
    }

    #[test]
    fn histogram_places_users_in_bands() {
        let store = InMemoryStore::new();
        for (auth, reputation) in [
            ("idp_root", 150i64),
            ("idp_low", 40),
            ("idp_high", 60000),
        ] {
            store.insert_user(UserRecord {
                id: 0,
                auth_id: auth.into(),
                name: auth.into(),
                username: None,
                email: if auth == "idp_root" {
                    "admin@stackit.com".into()
                } else {
                    format!("{auth}@example.com")
                },
                picture: String::new(),
                bio: None,
                location: None,
                portfolio: None,
                reputation,
                saved: Vec::new(),
                joined_at: Utc::now(),
            });
        }
        let payload = detailed_analytics(&store, &guard(), "idp_root", TimeRange::Month).unwrap();
        let find = |band: &str| {
            payload
                .reputation_distribution
                .iter()
                .find(|entry| entry.band == band)
                .map(|entry| entry.count)
                .unwrap()
        };
        assert_eq!(find("0"), 1);
        assert_eq!(find("100"), 1);
        assert_eq!(find("50000+"), 1);
    }

    #[test]
    fn quality_counts_unanswered() {
        let store = InMemoryStore::default();
        let payload = detailed_analytics(&store, &guard(), "idp_dana", TimeRange::Year).unwrap();
        assert_eq!(payload.quality.unanswered_questions, 1);
        assert_eq!(payload.quality.answered_questions, 1);
        assert_eq!(payload.quality.view_stats.max_views, 412);
        assert_eq!(payload.quality.view_stats.total_views, 499);
    }
}
