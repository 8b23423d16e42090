//! Invite use tracking
//!
//! Discord does not say which invite a member joined through. The tracker
//! keeps the last known use count of every invite and diffs it against a
//! fresh fetch whenever new members show up.

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tokio::sync::Mutex;

use crate::discord::{GuildMember, Invite, InviteSource};
use crate::error::Result;

/// Use count per invite code
pub type InviteSnapshot = BTreeMap<String, u32>;

pub fn snapshot(invites: &[Invite]) -> InviteSnapshot {
    invites
        .iter()
        .map(|invite| (invite.code.clone(), invite.uses))
        .collect()
}

/// Codes used between two snapshots, once per use gained.
///
/// A code missing from `after` counts as used once: single-use invites
/// delete themselves when consumed. A code missing from `before` was
/// created and used in between.
pub fn diff_invites(before: &InviteSnapshot, after: &InviteSnapshot) -> Vec<String> {
    let mut used = Vec::new();
    for (code, &uses) in after {
        let previous = before.get(code).copied().unwrap_or(0);
        for _ in previous..uses {
            used.push(code.clone());
        }
    }
    for code in before.keys() {
        if !after.contains_key(code) {
            used.push(code.clone());
        }
    }
    used
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// One join, one used code
    Exact,
    /// Several joins shared the window; paired in join order
    BestEffort,
    /// No used code left for this join
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinMatch {
    pub member: GuildMember,
    pub invite_code: Option<String>,
    pub kind: MatchKind,
}

/// Pair joins (any order) with the codes used in the same window.
pub fn pair_joins(mut joins: Vec<GuildMember>, used: Vec<String>) -> Vec<JoinMatch> {
    joins.sort_by_key(|m| m.joined_at);
    let exact = joins.len() == 1 && used.len() == 1;
    let mut codes = used.into_iter();
    joins
        .into_iter()
        .map(|member| match codes.next() {
            Some(code) => JoinMatch {
                member,
                invite_code: Some(code),
                kind: if exact {
                    MatchKind::Exact
                } else {
                    MatchKind::BestEffort
                },
            },
            None => JoinMatch {
                member,
                invite_code: None,
                kind: MatchKind::Unknown,
            },
        })
        .collect()
}

/// Cached invite snapshots per guild.
///
/// The lock is held across the fetch, so concurrent batches are diffed one
/// at a time and each sees the snapshot the previous one stored.
pub struct InviteTracker<S> {
    source: S,
    snapshots: Mutex<HashMap<String, InviteSnapshot>>,
}

impl<S: InviteSource> InviteTracker<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            snapshots: Mutex::new(HashMap::new()),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Store the current invite counts as the baseline for `guild_id`.
    pub async fn prime(&self, guild_id: &str) -> Result<usize> {
        let mut snapshots = self.snapshots.lock().await;
        let current = snapshot(&self.source.fetch_invites(guild_id).await?);
        let count = current.len();
        snapshots.insert(guild_id.to_string(), current);
        tracing::info!(guild_id, invites = count, "primed invite cache");
        Ok(count)
    }

    /// Fetch invites once, diff them against the cache, and pair the used
    /// codes with `joins`. Without a baseline every join is `Unknown`.
    pub async fn resolve_joins(
        &self,
        guild_id: &str,
        joins: Vec<GuildMember>,
    ) -> Result<Vec<JoinMatch>> {
        let mut snapshots = self.snapshots.lock().await;
        let current = snapshot(&self.source.fetch_invites(guild_id).await?);

        let used = match snapshots.get(guild_id) {
            Some(before) => diff_invites(before, &current),
            None => {
                tracing::warn!(guild_id, "no invite baseline, joins cannot be matched");
                Vec::new()
            }
        };
        if used.len() != joins.len() {
            tracing::debug!(
                guild_id,
                used = used.len(),
                joins = joins.len(),
                "invite uses and joins differ"
            );
        }
        snapshots.insert(guild_id.to_string(), current);
        Ok(pair_joins(joins, used))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discord::DiscordUser;
    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    fn snap(pairs: &[(&str, u32)]) -> InviteSnapshot {
        pairs.iter().map(|(c, u)| (c.to_string(), *u)).collect()
    }

    fn member(id: &str, minute: u32) -> GuildMember {
        GuildMember {
            user: DiscordUser {
                id: id.into(),
                username: format!("user{id}"),
                global_name: None,
            },
            joined_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
        }
    }

    /// Returns queued invite lists in order, repeating the last one
    struct FakeSource {
        responses: std::sync::Mutex<Vec<Vec<Invite>>>,
    }

    impl FakeSource {
        fn new(responses: Vec<Vec<(&str, u32)>>) -> Self {
            let responses = responses
                .into_iter()
                .map(|invites| {
                    invites
                        .into_iter()
                        .map(|(code, uses)| Invite {
                            code: code.into(),
                            uses,
                            max_uses: 0,
                        })
                        .collect()
                })
                .collect();
            Self {
                responses: std::sync::Mutex::new(responses),
            }
        }
    }

    #[async_trait]
    impl InviteSource for FakeSource {
        async fn fetch_invites(&self, _: &str) -> Result<Vec<Invite>> {
            let mut responses = self.responses.lock().unwrap();
            if responses.len() > 1 {
                Ok(responses.remove(0))
            } else {
                Ok(responses[0].clone())
            }
        }

        async fn recent_members(&self, _: &str, _: DateTime<Utc>) -> Result<Vec<GuildMember>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn diff_counts_each_use() {
        let before = snap(&[("aaa", 1), ("bbb", 4)]);
        let after = snap(&[("aaa", 3), ("bbb", 4)]);
        assert_eq!(diff_invites(&before, &after), vec!["aaa", "aaa"]);
    }

    #[test]
    fn vanished_code_counts_once() {
        let before = snap(&[("once", 0), ("keep", 2)]);
        let after = snap(&[("keep", 2)]);
        assert_eq!(diff_invites(&before, &after), vec!["once"]);
    }

    #[test]
    fn new_code_counts_all_uses() {
        let before = snap(&[]);
        let after = snap(&[("fresh", 2), ("idle", 0)]);
        assert_eq!(diff_invites(&before, &after), vec!["fresh", "fresh"]);
    }

    #[test]
    fn lower_count_is_not_a_use() {
        let before = snap(&[("aaa", 5)]);
        let after = snap(&[("aaa", 2)]);
        assert!(diff_invites(&before, &after).is_empty());
    }

    #[test]
    fn one_join_one_code_is_exact() {
        let matches = pair_joins(vec![member("1", 0)], vec!["aaa".into()]);
        assert_eq!(matches[0].kind, MatchKind::Exact);
        assert_eq!(matches[0].invite_code.as_deref(), Some("aaa"));
    }

    #[test]
    fn several_joins_pair_in_join_order() {
        let matches = pair_joins(
            vec![member("late", 9), member("early", 1), member("extra", 12)],
            vec!["aaa".into(), "bbb".into()],
        );
        let got: Vec<_> = matches
            .iter()
            .map(|m| (m.member.user.id.as_str(), m.invite_code.as_deref(), m.kind))
            .collect();
        assert_eq!(
            got,
            vec![
                ("early", Some("aaa"), MatchKind::BestEffort),
                ("late", Some("bbb"), MatchKind::BestEffort),
                ("extra", None, MatchKind::Unknown),
            ]
        );
    }

    #[test]
    fn match_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MatchKind::BestEffort).unwrap(),
            "\"best_effort\""
        );
    }

    #[tokio::test]
    async fn resolve_diffs_against_cached_snapshot() {
        let source = FakeSource::new(vec![
            vec![("aaa", 0), ("bbb", 1)],
            vec![("aaa", 1), ("bbb", 1)],
            vec![("aaa", 1), ("bbb", 2)],
        ]);
        let tracker = InviteTracker::new(source);
        tracker.prime("g").await.unwrap();

        let first = tracker.resolve_joins("g", vec![member("1", 0)]).await.unwrap();
        assert_eq!(first[0].invite_code.as_deref(), Some("aaa"));
        assert_eq!(first[0].kind, MatchKind::Exact);

        // The second batch only sees the use gained since the first
        let second = tracker.resolve_joins("g", vec![member("2", 5)]).await.unwrap();
        assert_eq!(second[0].invite_code.as_deref(), Some("bbb"));
    }

    #[tokio::test]
    async fn resolve_without_baseline_is_unknown() {
        let tracker = InviteTracker::new(FakeSource::new(vec![vec![("aaa", 3)]]));
        let matches = tracker.resolve_joins("g", vec![member("1", 0)]).await.unwrap();
        assert_eq!(matches[0].kind, MatchKind::Unknown);
        assert_eq!(matches[0].invite_code, None);
    }
}
