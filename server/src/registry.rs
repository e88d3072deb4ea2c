//! Shared player registry guarded by a single lock.
//!
//! This module owns the only mutable state shared across sessions: the list
//! of registered players with their per-topic scores and completion flags.
//! Every read or write goes through one mutex; operations that format or
//! sort data for output copy what they need under the lock and release it
//! before doing any non-trivial work.

use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Score value marking a topic the player has never played. Distinct from a
/// score of zero.
pub const UNPLAYED: i32 = -1;

/// One registered player and their per-topic results.
#[derive(Debug, Clone)]
pub struct PlayerRecord {
    pub nickname: String,
    /// One slot per topic; `UNPLAYED` until the first answer is saved.
    pub scores: Vec<i32>,
    pub completed: Vec<bool>,
}

impl PlayerRecord {
    fn new(nickname: &str, topic_count: usize) -> Self {
        Self {
            nickname: nickname.to_string(),
            scores: vec![UNPLAYED; topic_count],
            completed: vec![false; topic_count],
        }
    }
}

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Created,
    Duplicate,
    Full,
}

/// One row of a topic leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub nickname: String,
    pub score: i32,
    pub completed: bool,
}

#[derive(Debug)]
struct RegistryState {
    players: Vec<PlayerRecord>,
    running: bool,
}

/// Cheaply cloneable handle to the registry. Each operation takes the lock,
/// does its work, and releases it before returning.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<RegistryState>>,
    max_players: usize,
    topic_count: usize,
}

impl SharedRegistry {
    pub fn new(max_players: usize, topic_count: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(RegistryState {
                players: Vec::new(),
                running: true,
            })),
            max_players,
            topic_count,
        }
    }

    pub fn topic_count(&self) -> usize {
        self.topic_count
    }

    /// Atomic check-and-insert: of two racing registrations for the same
    /// nickname, exactly one sees `Created`.
    pub async fn register(&self, nickname: &str) -> RegisterOutcome {
        let mut state = self.inner.lock().await;

        if state.players.iter().any(|p| p.nickname == nickname) {
            return RegisterOutcome::Duplicate;
        }
        if state.players.len() >= self.max_players {
            return RegisterOutcome::Full;
        }

        state.players.push(PlayerRecord::new(nickname, self.topic_count));
        info!(
            "Player {} registered ({} active)",
            nickname,
            state.players.len()
        );
        RegisterOutcome::Created
    }

    /// Removes the record, compacting the list. No-op if absent.
    pub async fn unregister(&self, nickname: &str) {
        let mut state = self.inner.lock().await;
        let before = state.players.len();
        state.players.retain(|p| p.nickname != nickname);
        if state.players.len() < before {
            info!(
                "Player {} removed ({} active)",
                nickname,
                state.players.len()
            );
        }
    }

    /// Overwrites the player's score and completion flag for one topic.
    /// No-op if the nickname is not registered.
    pub async fn save_score(&self, topic: usize, nickname: &str, score: i32, completed: bool) {
        let mut state = self.inner.lock().await;
        if let Some(player) = state.players.iter_mut().find(|p| p.nickname == nickname) {
            player.scores[topic] = score;
            player.completed[topic] = completed;
        }
    }

    pub async fn has_completed(&self, nickname: &str, topic: usize) -> bool {
        let state = self.inner.lock().await;
        state
            .players
            .iter()
            .find(|p| p.nickname == nickname)
            .map(|p| p.completed[topic])
            .unwrap_or(false)
    }

    /// Standings for one topic, best score first. Players who have never
    /// played the topic are excluded; tie order is unspecified.
    ///
    /// The lock is held only long enough to copy the matching rows out.
    pub async fn leaderboard(&self, topic: usize) -> Vec<LeaderboardEntry> {
        let mut entries: Vec<LeaderboardEntry> = {
            let state = self.inner.lock().await;
            state
                .players
                .iter()
                .filter(|p| p.scores[topic] != UNPLAYED)
                .map(|p| LeaderboardEntry {
                    nickname: p.nickname.clone(),
                    score: p.scores[topic],
                    completed: p.completed[topic],
                })
                .collect()
        };

        entries.sort_unstable_by(|a, b| b.score.cmp(&a.score));
        entries
    }

    /// Point-in-time copy of every record, for status display.
    pub async fn snapshot(&self) -> Vec<PlayerRecord> {
        let state = self.inner.lock().await;
        state.players.clone()
    }

    /// Stops the dispatcher's accept loop on its next iteration.
    pub async fn shutdown(&self) {
        let mut state = self.inner.lock().await;
        state.running = false;
    }

    pub async fn is_running(&self) -> bool {
        let state = self.inner.lock().await;
        state.running
    }
}

/// Renders the server status report: active players, per-topic standings,
/// completions. Works on a snapshot, never on the live registry.
pub fn render_status(players: &[PlayerRecord], topics: &[String]) -> String {
    let mut out = String::from("===== server status =====\n");

    out.push_str(&format!("active players ({}):\n", players.len()));
    if players.is_empty() {
        out.push_str("  (none)\n");
    }
    for player in players {
        out.push_str(&format!("  - {}\n", player.nickname));
    }

    for (t, topic) in topics.iter().enumerate() {
        let mut ranked: Vec<&PlayerRecord> =
            players.iter().filter(|p| p.scores[t] != UNPLAYED).collect();
        ranked.sort_unstable_by(|a, b| b.scores[t].cmp(&a.scores[t]));

        out.push_str(&format!("standings for '{}':\n", topic));
        if ranked.is_empty() {
            out.push_str("  no players yet\n");
        }
        for (rank, player) in ranked.iter().enumerate() {
            out.push_str(&format!(
                "  {}. {}: {} points{}\n",
                rank + 1,
                player.nickname,
                player.scores[t],
                if player.completed[t] { " (completed)" } else { "" }
            ));
        }
    }

    out.push_str("=========================");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> SharedRegistry {
        SharedRegistry::new(20, 2)
    }

    #[tokio::test]
    async fn test_register_then_duplicate() {
        let reg = registry();

        assert_eq!(reg.register("alice").await, RegisterOutcome::Created);
        assert_eq!(reg.register("alice").await, RegisterOutcome::Duplicate);
    }

    #[tokio::test]
    async fn test_duplicate_check_is_case_sensitive() {
        let reg = registry();

        assert_eq!(reg.register("alice").await, RegisterOutcome::Created);
        assert_eq!(reg.register("Alice").await, RegisterOutcome::Created);
    }

    #[tokio::test]
    async fn test_unregister_frees_nickname() {
        let reg = registry();

        assert_eq!(reg.register("bob").await, RegisterOutcome::Created);
        reg.unregister("bob").await;
        assert_eq!(reg.register("bob").await, RegisterOutcome::Created);
    }

    #[tokio::test]
    async fn test_unregister_absent_is_noop() {
        let reg = registry();
        reg.unregister("ghost").await;
        assert!(reg.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_unregister_compacts_preserving_order() {
        let reg = registry();
        for name in ["a", "b", "c", "d"] {
            assert_eq!(reg.register(name).await, RegisterOutcome::Created);
        }

        reg.unregister("b").await;

        let names: Vec<String> = reg
            .snapshot()
            .await
            .into_iter()
            .map(|p| p.nickname)
            .collect();
        assert_eq!(names, ["a", "c", "d"]);
    }

    #[tokio::test]
    async fn test_capacity_enforced() {
        let reg = SharedRegistry::new(3, 1);

        for i in 0..3 {
            assert_eq!(
                reg.register(&format!("player{}", i)).await,
                RegisterOutcome::Created
            );
        }
        assert_eq!(reg.register("overflow").await, RegisterOutcome::Full);
        assert_eq!(reg.snapshot().await.len(), 3);

        // A duplicate of an existing name still reports Duplicate, not Full.
        assert_eq!(reg.register("player0").await, RegisterOutcome::Duplicate);
    }

    #[tokio::test]
    async fn test_new_record_starts_unplayed() {
        let reg = registry();
        reg.register("alice").await;

        let snap = reg.snapshot().await;
        assert_eq!(snap[0].scores, vec![UNPLAYED, UNPLAYED]);
        assert_eq!(snap[0].completed, vec![false, false]);
    }

    #[tokio::test]
    async fn test_save_score_and_completion() {
        let reg = registry();
        reg.register("alice").await;

        reg.save_score(1, "alice", 3, false).await;
        assert!(!reg.has_completed("alice", 1).await);

        reg.save_score(1, "alice", 4, true).await;
        assert!(reg.has_completed("alice", 1).await);
        assert!(!reg.has_completed("alice", 0).await);

        let snap = reg.snapshot().await;
        assert_eq!(snap[0].scores, vec![UNPLAYED, 4]);
    }

    #[tokio::test]
    async fn test_save_score_unknown_nickname_is_noop() {
        let reg = registry();
        reg.register("alice").await;
        reg.save_score(0, "ghost", 5, true).await;

        let snap = reg.snapshot().await;
        assert_eq!(snap[0].scores[0], UNPLAYED);
    }

    #[tokio::test]
    async fn test_has_completed_unknown_nickname() {
        let reg = registry();
        assert!(!reg.has_completed("ghost", 0).await);
    }

    #[tokio::test]
    async fn test_leaderboard_excludes_unplayed_and_sorts_descending() {
        let reg = registry();
        for name in ["alice", "bob", "carol", "dave"] {
            reg.register(name).await;
        }
        reg.save_score(0, "alice", 2, false).await;
        reg.save_score(0, "bob", 5, true).await;
        reg.save_score(0, "carol", 0, false).await;
        // dave never plays topic 0

        let board = reg.leaderboard(0).await;
        let names: Vec<&str> = board.iter().map(|e| e.nickname.as_str()).collect();
        assert_eq!(names, ["bob", "alice", "carol"]);
        assert!(board[0].completed);
        // A zero score is a real score, not the unplayed sentinel.
        assert_eq!(board[2].score, 0);
    }

    #[tokio::test]
    async fn test_leaderboard_empty_topic() {
        let reg = registry();
        reg.register("alice").await;
        assert!(reg.leaderboard(1).await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_duplicate_registration() {
        let reg = registry();

        let (a, b) = tokio::join!(reg.register("bob"), reg.register("bob"));

        let created = [a, b]
            .iter()
            .filter(|o| **o == RegisterOutcome::Created)
            .count();
        assert_eq!(created, 1);
        assert_eq!(reg.snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_flag() {
        let reg = registry();
        assert!(reg.is_running().await);
        reg.shutdown().await;
        assert!(!reg.is_running().await);
    }

    #[tokio::test]
    async fn test_render_status_sections() {
        let reg = registry();
        reg.register("alice").await;
        reg.register("bob").await;
        reg.save_score(0, "bob", 4, true).await;

        let topics = vec!["Geography".to_string(), "History".to_string()];
        let report = render_status(&reg.snapshot().await, &topics);

        assert!(report.contains("active players (2):"));
        assert!(report.contains("1. bob: 4 points (completed)"));
        assert!(report.contains("standings for 'History':"));
        assert!(report.contains("no players yet"));
    }
}
