//! Skill-rating collaborator.
//!
//! Rating math is an external concern; the core only asks "how much should
//! this kill move both players". [`BasicRankingService`] is the stock
//! expected-score implementation used by the standalone daemon and by
//! tests.

use crate::error::CoreResult;
use crate::repository::{PlayerRecord, PlayerRepository};
use async_trait::async_trait;
use scorekeep_event_system::PlayerId;
use std::collections::HashMap;
use std::sync::Arc;

/// Combat context of one kill, forwarded to the rating calculation.
#[derive(Debug, Clone)]
pub struct KillContext {
    pub weapon: String,
    pub headshot: bool,
    pub killer_team: Option<String>,
    pub victim_team: Option<String>,
}

/// Signed skill deltas for both parties of a kill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillAdjustment {
    pub killer_change: i32,
    pub victim_change: i32,
}

/// Rating operations the handlers depend on.
#[async_trait]
pub trait RankingService: Send + Sync {
    async fn calculate_skill_adjustment(
        &self,
        killer: &PlayerRecord,
        victim: &PlayerRecord,
        ctx: &KillContext,
    ) -> CoreResult<SkillAdjustment>;

    /// Fixed penalty applied to a player's skill on suicide.
    fn calculate_suicide_penalty(&self) -> i32;

    /// Rank positions (1-based) for a batch of players.
    async fn get_batch_player_ranks(
        &self,
        ids: &[PlayerId],
    ) -> CoreResult<HashMap<PlayerId, u32>>;

    /// Rank position of one player, if ranked.
    async fn get_player_rank_position(&self, id: PlayerId) -> CoreResult<Option<u32>>;
}

/// Expected-score rating with a fixed K factor.
///
/// `killer_change = max(1, round(K * (1 - expected)))` where `expected` is
/// the standard logistic expectation over the 400-point scale; the victim
/// loses what the killer gains.
pub struct BasicRankingService {
    players: Arc<dyn PlayerRepository>,
    k_factor: f64,
    suicide_penalty: i32,
}

const RANK_SCAN_LIMIT: usize = 10_000;

impl BasicRankingService {
    pub fn new(players: Arc<dyn PlayerRepository>) -> Self {
        Self {
            players,
            k_factor: 32.0,
            suicide_penalty: -5,
        }
    }

    async fn rank_in_game(&self, id: PlayerId) -> CoreResult<Option<u32>> {
        let Some(player) = self.players.find_by_id(id).await? else {
            return Ok(None);
        };
        let top = self.players.find_top_players(&player.game, RANK_SCAN_LIMIT).await?;
        Ok(top
            .iter()
            .position(|p| p.player_id == id)
            .map(|pos| pos as u32 + 1))
    }
}

#[async_trait]
impl RankingService for BasicRankingService {
    async fn calculate_skill_adjustment(
        &self,
        killer: &PlayerRecord,
        victim: &PlayerRecord,
        _ctx: &KillContext,
    ) -> CoreResult<SkillAdjustment> {
        let diff = (victim.skill as f64 - killer.skill as f64) / 400.0;
        let expected = 1.0 / (1.0 + 10f64.powf(-diff));
        // expected here is the probability the *victim* would have won.
        let change = (self.k_factor * expected).round().max(1.0) as i32;
        Ok(SkillAdjustment {
            killer_change: change,
            victim_change: -change,
        })
    }

    fn calculate_suicide_penalty(&self) -> i32 {
        self.suicide_penalty
    }

    async fn get_batch_player_ranks(
        &self,
        ids: &[PlayerId],
    ) -> CoreResult<HashMap<PlayerId, u32>> {
        let mut ranks = HashMap::new();
        for id in ids {
            if let Some(rank) = self.rank_in_game(*id).await? {
                ranks.insert(*id, rank);
            }
        }
        Ok(ranks)
    }

    async fn get_player_rank_position(&self, id: PlayerId) -> CoreResult<Option<u32>> {
        self.rank_in_game(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryPlayerRepository;
    use crate::repository::NewPlayer;

    fn record_with_skill(skill: u32) -> PlayerRecord {
        PlayerRecord {
            player_id: PlayerId(1),
            last_name: "p".to_string(),
            game: "cstrike".to_string(),
            skill,
            confidence: 0.0,
            volatility: 0.0,
            kills: 0,
            deaths: 0,
            suicides: 0,
            teamkills: 0,
            headshots: 0,
            shots: 0,
            hits: 0,
            connection_time: 0,
            kill_streak: 0,
            death_streak: 0,
            last_event: 0,
            unique_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_equal_skill_adjustment_is_half_k() {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let ranking = BasicRankingService::new(players);
        let ctx = KillContext {
            weapon: "ak47".to_string(),
            headshot: false,
            killer_team: None,
            victim_team: None,
        };

        let adj = ranking
            .calculate_skill_adjustment(&record_with_skill(1000), &record_with_skill(1000), &ctx)
            .await
            .unwrap();
        assert_eq!(adj.killer_change, 16);
        assert_eq!(adj.victim_change, -16);
    }

    #[tokio::test]
    async fn test_underdog_kill_pays_more() {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let ranking = BasicRankingService::new(players);
        let ctx = KillContext {
            weapon: "ak47".to_string(),
            headshot: false,
            killer_team: None,
            victim_team: None,
        };

        let upset = ranking
            .calculate_skill_adjustment(&record_with_skill(800), &record_with_skill(1400), &ctx)
            .await
            .unwrap();
        let expected_kill = ranking
            .calculate_skill_adjustment(&record_with_skill(1400), &record_with_skill(800), &ctx)
            .await
            .unwrap();
        assert!(upset.killer_change > expected_kill.killer_change);
        assert!(expected_kill.killer_change >= 1);
    }

    #[tokio::test]
    async fn test_rank_positions() {
        let players = Arc::new(InMemoryPlayerRepository::new());
        let mut ids = Vec::new();
        for (name, uid, skill) in [
            ("top", "76561197960265730", 20),
            ("mid", "76561197960265732", 10),
            ("low", "76561197960265734", 0),
        ] {
            let id = players
                .upsert_player(NewPlayer {
                    last_name: name.to_string(),
                    game: "cstrike".to_string(),
                    unique_id: uid.to_string(),
                })
                .await
                .unwrap();
            players
                .update(
                    id,
                    crate::repository::PlayerStatsUpdate {
                        skill_delta: skill - 1000,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            ids.push(id);
        }

        let ranking = BasicRankingService::new(players);
        assert_eq!(ranking.get_player_rank_position(ids[0]).await.unwrap(), Some(1));
        assert_eq!(ranking.get_player_rank_position(ids[2]).await.unwrap(), Some(3));

        let ranks = ranking.get_batch_player_ranks(&ids).await.unwrap();
        assert_eq!(ranks[&ids[1]], 2);
    }
}
