use std::cell::Cell;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

use crate::model::MatchReference;
use crate::riot_api::{ApiError, MatchApi};

const PARTICIPANTS: i64 = 10;
const FIRST_GAME_ID: u64 = 4_000_000_000;

/// Offline stand-in for the Riot API. Generates a fixed history of synthetic
/// matches for one summoner so the whole pipeline can run without a token.
pub struct FakeMatchApi {
    summoner: String,
    account_id: String,
    queue: u32,
    history: Vec<u64>,
    matches: HashMap<u64, Value>,
    /// Every n-th call fails with a 503 to exercise the retry path.
    fail_every: Option<u32>,
    calls: Cell<u32>,
}

impl FakeMatchApi {
    pub fn new(summoner: &str, n_matches: usize, first_blood_rate: f64, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let rate = first_blood_rate.clamp(0.0, 1.0);
        let queue = 450;
        let mut history = Vec::with_capacity(n_matches);
        let mut matches = HashMap::with_capacity(n_matches);
        for idx in 0..n_matches {
            let game_id = FIRST_GAME_ID + idx as u64;
            let seat = rng.gen_range(1..=PARTICIPANTS);
            let first_blood_seat = if rng.gen_bool(rate) {
                seat
            } else {
                let mut other = rng.gen_range(1..PARTICIPANTS);
                if other >= seat {
                    other += 1;
                }
                other
            };
            matches.insert(
                game_id,
                synthetic_match(game_id, queue, summoner, seat, first_blood_seat, &mut rng),
            );
            history.push(game_id);
        }
        Self {
            summoner: summoner.to_string(),
            account_id: format!("fake-{}", summoner.to_lowercase().replace(' ', "-")),
            queue,
            history,
            matches,
            fail_every: None,
            calls: Cell::new(0),
        }
    }

    pub fn with_queue(mut self, queue: u32) -> Self {
        self.queue = queue;
        for record in self.matches.values_mut() {
            record["queueId"] = json!(queue);
        }
        self
    }

    pub fn with_failures_every(mut self, n: u32) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    fn tick(&self) -> Result<(), ApiError> {
        let n = self.calls.get() + 1;
        self.calls.set(n);
        match self.fail_every {
            Some(every) if n % every == 0 => Err(ApiError::Status {
                status: 503,
                retry_after: None,
                body: "fake outage".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl MatchApi for FakeMatchApi {
    fn account_id(&self, _region: &str, summoner_name: &str) -> Result<String, ApiError> {
        self.tick()?;
        if summoner_name != self.summoner {
            return Err(ApiError::Status {
                status: 404,
                retry_after: None,
                body: format!("summoner '{summoner_name}' not found"),
            });
        }
        Ok(self.account_id.clone())
    }

    fn match_list(
        &self,
        _region: &str,
        account_id: &str,
        queues: &[u32],
        begin_index: u32,
        end_index: u32,
    ) -> Result<Vec<MatchReference>, ApiError> {
        self.tick()?;
        if account_id != self.account_id || (!queues.is_empty() && !queues.contains(&self.queue)) {
            return Ok(Vec::new());
        }
        let begin = (begin_index as usize).min(self.history.len());
        let end = (end_index as usize).clamp(begin, self.history.len());
        Ok(self.history[begin..end]
            .iter()
            .map(|game_id| MatchReference {
                game_id: *game_id,
                queue: Some(self.queue),
                champion: None,
                timestamp: None,
                platform_id: Some("FAKE".to_string()),
            })
            .collect())
    }

    fn match_by_id(&self, _region: &str, game_id: u64) -> Result<Value, ApiError> {
        self.tick()?;
        self.matches.get(&game_id).cloned().ok_or(ApiError::Status {
            status: 404,
            retry_after: None,
            body: format!("match {game_id} not found"),
        })
    }
}

fn synthetic_match(
    game_id: u64,
    queue: u32,
    summoner: &str,
    seat: i64,
    first_blood_seat: i64,
    rng: &mut StdRng,
) -> Value {
    let identities: Vec<Value> = (1..=PARTICIPANTS)
        .map(|id| {
            let name = if id == seat {
                summoner.to_string()
            } else {
                format!("Bot {id}")
            };
            json!({"participantId": id, "player": {"summonerName": name}})
        })
        .collect();
    let participants: Vec<Value> = (1..=PARTICIPANTS)
        .map(|id| {
            let team_id = if id <= PARTICIPANTS / 2 { 100 } else { 200 };
            let champion_id: u32 = rng.gen_range(1..160);
            let kills: u32 = rng.gen_range(0..15);
            let deaths: u32 = rng.gen_range(0..12);
            let assists: u32 = rng.gen_range(0..20);
            json!({
                "participantId": id,
                "teamId": team_id,
                "championId": champion_id,
                "stats": {
                    "kills": kills,
                    "deaths": deaths,
                    "assists": assists,
                    "firstBloodKill": id == first_blood_seat,
                },
            })
        })
        .collect();
    json!({
        "gameId": game_id,
        "queueId": queue,
        "gameMode": "ARAM",
        "participantIdentities": identities,
        "participants": participants,
    })
}
