use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum CropError {
    #[error("summoner '{summoner}' not found in match, only summoners {available:?} available")]
    SummonerNotFound {
        summoner: String,
        available: Vec<String>,
    },
    #[error("match has no participant entry with id {participant_id}")]
    ParticipantMissing { participant_id: i64 },
    #[error("malformed match record: {0}")]
    Malformed(&'static str),
}

/// True when the record still carries every participant, i.e. it was stored
/// without cropping.
pub fn is_full_match(record: &Value) -> bool {
    record.get("participantIdentities").is_some()
}

pub fn participant_names(record: &Value) -> Vec<String> {
    record
        .get("participantIdentities")
        .and_then(|x| x.as_array())
        .map(|ids| {
            ids.iter()
                .filter_map(|id| summoner_name_of(id).map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Reduces a full match to the participant entry of the summoner known by
/// any of `names`. The first identity whose name matches wins.
pub fn crop_match(record: &Value, names: &[String]) -> Result<Value, CropError> {
    let identities = record
        .get("participantIdentities")
        .and_then(|x| x.as_array())
        .ok_or(CropError::Malformed("missing participantIdentities"))?;

    let participant_id = identities
        .iter()
        .find(|id| summoner_name_of(id).is_some_and(|name| names.iter().any(|n| n == name)))
        .and_then(|id| id.get("participantId"))
        .and_then(|x| x.as_i64());

    let Some(participant_id) = participant_id else {
        return Err(CropError::SummonerNotFound {
            summoner: names.first().cloned().unwrap_or_default(),
            available: participant_names(record),
        });
    };

    let participants = record
        .get("participants")
        .and_then(|x| x.as_array())
        .ok_or(CropError::Malformed("missing participants"))?;

    participants
        .iter()
        .find(|p| p.get("participantId").and_then(|x| x.as_i64()) == Some(participant_id))
        .cloned()
        .ok_or(CropError::ParticipantMissing { participant_id })
}

fn summoner_name_of(identity: &Value) -> Option<&str> {
    identity
        .get("player")
        .and_then(|p| p.get("summonerName"))
        .and_then(|x| x.as_str())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample() -> Value {
        json!({
            "gameId": 1,
            "participantIdentities": [
                {"participantId": 1, "player": {"summonerName": "Alpha"}},
                {"participantId": 2, "player": {"summonerName": "Bravo"}},
            ],
            "participants": [
                {"participantId": 1, "stats": {"firstBloodKill": false}},
                {"participantId": 2, "stats": {"firstBloodKill": true}},
            ],
        })
    }

    #[test]
    fn missing_participant_list_is_malformed() {
        let record = json!({
            "participantIdentities": [
                {"participantId": 1, "player": {"summonerName": "Alpha"}},
            ],
        });
        assert_eq!(
            crop_match(&record, &["Alpha".to_string()]),
            Err(CropError::Malformed("missing participants"))
        );
    }

    #[test]
    fn identity_without_participant_entry() {
        let mut record = sample();
        record["participants"] = json!([{"participantId": 1}]);
        assert_eq!(
            crop_match(&record, &["Bravo".to_string()]),
            Err(CropError::ParticipantMissing { participant_id: 2 })
        );
    }

    #[test]
    fn detects_full_matches() {
        assert!(is_full_match(&sample()));
        assert!(!is_full_match(&json!({"participantId": 2})));
        assert_eq!(participant_names(&sample()), vec!["Alpha", "Bravo"]);
    }
}
