use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

use crate::models::{Evaluation, Participant};
use crate::services::store::{EvaluationLedger, ProfileStore, StoreError};

#[derive(Debug, Default)]
struct MemoryState {
    participants: BTreeMap<String, Participant>,
    evaluations: Vec<Evaluation>,
    next_evaluation_id: i64,
}

impl MemoryState {
    fn evaluation(&self, from_id: &str, to_id: &str) -> Option<&Evaluation> {
        self.evaluations
            .iter()
            .find(|e| e.from_id == from_id && e.to_id == to_id)
    }
}

/// In-process store with the same contract as `PostgresClient`
///
/// Enforces the `(from_id, to_id)` uniqueness constraint and the candidate
/// ordering of the SQL query. Used by tests, benches and `database.url = "memory"`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn participant_count(&self) -> usize {
        self.state.lock().await.participants.len()
    }

    pub async fn evaluation_count(&self) -> usize {
        self.state.lock().await.evaluations.len()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn add(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.participants.contains_key(&participant.id) {
            return Err(StoreError::AlreadyExists(format!("participant {}", participant.id)));
        }
        state
            .participants
            .insert(participant.id.clone(), participant.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Participant, StoreError> {
        self.state
            .lock()
            .await
            .participants
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("participant {}", id)))
    }

    async fn update_by_id(&self, participant: &Participant) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        match state.participants.get_mut(&participant.id) {
            Some(existing) => {
                *existing = participant.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("participant {}", participant.id))),
        }
    }

    async fn next_candidate(&self, id: &str, preference_flag: bool) -> Result<Participant, StoreError> {
        let state = self.state.lock().await;

        // true < false < no reverse edge, then by id
        let rank = |candidate: &Participant| match state.evaluation(&candidate.id, id) {
            Some(e) if e.value => 0,
            Some(_) => 1,
            None => 2,
        };

        state
            .participants
            .values()
            .filter(|p| p.id != id)
            .filter(|p| p.preference_flag != preference_flag)
            .filter(|p| state.evaluation(id, &p.id).is_none())
            .min_by(|a, b| rank(a).cmp(&rank(b)).then_with(|| a.id.cmp(&b.id)))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("next candidate for {}", id)))
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let removed = state.participants.len() as u64;
        state.participants.clear();
        Ok(removed)
    }
}

#[async_trait]
impl EvaluationLedger for MemoryStore {
    async fn get(&self, from_id: &str, to_id: &str) -> Result<Evaluation, StoreError> {
        self.state
            .lock()
            .await
            .evaluation(from_id, to_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("evaluation {} -> {}", from_id, to_id)))
    }

    async fn add(&self, evaluation: &Evaluation) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.evaluation(&evaluation.from_id, &evaluation.to_id).is_some() {
            return Err(StoreError::AlreadyExists(format!(
                "evaluation {} -> {}",
                evaluation.from_id, evaluation.to_id
            )));
        }

        state.next_evaluation_id += 1;
        let stored = Evaluation {
            id: state.next_evaluation_id,
            ..evaluation.clone()
        };
        state.evaluations.push(stored);
        Ok(())
    }

    async fn update(&self, evaluation: &Evaluation) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;

        let conflict = state.evaluations.iter().any(|e| {
            e.id != evaluation.id && e.from_id == evaluation.from_id && e.to_id == evaluation.to_id
        });
        if conflict {
            return Err(StoreError::AlreadyExists(format!(
                "evaluation {} -> {}",
                evaluation.from_id, evaluation.to_id
            )));
        }

        match state.evaluations.iter_mut().find(|e| e.id == evaluation.id) {
            Some(existing) => {
                *existing = evaluation.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("evaluation {}", evaluation.id))),
        }
    }

    async fn delete_all(&self) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let removed = state.evaluations.len() as u64;
        state.evaluations.clear();
        Ok(removed)
    }
}
