use chrono::Utc;
use fleetdeck_core::{
    GenerationListResponse, GenerationParams, GenerationRun, GenerationStatus,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use super::seed::{alphanumeric, random_agent};
use super::{body, message, respond, MockState};
use crate::transport::{ApiRequest, ApiResponse};

const MAX_QUANTITY: u32 = 500;

pub fn list(state: &MockState) -> ApiResponse {
    let mut data = state.runs.clone();
    data.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    respond(
        200,
        &GenerationListResponse {
            total: data.len() as u32,
            data,
        },
    )
}

pub fn get(state: &MockState, id: &str) -> ApiResponse {
    match state.runs.iter().find(|r| r.id == id) {
        Some(run) => respond(200, run),
        None => message(404, "Not found"),
    }
}

/// Insert `quantity` agents for one run.
///
/// Agent content comes from an RNG seeded with `params.seed` when given, so
/// the same seed and params always produce the same names, tags and metrics.
/// Ids continue from the highest id handed out so far.
pub fn run(state: &mut MockState, request: &ApiRequest) -> ApiResponse {
    let params: GenerationParams = match body(request) {
        Ok(params) => params,
        Err(response) => return response,
    };
    if !(1..=MAX_QUANTITY).contains(&params.quantity) {
        return message(400, "Quantity must be between 1 and 500");
    }

    let now = Utc::now();
    let run_id = format!("run-{}", alphanumeric(&mut state.rng, 6).to_lowercase());
    let content_seed = match params.seed {
        Some(seed) => u64::from(seed),
        None => state.rng.random(),
    };
    let mut content_rng = StdRng::seed_from_u64(content_seed);

    let mut agent_ids = Vec::with_capacity(params.quantity as usize);
    for _ in 0..params.quantity {
        let id = format!("agent-{}", state.next_agent);
        state.next_agent += 1;
        let mut agent = random_agent(&mut content_rng, id, now);
        agent.category = params.category.clone();
        agent.template = params.template.clone();
        agent.generation_run_id = run_id.clone();
        agent.created_at = now;
        agent.updated_at = now;
        agent_ids.push(agent.id.clone());
        state.agents.push(agent);
    }

    let run = GenerationRun {
        id: run_id,
        created_at: now,
        generated_count: params.quantity,
        params,
        status: GenerationStatus::Success,
        agent_ids,
    };
    info!(run = %run.id, count = run.generated_count, "generation run completed");
    state.runs.push(run.clone());
    respond(201, &run)
}
