//! Deterministic seed data for the mocked backend.

use chrono::{DateTime, Duration, Utc};
use fleetdeck_core::{
    Agent, AgentMetrics, AgentStatus, Category, GenerationParams, GenerationRun, GenerationStatus,
    Template,
};
use rand::distr::Alphanumeric;
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde_json::json;

pub const SEED_AGENT_COUNT: u32 = 500;
pub const SEED_RUN_COUNT: usize = 12;

pub const AGENT_CATEGORIES: &[&str] = &[
    "home",
    "education",
    "productivity",
    "finance",
    "health",
    "entertainment",
];
pub const TEMPLATE_SLUGS: &[&str] = &["default", "advanced", "minimal"];
const TAGS: &[&str] = &[
    "nlp",
    "vision",
    "reasoning",
    "planning",
    "memory",
    "tool-use",
    "multimodal",
];
const FIRST_NAMES: &[&str] = &[
    "Ada", "Alan", "Grace", "Linus", "Margaret", "Dennis", "Barbara", "Ken", "Frances", "Edsger",
    "Radia", "Donald", "Hedy", "John", "Karen", "Niklaus", "Sophie", "Tim", "Ivan", "Leslie",
];
const DESCRIPTIONS: &[&str] = &[
    "Summarises inbound support tickets and drafts replies.",
    "Tracks household energy usage and suggests savings.",
    "Builds weekly study plans from course syllabi.",
    "Reconciles ledgers and flags unusual transactions.",
    "Monitors sleep data and recommends routines.",
    "Curates playlists from listening history.",
    "Plans multi-step errands around calendar gaps.",
    "Extracts action items from meeting transcripts.",
    "Answers product questions from the documentation set.",
    "Reviews pull requests for common style issues.",
];

/// Fixed reference time all seed timestamps are derived from (2025-06-01).
pub fn seed_epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_748_736_000, 0).unwrap_or_default()
}

pub fn alphanumeric(rng: &mut StdRng, len: usize) -> String {
    (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

/// One random agent. Timestamps fall in the year before `anchor`.
pub fn random_agent(rng: &mut StdRng, id: String, anchor: DateTime<Utc>) -> Agent {
    let name = format!(
        "{}-{}",
        pick(rng, FIRST_NAMES),
        alphanumeric(rng, 4).to_uppercase()
    );
    let category = pick(rng, AGENT_CATEGORIES).to_string();
    let status = AgentStatus::all()
        .choose(rng)
        .copied()
        .unwrap_or(AgentStatus::Active);
    let tag_count = rng.random_range(1..=3);
    let tags = TAGS
        .choose_multiple(rng, tag_count)
        .map(|t| t.to_string())
        .collect();
    let template = pick(rng, TEMPLATE_SLUGS).to_string();
    let description = pick(rng, DESCRIPTIONS).to_string();
    let created_at = anchor - Duration::seconds(rng.random_range(0..365 * 86_400));
    let updated_at = anchor - Duration::seconds(rng.random_range(0..30 * 86_400));
    let generation_run_id = format!("run-{}", alphanumeric(rng, 6).to_lowercase());
    let metrics = AgentMetrics {
        tasks_completed: rng.random_range(0..=5000),
        success_rate: f64::from(rng.random_range(60u32..=100)) / 100.0,
    };

    Agent {
        id,
        name,
        category,
        status,
        tags,
        template,
        description,
        created_at,
        updated_at: updated_at.max(created_at),
        generation_run_id,
        metrics,
    }
}

pub fn agents(rng: &mut StdRng) -> Vec<Agent> {
    let anchor = seed_epoch();
    (1..=SEED_AGENT_COUNT)
        .map(|n| random_agent(rng, format!("agent-{}", n), anchor))
        .collect()
}

pub fn categories() -> Vec<Category> {
    let rows = [
        ("Home", "Household automation agents"),
        ("Education", "Learning and tutoring agents"),
        ("Productivity", "Task and time management agents"),
        ("Finance", "Financial analysis and budgeting agents"),
        ("Health", "Wellness and medical agents"),
    ];
    let anchor = seed_epoch();
    rows.iter()
        .enumerate()
        .map(|(i, (name, description))| Category {
            id: format!("cat-{}", i + 1),
            name: name.to_string(),
            slug: fleetdeck_core::slugify(name),
            description: description.to_string(),
            created_at: anchor - Duration::days(90 - 10 * i as i64),
        })
        .collect()
}

pub fn templates() -> Vec<Template> {
    let anchor = seed_epoch();
    vec![
        Template {
            id: "tpl-1".into(),
            name: "Default".into(),
            config: json!({ "maxTasks": 100, "memory": "512mb" }),
            created_at: anchor - Duration::days(120),
        },
        Template {
            id: "tpl-2".into(),
            name: "Advanced".into(),
            config: json!({ "maxTasks": 1000, "memory": "2gb" }),
            created_at: anchor - Duration::days(110),
        },
        Template {
            id: "tpl-3".into(),
            name: "Minimal".into(),
            config: json!({ "maxTasks": 10, "memory": "128mb" }),
            created_at: anchor - Duration::days(100),
        },
    ]
}

pub fn generation_runs(rng: &mut StdRng) -> Vec<GenerationRun> {
    let anchor = seed_epoch();
    (0..SEED_RUN_COUNT)
        .map(|_| {
            let id = format!("run-{}", alphanumeric(rng, 6).to_lowercase());
            let created_at = anchor - Duration::seconds(rng.random_range(0..182 * 86_400));
            let params = GenerationParams {
                quantity: rng.random_range(5..=100),
                category: pick(rng, &AGENT_CATEGORIES[..4]).to_string(),
                template: pick(rng, TEMPLATE_SLUGS).to_string(),
                seed: Some(rng.random_range(1000..=9999)),
            };
            // Three in four historical runs succeeded.
            let status = if rng.random_range(0..4) == 0 {
                GenerationStatus::Failed
            } else {
                GenerationStatus::Success
            };
            let generated_count = rng.random_range(5..=100);
            let agent_ids = (1..=rng.random_range(3..=10))
                .map(|j| format!("agent-{}", j))
                .collect();
            GenerationRun {
                id,
                created_at,
                params,
                status,
                generated_count,
                agent_ids,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_same_seed_same_agents() {
        let a = agents(&mut StdRng::seed_from_u64(42));
        let b = agents(&mut StdRng::seed_from_u64(42));
        assert_eq!(a.len(), SEED_AGENT_COUNT as usize);
        assert_eq!(a, b);
        assert_eq!(a[6].id, "agent-7");
    }

    #[test]
    fn test_agent_fields_are_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        for agent in agents(&mut rng) {
            assert!((1..=3).contains(&agent.tags.len()));
            assert!(AGENT_CATEGORIES.contains(&agent.category.as_str()));
            assert!((0.6..=1.0).contains(&agent.metrics.success_rate));
            assert!(agent.updated_at >= agent.created_at);
        }
    }

    #[test]
    fn test_fixed_catalogue() {
        let categories = categories();
        assert_eq!(categories.len(), 5);
        assert_eq!(categories[3].slug, "finance");
        assert_eq!(templates().len(), 3);
    }
}
