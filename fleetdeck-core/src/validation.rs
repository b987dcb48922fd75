//! Local, pre-flight validation of user forms.
//!
//! Every check here runs before a collaborator is called. A form that fails
//! validation never produces a request and never touches the cache.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::entities::{AgentPatch, AgentStatus, CreateCategoryInput, GenerationParams};
use crate::error::ValidationErrors;

static EMAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

/// Seeds are four-digit numbers.
pub const SEED_RANGE: std::ops::RangeInclusive<u32> = 1000..=9999;
pub const MAX_GENERATION_QUANTITY: u32 = 500;

/// Editable fields of an agent, as entered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AgentEditForm {
    pub name: String,
    pub description: String,
    pub status: String,
    pub category: String,
    /// Comma separated.
    pub tags: String,
}

impl AgentEditForm {
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Validate an agent edit and turn it into a patch carrying every field.
pub fn validate_agent_edit(form: &AgentEditForm) -> Result<AgentPatch, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = form.name.trim();
    let description = form.description.trim();

    check_length(&mut errors, "name", "Name", name, 2, 60);
    check_length(&mut errors, "description", "Description", description, 5, 300);

    let status = match form.status.parse::<AgentStatus>() {
        Ok(status) => Some(status),
        Err(_) => {
            errors.push("status", "Status must be one of active, inactive, training, deprecated");
            None
        }
    };
    if form.category.trim().is_empty() {
        errors.push("category", "Category is required");
    }
    let tags = form.tag_list();
    if tags.is_empty() {
        errors.push("tags", "At least one tag is required");
    }

    errors.into_result()?;
    Ok(AgentPatch {
        name: Some(name.to_string()),
        description: Some(description.to_string()),
        status,
        tags: Some(tags),
        category: Some(form.category.trim().to_string()),
    })
}

pub fn validate_category(
    name: &str,
    description: &str,
) -> Result<CreateCategoryInput, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let name = name.trim();
    let description = description.trim();
    check_length(&mut errors, "name", "Name", name, 2, 50);
    check_length(&mut errors, "description", "Description", description, 5, 200);
    errors.into_result()?;
    Ok(CreateCategoryInput {
        name: name.to_string(),
        description: description.to_string(),
    })
}

/// Generator form as entered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorForm {
    pub quantity: String,
    pub category: String,
    pub template: String,
    pub use_seed: bool,
    pub seed: String,
}

impl Default for GeneratorForm {
    fn default() -> Self {
        Self {
            quantity: "10".to_string(),
            category: String::new(),
            template: String::new(),
            use_seed: false,
            seed: String::new(),
        }
    }
}

pub fn validate_generation(form: &GeneratorForm) -> Result<GenerationParams, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let quantity = match form.quantity.trim().parse::<u32>() {
        Ok(q) if (1..=MAX_GENERATION_QUANTITY).contains(&q) => q,
        Ok(_) | Err(_) => {
            errors.push(
                "quantity",
                format!("Quantity must be between 1 and {}", MAX_GENERATION_QUANTITY),
            );
            0
        }
    };
    if form.category.trim().is_empty() {
        errors.push("category", "Category is required");
    }
    if form.template.trim().is_empty() {
        errors.push("template", "Template is required");
    }

    let seed = if form.use_seed {
        match form.seed.trim().parse::<u32>() {
            Ok(s) if SEED_RANGE.contains(&s) => Some(s),
            _ => {
                errors.push("seed", "Seed must be a number between 1000 and 9999");
                None
            }
        }
    } else {
        None
    };

    errors.into_result()?;
    Ok(GenerationParams {
        quantity,
        category: form.category.trim().to_string(),
        template: form.template.trim().to_string(),
        seed,
    })
}

pub fn validate_login(email: &str, password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if !EMAIL.is_match(email.trim()) {
        errors.push("email", "Invalid email address");
    }
    if password.chars().count() < 6 {
        errors.push("password", "Password must be at least 6 characters");
    }
    errors.into_result()
}

fn check_length(
    errors: &mut ValidationErrors,
    field: &'static str,
    label: &str,
    value: &str,
    min: usize,
    max: usize,
) {
    let len = value.chars().count();
    if len < min {
        errors.push(field, format!("{} must be at least {} characters", label, min));
    } else if len > max {
        errors.push(field, format!("{} must be at most {} characters", label, max));
    }
}
