use chrono::Utc;
use fleetdeck_core::{
    slugify, Category, CategoryListResponse, CreateCategoryInput, SuccessResponse,
    TemplateListResponse, UpdateCategoryInput,
};

use super::{body, message, respond, MockState};
use crate::transport::{ApiRequest, ApiResponse};

pub fn list(state: &MockState, request: &ApiRequest) -> ApiResponse {
    let search = request
        .param("search")
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase);
    let data: Vec<Category> = state
        .categories
        .iter()
        .filter(|c| {
            search
                .as_deref()
                .map_or(true, |needle| c.name.to_lowercase().contains(needle))
        })
        .cloned()
        .collect();
    respond(
        200,
        &CategoryListResponse {
            total: data.len() as u32,
            data,
        },
    )
}

pub fn create(state: &mut MockState, request: &ApiRequest) -> ApiResponse {
    let input: CreateCategoryInput = match body(request) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let category = Category {
        id: format!("cat-{}", state.next_category),
        slug: slugify(&input.name),
        name: input.name,
        description: input.description,
        created_at: Utc::now(),
    };
    state.next_category += 1;
    state.categories.push(category.clone());
    respond(201, &category)
}

/// Merge the given fields. The slug keeps the value it was created with.
pub fn update(state: &mut MockState, id: &str, request: &ApiRequest) -> ApiResponse {
    let input: UpdateCategoryInput = match body(request) {
        Ok(input) => input,
        Err(response) => return response,
    };
    let Some(category) = state.categories.iter_mut().find(|c| c.id == id) else {
        return message(404, "Not found");
    };
    if let Some(name) = input.name {
        category.name = name;
    }
    if let Some(description) = input.description {
        category.description = description;
    }
    respond(200, category)
}

/// Deleting an unknown id still succeeds.
pub fn delete(state: &mut MockState, id: &str) -> ApiResponse {
    state.categories.retain(|c| c.id != id);
    respond(200, &SuccessResponse { success: true })
}

pub fn templates(state: &MockState) -> ApiResponse {
    respond(
        200,
        &TemplateListResponse {
            data: state.templates.clone(),
            total: state.templates.len() as u32,
        },
    )
}
