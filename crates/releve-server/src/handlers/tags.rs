//! Tag and tagging rule handlers

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{AppError, AppState, SuccessResponse};
use releve_core::models::{Tag, TaggingRuleWithTag};
use releve_core::TagRuleMatcher;

/// Request body for creating a tag
#[derive(Debug, Deserialize)]
pub struct CreateTagRequest {
    pub name: String,
    /// `#rrggbb`; grey when omitted
    pub color: Option<String>,
}

/// Request body for creating a rule
#[derive(Debug, Deserialize)]
pub struct CreateRuleRequest {
    pub keyword: String,
    pub tag_id: i64,
    #[serde(default)]
    pub priority: i64,
}

#[derive(Debug, Deserialize)]
pub struct TestRulesRequest {
    pub label: String,
}

#[derive(Serialize)]
pub struct TestRulesResponse {
    pub label: String,
    pub matches: Vec<RuleMatch>,
}

#[derive(Serialize)]
pub struct RuleMatch {
    pub rule_id: i64,
    pub keyword: String,
    pub priority: i64,
    pub tag_id: i64,
    pub tag_name: String,
}

/// GET /api/tags - List all tags
pub async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.db.list_tags()?))
}

/// POST /api/tags - Create a tag
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateTagRequest>,
) -> Result<Json<Tag>, AppError> {
    if let Some(existing) = state.db.get_tag_by_name(&req.name)? {
        return Err(AppError::conflict(&format!(
            "Tag '{}' already exists",
            existing.name
        )));
    }

    let id = state
        .db
        .create_tag(&req.name, req.color.as_deref())
        .map_err(AppError::from_core)?;

    let tag = state
        .db
        .get_tag(id)?
        .ok_or_else(|| AppError::internal("Tag not found after creation"))?;

    Ok(Json(tag))
}

/// DELETE /api/tags/:id - Delete a tag along with its rules
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_tag(id)? {
        return Err(AppError::not_found(&format!("Tag {} not found", id)));
    }

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/rules - List rules in evaluation order
pub async fn list_rules(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TaggingRuleWithTag>>, AppError> {
    Ok(Json(state.db.list_tagging_rules()?))
}

/// POST /api/rules - Create a keyword rule
pub async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRuleRequest>,
) -> Result<Json<TaggingRuleWithTag>, AppError> {
    let id = state
        .db
        .create_tagging_rule(&req.keyword, req.tag_id, req.priority)
        .map_err(AppError::from_core)?;

    let rule = state
        .db
        .list_tagging_rules()?
        .into_iter()
        .find(|r| r.rule.id == id)
        .ok_or_else(|| AppError::internal("Rule not found after creation"))?;

    Ok(Json(rule))
}

/// DELETE /api/rules/:id - Delete a rule
pub async fn delete_rule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    if !state.db.delete_tagging_rule(id)? {
        return Err(AppError::not_found(&format!("Rule {} not found", id)));
    }

    Ok(Json(SuccessResponse { success: true }))
}

/// POST /api/rules/test - Show which rules would tag a label
pub async fn test_rules(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TestRulesRequest>,
) -> Result<Json<TestRulesResponse>, AppError> {
    let matcher = TagRuleMatcher::from_db(&state.db)?;
    let tag_names: HashMap<i64, String> = state
        .db
        .list_tags()?
        .into_iter()
        .map(|t| (t.id, t.name))
        .collect();

    let matches = matcher
        .matching_rules(&req.label)
        .into_iter()
        .map(|rule| RuleMatch {
            rule_id: rule.id,
            keyword: rule.keyword.clone(),
            priority: rule.priority,
            tag_id: rule.tag_id,
            tag_name: tag_names.get(&rule.tag_id).cloned().unwrap_or_default(),
        })
        .collect();

    Ok(Json(TestRulesResponse {
        label: req.label,
        matches,
    }))
}
