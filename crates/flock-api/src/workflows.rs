//! Communication workflows held in memory. Running one renders every step
//! without delivering anything.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use flock_types::api::{
    Claims, CreateWorkflowRequest, RenderRequest, RenderedStep, Workflow, WorkflowRun,
};

use crate::error::{ApiError, ApiJson, ApiResult};
use crate::middleware::require_staff;
use crate::state::AppState;
use crate::template::{self, merge_missing};

pub const MAX_WORKFLOWS: usize = 200;

pub async fn list_workflows(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<Vec<Workflow>>> {
    require_staff(&claims)?;
    Ok(Json(state.workflows.read().await.clone()))
}

pub async fn create_workflow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateWorkflowRequest>,
) -> ApiResult<impl IntoResponse> {
    require_staff(&claims)?;
    let name = req.name.trim().to_string();
    let trigger = req.trigger.trim().to_string();
    if name.is_empty() || trigger.is_empty() {
        return Err(ApiError::bad_request("name and trigger are required"));
    }
    if req.steps.is_empty() {
        return Err(ApiError::bad_request("a workflow needs at least one step"));
    }
    if req.steps.iter().any(|s| s.template.trim().is_empty()) {
        return Err(ApiError::bad_request("every step needs a template"));
    }

    let workflow = Workflow {
        id: Uuid::new_v4(),
        name,
        trigger,
        steps: req.steps,
        created_by: claims.sub,
        created_at: Utc::now(),
    };

    {
        let mut workflows = state.workflows.write().await;
        if workflows.len() >= MAX_WORKFLOWS {
            return Err(ApiError::bad_request("workflow limit reached; delete one first"));
        }
        workflows.push(workflow.clone());
    }

    info!("{} created workflow {} ({})", claims.sub, workflow.id, workflow.name);
    Ok((StatusCode::CREATED, Json(workflow)))
}

pub async fn delete_workflow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(workflow_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    require_staff(&claims)?;
    let mut workflows = state.workflows.write().await;
    let before = workflows.len();
    workflows.retain(|w| w.id != workflow_id);
    if workflows.len() == before {
        return Err(ApiError::NotFound("workflow"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn run_workflow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(workflow_id): Path<Uuid>,
    ApiJson(req): ApiJson<RenderRequest>,
) -> ApiResult<Json<WorkflowRun>> {
    require_staff(&claims)?;
    let workflow = state
        .workflows
        .read()
        .await
        .iter()
        .find(|w| w.id == workflow_id)
        .cloned()
        .ok_or(ApiError::NotFound("workflow"))?;

    Ok(Json(render_workflow(&workflow, &req)))
}

fn render_workflow(workflow: &Workflow, req: &RenderRequest) -> WorkflowRun {
    let mut missing_variables = Vec::new();
    let steps = workflow
        .steps
        .iter()
        .map(|step| {
            let subject = step.subject.as_deref().map(|s| {
                let rendered = template::render(s, &req.variables);
                merge_missing(&mut missing_variables, rendered.missing);
                rendered.text
            });
            let body = template::render(&step.template, &req.variables);
            merge_missing(&mut missing_variables, body.missing);
            RenderedStep {
                action: step.action,
                subject,
                body: body.text,
            }
        })
        .collect();

    WorkflowRun {
        workflow_id: workflow.id,
        steps,
        missing_variables,
    }
}
