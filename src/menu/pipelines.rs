use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::filter::{self, current_step};
use super::{header, Menu, MenuItem, RenderContext, StateColor, REPO_COLOR};
use crate::bitbucket::{ApiError, Bitbucket, Pipeline, Step};

/// A pipeline with its steps and, while a step is running, that step's log.
#[derive(Debug, Clone)]
pub struct PipelineStatus {
    pub pipeline: Pipeline,
    pub steps: Vec<Step>,
    pub log: Option<String>,
}

impl PipelineStatus {
    pub fn current_step(&self) -> Option<&Step> {
        current_step(&self.steps)
    }

    /// State shown on the pipeline line.
    pub fn state(&self) -> &str {
        self.current_step()
            .map(Step::state_name)
            .or_else(|| self.pipeline.state.as_ref().map(|s| s.name.as_str()))
            .unwrap_or("PENDING")
    }
}

#[derive(Debug)]
pub struct RepoPipelines {
    pub repo: String,
    pub pipelines: Result<Vec<PipelineStatus>, ApiError>,
}

/// Poll every recently updated repository for its recent pipelines.
///
/// A failing repository is kept with its error so the rest still renders.
pub async fn collect(api: &dyn Bitbucket, now: DateTime<Utc>) -> Result<Vec<RepoPipelines>, ApiError> {
    let repos = api.recent_repositories(filter::repository_cutoff(now)).await?;
    let repos = filter::recent_repositories(repos, now);
    info!(repos = repos.len(), "recent repositories");

    let mut out = Vec::with_capacity(repos.len());
    for repo in repos {
        let pipelines = collect_repo(api, repo.path_name(), now).await;
        if let Err(err) = &pipelines {
            warn!(repo = %repo.name, %err, "skipping repository");
        }
        out.push(RepoPipelines {
            repo: repo.path_name().to_string(),
            pipelines,
        });
    }
    Ok(out)
}

async fn collect_repo(
    api: &dyn Bitbucket,
    repo: &str,
    now: DateTime<Utc>,
) -> Result<Vec<PipelineStatus>, ApiError> {
    let pipelines = api.recent_pipelines(repo, filter::pipeline_cutoff(now)).await?;
    let pipelines = filter::recent_pipelines(pipelines, now);
    debug!(repo, pipelines = pipelines.len(), "recent pipelines");

    let mut statuses = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines {
        let steps = api.pipeline_steps(repo, &pipeline.uuid).await?;
        let running = steps.iter().find(|s| s.is_in_progress()).map(|s| s.uuid.clone());
        let log = match running {
            Some(step_uuid) => match api.step_log(repo, &pipeline.uuid, &step_uuid).await {
                Ok(log) => log,
                Err(err) => {
                    debug!(repo, build = pipeline.build_number, %err, "no step log");
                    None
                }
            },
            None => None,
        };
        statuses.push(PipelineStatus {
            pipeline,
            steps,
            log,
        });
    }
    Ok(statuses)
}

pub fn title() -> MenuItem {
    MenuItem::new("Pipeline")
}

pub fn render(ctx: &RenderContext, repos: &[RepoPipelines]) -> Menu {
    let mut menu = Menu::new();
    header(&mut menu, title());

    for repo in repos {
        menu.separator();
        menu.push(
            MenuItem::new(&repo.repo)
                .href(ctx.repo_url(&repo.repo))
                .color(REPO_COLOR)
                .size(12),
        );
        match &repo.pipelines {
            Ok(pipelines) => {
                for status in pipelines {
                    render_pipeline(&mut menu, ctx, &repo.repo, status);
                }
            }
            Err(err) => render_failure(&mut menu, err),
        }
    }
    menu
}

/// A menu that only says the workspace could not be read.
pub fn render_unavailable(err: &ApiError) -> Menu {
    let mut menu = Menu::new();
    header(&mut menu, title());
    menu.separator();
    render_failure(&mut menu, err);
    menu
}

fn render_failure(menu: &mut Menu, err: &ApiError) {
    menu.push(MenuItem::nested(1, format!("failed to load: {err}")).color(StateColor::Failed.hex()));
}

fn render_pipeline(menu: &mut Menu, ctx: &RenderContext, repo: &str, status: &PipelineStatus) {
    let pipeline = &status.pipeline;
    let url = format!(
        "{}/addon/pipelines/home#!/results/{}",
        ctx.repo_url(repo),
        pipeline.build_number
    );
    let target = pipeline.target.as_ref().map_or("-", |t| t.label());
    let state = status.state();

    menu.push(
        MenuItem::new(format!(
            "#{}[{}]:({}s)-{}",
            pipeline.build_number,
            target,
            pipeline.build_seconds_used.unwrap_or(0),
            state
        ))
        .href(&url)
        .color(StateColor::for_state(state).hex()),
    );
    menu.push(MenuItem::nested(
        1,
        format!("created_on:{}", ctx.timestamp(pipeline.created_on)),
    ));

    for step in &status.steps {
        menu.push(
            MenuItem::nested(
                1,
                format!(
                    "({}-{}s)-{}",
                    step.state_name(),
                    step.duration_in_seconds.unwrap_or(0),
                    step.name.as_deref().unwrap_or("-")
                ),
            )
            .color(StateColor::for_state(step.state_name()).hex())
            .href(&url),
        );
        if step.is_in_progress() {
            if let Some(log) = &status.log {
                for line in log.lines() {
                    menu.push(MenuItem::nested(2, line));
                }
            }
        }
    }
}
