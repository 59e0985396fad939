use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use uuid::Uuid;

use crate::assemble::{self, AssemblyLayout, AssemblyReport};
use crate::config::ShowcaseConfig;
use crate::error::Result;
use crate::toolchain::{StepEffect, Toolchain};
use crate::workspace::{CleanupOutcome, TransientDir, WorkingTree};

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// Build from checkouts that already exist under `projects_root`.
    Local,
    /// Clone or hard-reset both projects into the transient work dir first.
    Sync,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Syncing,
    Installing,
    Building,
    Assembling,
    CleaningUp,
    Succeeded,
    Failed,
}

impl PipelineStage {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineStage::Syncing => "syncing",
            PipelineStage::Installing => "installing",
            PipelineStage::Building => "building",
            PipelineStage::Assembling => "assembling",
            PipelineStage::CleaningUp => "cleaning up",
            PipelineStage::Succeeded => "succeeded",
            PipelineStage::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    Success,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStepResult {
    pub stage: PipelineStage,
    pub status: PipelineRunStatus,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineRunResult {
    pub run_id: Uuid,
    pub mode: PipelineMode,
    pub status: PipelineStage,
    pub steps: Vec<PipelineStepResult>,
    pub output_path: String,
    pub started_at: String,
    pub finished_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assembly: Option<AssemblyReport>,
    pub cleanup: CleanupOutcome,
}

/// Everything a run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct PipelinePlan {
    pub mode: PipelineMode,
    pub site: WorkingTree,
    pub game: WorkingTree,
    /// Present only in sync mode.
    pub transient_dir: Option<PathBuf>,
    pub layout: AssemblyLayout,
}

/// Resolve trees and paths for `mode`.
///
/// `token` is embedded into the remote URLs during sync; callers decide
/// whether it is mandatory.
pub fn plan(config: &ShowcaseConfig, mode: PipelineMode, token: Option<String>) -> PipelinePlan {
    let (site_path, game_path, transient_dir) = match mode {
        PipelineMode::Local => (
            config.local_tree_path(&config.site),
            config.local_tree_path(&config.game),
            None,
        ),
        PipelineMode::Sync => (
            config.synced_tree_path(&config.site),
            config.synced_tree_path(&config.game),
            Some(config.work_dir()),
        ),
    };

    let site = WorkingTree::from_project(&config.site, site_path, token.clone());
    let game = WorkingTree::from_project(&config.game, game_path, token);

    let layout = AssemblyLayout {
        site_root: site.path.clone(),
        game_build: game.build_output_dir(),
        output: config.output_dir(),
        nested_path: config.game_subpath(),
        exclude: config.copy_exclude.clone(),
    };

    PipelinePlan {
        mode,
        site,
        game,
        transient_dir,
        layout,
    }
}

/// Run the whole pipeline: sync (sync mode only), install, build, assemble, clean up.
///
/// Fail-fast: the first failing step aborts the rest and its error is
/// returned. The transient directory is released on every path, including
/// failures, because it is held by a drop guard for the whole run.
pub fn run(plan: &PipelinePlan, toolchain: &dyn Toolchain) -> Result<PipelineRunResult> {
    let run_id = Uuid::new_v4();
    let started_at = now();
    crate::log_status!("pipeline", "Starting {:?} build {}", plan.mode, run_id);

    let guard = match &plan.transient_dir {
        Some(dir) => TransientDir::acquire(dir.clone()),
        None => TransientDir::none(),
    };

    let mut steps = Vec::new();
    let outcome = run_steps(plan, toolchain, &mut steps);

    let cleanup_started = Instant::now();
    let cleanup = guard.release();
    steps.push(PipelineStepResult {
        stage: PipelineStage::CleaningUp,
        status: cleanup_status(&cleanup),
        duration_ms: elapsed_ms(cleanup_started),
        detail: serde_json::to_value(&cleanup).ok(),
    });

    match outcome {
        Ok(assembly) => {
            crate::log_status!("pipeline", "Build {} succeeded", run_id);
            Ok(PipelineRunResult {
                run_id,
                mode: plan.mode,
                status: PipelineStage::Succeeded,
                steps,
                output_path: plan.layout.output.display().to_string(),
                started_at,
                finished_at: now(),
                assembly: Some(assembly),
                cleanup,
            })
        }
        Err((stage, err)) => {
            crate::log_status!(
                "pipeline",
                "Build {} {} while {}: {}",
                run_id,
                PipelineStage::Failed.label(),
                stage.label(),
                err.message
            );
            Err(err)
        }
    }
}

/// A failed removal is reported on the step but never fails the run.
fn cleanup_status(cleanup: &CleanupOutcome) -> PipelineRunStatus {
    match cleanup {
        CleanupOutcome::Removed | CleanupOutcome::AlreadyAbsent => PipelineRunStatus::Success,
        CleanupOutcome::Failed(_) => PipelineRunStatus::Failed,
        CleanupOutcome::NotApplicable => PipelineRunStatus::Skipped,
    }
}

type StepFailure = (PipelineStage, crate::error::Error);

fn run_steps(
    plan: &PipelinePlan,
    toolchain: &dyn Toolchain,
    steps: &mut Vec<PipelineStepResult>,
) -> std::result::Result<AssemblyReport, StepFailure> {
    if plan.mode == PipelineMode::Sync {
        stage(steps, PipelineStage::Syncing, || {
            toolchain.sync(&plan.site)?;
            toolchain.sync(&plan.game)?;
            Ok((StepEffect::Ran, None))
        })?;
    }

    stage(steps, PipelineStage::Installing, || {
        toolchain.install(&plan.game).map(|effect| (effect, None))
    })?;

    stage(steps, PipelineStage::Building, || {
        toolchain.build(&plan.game)?;
        Ok((StepEffect::Ran, None))
    })?;

    let mut report = None;
    stage(steps, PipelineStage::Assembling, || {
        let r = assemble::assemble(&plan.layout)?;
        let detail = serde_json::to_value(&r).ok();
        report = Some(r);
        Ok((StepEffect::Ran, detail))
    })?;

    report.ok_or_else(|| {
        (
            PipelineStage::Assembling,
            crate::error::Error::internal_unexpected("assembly produced no report"),
        )
    })
}

fn stage<F>(
    steps: &mut Vec<PipelineStepResult>,
    stage: PipelineStage,
    f: F,
) -> std::result::Result<(), StepFailure>
where
    F: FnOnce() -> Result<(StepEffect, Option<serde_json::Value>)>,
{
    crate::log_status!("pipeline", "Stage: {}", stage.label());
    let started = Instant::now();

    match f() {
        Ok((effect, detail)) => {
            steps.push(PipelineStepResult {
                stage,
                status: match effect {
                    StepEffect::Ran => PipelineRunStatus::Success,
                    StepEffect::Skipped => PipelineRunStatus::Skipped,
                },
                duration_ms: elapsed_ms(started),
                detail,
            });
            Ok(())
        }
        Err(err) => {
            steps.push(PipelineStepResult {
                stage,
                status: PipelineRunStatus::Failed,
                duration_ms: elapsed_ms(started),
                detail: Some(serde_json::json!({
                    "code": err.code.as_str(),
                    "message": err.message,
                })),
            });
            Err((stage, err))
        }
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::error::{Error, StepFailedDetails};
    use std::fs;
    use std::sync::Mutex;
    use tempfile::{tempdir, TempDir};

    /// Records calls and materialises trees on disk instead of running tools.
    #[derive(Default)]
    struct FakeToolchain {
        calls: Mutex<Vec<String>>,
        fail_build: bool,
    }

    impl FakeToolchain {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Toolchain for FakeToolchain {
        fn sync(&self, tree: &WorkingTree) -> Result<()> {
            self.calls.lock().unwrap().push(format!("sync:{}", tree.name));
            fs::create_dir_all(&tree.path).unwrap();
            fs::write(tree.path.join("index.html"), &tree.name).unwrap();
            Ok(())
        }

        fn install(&self, tree: &WorkingTree) -> Result<StepEffect> {
            self.calls.lock().unwrap().push(format!("install:{}", tree.name));
            Ok(StepEffect::Ran)
        }

        fn build(&self, tree: &WorkingTree) -> Result<()> {
            self.calls.lock().unwrap().push(format!("build:{}", tree.name));
            if self.fail_build {
                return Err(Error::build_failed(StepFailedDetails {
                    project: tree.name.clone(),
                    command: tree.build_command.clone(),
                    exit_code: Some(1),
                    working_dir: tree.display_path(),
                    error: "exit code 1".to_string(),
                }));
            }
            let out = tree.build_output_dir();
            fs::create_dir_all(&out).unwrap();
            fs::write(out.join("bundle.js"), "game()").unwrap();
            Ok(())
        }
    }

    fn config_in(temp: &TempDir) -> ShowcaseConfig {
        let mut config = config::builtin();
        config.projects_root = temp.path().join("projects").display().to_string();
        config.work_dir = temp.path().join("work").display().to_string();
        config.output_path = temp.path().join("dist").display().to_string();
        config
    }

    #[test]
    fn sync_mode_runs_every_stage_in_order_and_cleans_up() {
        let temp = tempdir().unwrap();
        let config = config_in(&temp);
        let toolchain = FakeToolchain::default();

        let plan = plan(&config, PipelineMode::Sync, Some("tok".to_string()));
        let result = run(&plan, &toolchain).unwrap();

        assert_eq!(
            toolchain.calls(),
            vec![
                "sync:ResumeWebsite",
                "sync:TetrisGame",
                "install:TetrisGame",
                "build:TetrisGame",
            ]
        );
        let stages: Vec<_> = result.steps.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                PipelineStage::Syncing,
                PipelineStage::Installing,
                PipelineStage::Building,
                PipelineStage::Assembling,
                PipelineStage::CleaningUp,
            ]
        );
        assert_eq!(result.status, PipelineStage::Succeeded);
        assert_eq!(result.cleanup, CleanupOutcome::Removed);
        assert!(!temp.path().join("work").exists());
        assert!(temp.path().join("dist/game/TetrisGame/bundle.js").exists());
        assert_eq!(
            fs::read_to_string(temp.path().join("dist/index.html")).unwrap(),
            "ResumeWebsite"
        );
    }

    #[test]
    fn build_failure_still_removes_transient_dir() {
        let temp = tempdir().unwrap();
        let config = config_in(&temp);
        let toolchain = FakeToolchain {
            fail_build: true,
            ..Default::default()
        };

        let plan = plan(&config, PipelineMode::Sync, None);
        let err = run(&plan, &toolchain).unwrap_err();

        assert_eq!(err.code.as_str(), "pipeline.build_failed");
        assert!(!temp.path().join("work").exists());
        assert!(!temp.path().join("dist").exists());
    }

    #[test]
    fn failed_cleanup_is_reported_on_the_cleanup_step() {
        let temp = tempdir().unwrap();
        let config = config_in(&temp);
        let toolchain = FakeToolchain::default();

        // A regular file where the transient directory should be cannot be removed as a directory.
        let stray = temp.path().join("stray");
        fs::write(&stray, "not a directory").unwrap();
        let mut plan = plan(&config, PipelineMode::Sync, None);
        plan.transient_dir = Some(stray.clone());

        let result = run(&plan, &toolchain).unwrap();
        let cleanup_step = result.steps.last().unwrap();
        assert_eq!(cleanup_step.stage, PipelineStage::CleaningUp);
        assert_eq!(cleanup_step.status, PipelineRunStatus::Failed);
        assert!(matches!(result.cleanup, CleanupOutcome::Failed(_)));
        assert_eq!(result.status, PipelineStage::Succeeded);
        assert!(stray.exists());
    }

    #[test]
    fn cleanup_status_follows_outcome() {
        assert_eq!(cleanup_status(&CleanupOutcome::Removed), PipelineRunStatus::Success);
        assert_eq!(
            cleanup_status(&CleanupOutcome::AlreadyAbsent),
            PipelineRunStatus::Success
        );
        assert_eq!(
            cleanup_status(&CleanupOutcome::Failed("busy".to_string())),
            PipelineRunStatus::Failed
        );
        assert_eq!(
            cleanup_status(&CleanupOutcome::NotApplicable),
            PipelineRunStatus::Skipped
        );
    }

    #[test]
    fn local_mode_skips_sync_and_owns_no_transient_dir() {
        let temp = tempdir().unwrap();
        let config = config_in(&temp);
        let site = temp.path().join("projects/ResumeWebsite");
        fs::create_dir_all(&site).unwrap();
        fs::write(site.join("index.html"), "local").unwrap();

        let toolchain = FakeToolchain::default();
        let plan = plan(&config, PipelineMode::Local, None);
        assert!(plan.transient_dir.is_none());

        let result = run(&plan, &toolchain).unwrap();
        assert_eq!(toolchain.calls(), vec!["install:TetrisGame", "build:TetrisGame"]);
        assert_eq!(result.cleanup, CleanupOutcome::NotApplicable);
        assert!(site.join("index.html").exists());
        assert!(temp.path().join("dist/game/TetrisGame/bundle.js").exists());
    }

    #[test]
    fn missing_local_site_is_copy_error_after_build() {
        let temp = tempdir().unwrap();
        let config = config_in(&temp);
        let toolchain = FakeToolchain::default();

        let plan = plan(&config, PipelineMode::Local, None);
        let err = run(&plan, &toolchain).unwrap_err();
        assert_eq!(err.code.as_str(), "pipeline.copy_failed");
        assert_eq!(toolchain.calls().len(), 2);
    }

    #[test]
    fn plan_points_sync_trees_into_work_dir() {
        let temp = tempdir().unwrap();
        let config = config_in(&temp);
        let plan = plan(&config, PipelineMode::Sync, Some("tok".to_string()));

        assert_eq!(plan.site.path, temp.path().join("work/ResumeWebsite"));
        assert_eq!(plan.game.token.as_deref(), Some("tok"));
        assert_eq!(
            plan.layout.game_build,
            temp.path().join("work/TetrisGame/dist")
        );
        assert_eq!(plan.layout.nested_path, PathBuf::from("game/TetrisGame"));
    }
}
