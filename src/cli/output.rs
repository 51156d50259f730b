//! CLI output formatting

use crate::{
    core::{PipelineRun, PublishPlan, ReleaseVersion, RunStatus, StageStatus, StepOutcome},
    execution::{ReleaseEvent, RELEASE_STAGES},
};
use console::Emoji;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static PACKAGE: Emoji<'_, '_> = Emoji("📦 ", "* ");

/// Format a stage status for display
pub fn format_stage_status(status: &StageStatus) -> String {
    match status {
        StageStatus::Pending => style("PENDING").dim().to_string(),
        StageStatus::Running { .. } => style("RUNNING").yellow().to_string(),
        StageStatus::Succeeded { .. } => style("SUCCEEDED").green().to_string(),
        StageStatus::Tolerated { .. } => style("TOLERATED").yellow().to_string(),
        StageStatus::Failed { .. } => style("FAILED").red().to_string(),
    }
}

/// Format a run status for display
pub fn format_run_status(status: RunStatus) -> String {
    match status {
        RunStatus::Pending => style("PENDING").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Completed => style("COMPLETED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

fn format_duration(status: &StageStatus) -> Option<String> {
    let (started, finished) = match status {
        StageStatus::Succeeded {
            started_at,
            finished_at,
        }
        | StageStatus::Tolerated {
            started_at,
            finished_at,
            ..
        } => (started_at, finished_at),
        StageStatus::Failed {
            started_at,
            failed_at,
            ..
        } => (started_at, failed_at),
        _ => return None,
    };
    let secs = finished.signed_duration_since(*started).num_seconds().max(0);
    Some(if secs < 60 {
        format!("{}s", secs)
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    })
}

/// Format a release event for display
pub fn format_release_event(event: &ReleaseEvent) -> String {
    match event {
        ReleaseEvent::RunStarted {
            run_id,
            input,
            dry_run,
        } => format!(
            "{} Releasing {} ({}){}",
            ROCKET,
            style(input).bold(),
            style(&run_id.to_string()[..8]).dim(),
            if *dry_run {
                format!(" {}", style("[dry-run]").yellow())
            } else {
                String::new()
            }
        ),
        ReleaseEvent::StageStarted { stage } => format!(
            "[{}/{}] {}",
            style(stage.number()).cyan(),
            style(RELEASE_STAGES.len()).dim(),
            style(stage.label()).bold()
        ),
        ReleaseEvent::StageFinished { stage, status } => {
            let icon = match status {
                StageStatus::Succeeded { .. } => CHECK,
                StageStatus::Tolerated { .. } => WARN,
                StageStatus::Failed { .. } => CROSS,
                _ => INFO,
            };
            let elapsed = format_duration(status)
                .map(|d| format!(" {}", style(d).dim()))
                .unwrap_or_default();
            format!("{}{} {}{}", icon, style(stage).bold(), format_stage_status(status), elapsed)
        }
        ReleaseEvent::PlanResolved {
            version,
            order,
            violations,
            excluded,
        } => {
            let mut lines = vec![format!(
                "{} Version {} accepted; {} packages to publish",
                INFO,
                style(version).green(),
                style(order.len()).cyan()
            )];
            for violation in violations {
                lines.push(format!("{}{}", WARN, style(violation).yellow()));
            }
            if !excluded.is_empty() {
                lines.push(format!(
                    "{} Templates skipped: {}",
                    INFO,
                    style(excluded.join(", ")).dim()
                ));
            }
            lines.join("\n")
        }
        ReleaseEvent::PropagationFinished { report } => format!(
            "{} {} manifests updated, {} already current, {} version files{}",
            INFO,
            style(report.updated.len()).cyan(),
            style(report.unchanged.len()).dim(),
            style(report.constants.len() + report.constants_unchanged.len()).cyan(),
            if report.dry_run {
                format!(" {}", style("(not written)").yellow())
            } else {
                String::new()
            }
        ),
        ReleaseEvent::StepStarted {
            description,
            command,
            ..
        } => format!(
            "{}{} {}",
            SPINNER,
            style(description).cyan(),
            style(format!("$ {}", command)).dim()
        ),
        ReleaseEvent::StepFinished {
            description,
            result,
            ..
        } => match result.outcome {
            StepOutcome::Success => format!("{}{}", CHECK, style(description).green()),
            StepOutcome::Tolerated => format!(
                "{}{}: {}",
                WARN,
                style(description).yellow(),
                style(&result.diagnostic).dim()
            ),
            StepOutcome::Fatal => format!(
                "{}{}: {}",
                CROSS,
                style(description).red(),
                style(&result.diagnostic).dim()
            ),
        },
        ReleaseEvent::RunCompleted {
            version,
            published,
            warnings,
            install_hint,
            ..
        } => {
            let mut lines = vec![format!(
                "{}Released {} ({} packages) {}",
                CHECK,
                style(version).bold(),
                style(published.len()).cyan(),
                style("successfully").green()
            )];
            for warning in warnings {
                lines.push(format!("{}{}", WARN, style(warning).yellow()));
            }
            lines.push(format!("{} Try it: {}", PACKAGE, style(install_hint).bold()));
            lines.join("\n")
        }
        ReleaseEvent::RunFailed {
            stage,
            package,
            error,
            published,
            untagged,
            ..
        } => {
            let mut lines = vec![format!(
                "{}Release {} in {}{}",
                CROSS,
                style("failed").red(),
                style(stage).bold(),
                package
                    .as_ref()
                    .map(|p| format!(" ({})", style(p).red()))
                    .unwrap_or_default()
            )];
            lines.push(format!("  {}", style(error).red()));
            if !published.is_empty() {
                lines.push(format!("  Published: {}", style(published.join(", ")).dim()));
            }
            if !untagged.is_empty() {
                lines.push(format!(
                    "  Still untagged: {}",
                    style(untagged.join(", ")).yellow()
                ));
            }
            lines.join("\n")
        }
    }
}

/// Format the per-stage summary of a finished run
pub fn format_run_summary(run: &PipelineRun) -> String {
    let mut lines = vec![format!(
        "Run {} {}",
        style(&run.run_id.to_string()[..8]).dim(),
        format_run_status(run.status)
    )];
    for (stage, status) in run.stages() {
        let elapsed = format_duration(status)
            .map(|d| format!(" {}", style(d).dim()))
            .unwrap_or_default();
        lines.push(format!(
            "  {:<22} {}{}",
            stage.to_string(),
            format_stage_status(status),
            elapsed
        ));
    }
    lines.join("\n")
}

/// Format the resolved publish order
pub fn format_plan(version: &ReleaseVersion, plan: &PublishPlan) -> String {
    let mut lines = vec![format!(
        "{} Publish order for {}:",
        INFO,
        style(version).bold()
    )];
    for (index, package) in plan.packages.iter().enumerate() {
        lines.push(format!(
            "  {:>2}. {} {}",
            index + 1,
            style(&package.registry_name).bold(),
            style(format!("({})", package.id)).dim()
        ));
    }
    for violation in &plan.violations {
        lines.push(format!("{}{}", WARN, style(violation).yellow()));
    }
    if !plan.excluded.is_empty() {
        lines.push(format!(
            "{} Templates skipped: {}",
            INFO,
            style(plan.excluded.join(", ")).dim()
        ));
    }
    lines.join("\n")
}
