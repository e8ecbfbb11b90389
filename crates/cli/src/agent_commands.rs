//! Scheduler, track settings, and manual triggers.

use std::sync::Arc;

use {
    clap::{Subcommand, ValueEnum},
    tracing::info,
    vigil_common::{JobType, Language, Localizer},
    vigil_cron::{
        AgentScheduler, Clock, InFlightSet, ProjectionScope, load_state, project, update_track,
    },
};

use crate::app::App;

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

#[derive(Subcommand)]
pub enum TriggerAction {
    /// Run the long batch for every configured language now.
    Long,
    /// Run one short job now.
    Short {
        #[arg(long)]
        lang: Language,
    },
}

/// Run the scheduler until Ctrl-C.
pub async fn run(app: &App) -> anyhow::Result<()> {
    let gateway = app.gateway()?;
    let in_flight = InFlightSet::new();
    let runner = Arc::new(app.coordinator(gateway, in_flight.clone()));
    let scheduler = AgentScheduler::open(
        app.table.clone(),
        app.scheduler_options(),
        Arc::clone(&app.state),
        runner,
        in_flight,
        Arc::new(app.clock()?),
    )
    .await?;
    scheduler.start();

    let mut status_rx = scheduler.subscribe();
    let mut last_lines = None;
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                info!("shutdown requested");
                break;
            },
            Ok(()) = status_rx.changed() => {
                let lines = scheduler.status_lines();
                if last_lines.as_ref() != Some(&lines) {
                    info!(long = %lines.0, short = %lines.1, "agent status");
                    last_lines = Some(lines);
                }
            },
        }
    }

    scheduler.stop().await;
    Ok(())
}

/// Print persisted settings and the projected next jobs.
pub async fn status(app: &App) -> anyhow::Result<()> {
    let state = load_state(app.state.as_ref()).await?;
    let agent = &app.config.agent;
    let now = app.clock()?.now();
    let projected = project(
        ProjectionScope {
            table: &app.table,
            primary: agent.primary_language,
            languages: &agent.languages,
        },
        &state,
        &Default::default(),
        now,
    );

    let localizer = Localizer::new(agent.locale);
    for job_type in JobType::ALL {
        let track = state.track(job_type);
        let active = localizer.t(if track.active {
            "agentStatusActive"
        } else {
            "agentStatusInactive"
        });
        println!(
            "{:<6} {active:<10} cadence {}/{}  {}",
            job_type.as_str(),
            track.cadence,
            app.table.max_cadence(job_type),
            projected.track(job_type).render(job_type, &localizer),
        );
    }
    println!("{} slots fired", state.ledger.len());
    Ok(())
}

pub async fn set_track(app: &App, job_type: JobType, switch: Switch) -> anyhow::Result<()> {
    let track = update_track(
        app.state.as_ref(),
        &app.table,
        job_type,
        Some(switch == Switch::On),
        None,
    )
    .await?;
    println!(
        "{job_type} track {}",
        if track.active {
            "enabled"
        } else {
            "disabled"
        }
    );
    Ok(())
}

pub async fn set_cadence(app: &App, job_type: JobType, cadence: u8) -> anyhow::Result<()> {
    let track = update_track(app.state.as_ref(), &app.table, job_type, None, Some(cadence)).await?;
    let hours: Vec<String> = app
        .config
        .agent
        .languages
        .iter()
        .map(|&lang| {
            let hours = app.table.candidate_hours(lang, job_type, track.cadence);
            format!("{lang}: {hours:?}")
        })
        .collect();
    println!("{job_type} cadence set to {} ({})", track.cadence, hours.join(", "));
    Ok(())
}

pub async fn trigger(app: &App, action: TriggerAction) -> anyhow::Result<()> {
    let coordinator = app.coordinator(app.gateway()?, InFlightSet::new());
    match action {
        TriggerAction::Long => {
            let report = coordinator.run_long_batch().await?;
            println!("Long batch \"{}\" produced {} kit(s):", report.theme, report.item_ids.len());
            for id in &report.item_ids {
                println!("  {id}");
            }
        },
        TriggerAction::Short { lang } => {
            let item = coordinator.run_short_job(lang).await?;
            println!("Short kit {} ({}): {}", item.id, item.language.label(), item.title());
        },
    }
    Ok(())
}
