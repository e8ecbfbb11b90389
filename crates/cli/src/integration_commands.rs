//! Publishing platform connections.

use std::sync::Arc;

use {
    vigil_agents::{IntegrationManager, IntegrationState, Platform, SimulatedHandshake},
    vigil_common::Localizer,
};

use crate::app::App;

fn manager(app: &App) -> IntegrationManager {
    IntegrationManager::new(
        Arc::clone(&app.state),
        Arc::new(SimulatedHandshake::default()),
    )
}

pub async fn connect(app: &App, platform: Platform) -> anyhow::Result<()> {
    let localizer = Localizer::new(app.config.agent.locale);
    println!(
        "{}: {}",
        platform.label(),
        IntegrationState::Connecting.render(&localizer)
    );
    let state = manager(app).connect(platform).await?;
    println!("{}: {}", platform.label(), state.render(&localizer));
    Ok(())
}

pub async fn disconnect(app: &App, platform: Platform) -> anyhow::Result<()> {
    manager(app).disconnect(platform).await?;
    list(app).await
}

pub async fn list(app: &App) -> anyhow::Result<()> {
    let localizer = Localizer::new(app.config.agent.locale);
    for (platform, state) in manager(app).status().await? {
        println!("  {:<8} {}", platform.label(), state.render(&localizer));
    }
    Ok(())
}
