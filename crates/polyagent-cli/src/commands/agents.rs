use anyhow::Result;
use colored::Colorize;
use polyagent_core::agent::{AgentRouter, ResponseShape};

use crate::app::AppContext;

pub fn print_agents(router: &AgentRouter, current: Option<&str>) {
    for route in router.routes() {
        let endpoint = router
            .resolve(&route.id)
            .map(|resolved| resolved.endpoint)
            .unwrap_or_default();
        let shape = match route.shape {
            ResponseShape::StreamedText => "stream",
            ResponseShape::StructuredJson => "json",
        };
        let marker = if current == Some(route.id.as_str()) { "*" } else { " " };

        println!(
            "{} {:<10} {}",
            marker.bright_green(),
            route.id.bold(),
            route.title
        );
        if !route.description.is_empty() {
            println!("             {}", route.description.bright_black());
        }
        println!("             {}", format!("{} ({})", endpoint, shape).bright_black());
    }
}

/// `polyagent agents`
pub fn agents(ctx: &AppContext) {
    print_agents(&ctx.router, Some(ctx.config.default_agent.as_str()));
}

/// `polyagent config`
pub fn config(ctx: &AppContext) -> Result<()> {
    println!("{} {}", "Config file:".bright_black(), ctx.config_path.display());
    println!("{}", serde_json::to_string_pretty(&ctx.config)?);
    Ok(())
}
