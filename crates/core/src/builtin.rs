//! Commands that ship with the framework
//!
//! `sync`, `shutdown`, `help` and the `modules` group. They are registered
//! by [`Bot::new`](crate::Bot::new) and are not owned by any module.

use std::fmt::Write as _;

use tracing::info;

use crate::colors::Color;
use crate::commands::{Check, Command};
use crate::context::CommandContext;
use crate::error::Result;
use crate::modules::ModuleOp;
use crate::platform::{Embed, OutgoingMessage};

/// All built-in commands
pub fn commands() -> Vec<Command> {
    vec![
        Command::new("sync", sync)
            .description("Sync the slash commands added/removed by modules")
            .check(Check::BotOwner)
            .suppress(),
        Command::new("shutdown", shutdown)
            .description("Shutdown gracefully the bot")
            .check(Check::BotOwner),
        Command::new("help", help).description("Shows this message"),
        modules_group(),
    ]
}

fn modules_group() -> Command {
    Command::group("modules")
        .alias("mod")
        .alias("plugins")
        .description("Manages modules of the bot")
        .invoke_without_command(modules_usage)
        .subcommand(
            Command::new("list", list_modules)
                .alias("ls")
                .description("List all available modules"),
        )
        .subcommand(
            Command::new("status", modules_status)
                .alias("s")
                .description("Display the loaded status of provided modules"),
        )
        .subcommand(
            Command::new("load", load_modules)
                .alias("l")
                .alias("enable")
                .alias("activate")
                .description("Try to load the provided modules")
                .check(Check::AdminOnly),
        )
        .subcommand(
            Command::new("unload", unload_modules)
                .alias("u")
                .alias("disable")
                .alias("deactivate")
                .description("Try to unload the provided modules")
                .check(Check::AdminOnly),
        )
        .subcommand(
            Command::new("reload", reload_modules)
                .alias("rl")
                .alias("r")
                .description("Try to reload the provided modules")
                .check(Check::AdminOnly),
        )
}

async fn sync(ctx: CommandContext) -> Result<()> {
    info!("Syncing slash commands");
    ctx.bot().sync_commands().await?;
    ctx.success(
        "Slash commands synced successfully!\n*It may take some times to propagate to all guilds...*",
    )
    .await;
    Ok(())
}

async fn shutdown(ctx: CommandContext) -> Result<()> {
    info!("Shutting down bot...");
    ctx.client("Shutting down bot...").await;
    ctx.bot().shutdown();
    Ok(())
}

async fn modules_usage(ctx: CommandContext) -> Result<()> {
    let prefix = &ctx.handle().config().prefix;
    ctx.client(&format!(
        "Manages modules of the bots. Use `{prefix}help modules` to get all available subcommands."
    ))
    .await;
    Ok(())
}

fn list_text(modules: &[String]) -> String {
    let count = modules.len();
    let amount = if count > 0 {
        count.to_string()
    } else {
        "no".to_string()
    };
    let plural = if count > 1 { "s" } else { "" };
    format!(
        "There are {amount} available module{plural}:\n{}",
        modules.join(", ")
    )
}

async fn list_modules(ctx: CommandContext) -> Result<()> {
    let available = ctx.bot().modules().lock().await.available();
    ctx.client(&list_text(&available)).await;
    Ok(())
}

async fn modules_status(ctx: CommandContext) -> Result<()> {
    let text = {
        let modules = ctx.bot().modules().lock().await;
        match ctx.args().as_slice() {
            [] => {
                let available = modules.available();
                let mut text = format!("All modules ({}):\n", available.len());
                for name in &available {
                    let _ = writeln!(text, "- `{name}` (status: {})", modules.status_label(name));
                }
                text
            }
            [name] => format!("`{name}` module status: {}", modules.status_label(name)),
            names => {
                let mut text = "Modules status:\n".to_string();
                for name in names {
                    let _ = writeln!(
                        text,
                        "- `{name}` module status: {}",
                        modules.status_label(name)
                    );
                }
                text
            }
        }
    };
    ctx.client(&text).await;
    Ok(())
}

async fn run_batch(ctx: CommandContext, op: ModuleOp) -> Result<()> {
    let names: Vec<String> = ctx.args().into_iter().map(str::to_string).collect();
    if names.is_empty() {
        ctx.failure(&format!(
            "You must provide at least one module name to {}.",
            op.verb()
        ))
        .await;
        return Ok(());
    }

    let mut report = String::new();
    {
        let mut modules = ctx.bot().modules().lock().await;
        for name in &names {
            let result = match op {
                ModuleOp::Load => modules.load(name).await,
                ModuleOp::Unload => modules.unload(name).await,
                ModuleOp::Reload => modules.reload(name).await,
            };
            let _ = writeln!(report, "{}", op.report(name, &result));
        }
    }
    ctx.client(&report).await;
    Ok(())
}

async fn load_modules(ctx: CommandContext) -> Result<()> {
    run_batch(ctx, ModuleOp::Load).await
}

async fn unload_modules(ctx: CommandContext) -> Result<()> {
    run_batch(ctx, ModuleOp::Unload).await
}

async fn reload_modules(ctx: CommandContext) -> Result<()> {
    run_batch(ctx, ModuleOp::Reload).await
}

fn command_line(command: &Command, prefix: &str, parent: Option<&str>) -> String {
    let signature = command.signature(prefix, parent);
    let description = command.get_description();
    if description.is_empty() {
        format!("`{signature}`")
    } else {
        format!("`{signature}` {description}")
    }
}

fn help_overview(ctx: &CommandContext, prefix: &str) -> String {
    let router = ctx.bot().router().read();
    let mut text = format!("Use `{prefix}help [command]` for more info on a command.\n\n");
    for command in router.list() {
        let _ = writeln!(text, "{}", command_line(command, prefix, None));
        for sub in command.subcommands() {
            let _ = writeln!(text, "  {}", command_line(sub, prefix, Some(command.name())));
        }
    }
    text
}

fn help_detail(ctx: &CommandContext, prefix: &str, query: &str) -> Option<String> {
    let router = ctx.bot().router().read();
    let resolved = router.resolve(query)?;
    if !resolved.args.is_empty() {
        return None;
    }

    let parent = resolved
        .qualified_name
        .rsplit_once(' ')
        .map(|(parent, _)| parent);
    let mut text = command_line(&resolved.command, prefix, parent);
    if let Some(cog) = resolved.command.cog() {
        let _ = write!(text, "\nModule: `{cog}`");
    }
    if !resolved.command.subcommands().is_empty() {
        text.push_str("\n\n**Commands**\n");
        for sub in resolved.command.subcommands() {
            let _ = writeln!(
                text,
                "{}",
                command_line(sub, prefix, Some(&resolved.qualified_name))
            );
        }
    }
    Some(text)
}

async fn help(ctx: CommandContext) -> Result<()> {
    let prefix = ctx.handle().config().prefix.clone();
    let query = ctx.raw_args().trim().to_string();

    let embed = if query.is_empty() {
        Embed::new(help_overview(&ctx, &prefix), Color::BLURPLE).title("Help")
    } else {
        match help_detail(&ctx, &prefix, &query) {
            Some(text) => Embed::new(text, Color::BLURPLE).title("Help"),
            None => {
                let message = OutgoingMessage::embed(
                    Embed::new(format!("No command called \"{query}\" found."), Color::RED)
                        .title("Error"),
                );
                ctx.send(message).await;
                return Ok(());
            }
        }
    };

    let author = ctx.author();
    let embed = embed.footer(
        format!("Command issued by {}", author.display_name),
        author.avatar_url.clone(),
    );
    ctx.send(OutgoingMessage::embed(embed)).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_text() {
        assert_eq!(list_text(&[]), "There are no available module:\n");
        assert_eq!(
            list_text(&["ping".to_string()]),
            "There are 1 available module:\nping"
        );
        assert_eq!(
            list_text(&["announce".to_string(), "ping".to_string()]),
            "There are 2 available modules:\nannounce, ping"
        );
    }

    #[test]
    fn test_builtin_names_do_not_conflict() {
        let mut router = crate::commands::CommandRouter::new();
        router.register_all(commands(), None).unwrap();
        assert_eq!(router.len(), 4);
        assert_eq!(
            router.resolve("plugins rl ping").unwrap().qualified_name,
            "modules reload"
        );
    }
}
