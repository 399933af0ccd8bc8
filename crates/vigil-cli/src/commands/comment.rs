use crate::cli::GlobalFlags;
use crate::cli::subcommands::CommentCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `vigil comment`.
pub async fn handle(
    action: &CommentCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        CommentCommands::Add { incident, body } => {
            let request = ctx.request_context(flags).await?;
            output(&ctx.service.add_comment(&request, incident, body).await?, flags.format)
        }
        CommentCommands::Edit { id, body } => {
            let request = ctx.request_context(flags).await?;
            output(&ctx.service.edit_comment(&request, id, body).await?, flags.format)
        }
        CommentCommands::Delete { id } => {
            let request = ctx.request_context(flags).await?;
            output(&ctx.service.delete_comment(&request, id).await?, flags.format)
        }
        CommentCommands::React { id, emoji } => {
            let request = ctx.request_context(flags).await?;
            output(&ctx.service.toggle_reaction(&request, id, emoji).await?, flags.format)
        }
        CommentCommands::List { incident } => {
            output(&ctx.service.list_comments(incident).await?, flags.format)
        }
    }
}
