use crate::cli::GlobalFlags;
use crate::cli::subcommands::AttachmentCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `vigil attachment`.
pub async fn handle(
    action: &AttachmentCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        AttachmentCommands::Add {
            incident,
            file_name,
            content_type,
            size,
        } => {
            let request = ctx.request_context(flags).await?;
            let uploaded = ctx
                .service
                .record_attachment(&request, incident, file_name, content_type, *size)
                .await?;
            output(&uploaded, flags.format)
        }
        AttachmentCommands::Delete { id } => {
            let request = ctx.request_context(flags).await?;
            output(&ctx.service.delete_attachment(&request, id).await?, flags.format)
        }
        AttachmentCommands::List { incident } => {
            output(&ctx.service.list_attachments(incident).await?, flags.format)
        }
    }
}
