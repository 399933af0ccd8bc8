use crate::cli::GlobalFlags;
use crate::cli::subcommands::UserCommands;
use crate::context::AppContext;
use crate::output::output;

/// Handle `vigil user`.
pub async fn handle(
    action: &UserCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        UserCommands::Add { name, contact } => {
            let user = ctx.service.create_user(name, contact).await?;
            output(&user, flags.format)
        }
        UserCommands::Rename { id, name } => {
            let user = ctx.service.rename_user(id, name).await?;
            output(&user, flags.format)
        }
        UserCommands::Show { id } => output(&ctx.service.get_user(id).await?, flags.format),
        UserCommands::List => output(&ctx.service.list_users().await?, flags.format),
    }
}
