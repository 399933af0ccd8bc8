use anyhow::Context;
use vigil_core::enums::{AuditAction, SubjectType};
use vigil_db::repos::audit::AuditQuery;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::{AuditCommands, AuditFilterArgs};
use crate::commands::shared::parse::parse_enum;
use crate::context::AppContext;
use crate::output::output;

/// Handle `vigil audit`.
pub async fn handle(
    action: &AuditCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        AuditCommands::Query(args) => {
            let mut query = build_query(&args.filter)?;
            query.page = args.page;
            query.page_size = args.page_size;
            output(&ctx.service.query_audit(&query).await?, flags.format)
        }
        AuditCommands::Export(args) => {
            let query = build_query(&args.filter)?;
            let csv = ctx.service.export_audit_csv(&query).await?;
            match &args.output {
                Some(path) => {
                    std::fs::write(path, &csv)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    if !flags.quiet {
                        eprintln!("Wrote audit export to {}", path.display());
                    }
                }
                None => print!("{csv}"),
            }
            Ok(())
        }
        AuditCommands::Recent { limit, count } => {
            if *count {
                output(&ctx.service.count_recent_audit().await?, flags.format)
            } else {
                output(&ctx.service.recent_audit(*limit).await?, flags.format)
            }
        }
        AuditCommands::Show { id } => {
            output(&ctx.service.get_audit_entry(id).await?, flags.format)
        }
    }
}

fn build_query(filter: &AuditFilterArgs) -> anyhow::Result<AuditQuery> {
    Ok(AuditQuery {
        performer: filter.performer.clone(),
        action: filter
            .action
            .as_deref()
            .map(|raw| parse_enum::<AuditAction>(raw, "action"))
            .transpose()?,
        subject_type: filter
            .subject_type
            .as_deref()
            .map(|raw| parse_enum::<SubjectType>(raw, "subject type"))
            .transpose()?,
        subject_id: filter.subject.clone(),
        start_date: filter.from,
        end_date: filter.to,
        request_id: filter.request.clone(),
        ..AuditQuery::default()
    })
}
