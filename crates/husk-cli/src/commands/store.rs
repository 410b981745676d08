//! `husk store` command implementation.

use husk_cache::CasStore;
use husk_core::error::HuskResult;

use super::{format_size, CommandContext};
use crate::StoreAction;

/// Execute the `husk store` command
pub async fn execute(action: StoreAction, ctx: &CommandContext) -> HuskResult<()> {
    let config = ctx.load_config(&[]).await?;
    let store_dir = config.store_dir();

    if action == StoreAction::Path {
        println!("{}", store_dir);
        return Ok(());
    }

    let store = CasStore::open(&store_dir)?;
    match action {
        StoreAction::Status => {
            let status = store.status();
            ctx.output.step("Store", store_dir.as_str());
            ctx.output.field("packages", status.packages);
            ctx.output.field("versions", status.versions);
            ctx.output.field("compressed", format_size(status.compressed_size));
            ctx.output.field("unpacked", format_size(status.original_size));
            if status.missing > 0 {
                ctx.output.warn(&format!(
                    "{} index entries point at missing directories; run 'husk store prune'",
                    status.missing
                ));
            }
        },
        StoreAction::Prune => {
            let report = store.prune()?;
            ctx.output.success(&format!(
                "Pruned {} stale entries and {} unreferenced directories",
                report.stale_entries, report.orphan_dirs
            ));
        },
        StoreAction::Clear => {
            store.clear()?;
            ctx.output.success(&format!("Cleared {}", store_dir));
        },
        StoreAction::Path => {},
    }
    Ok(())
}
