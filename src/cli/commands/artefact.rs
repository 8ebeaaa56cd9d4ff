//! packmind artefact - Catalog artefact maintenance

use clap::{Args, Subcommand, ValueEnum};
use serde::Serialize;

use crate::app::AppContext;
use crate::cli::output::{emit_robot, robot_ok};
use crate::core::{ArtefactKind, SpaceId};
use crate::error::{PackmindError, Result};
use crate::events::{DomainEvent, EventPublisher};
use crate::storage::catalog::{CATALOG_FILE_NAME, CatalogData};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Command,
    Standard,
    Skill,
}

impl From<KindArg> for ArtefactKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Command => Self::Recipe,
            KindArg::Standard => Self::Standard,
            KindArg::Skill => Self::Skill,
        }
    }
}

#[derive(Args, Debug)]
pub struct ArtefactArgs {
    #[command(subcommand)]
    pub command: ArtefactCommand,
}

#[derive(Subcommand, Debug)]
pub enum ArtefactCommand {
    /// Remove an artefact from the catalog and from every package of its space
    Delete {
        #[arg(long, value_enum)]
        kind: KindArg,

        #[arg(long)]
        id: String,
    },
}

#[derive(Serialize)]
struct DeleteReport {
    kind: ArtefactKind,
    id: String,
    space_id: SpaceId,
}

pub fn run(ctx: &AppContext, args: &ArtefactArgs) -> Result<()> {
    match &args.command {
        ArtefactCommand::Delete { kind, id } => {
            let kind = ArtefactKind::from(*kind);
            let mut removed = None;
            ctx.catalog.update(|data| removed = remove_artefact(data, kind, id));
            let space_id = removed.ok_or_else(|| PackmindError::ArtefactNotFound {
                kind,
                id: id.clone(),
            })?;
            ctx.catalog.save(ctx.root.join(CATALOG_FILE_NAME))?;

            ctx.events.publish(&DomainEvent::ArtefactDeleted {
                kind,
                id: id.clone(),
                space_id: space_id.clone(),
            });

            if ctx.robot() {
                emit_robot(&robot_ok(DeleteReport {
                    kind,
                    id: id.clone(),
                    space_id,
                }))
            } else {
                println!("Deleted {} {id}", kind.label().to_lowercase());
                Ok(())
            }
        }
    }
}

/// Drop the artefact and its versions. Returns its space when it existed.
fn remove_artefact(data: &mut CatalogData, kind: ArtefactKind, id: &str) -> Option<SpaceId> {
    match kind {
        ArtefactKind::Recipe => {
            let position = data.recipes.iter().position(|r| r.id.as_str() == id)?;
            let recipe = data.recipes.remove(position);
            data.recipe_versions.retain(|v| v.recipe_id != recipe.id);
            Some(recipe.space_id)
        }
        ArtefactKind::Standard => {
            let position = data.standards.iter().position(|s| s.id.as_str() == id)?;
            let standard = data.standards.remove(position);
            data.standard_versions.retain(|v| v.standard_id != standard.id);
            Some(standard.space_id)
        }
        ArtefactKind::Skill => {
            let position = data.skills.iter().position(|s| s.id.as_str() == id)?;
            Some(data.skills.remove(position).space_id)
        }
    }
}
