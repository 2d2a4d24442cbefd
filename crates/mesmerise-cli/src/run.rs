use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use mesmerise_core::config::EditorConfig;
use mesmerise_core::effects::EffectKind;
use mesmerise_core::session::{Command, EditorSession};
use mesmerise_io::{decode, export, probe};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::args::CliArgs;
use crate::recipe::Recipe;

pub fn run(args: &CliArgs) -> Result<()> {
    if args.list_effects {
        println!("{}", catalog_json()?);
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => EditorConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => EditorConfig::default(),
    };
    if args.seed.is_some() {
        config.grain_seed = args.seed;
    }

    let (mut session, ids) = load_session(&args.layers, config)?;

    if let Some(path) = &args.recipe {
        let report = Recipe::load(path)?.apply(&mut session, &ids)?;
        info!(
            applied = report.applied,
            refused = report.refused.len(),
            "recipe applied"
        );
        for refusal in &report.refused {
            eprintln!("skipped {refusal}");
        }
    }

    export::export_png(&mut session, &args.output)
        .with_context(|| format!("failed to export {}", args.output.display()))?;
    Ok(())
}

/// Open a session with one layer per image, bottom first.
pub fn load_session(
    paths: &[PathBuf],
    config: EditorConfig,
) -> Result<(EditorSession, Vec<Uuid>)> {
    let mut session = EditorSession::with_config(config)?;
    let mut ids = Vec::with_capacity(paths.len());
    for path in paths {
        let source = decode::load_source(path)
            .with_context(|| format!("failed to load layer {}", path.display()))?;
        let outcome = session.execute(Command::AddLayer {
            name: probe::layer_name(path),
            source,
        })?;
        let id = outcome
            .created()
            .ok_or_else(|| anyhow!("layer {} was not added", path.display()))?;
        ids.push(id);
    }
    Ok((session, ids))
}

/// Effect catalog: kind, display name and value domain for each effect.
pub fn catalog_json() -> Result<String> {
    let entries: Vec<_> = EffectKind::all_builtin()
        .into_iter()
        .map(|kind| {
            json!({
                "kind": kind,
                "name": kind.display_name(),
                "domain": kind.domain(),
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&entries)?)
}
