//! Compile → mark → strip old output → save.

use anyhow::{Context, Result, bail};
use log::info;
use trigforge_data::level::{decode_object, segments};
use trigforge_data::{FieldTable, TypedRef, encode_objects};
use trigforge_script::Compiler;

use crate::save_file::SaveFile;
use crate::save_paths::SavePaths;

/// Group tagged onto every exported object so a later export can find and
/// remove it.
pub const DEFAULT_MARKER_GROUP: u32 = 9999;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub level: Option<String>,
    pub replace_past_objects: bool,
    pub marker_group: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            level: None,
            replace_past_objects: true,
            marker_group: DEFAULT_MARKER_GROUP,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSummary {
    pub level: String,
    pub added: usize,
    pub removed: usize,
}

/// Drop every object whose `GROUPS` contains `marker`. Kept segments are
/// copied verbatim. Returns the new level string and the number removed.
pub fn strip_marked(level: &str, marker: u32, table: &FieldTable) -> (String, usize) {
    let mut out = String::with_capacity(level.len());
    let mut removed = 0;
    for seg in segments(level) {
        if decode_object(seg, table).has_group(marker) {
            removed += 1;
        } else {
            out.push_str(seg);
            out.push(';');
        }
    }
    (out, removed)
}

/// Flush `compiler` and write its objects into a level of the save file.
///
/// With `replace_past_objects`, every new object carries the marker group and
/// objects from earlier exports are removed first.
///
/// Pass the marker through `CompilerOptions::marker_group` so compilation
/// never allocates it.
///
/// # Errors
/// The marker group already used by the compiled graph, encoding failures, or
/// any failure from opening or saving the container.
pub fn export_to_savefile(mut compiler: Compiler, paths: &SavePaths, opts: &ExportOptions) -> Result<ExportSummary> {
    let table = FieldTable::builtin();
    let marker = TypedRef::group(opts.marker_group);
    if opts.replace_past_objects {
        if compiler.group_in_use(opts.marker_group) {
            bail!(
                "marker group {} is already used by the compiled script; choose another marker_group",
                opts.marker_group
            );
        }
        compiler.reserve_group(opts.marker_group);
    }
    let mut objects = compiler.flush();
    if opts.replace_past_objects {
        for obj in &mut objects {
            obj.add_group(marker);
        }
    }
    let encoded = encode_objects(&objects, table).context("encoding compiled objects")?;

    let mut save = SaveFile::open(paths, opts.level.as_deref())?;
    let (base, removed) = if opts.replace_past_objects {
        strip_marked(&save.data.levelstring, opts.marker_group, table)
    } else {
        (save.data.levelstring.clone(), 0)
    };
    save.set(&format!("{base}{encoded}"))?;
    save.save()?;

    info!(
        "exported {} objects into '{}' (removed {removed} from earlier exports)",
        objects.len(),
        save.data.name
    );
    Ok(ExportSummary {
        level: save.data.name.clone(),
        added: objects.len(),
        removed,
    })
}
