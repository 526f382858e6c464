//! Markdown documentation of module options.

use crate::core::module::Module;
use crate::modules::module_params;
use crate::modules::registry::ModuleRegistry;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Render the option table of one module.
pub fn module_doc(module: &dyn Module) -> String {
    let metadata = module.metadata();
    let params = module_params(module);

    let mut doc = String::new();
    let _ = writeln!(doc, "# {}\n", metadata.name);
    if !metadata.description.is_empty() {
        let _ = writeln!(doc, "{}\n", metadata.description);
    }
    let _ = writeln!(doc, "- Namespace: `{}`", metadata.category);
    let _ = writeln!(doc, "- Version: {}", metadata.version);
    if metadata.has_dependencies() {
        let _ = writeln!(doc, "- Dependencies: {}", metadata.dependencies.join(", "));
    }
    doc.push('\n');

    if params.is_empty() {
        doc.push_str("This module has no options.\n");
        return doc;
    }

    doc.push_str("| Name | Type | Default | Description |\n");
    doc.push_str("|------|------|---------|-------------|\n");
    for definition in params.definitions() {
        let _ = writeln!(
            doc,
            "| `{}` | {} | `{}` | {} |",
            definition.name,
            definition.value_type,
            definition.default_value,
            definition.help.replace('|', "\\|")
        );
    }
    doc
}

/// Write `<dir>/<module>.md` for every built-in module.
///
/// Creates `dir` if needed and returns the written paths.
pub fn write_docs(registry: &ModuleRegistry, dir: &Path) -> io::Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::new();
    for (_, entry) in registry.entries() {
        let module = (entry.factory)();
        let path = dir.join(format!("{}.md", entry.metadata.name));
        fs::write(&path, module_doc(module.as_ref()))?;
        log::info!("wrote {}", path.display());
        written.push(path);
    }
    Ok(written)
}
