// repos.rs — The list of repositories opted in to automatic merging.
//
// A YAML sequence of bare repository names:
//
//     - collections
//     - whitehall

use std::path::Path;

use anyhow::Context;

pub fn load(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read repository list {}", path.display()))?;
    parse(&content).with_context(|| format!("invalid repository list {}", path.display()))
}

fn parse(content: &str) -> anyhow::Result<Vec<String>> {
    let names: Option<Vec<String>> = serde_yaml::from_str(content)?;
    let names: Vec<String> = names
        .unwrap_or_default()
        .into_iter()
        .map(|name| name.trim().to_string())
        .collect();
    if let Some(bad) = names.iter().find(|n| n.is_empty() || n.contains('/')) {
        anyhow::bail!("'{}' is not a bare repository name", bad);
    }
    Ok(names)
}
