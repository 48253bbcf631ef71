// Named beats live in <project_dir>/.kidbeat/beats.json, one map from beat
// name to its full state. Malformed or missing files default to empty
// rather than erroring; saving is the only fallible path we surface.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use super::song::Song;

const KIDBEAT_DIR: &str = ".kidbeat";
const BEATS_FILE: &str = "beats.json";

fn beats_file_path(project_dir: &Path) -> PathBuf {
    project_dir.join(KIDBEAT_DIR).join(BEATS_FILE)
}

pub fn load_beats(project_dir: &Path) -> BTreeMap<String, Song> {
    let path = beats_file_path(project_dir);
    std::fs::read_to_string(&path)
        .ok()
        .and_then(|data| serde_json::from_str(&data).ok())
        .unwrap_or_default()
}

pub fn load_beat(project_dir: &Path, name: &str) -> Option<Song> {
    load_beats(project_dir).remove(name)
}

pub fn save_beat(project_dir: &Path, song: &Song) -> anyhow::Result<()> {
    let mut beats = load_beats(project_dir);
    beats.insert(song.name.clone(), song.clone());
    let path = beats_file_path(project_dir);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .kidbeat/ if needed
    }
    let json = serde_json::to_string_pretty(&beats)?;
    std::fs::write(&path, json)
        .with_context(|| format!("could not write {}", path.display()))?;
    Ok(())
}

pub fn delete_beat(project_dir: &Path, name: &str) -> anyhow::Result<()> {
    let mut beats = load_beats(project_dir);
    if beats.remove(name).is_some() {
        let json = serde_json::to_string_pretty(&beats)?;
        std::fs::write(beats_file_path(project_dir), json)?;
    }
    Ok(())
}
