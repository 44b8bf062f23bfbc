use std::path::PathBuf;

const DATA_DIR: &str = "cricket_predictor";

pub fn app_data_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("CRICKET_PREDICTOR_DATA") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base));
        }
    }
    if let Ok(base) = std::env::var("XDG_DATA_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(DATA_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(DATA_DIR),
    )
}

pub fn default_db_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("history.sqlite"))
}

pub fn team_map_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("team_map.json"))
}

pub fn stadium_map_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("stadium_map.json"))
}

pub fn model_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join("forest_model.json"))
}
