// Tabkeeper config path for Linux: $XDG_CONFIG_HOME/tabkeeper or ~/.config/tabkeeper

use std::env;
use std::path::PathBuf;

pub fn get_config_dir() -> PathBuf {
    config_dir_from(env::var("XDG_CONFIG_HOME").ok(), env::var("HOME").ok())
}

fn config_dir_from(xdg_config_home: Option<String>, home: Option<String>) -> PathBuf {
    match xdg_config_home.filter(|x| !x.is_empty()) {
        Some(xdg) => PathBuf::from(xdg).join("tabkeeper"),
        None => {
            let home = home.unwrap_or_else(|| String::from("/tmp"));
            PathBuf::from(home).join(".config").join("tabkeeper")
        }
    }
}
