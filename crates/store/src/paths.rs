use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CHATS_FILE_NAME: &str = "chat_data.json";
pub const FAVORITES_FILE_NAME: &str = "favorites.json";
pub const TAGS_FILE_NAME: &str = "tags.json";
pub const VOCABULARY_FILE_NAME: &str = "all_tags.json";
pub const CONFIG_FILE_NAME: &str = "chatmap.toml";

/// Where the dataset and the three annotation documents live.
///
/// File names are relative to `dir` unless absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataLayout {
    pub dir: PathBuf,
    pub chats_file: PathBuf,
    pub favorites_file: PathBuf,
    pub tags_file: PathBuf,
    pub vocabulary_file: PathBuf,
    /// Fill missing parent links from `children` lists when loading
    pub repair_links: bool,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            chats_file: PathBuf::from(CHATS_FILE_NAME),
            favorites_file: PathBuf::from(FAVORITES_FILE_NAME),
            tags_file: PathBuf::from(TAGS_FILE_NAME),
            vocabulary_file: PathBuf::from(VOCABULARY_FILE_NAME),
            repair_links: false,
        }
    }
}

impl DataLayout {
    #[must_use]
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.dir.join(file)
        }
    }

    #[must_use]
    pub fn chats_path(&self) -> PathBuf {
        self.resolve(&self.chats_file)
    }

    #[must_use]
    pub fn favorites_path(&self) -> PathBuf {
        self.resolve(&self.favorites_file)
    }

    #[must_use]
    pub fn tags_path(&self) -> PathBuf {
        self.resolve(&self.tags_file)
    }

    #[must_use]
    pub fn vocabulary_path(&self) -> PathBuf {
        self.resolve(&self.vocabulary_file)
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }
}
