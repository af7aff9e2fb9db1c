/// How cached files are arranged under the cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheLayout {
    /// `<dir>/<file>`
    #[default]
    Flat,
    /// `<dir>/<family>/<model>/<file>`
    Hierarchical,
}

impl CacheLayout {
    /// Parse the layout environment value. Unknown or missing values mean
    /// [`CacheLayout::Flat`].
    pub fn from_env_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("hierarchical") => Self::Hierarchical,
            _ => Self::Flat,
        }
    }
}
