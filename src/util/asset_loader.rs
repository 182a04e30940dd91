use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use minijinja::Environment;
use sha2::{Digest, Sha256};

/// Resolves `asset("app.css")` in templates to a cache-busting URL.
///
/// Digests are computed on first use and kept for the life of the process;
/// a missing file falls back to the plain path.
#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
    digests: Arc<RwLock<HashMap<String, String>>>,
}

impl AssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            digests: Arc::default(),
        }
    }

    pub fn asset_path(&self, path: &str) -> String {
        if let Some(url) = self
            .digests
            .read()
            .ok()
            .and_then(|digests| digests.get(path).cloned())
        {
            return url;
        }

        match fs::read(self.root.join(path)) {
            Ok(contents) => {
                let digest = Sha256::digest(&contents);
                let short: String = format!("{digest:x}").chars().take(16).collect();
                let url = format!("/static/{path}?v={short}");
                if let Ok(mut digests) = self.digests.write() {
                    digests.insert(path.to_string(), url.clone());
                }
                url
            }
            Err(e) => {
                tracing::warn!(path, error = %e, "static asset missing");
                format!("/static/{path}")
            }
        }
    }

    pub fn register(&self, env: &mut Environment<'_>) {
        let loader = self.clone();
        env.add_function("asset", move |path: String| loader.asset_path(&path));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_assets_get_a_version() {
        let dir = std::env::temp_dir().join(format!("assets-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("app.css"), "body { margin: 0 }").unwrap();

        let loader = AssetLoader::new(&dir);
        let url = loader.asset_path("app.css");
        assert!(url.starts_with("/static/app.css?v="));
        assert_eq!(url.len(), "/static/app.css?v=".len() + 16);
        assert_eq!(loader.asset_path("app.css"), url);

        assert_eq!(loader.asset_path("missing.js"), "/static/missing.js");
        fs::remove_dir_all(dir).unwrap();
    }
}
