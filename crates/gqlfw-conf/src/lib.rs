use std::path::Path;

use camino::Utf8Path;
use camino::Utf8PathBuf;
use config::Config;
use config::ConfigError as ExternalConfigError;
use config::File;
use config::FileFormat;
use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration build/deserialize error")]
    Config(#[from] ExternalConfigError),
}

/// Settings of the command-line front end.
///
/// Sources, lowest priority first: the user config file, `.gqlfw.toml` and
/// `gqlfw.toml` in the project directory. Command-line flags override all
/// of them.
#[derive(Debug, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// JSON file holding the template definitions.
    pub templates: Option<Utf8PathBuf>,
    /// JSON file holding the schema model. Without it argument values are
    /// checked without types.
    pub schema: Option<Utf8PathBuf>,
    /// Report every matching template instead of the first.
    pub match_all: bool,
    pub debug: bool,
}

impl Settings {
    pub fn new(project_root: &Utf8Path) -> Result<Self, ConfigError> {
        let user_config_file = ProjectDirs::from("com.github", "gqlfw", "gqlfw")
            .map(|proj_dirs| proj_dirs.config_dir().join("gqlfw.toml"));

        Self::load_from_paths(project_root, user_config_file.as_deref())
    }

    fn load_from_paths(
        project_root: &Utf8Path,
        user_config_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();

        if let Some(path) = user_config_path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        for name in [".gqlfw.toml", "gqlfw.toml"] {
            builder = builder.add_source(
                File::from(project_root.join(name).as_std_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        let config = builder.build()?;
        let mut settings: Settings = config.try_deserialize()?;
        settings.templates = settings.templates.map(|path| resolve(project_root, path));
        settings.schema = settings.schema.map(|path| resolve(project_root, path));
        tracing::debug!(?settings, "loaded settings");
        Ok(settings)
    }
}

/// Relative paths in project files are relative to the project root.
fn resolve(project_root: &Utf8Path, path: Utf8PathBuf) -> Utf8PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    fn root(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    mod defaults {
        use super::*;

        #[test]
        fn test_load_no_files() {
            let dir = tempdir().unwrap();
            let settings = Settings::load_from_paths(&root(&dir), None).unwrap();
            assert_eq!(settings, Settings::default());
            assert!(!settings.match_all);
        }
    }

    mod project_files {
        use super::*;

        #[test]
        fn test_load_gqlfw_toml_only() {
            let dir = tempdir().unwrap();
            fs::write(
                dir.path().join("gqlfw.toml"),
                "templates = \"templates.json\"\nmatch_all = true\n",
            )
            .unwrap();
            let settings = Settings::load_from_paths(&root(&dir), None).unwrap();
            assert_eq!(
                settings,
                Settings {
                    templates: Some(root(&dir).join("templates.json")),
                    match_all: true,
                    ..Settings::default()
                }
            );
        }

        #[test]
        fn test_load_dot_gqlfw_toml_only() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(".gqlfw.toml"), "debug = true").unwrap();
            let settings = Settings::load_from_paths(&root(&dir), None).unwrap();
            assert!(settings.debug);
        }

        #[test]
        fn test_absolute_paths_are_kept() {
            let dir = tempdir().unwrap();
            let schema = root(&dir).join("elsewhere").join("schema.json");
            fs::write(
                dir.path().join("gqlfw.toml"),
                format!("schema = {:?}\n", schema.as_str()),
            )
            .unwrap();
            let settings = Settings::load_from_paths(&root(&dir), None).unwrap();
            assert_eq!(settings.schema, Some(schema));
        }
    }

    mod priority {
        use super::*;

        #[test]
        fn test_gqlfw_overrides_dot_gqlfw() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join(".gqlfw.toml"), "debug = false").unwrap();
            fs::write(dir.path().join("gqlfw.toml"), "debug = true").unwrap();
            let settings = Settings::load_from_paths(&root(&dir), None).unwrap();
            assert!(settings.debug);
        }

        #[test]
        fn test_project_overrides_user() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("gqlfw.toml");
            fs::write(&user_conf_path, "debug = true\nmatch_all = true").unwrap();
            fs::write(project_dir.path().join("gqlfw.toml"), "debug = false").unwrap();

            let settings =
                Settings::load_from_paths(&root(&project_dir), Some(&user_conf_path)).unwrap();
            assert!(!settings.debug);
            assert!(settings.match_all);
        }

        #[test]
        fn test_missing_user_config_is_ignored() {
            let user_dir = tempdir().unwrap();
            let project_dir = tempdir().unwrap();
            let user_conf_path = user_dir.path().join("gqlfw.toml");
            fs::write(project_dir.path().join(".gqlfw.toml"), "debug = true").unwrap();

            let settings =
                Settings::load_from_paths(&root(&project_dir), Some(&user_conf_path)).unwrap();
            assert!(settings.debug);
        }
    }

    mod errors {
        use super::*;

        #[test]
        fn test_invalid_toml_content() {
            let dir = tempdir().unwrap();
            fs::write(dir.path().join("gqlfw.toml"), "debug = not_a_boolean").unwrap();
            let result = Settings::load_from_paths(&root(&dir), None);
            assert!(matches!(result.unwrap_err(), ConfigError::Config(_)));
        }
    }
}
