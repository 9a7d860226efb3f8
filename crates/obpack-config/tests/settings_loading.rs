//! Layering of defaults, `obpack.toml` and `OBPACK_*` overrides.

use std::path::{Path, PathBuf};

use figment::Jail;
use obpack_config::{
    ConfigError, DEFAULT_DEBOUNCE_MS, Mode, ProjectSettings, RenameFailurePolicy, build_config,
};

fn load(jail: &Jail) -> Result<ProjectSettings, figment::Error> {
    ProjectSettings::load(jail.directory(), None).map_err(|e| e.to_string().into())
}

#[test]
fn no_file_no_env_yields_defaults() {
    Jail::expect_with(|jail| {
        let settings = load(jail)?;
        assert_eq!(settings, ProjectSettings::default());
        assert_eq!(settings.dev.debounce_ms, DEFAULT_DEBOUNCE_MS);
        assert_eq!(settings.dev.on_rename_error, RenameFailurePolicy::Fatal);
        Ok(())
    });
}

#[test]
fn project_file_is_picked_up() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "obpack.toml",
            r#"
entry = "src/plugin.ts"
outfile = "main.js"
external = ["moment"]

[banner]
css = "/* styles */"

[dev]
debounce_ms = 250
watch_ignore = ["generated"]
on_rename_error = "warn"
"#,
        )?;

        let settings = load(jail)?;
        assert_eq!(settings.entry, Some(PathBuf::from("src/plugin.ts")));
        assert_eq!(settings.outfile, Some(PathBuf::from("main.js")));
        assert_eq!(settings.external, vec!["moment".to_string()]);
        assert_eq!(settings.banner.css.as_deref(), Some("/* styles */"));
        assert_eq!(settings.banner.js, None);
        assert_eq!(settings.dev.debounce_ms, 250);
        assert_eq!(settings.dev.watch_ignore, vec!["generated".to_string()]);
        assert_eq!(settings.dev.on_rename_error, RenameFailurePolicy::Warn);

        let config = settings.apply(build_config(Mode::Release));
        assert_eq!(config.stylesheet_paths().target, Path::new("./styles.css"));
        assert_eq!(config.banner.css, "/* styles */");
        Ok(())
    });
}

#[test]
fn environment_wins_over_file() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "obpack.toml",
            r#"
outfile = "dist/main.js"

[dev]
debounce_ms = 250
"#,
        )?;
        jail.set_env("OBPACK_OUTFILE", "plugin/bundle.js");
        jail.set_env("OBPACK_DEV__DEBOUNCE_MS", "10");

        let settings = load(jail)?;
        assert_eq!(settings.outfile, Some(PathBuf::from("plugin/bundle.js")));
        assert_eq!(settings.dev.debounce_ms, 10);
        Ok(())
    });
}

#[test]
fn explicit_config_path_is_used() {
    Jail::expect_with(|jail| {
        jail.create_file("obpack.toml", "entry = \"ignored.ts\"")?;
        jail.create_file("custom.toml", "entry = \"src/custom.ts\"")?;

        let settings = ProjectSettings::load(jail.directory(), Some(Path::new("custom.toml")))
            .map_err(|e| e.to_string())?;
        assert_eq!(settings.entry, Some(PathBuf::from("src/custom.ts")));
        Ok(())
    });
}

#[test]
fn unknown_keys_are_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("obpack.toml", "sourcemap = \"external\"")?;

        let err = ProjectSettings::load(jail.directory(), None).unwrap_err();
        assert!(matches!(err, ConfigError::Extract(_)), "got {err:?}");
        Ok(())
    });
}

#[test]
fn bad_policy_value_is_rejected() {
    Jail::expect_with(|jail| {
        jail.create_file("obpack.toml", "[dev]\non_rename_error = \"retry\"")?;
        assert!(ProjectSettings::load(jail.directory(), None).is_err());
        Ok(())
    });
}
