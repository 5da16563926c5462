use std::ffi::OsString;

use nova_config::{
    discover_config_path, load_for_dir, with_config_env_lock, NovaConfig, NOVA_CONFIG_ENV_VAR,
};
use tempfile::tempdir;

struct EnvVarGuard {
    key: &'static str,
    prev: Option<OsString>,
}

impl EnvVarGuard {
    fn set(key: &'static str, value: &std::path::Path) -> Self {
        let prev = std::env::var_os(key);
        std::env::set_var(key, value);
        Self { key, prev }
    }

    fn unset(key: &'static str) -> Self {
        let prev = std::env::var_os(key);
        std::env::remove_var(key);
        Self { key, prev }
    }
}

impl Drop for EnvVarGuard {
    fn drop(&mut self) {
        match &self.prev {
            Some(v) => std::env::set_var(self.key, v),
            None => std::env::remove_var(self.key),
        }
    }
}

#[test]
fn discovers_nova_toml_in_dir() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(NOVA_CONFIG_ENV_VAR);
        let dir = tempdir().expect("tempdir");
        std::fs::write(dir.path().join("nova.toml"), "[watch]\nsize_limit = 3\n")
            .expect("write config");

        let found = discover_config_path(dir.path()).expect("config path");
        assert_eq!(found, dir.path().join("nova.toml"));

        let (config, path) = load_for_dir(dir.path()).expect("load");
        assert_eq!(path, Some(dir.path().join("nova.toml")));
        assert_eq!(config.watch.size_limit, 3);
    });
}

#[test]
fn falls_back_to_legacy_location() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(NOVA_CONFIG_ENV_VAR);
        let dir = tempdir().expect("tempdir");
        std::fs::create_dir_all(dir.path().join(".nova")).expect("mkdir");
        std::fs::write(dir.path().join(".nova/config.toml"), "").expect("write config");

        assert_eq!(
            discover_config_path(dir.path()),
            Some(dir.path().join(".nova/config.toml"))
        );
    });
}

#[test]
fn env_var_overrides_discovery() {
    with_config_env_lock(|| {
        let dir = tempdir().expect("tempdir");
        let custom = dir.path().join("custom.toml");
        std::fs::write(&custom, "[watch]\ninvocation_limit = 5\n").expect("write config");
        std::fs::write(dir.path().join("nova.toml"), "").expect("write config");
        let _env = EnvVarGuard::set(NOVA_CONFIG_ENV_VAR, &custom);

        let (config, path) = load_for_dir(dir.path()).expect("load");
        assert_eq!(path, Some(custom));
        assert_eq!(config.watch.invocation_limit, 5);
    });
}

#[test]
fn missing_config_yields_defaults() {
    with_config_env_lock(|| {
        let _env = EnvVarGuard::unset(NOVA_CONFIG_ENV_VAR);
        let dir = tempdir().expect("tempdir");

        let (config, path) = load_for_dir(dir.path()).expect("load");
        assert_eq!(path, None);
        assert_eq!(config, NovaConfig::default());
    });
}
