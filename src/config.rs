use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Project file read by the CLI when no single output is given on the command line.
pub const CONFIG_FILE: &str = "depstage.toml";

pub const DEFAULT_PACKAGE_MANAGER: &str = "npm";

/// Deployment operating system passed as `--platform`, regardless of the host.
pub const DEFAULT_PLATFORM: &str = "linux";

/// What to install into one output directory, and for which target.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InstallConfig {
    pub packages: Vec<String>,
    pub arch: Option<String>,
    #[serde(alias = "nodeVersion")]
    pub node_version: Option<String>,
    pub libc: Option<String>,
    #[serde(alias = "additionalArgs")]
    pub additional_args: Option<String>,
}

impl InstallConfig {
    pub fn new<I, S>(packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packages: packages.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_arch(mut self, arch: impl Into<String>) -> Self {
        self.arch = Some(arch.into());
        self
    }

    pub fn with_node_version(mut self, version: impl Into<String>) -> Self {
        self.node_version = Some(version.into());
        self
    }

    pub fn with_libc(mut self, libc: impl Into<String>) -> Self {
        self.libc = Some(libc.into());
        self
    }

    pub fn with_additional_args(mut self, args: impl Into<String>) -> Self {
        self.additional_args = Some(args.into());
        self
    }

    /// A present configuration must name at least one package, and none of them blank.
    pub fn validate(&self) -> Result<()> {
        if self.packages.is_empty() {
            bail!("install configuration must list at least one package");
        }
        if let Some(pos) = self.packages.iter().position(|p| p.trim().is_empty()) {
            bail!("package #{} is empty", pos + 1);
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Executable invoked as `<package_manager> install ...`.
    pub package_manager: String,
    pub platform: String,
}

impl Settings {
    /// Both values end up on the command line, so neither may be blank.
    pub fn validate(&self) -> Result<()> {
        if self.package_manager.trim().is_empty() {
            bail!("settings.package_manager must not be empty");
        }
        if self.platform.trim().is_empty() {
            bail!("settings.platform must not be empty");
        }
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            package_manager: DEFAULT_PACKAGE_MANAGER.to_string(),
            platform: DEFAULT_PLATFORM.to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// Outputs without an `install` table are skipped.
    pub install: Option<InstallConfig>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(deny_unknown_fields)]
pub struct DepstageConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, rename = "output")]
    pub outputs: Vec<OutputConfig>,
}

impl DepstageConfig {
    /// Parse and validate config text. Output directories are left as written.
    pub fn parse(content: &str) -> Result<Self> {
        let config: DepstageConfig = toml::from_str(content)
            .context("Failed to parse depstage.toml - check for syntax errors or misspelled keys")?;

        for output in &config.outputs {
            if let Some(install) = &output.install {
                install.validate().with_context(|| {
                    format!("Invalid [output.install] for '{}'", output.dir.display())
                })?;
            }
        }
        config.settings.validate()?;

        Ok(config)
    }

    /// Resolve relative output directories against `base`.
    pub fn resolve_relative_to(&mut self, base: &Path) {
        for output in &mut self.outputs {
            if output.dir.is_relative() {
                output.dir = base.join(&output.dir);
            }
        }
    }
}

pub fn load_config(path: &Path) -> Result<DepstageConfig> {
    if !path.exists() {
        bail!(
            "{} not found.\n\n\
            💡 Tip: pass an output directory and --package, or create {} with [[output]] entries.",
            path.display(),
            CONFIG_FILE
        );
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} - check file permissions", path.display()))?;

    let mut config = DepstageConfig::parse(&content)?;

    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.resolve_relative_to(base);

    tracing::debug!(
        path = %path.display(),
        outputs = config.outputs.len(),
        "loaded configuration"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[settings]
package_manager = "pnpm"

[[output]]
dir = "server-functions/default"
[output.install]
packages = ["sharp@0.32.0", "canvas"]
arch = "arm64"
nodeVersion = "18"
libc = "glibc"
additionalArgs = "--no-save"

[[output]]
dir = "/abs/image-optimizer"
"#;

    #[test]
    fn test_parse_sample() {
        let config = DepstageConfig::parse(SAMPLE).unwrap();
        assert_eq!(config.settings.package_manager, "pnpm");
        assert_eq!(config.settings.platform, DEFAULT_PLATFORM);
        assert_eq!(config.outputs.len(), 2);

        let install = config.outputs[0].install.as_ref().unwrap();
        assert_eq!(install.packages, vec!["sharp@0.32.0", "canvas"]);
        assert_eq!(install.arch.as_deref(), Some("arm64"));
        assert_eq!(install.node_version.as_deref(), Some("18"));
        assert_eq!(install.libc.as_deref(), Some("glibc"));
        assert_eq!(install.additional_args.as_deref(), Some("--no-save"));

        assert!(config.outputs[1].install.is_none());
    }

    #[test]
    fn test_snake_case_keys_accepted() {
        let config = DepstageConfig::parse(
            r#"
[[output]]
dir = "out"
[output.install]
packages = ["sharp"]
node_version = "20"
additional_args = "--legacy-peer-deps"
"#,
        )
        .unwrap();
        let install = config.outputs[0].install.as_ref().unwrap();
        assert_eq!(install.node_version.as_deref(), Some("20"));
        assert_eq!(
            install.additional_args.as_deref(),
            Some("--legacy-peer-deps")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = DepstageConfig::parse("").unwrap();
        assert_eq!(config.settings, Settings::default());
        assert!(config.outputs.is_empty());
    }

    #[test]
    fn test_empty_packages_rejected() {
        let err = DepstageConfig::parse(
            r#"
[[output]]
dir = "out"
[output.install]
packages = []
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("at least one package"));
    }

    #[test]
    fn test_blank_package_rejected() {
        let config = InstallConfig::new(["sharp", "  "]);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("package #2"));
    }

    #[test]
    fn test_resolve_relative_dirs() {
        let mut config = DepstageConfig::parse(SAMPLE).unwrap();
        config.resolve_relative_to(Path::new("/project"));
        assert_eq!(
            config.outputs[0].dir,
            PathBuf::from("/project/server-functions/default")
        );
        assert_eq!(config.outputs[1].dir, PathBuf::from("/abs/image-optimizer"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_load_config_resolves_against_file_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, SAMPLE).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.outputs[0].dir,
            dir.path().join("server-functions/default")
        );
    }

    #[test]
    fn test_builder_methods() {
        let config = InstallConfig::new(["sharp@0.32.0"])
            .with_arch("arm64")
            .with_libc("musl")
            .with_node_version("18")
            .with_additional_args("--omit=dev");
        assert_eq!(config.arch.as_deref(), Some("arm64"));
        assert_eq!(config.libc.as_deref(), Some("musl"));
        assert_eq!(config.node_version.as_deref(), Some("18"));
        assert_eq!(config.additional_args.as_deref(), Some("--omit=dev"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_blank_settings_rejected() {
        let err = DepstageConfig::parse("[settings]\nplatform = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("settings.platform"));

        let err = DepstageConfig::parse("[settings]\npackage_manager = \" \"\n").unwrap_err();
        assert!(err.to_string().contains("settings.package_manager"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let err = DepstageConfig::parse(
            r#"
[[output]]
dir = "out"
[output.install]
packages = ["sharp"]
node-version = "18"
"#,
        )
        .unwrap_err();
        assert!(format!("{err:#}").contains("node-version"));

        let err = DepstageConfig::parse("[settings]\npackageManager = \"pnpm\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("packageManager"));
    }
}
