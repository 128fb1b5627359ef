use crate::config::{MetadataConfig, VersionFile};
use crate::domain::SemanticVersion;
use crate::error::{ReleaseError, Result};
use log::{debug, info};
use regex::Regex;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Environment variable carrying the target version to the metadata command
pub const VERSION_ENV: &str = "RELEASE_VERSION";

/// Writes a version into the working tree before it is committed.
///
/// Runs the configured external command (if any) and then rewrites the
/// configured version files. Both are optional; with neither configured the
/// update is a no-op and the following commit records nothing new.
pub struct MetadataUpdater {
    config: MetadataConfig,
}

impl MetadataUpdater {
    pub fn new(config: MetadataConfig) -> Self {
        MetadataUpdater { config }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.command.is_empty() || !self.config.files.is_empty()
    }

    /// Update the working tree at `workdir` to `version`
    pub fn update(&self, workdir: &Path, version: &SemanticVersion) -> Result<()> {
        if !self.config.command.is_empty() {
            self.run_command(workdir, version)?;
        }
        for file in &self.config.files {
            rewrite_version_file(workdir, file, version)?;
        }
        Ok(())
    }

    /// Execute the metadata command with a hard timeout
    ///
    /// `{version}` in any argument is replaced by the version. A missing
    /// program, a non-zero exit or running past the timeout all fail.
    fn run_command(&self, workdir: &Path, version: &SemanticVersion) -> Result<()> {
        let version_text = version.to_string();
        let (program, args) = match self.config.command.split_first() {
            Some(parts) => parts,
            None => return Ok(()),
        };
        let args: Vec<String> = args
            .iter()
            .map(|arg| arg.replace("{version}", &version_text))
            .collect();

        debug!("running metadata command {} {:?}", program, args);
        let mut child = Command::new(program)
            .args(&args)
            .current_dir(workdir)
            .env(VERSION_ENV, &version_text)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    ReleaseError::external_tool(format!("'{}' not found", program))
                }
                _ => ReleaseError::external_tool(format!("Failed to start '{}': {}", program, e)),
            })?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match child.wait_timeout(timeout)? {
            Some(status) if status.success() => {
                info!("metadata updated to {}", version_text);
                Ok(())
            }
            Some(status) => Err(ReleaseError::external_tool(format!(
                "'{}' failed with exit code {}",
                program,
                status.code().unwrap_or(-1)
            ))),
            None => {
                let _ = child.kill();
                let _ = child.wait();
                Err(ReleaseError::external_tool(format!(
                    "'{}' timed out after {} seconds",
                    program,
                    timeout.as_secs()
                )))
            }
        }
    }
}

fn rewrite_version_file(workdir: &Path, file: &VersionFile, version: &SemanticVersion) -> Result<()> {
    let path = workdir.join(&file.path);
    let version_text = version.to_string();

    let updated = match &file.pattern {
        None => format!("{}\n", version_text),
        Some(pattern) => {
            let regex = Regex::new(pattern).map_err(|e| {
                ReleaseError::config(format!("Invalid pattern for '{}': {}", file.path, e))
            })?;
            let content = fs::read_to_string(&path)?;
            let group = regex
                .captures(&content)
                .and_then(|captures| captures.get(1))
                .ok_or_else(|| {
                    ReleaseError::config(format!(
                        "Pattern '{}' does not match a capture group in '{}'",
                        pattern, file.path
                    ))
                })?;
            format!(
                "{}{}{}",
                &content[..group.start()],
                version_text,
                &content[group.end()..]
            )
        }
    };

    fs::write(&path, updated)?;
    debug!("wrote {} to {}", version_text, path.display());
    Ok(())
}
