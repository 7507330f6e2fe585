use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;

use crate::error::ServerError;
use crate::storage::model_stem;

/// One run of the external converter on an uploaded file.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub converter: PathBuf,
    pub input: PathBuf,
    pub profile: String,
    pub output: PathBuf,
}

impl ConversionJob {
    pub fn args(&self) -> Vec<String> {
        vec![
            "-i".to_string(),
            self.input.display().to_string(),
            "-p".to_string(),
            self.profile.clone(),
            "-e".to_string(),
            self.output.display().to_string(),
        ]
    }

    /// The command as a shell would show it, used in failure messages.
    pub fn command_line(&self) -> String {
        format!(
            "\"{}\" -i \"{}\" -p {} -e \"{}\"",
            self.converter.display(),
            self.input.display(),
            self.profile,
            self.output.display()
        )
    }

    /// Run the converter and wait for it. The child is killed if the wait is abandoned.
    pub async fn run(&self, timeout: Option<Duration>) -> Result<(), ServerError> {
        let job_id = uuid::Uuid::new_v4();
        tracing::info!("[{job_id}] converting: {}", self.command_line());

        let mut command = Command::new(&self.converter);
        command
            .args(self.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| {
                    tracing::warn!("[{job_id}] converter timed out after {limit:?}");
                    ServerError::ConversionTimeout(limit.as_secs())
                })?,
            None => command.output().await,
        };

        let output = output.map_err(|e| self.failure(&e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::error!("[{job_id}] converter exited with {}", output.status);
            return Err(self.failure(stderr.trim_end()));
        }

        tracing::info!("[{job_id}] conversion finished: {}", self.output.display());
        Ok(())
    }

    fn failure(&self, detail: &str) -> ServerError {
        ServerError::Conversion(format!("Command failed: {}\n{}", self.command_line(), detail))
    }
}

/// The converter names sheet-metal geometry after an empty stem (`.cdxfb`,
/// `_unfolded.cdxfb`); give those files the stem of the uploaded model.
/// Returns the number of renamed files.
pub fn rename_sheet_metal_outputs(dir: &Path, original_name: &str) -> std::io::Result<usize> {
    let stem = model_stem(original_name);

    let mut renamed = 0;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let target = match name.to_str() {
            Some(".cdxfb") => format!("{stem}.cdxfb"),
            Some("_unfolded.cdxfb") => format!("{stem}_unfolded.cdxfb"),
            _ => continue,
        };
        if name.to_str() == Some(target.as_str()) {
            continue;
        }
        std::fs::rename(entry.path(), dir.join(&target))?;
        tracing::debug!("renamed {name:?} -> {target}");
        renamed += 1;
    }
    Ok(renamed)
}
