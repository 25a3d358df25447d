//! Launch metadata of a spawned process.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Immutable snapshot of how a process was launched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    /// Program that was executed.
    pub command: String,
    /// Command line arguments.
    pub args: Vec<String>,
    /// Working directory, `None` when inherited.
    pub working_dir: Option<PathBuf>,
    /// When the process was started.
    pub started_at: DateTime<Utc>,
    /// OS process id at launch time.
    pub pid: Option<u32>,
}

impl ProcessInfo {
    /// Get the full command string with arguments.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use execreg::ProcessInfo;
    ///
    /// let info = ProcessInfo {
    ///     command: "ls".to_string(),
    ///     args: vec!["-la".to_string()],
    ///     working_dir: None,
    ///     started_at: chrono::Utc::now(),
    ///     pid: None,
    /// };
    /// assert_eq!(info.command_line(), "ls -la");
    /// ```
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            return self.command.clone();
        }
        format!("{} {}", self.command, self.args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_without_args() {
        let info = ProcessInfo {
            command: String::from("pwd"),
            args: Vec::new(),
            working_dir: None,
            started_at: Utc::now(),
            pid: Some(1),
        };
        assert_eq!(info.command_line(), "pwd");
    }

    #[test]
    fn serializes_to_json() -> Result<(), serde_json::Error> {
        let info = ProcessInfo {
            command: String::from("sh"),
            args: vec![String::from("-c"), String::from("true")],
            working_dir: Some(PathBuf::from("/tmp")),
            started_at: Utc::now(),
            pid: Some(42),
        };
        let json = serde_json::to_string(&info)?;
        assert_eq!(serde_json::from_str::<ProcessInfo>(&json)?, info);
        Ok(())
    }
}
