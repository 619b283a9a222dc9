//! Command-line options understood by `go-smart-launcher`.

use std::path::PathBuf;

/// Tokens the launcher would read as stream redirections; they are never
/// passed through.
const STREAM_TOKENS: &[&str] = &["stdin", "stdout", "stderr"];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LauncherArguments {
  /// Configuration files, relative to the job directory.
  pub config_files:  Vec<String>,
  /// Where the launcher reports progress.
  pub status_socket: Option<PathBuf>,
  pub debug:         bool,
  /// Additional raw options, passed through as given.
  pub extra:         Vec<String>,
}

impl LauncherArguments {
  pub fn new(config_files: impl IntoIterator<Item = impl Into<String>>) -> Self {
    Self {
      config_files: config_files.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  /// Every recognised option as argv entries, config files last.
  pub fn to_list(&self) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(socket) = &self.status_socket {
      args.push("--status-socket".to_owned());
      args.push(socket.to_string_lossy().into_owned());
    }
    if self.debug {
      args.push("--debug".to_owned());
    }
    args.extend(self.extra.iter().cloned());
    args.extend(self.config_files.iter().cloned());
    args
  }

  /// [`to_list`](Self::to_list) minus the stream tokens; this is what gets
  /// executed.
  pub fn to_argv(&self) -> Vec<String> {
    self
      .to_list()
      .into_iter()
      .filter(|a| !STREAM_TOKENS.contains(&a.as_str()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn socket_flags_then_config_files() {
    let mut args = LauncherArguments::new(["settings.xml"]);
    args.status_socket = Some(PathBuf::from("/jobs/abc/update.sock"));
    args.debug = true;

    assert_eq!(args.to_argv(), vec![
      "--status-socket",
      "/jobs/abc/update.sock",
      "--debug",
      "settings.xml",
    ]);
  }

  #[test]
  fn stream_tokens_are_filtered() {
    let mut args = LauncherArguments::new(["settings.xml"]);
    args.extra = vec!["--log".into(), "stdout".into(), "stderr".into(), "--quiet".into()];

    assert!(args.to_list().contains(&"stdout".to_owned()));
    assert_eq!(args.to_argv(), vec!["--log", "--quiet", "settings.xml"]);
  }
}
