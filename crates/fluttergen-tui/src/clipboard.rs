use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};

type Helper = (&'static str, Vec<&'static str>);

/// Clipboard helpers tried in order for the current platform
fn candidates() -> Vec<Helper> {
    if cfg!(target_os = "macos") {
        vec![("pbcopy", vec![])]
    } else if cfg!(target_os = "windows") {
        vec![("clip", vec![])]
    } else {
        vec![
            ("wl-copy", vec![]),
            ("xclip", vec!["-selection", "clipboard"]),
            ("xsel", vec!["--clipboard", "--input"]),
        ]
    }
}

/// Copy text to the system clipboard by piping it into a platform helper
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    copy_with(&candidates(), text)
}

/// Pipe text into the first helper that accepts it
fn copy_with(helpers: &[Helper], text: &str) -> Result<()> {
    for (program, args) in helpers {
        let mut child = match Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => child,
            Err(_) => continue,
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                tracing::debug!(program, error = %e, "clipboard helper rejected input");
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                continue;
            }
        }

        let status = child.wait().with_context(|| format!("{} did not finish", program))?;
        if status.success() {
            tracing::debug!(program, bytes = text.len(), "copied to clipboard");
            return Ok(());
        }
    }

    Err(anyhow!("No clipboard helper available"))
}
