//! Line-oriented shell: JSON events on stdout, commands and dialog answers on stdin.

use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use scout_engine::{Shell, ShellError};
use scout_logging::{scout_info, scout_warn};
use serde_json::{json, Value};

type Input = Box<dyn BufRead + Send>;
type Output = Box<dyn Write + Send>;

pub struct ConsoleShell {
    input: Mutex<Input>,
    output: Mutex<Output>,
    opener: Option<String>,
    closed: AtomicBool,
}

impl ConsoleShell {
    pub fn stdio() -> Self {
        Self::new(
            Box::new(io::BufReader::new(io::stdin())),
            Box::new(io::stdout()),
            platform_opener(),
        )
    }

    pub fn new(input: Input, output: Output, opener: Option<String>) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
            opener,
            closed: AtomicBool::new(false),
        }
    }

    /// Next input line without its terminator; `None` at end of input.
    pub fn read_line(&self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let mut input = self.input.lock().unwrap_or_else(PoisonError::into_inner);
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Writes one JSON document as a single line.
    pub fn emit(&self, value: &Value) -> io::Result<()> {
        let mut output = self.output.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(output, "{value}")?;
        output.flush()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Shell for ConsoleShell {
    fn pick_directory(&self) -> Result<Option<PathBuf>, ShellError> {
        self.emit(&json!({ "channel": "dialog", "payload": { "kind": "directory" } }))?;
        let answer = self
            .read_line()?
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty());
        Ok(answer.map(PathBuf::from))
    }

    fn push_event(&self, channel: &str, payload: &Value) -> Result<(), ShellError> {
        if self.is_closed() {
            return Err(ShellError::Unavailable("console closed".to_string()));
        }
        self.emit(&json!({ "channel": channel, "payload": payload }))
            .map_err(|err| ShellError::Delivery {
                channel: channel.to_string(),
                message: err.to_string(),
            })
    }

    fn open_path(&self, path: &Path) -> Result<(), ShellError> {
        self.emit(&json!({ "channel": "open", "payload": { "path": path.display().to_string() } }))?;
        let Some(opener) = &self.opener else {
            return Ok(());
        };
        match Command::new(opener).arg(path).spawn() {
            Ok(_) => {
                scout_info!("Opened {:?} with {}", path, opener);
                Ok(())
            }
            Err(err) => {
                scout_warn!("Could not run {} for {:?}: {}", opener, path, err);
                Err(err.into())
            }
        }
    }

    fn destroy(&self) -> Result<(), ShellError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.emit(&json!({ "channel": "exit", "payload": {} }))?;
        Ok(())
    }
}

fn platform_opener() -> Option<String> {
    let opener = if cfg!(target_os = "windows") {
        "explorer"
    } else if cfg!(target_os = "macos") {
        "open"
    } else {
        "xdg-open"
    };
    Some(opener.to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn lines(&self) -> Vec<Value> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(|line| serde_json::from_str(line).unwrap())
                .collect()
        }
    }

    fn shell(input: &str) -> (ConsoleShell, Captured) {
        let captured = Captured::default();
        let shell = ConsoleShell::new(
            Box::new(Cursor::new(input.as_bytes().to_vec())),
            Box::new(captured.clone()),
            None,
        );
        (shell, captured)
    }

    #[test]
    fn events_are_json_lines() {
        let (shell, captured) = shell("");
        shell.push_event("item", &json!({ "price": 3 })).unwrap();
        assert_eq!(
            captured.lines(),
            vec![json!({ "channel": "item", "payload": { "price": 3 } })]
        );
    }

    #[test]
    fn directory_answer_comes_from_input() {
        let (shell, _) = shell("/data/out\n\n");
        assert_eq!(
            shell.pick_directory().unwrap(),
            Some(PathBuf::from("/data/out"))
        );
        assert_eq!(shell.pick_directory().unwrap(), None);
        assert_eq!(shell.pick_directory().unwrap(), None);
    }

    #[test]
    fn closed_console_refuses_events() {
        let (shell, captured) = shell("");
        shell.destroy().unwrap();
        shell.destroy().unwrap();
        assert!(shell.push_event("status", &json!({})).is_err());
        assert_eq!(captured.lines().len(), 1);
    }
}
