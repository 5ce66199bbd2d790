// Console prompt adapter - Collects run requests from the operator

use std::collections::VecDeque;
use std::io::{self, BufRead, Stdin, StdinLock, Stdout, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::ports::*;
use crate::utils::{clean_dropped_path, parse_hms};

const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";
const RULE: &str = "-------------------------------------------------------------------------";

/// Interactive prompts over any line reader and writer.
///
/// End of input ends the session.
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
    output_root: PathBuf,
    clear_screen: bool,
}

impl ConsolePrompter<StdinLock<'static>, Stdout> {
    /// Prompter bound to the process terminal
    pub fn terminal(output_root: impl Into<PathBuf>) -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout(), output_root).with_clear_screen(true)
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W, output_root: impl Into<PathBuf>) -> Self {
        Self {
            input,
            output,
            output_root: output_root.into(),
            clear_screen: false,
        }
    }

    pub fn with_clear_screen(mut self, clear_screen: bool) -> Self {
        self.clear_screen = clear_screen;
        self
    }

    fn io_error(e: io::Error) -> DomainError {
        DomainError::Fs(format!("Console I/O failed: {}", e))
    }

    fn intro_message(&mut self) -> Result<(), DomainError> {
        if self.clear_screen {
            write!(self.output, "{}", CLEAR_SCREEN).map_err(Self::io_error)?;
        }
        writeln!(self.output, "{}", RULE).map_err(Self::io_error)?;
        writeln!(
            self.output,
            "Follow instructions to trim local video whilst avoiding transcode when possible:"
        )
        .map_err(Self::io_error)?;
        writeln!(
            self.output,
            "Files will be exported to: {}",
            self.output_root.display()
        )
        .map_err(Self::io_error)?;
        writeln!(self.output, "{}\n", RULE).map_err(Self::io_error)
    }

    /// One trimmed answer; `None` at end of input
    fn ask(&mut self, prompt: &str) -> Result<Option<String>, DomainError> {
        write!(self.output, "{}", prompt).map_err(Self::io_error)?;
        self.output.flush().map_err(Self::io_error)?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(Self::io_error)?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// A path that must exist, re-asked until it does
    fn ask_required_path(&mut self, prompt: &str) -> Result<Option<PathBuf>, DomainError> {
        loop {
            let Some(answer) = self.ask(prompt)? else {
                return Ok(None);
            };
            let cleaned = clean_dropped_path(&answer);
            if !cleaned.is_empty() && Path::new(&cleaned).exists() {
                return Ok(Some(PathBuf::from(cleaned)));
            }
            warn!("Something went wrong, please ensure you entered a valid file path.");
        }
    }

    /// A path that may be left blank; the outer `None` means end of input
    fn ask_optional_path(&mut self, prompt: &str) -> Result<Option<Option<PathBuf>>, DomainError> {
        loop {
            let Some(answer) = self.ask(prompt)? else {
                return Ok(None);
            };
            let cleaned = clean_dropped_path(&answer);
            if cleaned.is_empty() {
                return Ok(Some(None));
            }
            if Path::new(&cleaned).exists() {
                return Ok(Some(Some(PathBuf::from(cleaned))));
            }
            warn!("Something went wrong, please ensure you entered a valid file path.");
        }
    }

    fn ask_time(&mut self, mode: &str) -> Result<Option<Option<String>>, DomainError> {
        let prompt = format!(
            "What {} point do you want? (hh:mm:ss, leave blank for default): ",
            mode
        );
        loop {
            let Some(answer) = self.ask(&prompt)? else {
                return Ok(None);
            };
            if answer.is_empty() {
                return Ok(Some(None));
            }
            match parse_hms(&answer) {
                Ok(_) => return Ok(Some(Some(answer))),
                Err(e) => warn!("{}", e),
            }
        }
    }

    fn ask_yes_no(&mut self, prompt: &str) -> Result<Option<bool>, DomainError> {
        Ok(self
            .ask(prompt)?
            .map(|answer| answer.to_lowercase().starts_with('y')))
    }
}

impl<R: BufRead, W: Write> RequestSource for ConsolePrompter<R, W> {
    fn next_request(&mut self) -> Result<Option<RunRequest>, DomainError> {
        self.intro_message()?;

        let Some(primary) = self.ask_required_path("Drag and drop local file: ")? else {
            return Ok(None);
        };
        let Some(inpoint) = self.ask_time("in")? else {
            return Ok(None);
        };
        let Some(outpoint) = self.ask_time("out")? else {
            return Ok(None);
        };
        let Some(watermark) =
            self.ask_optional_path("Watermark image (leave blank for none): ")?
        else {
            return Ok(None);
        };
        let Some(intro) = self.ask_optional_path("Intro clip or image (leave blank for none): ")?
        else {
            return Ok(None);
        };
        let Some(outro) = self.ask_optional_path("Outro clip or image (leave blank for none): ")?
        else {
            return Ok(None);
        };
        let Some(suffix) = self.ask("Output name suffix (leave blank for none): ")? else {
            return Ok(None);
        };
        let Some(secondary_path) = self.ask_optional_path(
            "Make another version from a second file? (path, leave blank to skip): ",
        )?
        else {
            return Ok(None);
        };

        let secondary = match secondary_path {
            Some(path) => {
                let watermark = if watermark.is_some() {
                    let Some(answer) = self.ask_yes_no("Watermark the second version? (yes/no): ")?
                    else {
                        return Ok(None);
                    };
                    answer
                } else {
                    false
                };
                Some(SecondaryInput { path, watermark })
            }
            None => None,
        };

        let mut request = RunRequest::new(primary, TrimRange::new(inpoint, outpoint)?);
        request.watermark = watermark;
        request.intro = intro;
        request.outro = outro;
        request.suffix = Some(suffix).filter(|s| !s.is_empty());
        request.secondary = secondary;
        Ok(Some(request))
    }
}

/// Hands out a fixed list of requests, then ends the session
pub struct FixedRequests {
    queue: VecDeque<RunRequest>,
}

impl FixedRequests {
    pub fn new(requests: impl IntoIterator<Item = RunRequest>) -> Self {
        Self {
            queue: requests.into_iter().collect(),
        }
    }
}

impl RequestSource for FixedRequests {
    fn next_request(&mut self) -> Result<Option<RunRequest>, DomainError> {
        Ok(self.queue.pop_front())
    }
}
