use std::io::{BufRead, Write};

use anyhow::Result;
use cipherstudio_project::{
    CreateOutcome, EditOutcome, FilePath, PreviewRuntime, RenameOutcome, RuntimeBundle, Studio,
    StudioError,
};
use cipherstudio_settings::{Theme, ThemeStore};
use cipherstudio_storage::KeyValueStore;

const HELP: &str = "\
Commands:
  ls                     list files (* marks the active file)
  show [PATH]            print a file (defaults to the active file)
  create NAME            create a file and make it active
  delete PATH            delete a file
  select PATH            make a file active
  rename PATH NAME       rename a file
  edit TEXT              replace the active file's content (\\n for newlines)
  save                   save the project as a new snapshot
  load [ID]              load a snapshot (defaults to the last id)
  theme [toggle|dark|light]
  help
  quit";

/// Stand-in for the preview runtime: reports what it was asked to do.
/// 代替預覽執行環境，記錄收到的要求。
#[derive(Debug, Default)]
pub struct ConsoleRuntime {
    events: Vec<String>,
}

impl ConsoleRuntime {
    fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.events)
    }
}

impl PreviewRuntime for ConsoleRuntime {
    fn reload(&mut self, bundle: &RuntimeBundle) {
        let active = bundle.active.as_ref().map_or("none", FilePath::as_str);
        self.events.push(format!(
            "[preview] reloaded {} file(s), active {active}",
            bundle.files.len()
        ));
    }

    fn focus(&mut self, active: Option<&FilePath>) {
        let active = active.map_or("none", FilePath::as_str);
        self.events.push(format!("[preview] focus {active}"));
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Runs the interactive loop until `quit` or end of input.
/// 執行互動式指令迴圈，直到 `quit` 或輸入結束。
pub fn run<S, T, R, W>(
    studio: &mut Studio<S>,
    theme: &mut ThemeStore<T>,
    input: R,
    output: &mut W,
    prompt: bool,
) -> Result<()>
where
    S: KeyValueStore,
    T: KeyValueStore,
    R: BufRead,
    W: Write,
{
    let mut runtime = ConsoleRuntime::default();
    if !studio.load_id().is_empty() {
        writeln!(output, "Last project id: {}", studio.load_id())?;
    }
    writeln!(output, "Theme: {}", theme.theme())?;
    sync(studio, &mut runtime, output)?;

    let mut lines = input.lines();
    loop {
        if prompt {
            write!(output, "> ")?;
            output.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Flow::Quit = execute(studio, theme, line, output)? {
            break;
        }
        sync(studio, &mut runtime, output)?;
    }
    Ok(())
}

fn sync<S: KeyValueStore, W: Write>(
    studio: &mut Studio<S>,
    runtime: &mut ConsoleRuntime,
    output: &mut W,
) -> Result<()> {
    studio.sync_runtime(runtime);
    for event in runtime.drain() {
        writeln!(output, "{event}")?;
    }
    Ok(())
}

fn execute<S, T, W>(
    studio: &mut Studio<S>,
    theme: &mut ThemeStore<T>,
    line: &str,
    output: &mut W,
) -> Result<Flow>
where
    S: KeyValueStore,
    T: KeyValueStore,
    W: Write,
{
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };

    match command {
        "ls" => {
            let active = studio.project().active();
            for path in studio.project().paths() {
                let marker = if Some(path) == active { '*' } else { ' ' };
                writeln!(output, "{marker} {path}")?;
            }
        }
        "show" => {
            let target = if rest.is_empty() {
                studio.project().active().map(|path| path.as_str().to_string())
            } else {
                Some(rest.to_string())
            };
            match target.as_deref().and_then(|path| studio.project().file(path)) {
                Some(file) => write!(output, "{}", ensure_newline(&file.content))?,
                None => writeln!(output, "No such file")?,
            }
        }
        "create" => match studio.create_file(rest) {
            CreateOutcome::Created(path) => writeln!(output, "Created {path}")?,
            CreateOutcome::Exists(path) => writeln!(output, "{path} already exists")?,
            CreateOutcome::Rejected(_) => {}
        },
        "delete" => {
            if studio.delete_file(rest) {
                writeln!(output, "Deleted {rest}")?;
            }
        }
        "select" => match studio.select_file(rest) {
            Ok(()) => writeln!(output, "Active file: {rest}")?,
            Err(err) => writeln!(output, "Invalid path: {err}")?,
        },
        "rename" => {
            let (from, to) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            match studio.rename_file(from, to.trim()) {
                RenameOutcome::Renamed { from, to } => writeln!(output, "Renamed {from} to {to}")?,
                RenameOutcome::SourceMissing => writeln!(output, "No such file")?,
                RenameOutcome::TargetExists(path) => writeln!(output, "{path} already exists")?,
                RenameOutcome::Rejected(err) => writeln!(output, "Invalid name: {err}")?,
            }
        }
        "edit" => match studio.edit_active(unescape(rest)) {
            EditOutcome::Applied(path) => writeln!(output, "Updated {path}")?,
            EditOutcome::Ignored => writeln!(output, "No active file")?,
        },
        "save" => match studio.save_project() {
            Ok(id) => writeln!(output, "Saved project id: {id}")?,
            Err(err) => writeln!(output, "Save failed: {err}")?,
        },
        "load" => {
            let result = if rest.is_empty() {
                studio.load_from_field()
            } else {
                studio.load_project(rest)
            };
            match result {
                Ok(()) => writeln!(output, "Loaded project {}", studio.load_id())?,
                Err(err @ StudioError::ProjectNotFound { .. }) => writeln!(output, "{err}")?,
                Err(err) => writeln!(output, "Load failed: {err}")?,
            }
        }
        "theme" => {
            let result = match rest {
                "" => Ok(()),
                "toggle" => theme.toggle().map(|_| ()),
                other => match other.parse::<Theme>() {
                    Ok(next) => theme.set(next),
                    Err(err) => {
                        writeln!(output, "{err}")?;
                        return Ok(Flow::Continue);
                    }
                },
            };
            writeln!(output, "Theme: {}", theme.theme())?;
            if let Err(err) = result {
                writeln!(output, "Theme not saved: {err}")?;
            }
        }
        "help" => writeln!(output, "{HELP}")?,
        "quit" | "exit" => return Ok(Flow::Quit),
        other => writeln!(output, "Unknown command `{other}` (try `help`)")?,
    }
    Ok(Flow::Continue)
}

fn ensure_newline(text: &str) -> String {
    if text.is_empty() || text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// Expands `\n`, `\t` and `\\` in a single-line argument.
fn unescape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            result.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => result.push('\n'),
            Some('t') => result.push('\t'),
            Some('\\') => result.push('\\'),
            Some(other) => {
                result.push('\\');
                result.push(other);
            }
            None => result.push('\\'),
        }
    }
    result
}
