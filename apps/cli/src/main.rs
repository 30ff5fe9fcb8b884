mod shell;

use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use cipherstudio_project::{SnapshotId, SnapshotIdGenerator, SnapshotManager, Studio, StudioError};
use cipherstudio_settings::{detect_system_theme, Preferences, PreferencesStore, Theme, ThemeStore};
use cipherstudio_storage::{FileStore, Namespaced};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

type Storage = Namespaced<FileStore>;

#[derive(Parser)]
#[command(
    name = "cipherstudio",
    about = "Project shell for the CipherStudio mini IDE",
    author,
    version
)]
struct Cli {
    /// 工作區根目錄；預設為目前目錄。 / Workspace root (defaults to current directory).
    #[arg(long, global = true, value_name = "PATH")]
    workspace: Option<PathBuf>,
    /// 鍵值儲存檔案。 / Key/value storage file.
    #[arg(long, global = true, value_name = "FILE")]
    storage: Option<PathBuf>,
    /// 偏好設定檔。 / Preferences file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 互動式編輯工作階段。 / Interactive editing session over stdin.
    Shell,
    /// 檢視或刪除已儲存的快照。 / Inspect or delete saved snapshots.
    #[command(subcommand)]
    Snapshot(SnapshotCommand),
    /// 顯示最近使用的快照識別碼。 / Print the last used snapshot id.
    Last,
    /// 顯示或變更主題。 / Show or change the theme.
    Theme(ThemeArgs),
}

#[derive(Subcommand)]
enum SnapshotCommand {
    /// 列印快照中的檔案。 / Print the files of a snapshot.
    Show {
        #[arg(value_name = "ID")]
        id: String,
    },
    /// 刪除快照。 / Delete a snapshot.
    Delete {
        #[arg(value_name = "ID")]
        id: String,
    },
}

#[derive(Args)]
struct ThemeArgs {
    #[arg(value_enum)]
    action: Option<ThemeAction>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ThemeAction {
    Toggle,
    Dark,
    Light,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let Cli {
        workspace,
        storage,
        config,
        command,
    } = Cli::parse();
    let workspace_root = resolve_workspace(workspace)?;
    let preferences = load_preferences(config, &workspace_root)?;
    let storage = open_storage(storage, &preferences, &workspace_root);

    match command {
        Commands::Shell => execute_shell(storage, &preferences),
        Commands::Snapshot(subcommand) => {
            execute_snapshot_command(subcommand, storage, &preferences)
        }
        Commands::Last => {
            match snapshot_manager(storage, &preferences).load_last_used_id()? {
                Some(id) => println!("{id}"),
                None => println!("No project saved yet"),
            }
            Ok(())
        }
        Commands::Theme(args) => execute_theme(args, storage),
    }
}

fn execute_shell(storage: Storage, preferences: &Preferences) -> Result<()> {
    let mut theme = ThemeStore::load(storage.clone(), detect_system_theme());
    let mut studio = Studio::with_snapshots(snapshot_manager(storage, preferences));
    let stdin = io::stdin();
    let prompt = stdin.is_terminal();
    let mut stdout = io::stdout().lock();
    shell::run(&mut studio, &mut theme, stdin.lock(), &mut stdout, prompt)
}

fn execute_snapshot_command(
    command: SnapshotCommand,
    storage: Storage,
    preferences: &Preferences,
) -> Result<()> {
    let manager = snapshot_manager(storage, preferences);
    match command {
        SnapshotCommand::Show { id } => {
            let id = SnapshotId::new(id.trim());
            let loaded = match manager.load(&id) {
                Ok(loaded) => loaded,
                Err(err) if err.is_not_found() => {
                    debug!(%err, "snapshot lookup failed");
                    bail!(StudioError::ProjectNotFound { id, source: err });
                }
                Err(err) => {
                    return Err(err).with_context(|| format!("failed to load snapshot {id}"));
                }
            };
            for (path, file) in &loaded.files {
                println!("== {path} ==");
                print!("{}", file.content);
                if !file.content.ends_with('\n') {
                    println!();
                }
            }
            Ok(())
        }
        SnapshotCommand::Delete { id } => {
            let id = SnapshotId::new(id.trim());
            if manager
                .delete(&id)
                .with_context(|| format!("failed to delete snapshot {id}"))?
            {
                println!("Deleted snapshot {id}");
                Ok(())
            } else {
                bail!("Project not found: {id}")
            }
        }
    }
}

fn execute_theme(args: ThemeArgs, storage: Storage) -> Result<()> {
    let mut store = ThemeStore::load(storage, detect_system_theme());
    let result = match args.action {
        None => Ok(()),
        Some(ThemeAction::Toggle) => store.toggle().map(|_| ()),
        Some(ThemeAction::Dark) => store.set(Theme::Dark),
        Some(ThemeAction::Light) => store.set(Theme::Light),
    };
    result.context("failed to persist theme")?;
    println!("Theme: {}", store.theme());
    Ok(())
}

fn snapshot_manager(storage: Storage, preferences: &Preferences) -> SnapshotManager<Storage> {
    SnapshotManager::with_generator(
        storage,
        SnapshotIdGenerator::new(preferences.snapshots.id_prefix.clone()),
    )
}

fn load_preferences(config: Option<PathBuf>, workspace_root: &Path) -> Result<Preferences> {
    let path = match config {
        Some(path) => resolve_path(&path, workspace_root),
        None => state_dir(workspace_root).join("preferences.json"),
    };
    let store = PreferencesStore::load(&path)
        .with_context(|| format!("failed to load preferences from {}", path.display()))?;
    Ok(store.preferences().clone())
}

/// Opens the storage file. A file that cannot be opened does not stop the
/// session: every save and load then reports the storage as unavailable.
fn open_storage(
    storage: Option<PathBuf>,
    preferences: &Preferences,
    workspace_root: &Path,
) -> Storage {
    let path = match storage.or_else(|| preferences.storage.file.clone()) {
        Some(path) => resolve_path(&path, workspace_root),
        None => state_dir(workspace_root).join("storage.json"),
    };
    let store = FileStore::open(&path).unwrap_or_else(|err| {
        warn!(path = %path.display(), %err, "storage unavailable, persistence disabled");
        FileStore::unavailable(&path, format!("failed to open storage: {err}"))
    });
    Namespaced::new(preferences.storage.namespace.clone(), store)
}

fn state_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".cipherstudio")
}

fn resolve_workspace(workspace: Option<PathBuf>) -> Result<PathBuf> {
    let current = std::env::current_dir().context("determine current directory")?;
    Ok(match workspace {
        Some(path) if path.is_absolute() => path,
        Some(path) => current.join(path),
        None => current,
    })
}

fn resolve_path(path: &Path, workspace_root: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        workspace_root.join(path)
    }
}
