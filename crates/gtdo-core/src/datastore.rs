use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::contexts::CustomContext;
use crate::store::custom_contexts::CustomContextState;
use crate::store::filter::FilterState;
use crate::store::image::ImageProcessingState;
use crate::store::plan::UserPlan;
use crate::store::pomodoro::PomodoroState;
use crate::store::todos::TodoState;
use crate::store::{Action, AppState, Subscriber};

/// The slices mirrored to `state.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub todos: TodoState,
    #[serde(default)]
    pub filter: FilterState,
    #[serde(default)]
    pub pomodoro: PomodoroState,
}

impl PersistedState {
    pub fn of(state: &AppState) -> Self {
        Self {
            todos: state.todos.clone(),
            filter: state.filter.clone(),
            pomodoro: state.pomodoro.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoEntry {
    pub state: PersistedState,
    #[serde(default)]
    pub custom_contexts: Vec<CustomContext>,
}

#[derive(Debug, Clone)]
pub struct DataStore {
    pub data_dir: PathBuf,
    pub state_path: PathBuf,
    pub custom_contexts_path: PathBuf,
    pub plan_path: PathBuf,
    pub extraction_path: PathBuf,
    pub undo_path: PathBuf,
}

impl DataStore {
    #[tracing::instrument(skip(data_dir))]
    pub fn open(data_dir: &Path) -> anyhow::Result<Self> {
        let data_dir = data_dir.to_path_buf();
        fs::create_dir_all(&data_dir)
            .with_context(|| format!("failed to create {}", data_dir.display()))?;

        let store = Self {
            state_path: data_dir.join("state.json"),
            custom_contexts_path: data_dir.join("customContexts.json"),
            plan_path: data_dir.join("userPlan.json"),
            extraction_path: data_dir.join("extraction.json"),
            undo_path: data_dir.join("undo.data"),
            data_dir,
        };

        info!(
            data_dir = %store.data_dir.display(),
            state = %store.state_path.display(),
            "opened datastore"
        );
        Ok(store)
    }

    /// Rebuilds the full application state. Every file is optional and a
    /// corrupt one falls back to defaults.
    #[tracing::instrument(skip(self))]
    pub fn hydrate(&self) -> AppState {
        let persisted: PersistedState = load_or_default(&self.state_path);
        let contexts: Vec<CustomContext> = load_or_default(&self.custom_contexts_path);
        let plan: UserPlan = load_or_default(&self.plan_path);
        let image: ImageProcessingState = load_or_default(&self.extraction_path);

        debug!(
            todos = persisted.todos.len(),
            custom_contexts = contexts.len(),
            ?plan,
            pending_review = image.has_pending_review(),
            "hydrated state"
        );

        AppState {
            todos: persisted.todos.normalized(),
            filter: persisted.filter,
            custom_contexts: CustomContextState { contexts },
            pomodoro: persisted.pomodoro.normalized(),
            image: ImageProcessingState {
                is_processing: false,
                ..image
            },
            plan,
        }
    }

    #[tracing::instrument(skip(self, state))]
    pub fn save_state(&self, state: &PersistedState) -> anyhow::Result<()> {
        save_json_atomic(&self.state_path, state).context("failed to save state.json")
    }

    #[tracing::instrument(skip(self, contexts))]
    pub fn save_custom_contexts(&self, contexts: &[CustomContext]) -> anyhow::Result<()> {
        save_json_atomic(&self.custom_contexts_path, &contexts)
            .context("failed to save customContexts.json")
    }

    #[tracing::instrument(skip(self))]
    pub fn save_plan(&self, plan: UserPlan) -> anyhow::Result<()> {
        save_json_atomic(&self.plan_path, &plan).context("failed to save userPlan.json")
    }

    /// Keeps the extraction review on disk only while there are candidates
    /// or an error to show.
    #[tracing::instrument(skip(self, image))]
    pub fn save_extraction(&self, image: &ImageProcessingState) -> anyhow::Result<()> {
        if image.has_pending_review() || image.error.is_some() {
            return save_json_atomic(&self.extraction_path, image)
                .context("failed to save extraction.json");
        }
        if self.extraction_path.exists() {
            fs::remove_file(&self.extraction_path).with_context(|| {
                format!("failed to remove {}", self.extraction_path.display())
            })?;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, entry))]
    pub fn push_undo_snapshot(&self, entry: &UndoEntry) -> anyhow::Result<()> {
        let mut entries = self.load_undo_entries()?;
        entries.push(entry.clone());
        if entries.len() > MAX_UNDO_ENTRIES {
            let excess = entries.len() - MAX_UNDO_ENTRIES;
            entries.drain(..excess);
        }
        self.save_undo_entries(&entries)
    }

    #[tracing::instrument(skip(self))]
    pub fn pop_undo_snapshot(&self) -> anyhow::Result<Option<UndoEntry>> {
        let mut entries = self.load_undo_entries()?;
        let Some(entry) = entries.pop() else {
            return Ok(None);
        };
        self.save_undo_entries(&entries)?;
        Ok(Some(entry))
    }

    fn load_undo_entries(&self) -> anyhow::Result<Vec<UndoEntry>> {
        if !self.undo_path.exists() {
            return Ok(Vec::new());
        }
        debug!(file = %self.undo_path.display(), "loading undo entries");
        let file = fs::File::open(&self.undo_path)
            .with_context(|| format!("failed to open {}", self.undo_path.display()))?;
        let reader = BufReader::new(file);

        let mut out = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<UndoEntry>(trimmed) {
                Ok(entry) => out.push(entry),
                Err(err) => warn!(
                    file = %self.undo_path.display(),
                    line = idx + 1,
                    error = %err,
                    "skipping unreadable undo entry"
                ),
            }
        }
        Ok(out)
    }

    fn save_undo_entries(&self, entries: &[UndoEntry]) -> anyhow::Result<()> {
        debug!(file = %self.undo_path.display(), count = entries.len(), "saving undo entries");
        let mut temp = NamedTempFile::new_in(&self.data_dir)?;
        for entry in entries {
            let serialized = serde_json::to_string(entry)?;
            writeln!(temp, "{serialized}")?;
        }
        temp.flush()?;
        temp.persist(&self.undo_path)
            .map_err(|err| anyhow!("failed to persist {}: {}", self.undo_path.display(), err))?;
        Ok(())
    }
}

const MAX_UNDO_ENTRIES: usize = 100;

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(file = %path.display(), "no saved file, using defaults");
            return T::default();
        }
        Err(err) => {
            warn!(file = %path.display(), error = %err, "failed reading saved file, using defaults");
            return T::default();
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(err) => {
            warn!(file = %path.display(), error = %err, "ignoring malformed saved file");
            T::default()
        }
    }
}

fn save_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> anyhow::Result<()> {
    debug!(file = %path.display(), "saving json atomically");
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut temp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut temp, value)?;
    writeln!(temp)?;
    temp.flush()?;
    temp.persist(path)
        .map_err(|err| anyhow!("failed to persist {}: {}", path.display(), err))?;
    Ok(())
}

/// Mirrors state to disk after every action. Write failures are logged
/// and swallowed; the in-memory state stays authoritative.
pub struct Persister {
    store: DataStore,
}

impl Persister {
    pub fn new(store: DataStore) -> Self {
        Self { store }
    }

    fn write(&self, previous: &AppState, state: &AppState, action: &Action) -> anyhow::Result<()> {
        self.store.save_state(&PersistedState::of(state))?;
        if previous.custom_contexts != state.custom_contexts {
            self.store
                .save_custom_contexts(&state.custom_contexts.contexts)?;
        }
        if previous.plan != state.plan {
            self.store.save_plan(state.plan)?;
        }
        if action.touches_image() {
            self.store.save_extraction(&state.image)?;
        }
        Ok(())
    }

    fn record_undo(&self, previous: &AppState) -> anyhow::Result<()> {
        self.store.push_undo_snapshot(&UndoEntry {
            state: PersistedState::of(previous),
            custom_contexts: previous.custom_contexts.contexts.clone(),
        })
    }
}

impl Subscriber for Persister {
    fn state_changed(&mut self, previous: &AppState, state: &AppState, action: &Action) {
        if let Err(err) = self.write(previous, state, action) {
            warn!(error = %format!("{err:#}"), ?action, "failed to persist state");
        }
        if action.is_undoable()
            && previous != state
            && let Err(err) = self.record_undo(previous)
        {
            warn!(error = %format!("{err:#}"), ?action, "failed to record undo snapshot");
        }
    }
}
