use std::fs::{self, File, OpenOptions};
use std::io::{self, Read as _, Seek as _, SeekFrom, Write as _};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context as _, bail};
use snaplearn_utils::time::parse_ledger_timestamp;
use tracing::{debug, warn};

use crate::model::ChatTurn;

/// Header row of the ledger file.
pub const LEDGER_HEADER: [&str; 3] = ["Datetime", "User Input", "Bot Response"];

/// Append-only CSV history of chat turns.
///
/// - the header is written exactly once, when the file is created (or found empty)
/// - appends never rewrite earlier rows
/// - reads and writes from this handle are serialized; other processes are not coordinated
#[derive(Clone, Debug)]
pub struct Ledger {
    inner: Arc<LedgerInner>,
}

#[derive(Debug)]
struct LedgerInner {
    path: PathBuf,
    lock: Mutex<()>,
}

/// Result of reading the ledger back for display.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum History {
    /// No ledger file yet.
    Missing,
    /// Every row, in file order.
    Loaded(Vec<ChatTurn>),
    /// The file exists but could not be parsed; treated as empty.
    Unreadable,
}

impl History {
    pub fn turns(&self) -> &[ChatTurn] {
        match self {
            Self::Loaded(turns) => turns,
            Self::Missing | Self::Unreadable => &[],
        }
    }

    /// Whether a ledger file was present on disk.
    pub fn file_exists(&self) -> bool {
        !matches!(self, Self::Missing)
    }

    /// Whether the reader should be told the history is empty.
    ///
    /// Only an unreadable file gets the notice; a header-only file is an empty table.
    pub fn shows_empty_notice(&self) -> bool {
        matches!(self, Self::Unreadable)
    }
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                path: path.into(),
                lock: Mutex::new(()),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Append one turn, creating the file with its header on first use.
    pub fn append(&self, turn: &ChatTurn) -> anyhow::Result<()> {
        let _guard = self
            .inner
            .lock
            .lock()
            .map_err(|_| anyhow::anyhow!("ledger lock poisoned"))?;
        let path = self.path();

        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open ledger {}", path.display()))?;

        let len = file
            .metadata()
            .with_context(|| format!("failed to stat ledger {}", path.display()))?
            .len();
        let needs_header = len == 0;

        if !needs_header
            && !ends_with_newline(&mut file, len).context("failed to read ledger tail")?
        {
            file.write_all(b"\n").context("failed to terminate last ledger row")?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer
                .write_record(LEDGER_HEADER)
                .context("failed to write ledger header")?;
        }

        writer
            .write_record([
                turn.formatted_timestamp().as_str(),
                turn.user_input(),
                turn.bot_response(),
            ])
            .context("failed to write ledger row")?;
        writer.flush().context("failed to flush ledger")?;

        debug!(path = %path.display(), created = needs_header, "ledger row appended");
        Ok(())
    }

    /// Read every turn back in file order.
    ///
    /// A missing file is [`History::Missing`]; a file that cannot be parsed is
    /// [`History::Unreadable`] and never an error.
    pub fn load_all(&self) -> History {
        let _guard = match self.inner.lock.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!("ledger lock poisoned; treating history as unreadable");
                return History::Unreadable;
            }
        };
        let path = self.path();

        if !path.is_file() {
            return History::Missing;
        }

        match read_turns(path) {
            Ok(turns) => History::Loaded(turns),
            Err(err) => {
                warn!(?err, path = %path.display(), "ledger could not be parsed; showing empty history");
                History::Unreadable
            }
        }
    }
}

fn ends_with_newline(file: &mut File, len: u64) -> io::Result<bool> {
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0_u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

fn read_turns(path: &Path) -> anyhow::Result<Vec<ChatTurn>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("failed to open ledger {}", path.display()))?;

    let headers = reader.headers().context("failed to read ledger header")?;
    if headers.iter().ne(LEDGER_HEADER) {
        bail!("unexpected ledger header: {:?}", headers);
    }

    let mut out = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("malformed ledger row {}", index + 1))?;
        let (Some(datetime), Some(user_input), Some(bot_response)) =
            (record.get(0), record.get(1), record.get(2))
        else {
            bail!("ledger row {} is missing columns", index + 1);
        };

        let Some(timestamp) = parse_ledger_timestamp(datetime) else {
            bail!("ledger row {} has an invalid datetime `{}`", index + 1, datetime);
        };

        out.push(ChatTurn::new(timestamp, user_input, bot_response));
    }

    Ok(out)
}
