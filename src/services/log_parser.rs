use crate::models::WorkshopRecord;
use camino::Utf8Path;
use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::sync::LazyLock;

/// Marker carried by every log line that concerns Wallpaper Engine
pub const APP_MARKER: &str = "[AppID 431960]";

/// What a recognised workshop log line does to the working set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineAction {
    Remove,
    Subscribe,
    Unsubscribe,
}

/// Parser for the Steam `workshop_log.txt`.
///
/// Turns the raw lines of the log into the current subscription state of every
/// Wallpaper Engine item. The parser is stateless: each call to [`analyze`](Self::analyze)
/// starts from an empty working set, so the full file content has to be passed every time.
///
/// # Recognised lines
///
/// Only lines containing [`APP_MARKER`] and a `[yyyy-MM-dd HH:mm:ss]` timestamp are
/// considered. The phrases are checked in this order and the first match wins:
///
/// 1. `removing unused item {id}` drops the id from the working set
/// 2. `removing unknown item {id}` drops the id from the working set
/// 3. `added subscribed item {id}` upserts the id as subscribed
/// 4. `removing unsubscribed item {id}` upserts the id as unsubscribed
///
/// An upsert on an id already in the working set overwrites its timestamp and flag but keeps
/// its position, so the output order is the order in which ids first appeared.
pub struct LogParser {
    /// Matches the bracketed timestamp, e.g. `[2024-03-01 18:22:05]`
    time_pattern: Regex,

    /// Workshop change phrases in priority order
    actions: Vec<(Regex, LineAction)>,
}

impl LogParser {
    /// Create a new LogParser with compiled regex patterns
    pub fn new() -> Self {
        let change = |phrase: &str| {
            Regex::new(&format!(r"Detected workshop change : {} (\d+)", phrase))
                .expect("Invalid workshop change regex")
        };

        Self {
            time_pattern: Regex::new(r"\[(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2})\]")
                .expect("Invalid timestamp regex"),
            actions: vec![
                (change("removing unused item"), LineAction::Remove),
                (change("removing unknown item"), LineAction::Remove),
                (change("added subscribed item"), LineAction::Subscribe),
                (change("removing unsubscribed item"), LineAction::Unsubscribe),
            ],
        }
    }

    /// Derive the subscription records from the log lines.
    ///
    /// # Arguments
    /// * `lines` - The complete log content, in file order
    /// * `start_time` - Inclusive lower bound in `yyyy-MM-dd HH:mm:ss`; `None` or an empty
    ///   string disables the filter. The format is fixed-width so a lexical comparison
    ///   orders timestamps correctly.
    pub fn analyze<I, S>(&self, lines: I, start_time: Option<&str>) -> Vec<WorkshopRecord>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let start_time = start_time.filter(|t| !t.is_empty());
        let mut records: IndexMap<String, WorkshopRecord> = IndexMap::new();

        for line in lines {
            let line = line.as_ref();

            if !line.contains(APP_MARKER) {
                continue;
            }

            let Some(timestamp) = self.extract_timestamp(line) else {
                continue;
            };

            if let Some(start) = start_time {
                if timestamp < start {
                    continue;
                }
            }

            let Some((id, action)) = self.classify(line) else {
                continue;
            };

            match action {
                LineAction::Remove => {
                    records.shift_remove(id);
                }
                LineAction::Subscribe | LineAction::Unsubscribe => {
                    let subscribed = action == LineAction::Subscribe;
                    match records.get_mut(id) {
                        Some(existing) => {
                            existing.timestamp = timestamp.to_string();
                            existing.subscribed = subscribed;
                        }
                        None => {
                            records.insert(
                                id.to_string(),
                                WorkshopRecord::new(id, timestamp, subscribed),
                            );
                        }
                    }
                }
            }
        }

        tracing::trace!("Parsed workshop log into {} records", records.len());

        records.into_values().collect()
    }

    fn extract_timestamp<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.time_pattern
            .captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    fn classify<'a>(&self, line: &'a str) -> Option<(&'a str, LineAction)> {
        self.actions.iter().find_map(|(pattern, action)| {
            pattern
                .captures(line)
                .and_then(|caps| caps.get(1))
                .map(|id| (id.as_str(), *action))
        })
    }
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new()
    }
}

static PARSER: LazyLock<LogParser> = LazyLock::new(LogParser::new);

/// Parse log lines with the shared parser instance.
///
/// See [`LogParser::analyze`].
pub fn analyze_log<I, S>(lines: I, start_time: Option<&str>) -> Vec<WorkshopRecord>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    PARSER.analyze(lines, start_time)
}

/// Read the whole log as UTF-8 lines.
///
/// A missing or unreadable file yields `None` rather than an error: Steam may not have
/// written the log yet, and the watcher simply tries again on its next cycle.
pub fn read_log_lines(path: &Utf8Path) -> Option<Vec<String>> {
    if !path.is_file() {
        tracing::debug!("Workshop log not present: {}", path);
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => Some(content.lines().map(str::to_string).collect()),
        Err(e) => {
            tracing::error!("Failed to read workshop log {}: {}", path, e);
            None
        }
    }
}
