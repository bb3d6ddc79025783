//! Activity report construction

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

/// Per-sender message counts for one finalized alert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Channel display name
    pub channel_name: String,
    /// Tracking window the counts cover
    pub window: Duration,
    /// Note supplied with the request
    pub note: Option<String>,
    /// Senders ordered by count descending, then id ascending
    pub entries: Vec<(String, u64)>,
    /// Sum of all counts
    pub total_messages: u64,
    /// Number of distinct senders
    pub total_users: usize,
}

impl Report {
    /// Build a report from a counter snapshot
    pub fn from_counts(
        channel_name: impl Into<String>,
        window: Duration,
        note: Option<String>,
        counts: HashMap<String, u64>,
    ) -> Self {
        let mut entries: Vec<(String, u64)> = counts.into_iter().collect();
        entries.sort_by(|(a_id, a_count), (b_id, b_count)| {
            b_count.cmp(a_count).then_with(|| a_id.cmp(b_id))
        });

        let total_messages = entries.iter().map(|(_, count)| count).sum();
        let total_users = entries.len();

        Self {
            channel_name: channel_name.into(),
            window,
            note,
            entries,
            total_messages,
            total_users,
        }
    }

    /// Whether no messages were tracked
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} Activity Report for #{}",
            humantime::format_duration(self.window),
            self.channel_name
        )?;
        if let Some(note) = &self.note {
            write!(f, "\nNote: {note}")?;
        }

        if self.is_empty() {
            return write!(f, "\n\nNo messages tracked.");
        }

        writeln!(f)?;
        for (sender, count) in &self.entries {
            write!(f, "\n• {sender}: {count} {}", plural(*count, "message"))?;
        }
        write!(
            f,
            "\n\nTotal: {} {} from {} {}",
            self.total_messages,
            plural(self.total_messages, "message"),
            self.total_users,
            plural(self.total_users as u64, "user"),
        )
    }
}

fn plural(n: u64, word: &str) -> String {
    if n == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}
