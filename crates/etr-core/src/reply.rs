//! Chat replies summarizing one processed batch.

use chrono::{DateTime, TimeZone};

use crate::{
    domain::{ExpenseRecord, FailureReason, LineOutcome},
    formatting::{date_and_time, format_rupiah},
};

const ERROR_HEADER: &str = "⚠️ Beberapa baris salah atau gagal diproses:\n\n";

const USAGE_HINT: &str = "\n\nGunakan format:\n\
Kategori/Deskripsi/Jumlah/Metode/Catatan (Opsional)\n\n\
Contoh format input ⬇️:\n";

/// Sent on its own, right after the error message.
pub const EXAMPLE_BLOCK: &str = "\nFood/Nasi Goreng/50000/Cash/makan pagi\
\nTransport/Gojek/35,000/Gopay\
\nEntertainment/Netflix/75.000/Bca/bulanan";

/// Replies for one batch. Each part is present only when the batch needs it.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reply {
    pub errors: Option<String>,
    pub example: Option<&'static str>,
    pub success: Option<String>,
}

impl Reply {
    pub fn is_empty(&self) -> bool {
        self.errors.is_none() && self.example.is_none() && self.success.is_none()
    }

    /// Messages in the order they must reach the chat.
    pub fn into_messages(self) -> Vec<String> {
        [self.errors, self.example.map(str::to_string), self.success]
            .into_iter()
            .flatten()
            .collect()
    }
}

/// Build the replies for a batch, stamping successes with `now`.
pub fn compose_reply<Tz: TimeZone>(outcomes: &[LineOutcome], now: &DateTime<Tz>) -> Reply
where
    Tz::Offset: std::fmt::Display,
{
    let mut failures = Vec::new();
    let mut successes = Vec::new();
    for outcome in outcomes {
        match outcome {
            LineOutcome::Success { index, record } => successes.push(success_line(*index, record)),
            LineOutcome::Failure {
                index,
                raw_line,
                reason,
            } => failures.push(failure_line(*index, raw_line, reason)),
        }
    }

    let mut reply = Reply::default();

    if !failures.is_empty() {
        reply.errors = Some(format!("{ERROR_HEADER}{}{USAGE_HINT}", failures.join("\n")));
        reply.example = Some(EXAMPLE_BLOCK);
    }

    if !successes.is_empty() {
        let (date, time) = date_and_time(now);
        reply.success = Some(format!(
            "✅ Data berhasil disimpan!\n📅 {date} ⏰ {time}\n\n{}",
            successes.join("\n")
        ));
    }

    reply
}

fn success_line(index: usize, record: &ExpenseRecord) -> String {
    let mut line = format!(
        "{index}. {} - {} ({}): {}",
        record.category,
        record.description,
        record.method,
        format_rupiah(record.amount)
    );
    if !record.note.is_empty() {
        line.push_str(" 📝 ");
        line.push_str(&record.note);
    }
    line
}

fn failure_line(index: usize, raw_line: &str, reason: &FailureReason) -> String {
    match reason {
        FailureReason::Malformed => format!("❌ Baris {index}: \"{raw_line}\""),
        FailureReason::Rejected(error) => format!("⚠️ Baris {index} gagal simpan: {error}"),
        FailureReason::Transport(error) => format!("⚠️ Baris {index} error: {error}"),
    }
}
