//! Per-message pipeline: split, parse, normalize, record, reply.

use std::sync::Arc;

use chrono::Local;

use crate::{
    domain::{ChatId, FailureReason, LineOutcome},
    parser::{parse_amount, parse_line, split_batch},
    ports::{ExpenseRecorder, MessagingPort, RecordError},
    reply::compose_reply,
    Result,
};

/// Counters for one handled message, used for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub lines: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub replies_sent: usize,
}

pub struct BatchDispatcher {
    recorder: Arc<dyn ExpenseRecorder>,
    messenger: Arc<dyn MessagingPort>,
    delimiter: char,
}

impl BatchDispatcher {
    pub fn new(
        recorder: Arc<dyn ExpenseRecorder>,
        messenger: Arc<dyn MessagingPort>,
        delimiter: char,
    ) -> Self {
        Self {
            recorder,
            messenger,
            delimiter,
        }
    }

    /// Process every line of `text` and send the replies to `chat_id`.
    ///
    /// Line failures are reported to the chat, not returned. An error here is the
    /// first reply that could not be delivered. A failed error message also drops
    /// its example; the success message is attempted either way.
    pub async fn handle_text(&self, chat_id: ChatId, text: &str) -> Result<BatchSummary> {
        let outcomes = self.process_batch(text).await;

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let mut summary = BatchSummary {
            lines: outcomes.len(),
            succeeded,
            failed: outcomes.len() - succeeded,
            replies_sent: 0,
        };

        let reply = compose_reply(&outcomes, &Local::now());
        let mut first_err = None;

        // The example only makes sense right after the error message it belongs to.
        if let Some(errors) = &reply.errors {
            match self.send(chat_id, errors, &mut summary).await {
                Ok(()) => {
                    if let Some(example) = reply.example {
                        if let Err(e) = self.send(chat_id, example, &mut summary).await {
                            first_err.get_or_insert(e);
                        }
                    }
                }
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        // Records are already stored, so the confirmation goes out regardless.
        if let Some(success) = &reply.success {
            if let Err(e) = self.send(chat_id, success, &mut summary).await {
                first_err.get_or_insert(e);
            }
        }

        tracing::info!(
            chat_id = chat_id.0,
            lines = summary.lines,
            succeeded = summary.succeeded,
            failed = summary.failed,
            replies_sent = summary.replies_sent,
            "batch processed"
        );

        match first_err {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }

    async fn send(&self, chat_id: ChatId, text: &str, summary: &mut BatchSummary) -> Result<()> {
        match self.messenger.send_text(chat_id, text).await {
            Ok(_) => {
                summary.replies_sent += 1;
                Ok(())
            }
            Err(e) => {
                tracing::warn!(chat_id = chat_id.0, "reply not delivered: {e}");
                Err(e)
            }
        }
    }

    /// Run each line through the pipeline, one at a time, in order.
    pub async fn process_batch(&self, text: &str) -> Vec<LineOutcome> {
        let mut outcomes = Vec::new();
        for (i, line) in split_batch(text).into_iter().enumerate() {
            outcomes.push(self.process_line(i + 1, line).await);
        }
        outcomes
    }

    async fn process_line(&self, index: usize, line: &str) -> LineOutcome {
        let fields = match parse_line(line, index, self.delimiter) {
            Ok(fields) => fields,
            Err(e) => {
                tracing::debug!("{e}");
                return LineOutcome::Failure {
                    index,
                    raw_line: line.to_string(),
                    reason: FailureReason::Malformed,
                };
            }
        };

        // An unparsable amount is recorded as 0, never rejected.
        let amount = parse_amount(fields.amount).unwrap_or_else(|e| {
            tracing::warn!(line = index, "{e}; recording amount as 0");
            0
        });
        let record = fields.into_record(amount);

        match self.recorder.record(&record).await {
            Ok(()) => LineOutcome::Success { index, record },
            Err(e) => {
                tracing::debug!(line = index, "record failed: {e}");
                let reason = match e {
                    RecordError::RemoteRejected(msg) => FailureReason::Rejected(msg),
                    RecordError::TransportFault(msg) => FailureReason::Transport(msg),
                };
                LineOutcome::Failure {
                    index,
                    raw_line: line.to_string(),
                    reason,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::{
        domain::{ExpenseRecord, MessageId, MessageRef},
        errors::Error,
        reply::EXAMPLE_BLOCK,
    };

    /// Answers with scripted results in order, `Ok` once the script runs out.
    #[derive(Default)]
    struct FakeRecorder {
        script: Mutex<VecDeque<std::result::Result<(), RecordError>>>,
        seen: Mutex<Vec<ExpenseRecord>>,
    }

    impl FakeRecorder {
        fn scripted(results: Vec<std::result::Result<(), RecordError>>) -> Self {
            Self {
                script: Mutex::new(results.into()),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExpenseRecorder for FakeRecorder {
        async fn record(&self, record: &ExpenseRecord) -> std::result::Result<(), RecordError> {
            self.seen.lock().unwrap().push(record.clone());
            self.script.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    /// Records delivered messages; fails the calls listed in `failing_calls` (1-based).
    #[derive(Default)]
    struct FakeMessenger {
        sent: Mutex<Vec<(ChatId, String)>>,
        calls: Mutex<usize>,
        failing_calls: Vec<usize>,
    }

    impl FakeMessenger {
        fn failing(calls: &[usize]) -> Self {
            Self {
                failing_calls: calls.to_vec(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl MessagingPort for FakeMessenger {
        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<MessageRef> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            if self.failing_calls.contains(&call) {
                return Err(Error::External(format!("telegram error: blocked on call {call}")));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push((chat_id, text.to_string()));
            Ok(MessageRef {
                chat_id,
                message_id: MessageId(sent.len() as i32),
            })
        }
    }

    fn dispatcher(
        recorder: Arc<FakeRecorder>,
        messenger: Arc<FakeMessenger>,
    ) -> BatchDispatcher {
        BatchDispatcher::new(recorder, messenger, '/')
    }

    fn sent_texts(messenger: &FakeMessenger) -> Vec<String> {
        messenger
            .sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, t)| t.clone())
            .collect()
    }

    #[tokio::test]
    async fn records_a_valid_line_and_confirms_it() {
        let recorder = Arc::new(FakeRecorder::default());
        let messenger = Arc::new(FakeMessenger::default());
        let d = dispatcher(recorder.clone(), messenger.clone());

        let summary = d
            .handle_text(ChatId(42), "Food/Nasi Goreng/50000/Cash/makan pagi")
            .await
            .unwrap();

        assert_eq!(
            summary,
            BatchSummary {
                lines: 1,
                succeeded: 1,
                failed: 0,
                replies_sent: 1
            }
        );
        assert_eq!(
            recorder.seen.lock().unwrap()[0],
            ExpenseRecord {
                category: "Food".to_string(),
                description: "Nasi Goreng".to_string(),
                amount: 50_000,
                method: "Cash".to_string(),
                note: "makan pagi".to_string(),
            }
        );

        let sent = messenger.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, ChatId(42));
        assert!(sent[0].1.starts_with("✅ Data berhasil disimpan!\n📅 "));
        assert!(sent[0]
            .1
            .ends_with("\n\n1. Food - Nasi Goreng (Cash): Rp 50.000 📝 makan pagi"));
    }

    #[tokio::test]
    async fn malformed_line_skips_recorder_and_sends_error_then_example() {
        let recorder = Arc::new(FakeRecorder::default());
        let messenger = Arc::new(FakeMessenger::default());
        let d = dispatcher(recorder.clone(), messenger.clone());

        d.handle_text(ChatId(1), "BadLine").await.unwrap();

        assert!(recorder.seen.lock().unwrap().is_empty());
        let texts = sent_texts(&messenger);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("❌ Baris 1: \"BadLine\""));
        assert_eq!(texts[1], EXAMPLE_BLOCK);
    }

    #[tokio::test]
    async fn comma_separated_amount_is_normalized() {
        let recorder = Arc::new(FakeRecorder::default());
        let messenger = Arc::new(FakeMessenger::default());
        let d = dispatcher(recorder.clone(), messenger);

        d.process_batch("Transport/Gojek/35,000/Gopay").await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen[0].amount, 35_000);
        assert_eq!(seen[0].note, "");
    }

    #[tokio::test]
    async fn unparsable_amount_is_recorded_as_zero() {
        let recorder = Arc::new(FakeRecorder::default());
        let messenger = Arc::new(FakeMessenger::default());
        let d = dispatcher(recorder.clone(), messenger);

        let outcomes = d.process_batch("Food/Soto/lima ribu/Cash").await;

        assert!(outcomes[0].is_success());
        assert_eq!(recorder.seen.lock().unwrap()[0].amount, 0);
    }

    #[tokio::test]
    async fn mixed_batch_keeps_line_order_and_sends_all_replies() {
        let recorder = Arc::new(FakeRecorder::scripted(vec![
            Ok(()),
            Err(RecordError::RemoteRejected("sheet locked".to_string())),
            Err(RecordError::TransportFault("connection refused".to_string())),
        ]));
        let messenger = Arc::new(FakeMessenger::default());
        let d = dispatcher(recorder.clone(), messenger.clone());

        let text = "Food/A/1.000/Cash\nnot a record\nFood/B/2000/Cash\n\nFood/C/3000/Cash\nFood/D/4000/Cash/note";
        let summary = d.handle_text(ChatId(7), text).await.unwrap();

        assert_eq!(summary.lines, 5);
        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 3);
        assert_eq!(summary.replies_sent, 3);
        assert_eq!(recorder.seen.lock().unwrap().len(), 4);

        let texts = sent_texts(&messenger);
        assert!(texts[0].contains(
            "❌ Baris 2: \"not a record\"\n⚠️ Baris 3 gagal simpan: sheet locked\n⚠️ Baris 4 error: connection refused"
        ));
        assert_eq!(texts[1], EXAMPLE_BLOCK);
        assert!(texts[2].contains(
            "1. Food - A (Cash): Rp 1.000\n5. Food - D (Cash): Rp 4.000 📝 note"
        ));
        assert!(!texts[2].contains("Food - B"));
    }

    #[tokio::test]
    async fn blank_message_sends_nothing() {
        let recorder = Arc::new(FakeRecorder::default());
        let messenger = Arc::new(FakeMessenger::default());
        let d = dispatcher(recorder.clone(), messenger.clone());

        let summary = d.handle_text(ChatId(1), "  \n\t\n ").await.unwrap();

        assert_eq!(summary, BatchSummary::default());
        assert!(recorder.seen.lock().unwrap().is_empty());
        assert!(messenger.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_error_message_drops_example_and_returns_error() {
        let recorder = Arc::new(FakeRecorder::default());
        let messenger = Arc::new(FakeMessenger::failing(&[1]));
        let d = dispatcher(recorder, messenger.clone());

        let err = d.handle_text(ChatId(1), "BadLine").await.unwrap_err();

        assert!(err.to_string().contains("blocked on call 1"));
        assert!(sent_texts(&messenger).is_empty());
        assert_eq!(*messenger.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn success_is_confirmed_even_if_error_message_fails() {
        let recorder = Arc::new(FakeRecorder::default());
        let messenger = Arc::new(FakeMessenger::failing(&[1]));
        let d = dispatcher(recorder.clone(), messenger.clone());

        let err = d
            .handle_text(ChatId(1), "BadLine\nFood/A/1000/Cash")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("blocked on call 1"));
        assert_eq!(recorder.seen.lock().unwrap().len(), 1);
        let texts = sent_texts(&messenger);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("✅ Data berhasil disimpan!"));
        assert!(texts[0].ends_with("1. Food - A (Cash): Rp 1.000"));
    }

    #[tokio::test]
    async fn success_is_confirmed_even_if_example_fails() {
        let recorder = Arc::new(FakeRecorder::default());
        let messenger = Arc::new(FakeMessenger::failing(&[2]));
        let d = dispatcher(recorder, messenger.clone());

        let err = d
            .handle_text(ChatId(1), "BadLine\nFood/A/1000/Cash")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("blocked on call 2"));
        let texts = sent_texts(&messenger);
        assert_eq!(texts.len(), 2);
        assert!(texts[0].contains("❌ Baris 1: \"BadLine\""));
        assert!(texts[1].starts_with("✅"));
    }
}
