//! The polling/dispatch loop.
//!
//! One update is handled completely (parse, actuate, reply) before the next
//! one is looked at, and the offset is advanced before any of that happens so
//! a poisonous update can never be delivered twice.

use std::{sync::Arc, time::Duration};

use tokio::time::sleep;

use crate::{
    actuator::{Actuator, OutputPin},
    command::{parse_water_command, watered_reply, WRONG_INPUT_REPLY},
    config::Config,
    domain::{ChatId, Offset},
    messaging::{port::BotApi, types::Update},
    Result,
};

#[derive(Clone, Debug)]
pub struct PollSettings {
    pub timeout: Duration,
    pub delay: Duration,
    pub allowed_updates: Vec<String>,
}

impl From<&Config> for PollSettings {
    fn from(cfg: &Config) -> Self {
        Self {
            timeout: cfg.poll_timeout,
            delay: cfg.poll_delay,
            allowed_updates: cfg.allowed_updates.clone(),
        }
    }
}

/// What happened to a single update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// No message, or a message without text.
    Skipped,
    Watered(u64),
    Rejected,
    /// Matched the grammar but the duration did not fit; nothing was sent.
    InvalidDuration,
}

pub struct Dispatcher<P: OutputPin> {
    api: Arc<dyn BotApi>,
    actuator: Actuator<P>,
    settings: PollSettings,
    offset: Offset,
}

impl<P: OutputPin> Dispatcher<P> {
    pub fn new(api: Arc<dyn BotApi>, actuator: Actuator<P>, settings: PollSettings) -> Self {
        Self {
            api,
            actuator,
            settings,
            offset: Offset::default(),
        }
    }

    pub fn offset(&self) -> Offset {
        self.offset
    }

    /// Poll forever. Only returns when a fetch fails.
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!(
            timeout_secs = self.settings.timeout.as_secs(),
            delay_secs = self.settings.delay.as_secs(),
            "polling for updates"
        );
        loop {
            self.poll_once().await?;
            sleep(self.settings.delay).await;
        }
    }

    /// Fetch one batch and handle every update in it, in order.
    pub async fn poll_once(&mut self) -> Result<Vec<Outcome>> {
        let updates = self
            .api
            .get_updates(
                self.offset,
                self.settings.timeout.as_secs(),
                &self.settings.allowed_updates,
            )
            .await?;
        tracing::debug!(count = updates.len(), offset = self.offset.0, "fetched updates");

        let mut outcomes = Vec::with_capacity(updates.len());
        for update in updates {
            outcomes.push(self.handle_update(update).await);
        }
        Ok(outcomes)
    }

    pub async fn handle_update(&mut self, update: Update) -> Outcome {
        self.offset.advance_past(update.update_id);

        let Some((msg, text)) = update.text() else {
            return Outcome::Skipped;
        };
        let chat_id = msg.chat.id;

        match parse_water_command(text) {
            Ok(Some(seconds)) => {
                tracing::info!(chat_id = chat_id.0, seconds, "watering");
                self.actuator.run(seconds).await;
                self.reply(chat_id, &watered_reply(seconds)).await;
                Outcome::Watered(seconds)
            }
            Ok(None) => {
                self.reply(chat_id, WRONG_INPUT_REPLY).await;
                Outcome::Rejected
            }
            Err(e) => {
                tracing::warn!(chat_id = chat_id.0, error = %e, "dropping command");
                Outcome::InvalidDuration
            }
        }
    }

    async fn reply(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.api.send_text(chat_id, text).await {
            tracing::warn!(chat_id = chat_id.0, error = %e, "reply failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, sync::Mutex};

    use async_trait::async_trait;
    use tokio::time::Instant;

    use super::*;
    use crate::{
        actuator::testing::{Level, RecordingPin},
        domain::{MessageId, UpdateId},
        errors::Error,
        messaging::types::{Chat, Message},
    };

    #[derive(Default)]
    struct FakeApi {
        batches: Mutex<VecDeque<Vec<Update>>>,
        fetches: Mutex<Vec<(Offset, u64, Vec<String>, Instant)>>,
        sent: Mutex<Vec<(ChatId, String)>>,
        fail_sends: bool,
    }

    impl FakeApi {
        fn with_batches(batches: Vec<Vec<Update>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
                ..Self::default()
            }
        }

        fn offsets(&self) -> Vec<Offset> {
            self.fetches.lock().unwrap().iter().map(|f| f.0).collect()
        }

        fn sent(&self) -> Vec<(ChatId, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BotApi for FakeApi {
        async fn get_updates(
            &self,
            offset: Offset,
            timeout_secs: u64,
            allowed_updates: &[String],
        ) -> Result<Vec<Update>> {
            self.fetches.lock().unwrap().push((
                offset,
                timeout_secs,
                allowed_updates.to_vec(),
                Instant::now(),
            ));
            self.batches
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| Error::Transport("connection reset".to_string()))
        }

        async fn send_text(&self, chat_id: ChatId, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            if self.fail_sends {
                return Err(Error::HttpStatus { status: 502 });
            }
            Ok(())
        }
    }

    fn text_update(id: i64, chat: i64, text: &str) -> Update {
        Update {
            update_id: UpdateId(id),
            message: Some(Message {
                message_id: MessageId(id * 10),
                chat: Chat { id: ChatId(chat) },
                text: text.to_string(),
            }),
        }
    }

    fn bare_update(id: i64) -> Update {
        Update {
            update_id: UpdateId(id),
            message: None,
        }
    }

    fn settings() -> PollSettings {
        PollSettings {
            timeout: Duration::from_secs(60),
            delay: Duration::from_secs(5),
            allowed_updates: vec!["message".to_string()],
        }
    }

    fn dispatcher(api: &Arc<FakeApi>, pin: &RecordingPin) -> Dispatcher<RecordingPin> {
        let d = Dispatcher::new(api.clone(), Actuator::new(pin.clone()), settings());
        pin.log.lock().unwrap().clear();
        d
    }

    #[tokio::test(start_paused = true)]
    async fn waters_and_confirms_end_to_end() {
        let api = Arc::new(FakeApi::with_batches(vec![vec![text_update(
            42,
            100,
            "water the plants for 3 seconds",
        )]]));
        let pin = RecordingPin::default();
        let mut d = dispatcher(&api, &pin);

        let outcomes = d.poll_once().await.unwrap();
        assert_eq!(outcomes, vec![Outcome::Watered(3)]);

        let t = pin.transitions();
        assert_eq!(t.iter().map(|x| x.0).collect::<Vec<_>>(), vec![Level::High, Level::Low]);
        assert!(t[1].1 - t[0].1 >= Duration::from_secs(3));

        assert_eq!(
            api.sent(),
            vec![(ChatId(100), "Watered the plants for 3 seconds.\n".to_string())]
        );
        assert_eq!(d.offset(), Offset(43));

        let fetches = api.fetches.lock().unwrap().clone();
        assert_eq!(fetches[0].0, Offset(0));
        assert_eq!(fetches[0].1, 60);
        assert_eq!(fetches[0].2, vec!["message".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn offset_ends_one_past_last_update_whatever_the_content() {
        let api = Arc::new(FakeApi::with_batches(vec![vec![
            text_update(5, 1, "hello"),
            bare_update(6),
            text_update(7, 1, ""),
            text_update(9, 1, "water the plants for 99999999999999999999999 seconds"),
            text_update(11, 1, "water the plants for 0 seconds"),
        ]]));
        let pin = RecordingPin::default();
        let mut d = dispatcher(&api, &pin);

        let outcomes = d.poll_once().await.unwrap();
        assert_eq!(
            outcomes,
            vec![
                Outcome::Rejected,
                Outcome::Skipped,
                Outcome::Skipped,
                Outcome::InvalidDuration,
                Outcome::Watered(0),
            ]
        );
        assert_eq!(d.offset(), Offset(12));
        assert_eq!(
            api.sent(),
            vec![
                (ChatId(1), "Wrong input".to_string()),
                (ChatId(1), "Watered the plants for 0 seconds.\n".to_string()),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn empty_and_missing_messages_do_nothing_but_advance() {
        let api = Arc::new(FakeApi::with_batches(vec![vec![
            bare_update(3),
            text_update(4, 8, ""),
        ]]));
        let pin = RecordingPin::default();
        let mut d = dispatcher(&api, &pin);

        d.poll_once().await.unwrap();
        assert!(api.sent().is_empty());
        assert!(pin.levels().is_empty());
        assert_eq!(d.offset(), Offset(5));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_replies_do_not_stop_the_loop() {
        let api = Arc::new(FakeApi {
            batches: Mutex::new(
                vec![
                    vec![text_update(20, 3, "water the plants for 2 seconds")],
                    vec![text_update(21, 3, "nope")],
                ]
                .into(),
            ),
            fail_sends: true,
            ..FakeApi::default()
        });
        let pin = RecordingPin::default();
        let mut d = dispatcher(&api, &pin);

        let err = d.run().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));

        assert_eq!(api.offsets(), vec![Offset(0), Offset(21), Offset(22)]);
        assert_eq!(api.sent().len(), 2);
        // Output still went low even though the confirmation could not be sent.
        assert_eq!(pin.levels(), vec![Level::High, Level::Low]);
    }

    #[tokio::test(start_paused = true)]
    async fn run_waits_between_polls_even_after_a_full_batch() {
        let api = Arc::new(FakeApi::with_batches(vec![
            vec![text_update(1, 1, "hi")],
            vec![],
        ]));
        let pin = RecordingPin::default();
        let mut d = dispatcher(&api, &pin);

        assert!(d.run().await.is_err());

        let fetches = api.fetches.lock().unwrap().clone();
        assert_eq!(fetches.len(), 3);
        assert!(fetches[1].3 - fetches[0].3 >= Duration::from_secs(5));
        assert!(fetches[2].3 - fetches[1].3 >= Duration::from_secs(5));
        assert_eq!(api.offsets(), vec![Offset(0), Offset(2), Offset(2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_error_is_returned_immediately() {
        let api = Arc::new(FakeApi::default());
        let pin = RecordingPin::default();
        let mut d = dispatcher(&api, &pin);

        assert!(d.run().await.is_err());
        assert_eq!(api.offsets(), vec![Offset(0)]);
        assert_eq!(d.offset(), Offset(0));
    }
}
