//! Per-connection session state machine.
//!
//! Each accepted connection gets one `Session` that drives the full dialogue:
//! nickname registration, the topic menu, the question loop, and nested
//! leaderboard queries. Sessions share nothing with each other except the
//! registry; a session's failure tears down only its own connection.
//!
//! States: `Registering -> TopicMenu -> Quizzing -> (TopicMenu | Ended)`,
//! with the leaderboard listing reachable as a sub-dialogue from both
//! `TopicMenu` and `Quizzing`.

use crate::quiz::{check_answer, Quiz, TopicCatalog};
use crate::registry::{render_status, LeaderboardEntry, RegisterOutcome, SharedRegistry};
use log::{debug, info, warn};
use shared::{
    write_frame, Frame, FrameReader, ProtocolError, MSG_ANSWER, MSG_END, MSG_END_SCORE, MSG_ERROR,
    MSG_NICK, MSG_OK, MSG_QUESTION, MSG_QUIZ_START, MSG_RESULT, MSG_SCORE, MSG_SCORELIST,
    MSG_THEME, MSG_THEMES, MSG_THEMES_LIST, RESP_CORRECT, RESP_INVALID_THEME, RESP_NICK_TAKEN,
    RESP_QUIZ_COMPLETE, RESP_WRONG,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpStream;

/// Session-fatal conditions. Validation failures and unexpected message
/// types are handled in place and never surface here.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("registry is at capacity")]
    ServerFull,
    #[error("no topics available")]
    NoTopics,
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// The stateful dialogue with one connected client.
pub struct Session {
    stream: TcpStream,
    peer: SocketAddr,
    reader: FrameReader,
    registry: SharedRegistry,
    catalog: Arc<TopicCatalog>,
    /// Empty until registration completes.
    nickname: String,
}

impl Session {
    pub fn new(
        stream: TcpStream,
        peer: SocketAddr,
        registry: SharedRegistry,
        catalog: Arc<TopicCatalog>,
    ) -> Self {
        Self {
            stream,
            peer,
            reader: FrameReader::new(),
            registry,
            catalog,
            nickname: String::new(),
        }
    }

    /// Runs the session to completion. Whatever the outcome, the player's
    /// record is removed before the connection is dropped.
    pub async fn run(mut self) -> Result<(), SessionError> {
        info!("Session started for {}", self.peer);
        let result = self.dialogue().await;

        if !self.nickname.is_empty() {
            self.registry.unregister(&self.nickname).await;
            self.log_status().await;
        }
        info!("Session ended for {}", self.peer);
        result
    }

    async fn dialogue(&mut self) -> Result<(), SessionError> {
        self.register().await?;
        self.topic_menu().await
    }

    /// Receives the next frame. A malformed frame is answered with an
    /// `ERROR` and skipped (the buffered reader keeps later frames intact);
    /// transport failures and EOF abort the session.
    async fn recv(&mut self) -> Result<Frame, SessionError> {
        loop {
            match self.reader.read_frame(&mut self.stream).await {
                Ok(frame) => return Ok(frame),
                Err(err) if err.is_fatal() => return Err(err.into()),
                Err(err) => {
                    warn!("Malformed frame from {}: {}", self.peer, err);
                    self.send(MSG_ERROR, "Malformed message").await?;
                }
            }
        }
    }

    async fn send(&mut self, msg_type: &str, data: &str) -> Result<(), SessionError> {
        write_frame(&mut self.stream, msg_type, data).await?;
        Ok(())
    }

    /// Registering: loop until a valid, unclaimed nickname arrives.
    async fn register(&mut self) -> Result<(), SessionError> {
        loop {
            let frame = self.recv().await?;
            if frame.msg_type != MSG_NICK {
                debug!("Ignoring {} from {} before registration", frame.msg_type, self.peer);
                continue;
            }

            // Local validation first; the registry is only consulted for
            // well-formed names.
            if !shared::valid_nickname(&frame.data) {
                self.send(MSG_ERROR, "Invalid nickname").await?;
                continue;
            }

            match self.registry.register(&frame.data).await {
                RegisterOutcome::Created => {
                    self.nickname = frame.data;
                    self.send(MSG_OK, "Nickname registered").await?;
                    info!("Nickname registered: {} ({})", self.nickname, self.peer);
                    self.log_status().await;
                    return Ok(());
                }
                RegisterOutcome::Duplicate => {
                    self.send(MSG_ERROR, RESP_NICK_TAKEN).await?;
                }
                RegisterOutcome::Full => {
                    warn!("Registry full, turning away {}", self.peer);
                    self.send(MSG_ERROR, "Server is full").await?;
                    return Err(SessionError::ServerFull);
                }
            }
        }
    }

    /// TopicMenu: advertise the topics, then act on the client's choice.
    /// Every rejected input re-enters the loop.
    async fn topic_menu(&mut self) -> Result<(), SessionError> {
        loop {
            if self.catalog.is_empty() {
                self.send(MSG_ERROR, "No topics available").await?;
                return Err(SessionError::NoTopics);
            }

            let frame = self.recv().await?;
            if frame.msg_type != MSG_THEMES {
                debug!("Expected THEMES from {}, got {}", self.nickname, frame.msg_type);
                continue;
            }
            let count = self.catalog.len().to_string();
            self.send(MSG_OK, &count).await?;

            let frame = self.recv().await?;
            if frame.msg_type != MSG_OK {
                continue;
            }
            let listing = self.topic_listing().await;
            self.send(MSG_THEMES_LIST, &listing).await?;

            let frame = self.recv().await?;
            match frame.msg_type.as_str() {
                MSG_SCORE => self.score_query().await?,
                MSG_END => {
                    info!("{} ended the session from the topic menu", self.nickname);
                    return Ok(());
                }
                MSG_THEME => {
                    if let Some((topic, quiz)) = self.select_topic(&frame.data).await? {
                        if !self.run_quiz(topic, &quiz).await? {
                            return Ok(());
                        }
                    }
                }
                other => debug!("Unexpected {} in topic menu from {}", other, self.nickname),
            }
        }
    }

    /// Validates a topic choice and loads its quiz. On rejection an `ERROR`
    /// frame has been sent and `None` is returned so the menu re-prompts.
    async fn select_topic(&mut self, raw: &str) -> Result<Option<(usize, Quiz)>, SessionError> {
        let choice = match raw.trim().parse::<usize>() {
            Ok(n) if n < self.catalog.len() => n,
            _ => {
                self.send(MSG_ERROR, RESP_INVALID_THEME).await?;
                return Ok(None);
            }
        };

        if self.registry.has_completed(&self.nickname, choice).await {
            self.send(MSG_ERROR, "Topic already completed, choose another")
                .await?;
            return Ok(None);
        }

        let quiz = match self.catalog.load_quiz(choice) {
            Ok(quiz) => quiz,
            Err(err) => {
                warn!("Failed to load quiz for topic {}: {}", choice, err);
                self.send(MSG_ERROR, RESP_INVALID_THEME).await?;
                return Ok(None);
            }
        };

        info!(
            "{} selected topic {} ({})",
            self.nickname,
            choice,
            self.catalog.name(choice).unwrap_or("?")
        );
        self.send(MSG_OK, "").await?;
        Ok(Some((choice, quiz)))
    }

    /// Quizzing: serve questions and judge answers until the cursor reaches
    /// the end of the quiz. Returns `false` when the client terminated the
    /// session mid-quiz.
    async fn run_quiz(&mut self, topic: usize, quiz: &Quiz) -> Result<bool, SessionError> {
        let mut cursor = 0;
        let mut score = 0;

        while cursor < quiz.len() {
            let frame = self.recv().await?;
            match frame.msg_type.as_str() {
                MSG_QUIZ_START => {
                    // Re-sends the question at the cursor; only an answer
                    // advances it.
                    if let Some(question) = quiz.question(cursor) {
                        self.send(MSG_QUESTION, &question.prompt).await?;
                    }
                }
                MSG_ANSWER => {
                    let Some(question) = quiz.question(cursor) else {
                        break;
                    };
                    if check_answer(question, &frame.data) {
                        score += 1;
                        self.send(MSG_RESULT, RESP_CORRECT).await?;
                        info!("{} answered question {} correctly", self.nickname, cursor + 1);
                    } else {
                        self.send(MSG_RESULT, RESP_WRONG).await?;
                        info!("{} answered question {} incorrectly", self.nickname, cursor + 1);
                    }
                    cursor += 1;

                    let completed = cursor >= quiz.len();
                    self.registry
                        .save_score(topic, &self.nickname, score, completed)
                        .await;
                    self.log_status().await;
                }
                MSG_SCORE => self.score_query().await?,
                MSG_END => {
                    info!("{} left the quiz on topic {}", self.nickname, topic);
                    return Ok(false);
                }
                other => {
                    // Covers the client's OK acks after each RESULT.
                    debug!("Ignoring {} during quiz from {}", other, self.nickname);
                }
            }
        }

        if cursor >= quiz.len() {
            self.send(MSG_RESULT, RESP_QUIZ_COMPLETE).await?;
            info!(
                "{} completed topic {} with score {}/{}",
                self.nickname,
                topic,
                score,
                quiz.len()
            );
        }
        Ok(true)
    }

    /// ScoreQuery: one `SCORELIST` per topic in order, each acknowledged by
    /// the client before the next is sent, then the end-of-listing marker.
    /// Control returns to whichever state invoked it.
    async fn score_query(&mut self) -> Result<(), SessionError> {
        info!("{} requested the leaderboards", self.nickname);

        for topic in 0..self.catalog.len() {
            let entries = self.registry.leaderboard(topic).await;
            let payload = format_scorelist(topic, &entries);
            self.send(MSG_SCORELIST, &payload).await?;

            let ack = self.recv().await?;
            if ack.msg_type != MSG_OK {
                warn!(
                    "{} sent {} instead of an ack during the leaderboard listing",
                    self.nickname, ack.msg_type
                );
            }
        }

        self.send(MSG_END_SCORE, "").await?;
        Ok(())
    }

    async fn topic_listing(&self) -> String {
        let mut completed = Vec::with_capacity(self.catalog.len());
        for topic in 0..self.catalog.len() {
            completed.push(self.registry.has_completed(&self.nickname, topic).await);
        }
        format_topic_list(self.catalog.names(), &completed)
    }

    async fn log_status(&self) {
        let snapshot = self.registry.snapshot().await;
        debug!("\n{}", render_status(&snapshot, self.catalog.names()));
    }
}

/// Renders the `THEMES_LIST` payload: one `\n`-escaped line per topic,
/// marking the ones this player has already completed.
pub fn format_topic_list(names: &[String], completed: &[bool]) -> String {
    let mut listing = String::new();
    for (index, name) in names.iter().enumerate() {
        let marker = if completed.get(index).copied().unwrap_or(false) {
            " [COMPLETED]"
        } else {
            ""
        };
        listing.push_str(&format!("{}. {}{}\\n", index, name, marker));
    }
    listing
}

/// Renders one `SCORELIST` payload: the topic index digit followed by the
/// rendered standings. A payload of just the digit is the explicit empty
/// marker for a topic nobody has played.
pub fn format_scorelist(topic: usize, entries: &[LeaderboardEntry]) -> String {
    let mut payload = topic.to_string();
    for (rank, entry) in entries.iter().enumerate() {
        payload.push_str(&format!(
            "{}. {}: {} points{}\\n",
            rank + 1,
            entry.nickname,
            entry.score,
            if entry.completed { " (completed)" } else { "" }
        ));
    }
    payload
}
