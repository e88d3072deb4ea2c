//! Topic catalog and quiz store.
//!
//! Topic names come from `<dir>/topics.txt`, one per line; each name maps to
//! `<dir>/<name>.txt` holding alternating prompt/answer lines. Quizzes are
//! immutable once loaded.

use log::{info, warn};
use shared::{MAX_TOPICS, QUIZ_QUESTIONS};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QuizError {
    #[error("unknown topic index {0}")]
    NotFound(usize),
    #[error("failed to read quiz file: {0}")]
    Io(#[from] io::Error),
}

/// One prompt with its correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub answer: String,
}

/// An ordered question set for one topic, capped at `QUIZ_QUESTIONS`.
#[derive(Debug, Clone)]
pub struct Quiz {
    questions: Vec<Question>,
}

impl Quiz {
    /// Parses alternating prompt/answer lines. Blank lines and literal `---`
    /// separators before a prompt are skipped; the answer is always the very
    /// next line. A trailing prompt with no answer line is dropped.
    fn parse(text: &str) -> Self {
        let mut questions = Vec::new();
        let mut lines = text.lines().map(str::trim_end);

        while questions.len() < QUIZ_QUESTIONS {
            let prompt = match lines.find(|l| !l.is_empty() && *l != "---") {
                Some(line) => line,
                None => break,
            };
            match lines.next() {
                Some(answer) => questions.push(Question {
                    prompt: prompt.to_string(),
                    answer: answer.trim().to_string(),
                }),
                None => {
                    warn!("Quiz file ends with an unanswered prompt; dropping it");
                    break;
                }
            }
        }

        Self { questions }
    }

    pub fn question(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn len(&self) -> usize {
        self.questions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Case-insensitive, surrounding-whitespace-insensitive exact match. No
/// partial credit.
pub fn check_answer(question: &Question, raw_answer: &str) -> bool {
    raw_answer.trim().eq_ignore_ascii_case(&question.answer)
}

/// The ordered list of topics, fixed for the server's lifetime. A topic is
/// identified everywhere by its index in this list.
#[derive(Debug)]
pub struct TopicCatalog {
    names: Vec<String>,
    dir: PathBuf,
}

impl TopicCatalog {
    /// Reads topic names from `<dir>/topics.txt`, capped at `MAX_TOPICS`.
    pub fn load(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        let raw = fs::read_to_string(dir.join("topics.txt"))?;
        let names: Vec<String> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .take(MAX_TOPICS)
            .map(String::from)
            .collect();

        info!("Loaded {} topics from {}", names.len(), dir.display());
        for name in &names {
            info!("  - {}", name);
        }
        Ok(Self { names, dir })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Resolves a topic index to its question set.
    pub fn load_quiz(&self, index: usize) -> Result<Quiz, QuizError> {
        let name = self.names.get(index).ok_or(QuizError::NotFound(index))?;
        let path = self.dir.join(format!("{}.txt", name));
        let text = fs::read_to_string(&path)?;
        Ok(Quiz::parse(&text))
    }
}
