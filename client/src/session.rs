//! Interactive session flow: registration, topic menu, quiz play, and
//! leaderboard display. All rendering is plain terminal output; the server
//! remains the authority on every decision.

use crate::connection::Connection;
use log::warn;
use shared::{
    expand_escapes, valid_nickname, MSG_ANSWER, MSG_END, MSG_END_SCORE, MSG_ERROR, MSG_NICK,
    MSG_OK, MSG_QUESTION, MSG_QUIZ_START, MSG_RESULT, MSG_SCORE, MSG_SCORELIST, MSG_THEME,
    MSG_THEMES, MSG_THEMES_LIST, ProtocolError, RESP_CORRECT, RESP_NICK_TAKEN,
    RESP_QUIZ_COMPLETE, RESP_WRONG,
};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Line-oriented stdin prompt. `None` means the user closed the input.
struct Prompt {
    lines: Lines<BufReader<Stdin>>,
}

impl Prompt {
    fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }

    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>, std::io::Error> {
        print!("{}", prompt);
        std::io::stdout().flush()?;
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| line.trim().to_string()))
    }
}

enum MenuOutcome {
    Selected(usize),
    Retry,
    Quit,
}

/// Drives one full session against the server, from registration to
/// termination.
pub async fn run_session(conn: &mut Connection) -> Result<(), ProtocolError> {
    let mut prompt = Prompt::new();

    if !register(conn, &mut prompt).await? {
        return Ok(());
    }

    loop {
        match topic_menu(conn, &mut prompt).await? {
            MenuOutcome::Selected(topic) => {
                if !play(conn, &mut prompt, topic).await? {
                    break;
                }
            }
            MenuOutcome::Retry => continue,
            MenuOutcome::Quit => break,
        }
    }

    println!("\nSession ended.");
    Ok(())
}

/// Prompts for nicknames until the server accepts one. Returns `false` when
/// the user gives up by closing stdin.
async fn register(conn: &mut Connection, prompt: &mut Prompt) -> Result<bool, ProtocolError> {
    println!("=== Nickname registration ===");
    loop {
        let Some(nickname) = prompt
            .read_line("Nickname (letters, digits, underscore; max 31 chars): ")
            .await?
        else {
            return Ok(false);
        };

        if !valid_nickname(&nickname) {
            println!("Invalid nickname, try again.");
            continue;
        }

        conn.send(MSG_NICK, &nickname).await?;
        let reply = conn.recv().await?;
        match reply.msg_type.as_str() {
            MSG_OK => {
                println!("Nickname '{}' registered.", nickname);
                return Ok(true);
            }
            MSG_ERROR if reply.data == RESP_NICK_TAKEN => {
                println!("Nickname already in use, pick another.");
            }
            MSG_ERROR => println!("Error: {}", reply.data),
            other => warn!("Unexpected reply during registration: {}", other),
        }
    }
}

/// Requests the topic list and reads the user's choice. Anything that is not
/// a recognized command is sent as a topic index and judged by the server.
async fn topic_menu(
    conn: &mut Connection,
    prompt: &mut Prompt,
) -> Result<MenuOutcome, ProtocolError> {
    conn.send(MSG_THEMES, "").await?;

    let reply = conn.recv().await?;
    if reply.msg_type != MSG_OK {
        return Ok(MenuOutcome::Retry);
    }
    let count: usize = reply.data.trim().parse().unwrap_or(0);
    if count == 0 {
        println!("No topics available.");
        conn.send(MSG_END, "").await?;
        return Ok(MenuOutcome::Quit);
    }

    conn.send(MSG_OK, "").await?;
    let listing = conn.recv().await?;
    if listing.msg_type != MSG_THEMES_LIST {
        return Ok(MenuOutcome::Retry);
    }

    println!("\n=== Topic selection ===");
    println!("{}", expand_escapes(&listing.data));

    let Some(input) = prompt
        .read_line("Topic number, 'score' for standings, 'quit' to exit: ")
        .await?
    else {
        conn.send(MSG_END, "").await?;
        return Ok(MenuOutcome::Quit);
    };

    match input.as_str() {
        "score" => {
            conn.send(MSG_SCORE, "").await?;
            show_scoreboards(conn).await?;
            Ok(MenuOutcome::Retry)
        }
        "quit" => {
            conn.send(MSG_END, "").await?;
            Ok(MenuOutcome::Quit)
        }
        choice => {
            conn.send(MSG_THEME, choice).await?;
            let reply = conn.recv().await?;
            if reply.msg_type == MSG_OK {
                Ok(MenuOutcome::Selected(choice.parse().unwrap_or(0)))
            } else {
                println!("Topic not accepted: {}", reply.data);
                Ok(MenuOutcome::Retry)
            }
        }
    }
}

/// The question loop for one quiz. Returns `false` when the session is over
/// (user quit or server ended it), `true` to go back to the topic menu.
async fn play(
    conn: &mut Connection,
    prompt: &mut Prompt,
    topic: usize,
) -> Result<bool, ProtocolError> {
    println!("\n====== Quiz: topic {} ======", topic);
    println!("Answer each question; 'score' shows standings, 'quit' leaves the session.");

    let mut question_num = 1;
    conn.send(MSG_QUIZ_START, "").await?;

    loop {
        let frame = conn.recv().await?;
        match frame.msg_type.as_str() {
            MSG_QUESTION => {
                println!("---- Question {} ----", question_num);
                println!("{}", frame.data);

                let Some(input) = prompt.read_line("> ").await? else {
                    conn.send(MSG_END, "").await?;
                    return Ok(false);
                };
                match input.as_str() {
                    "score" => conn.send(MSG_SCORE, "").await?,
                    "quit" => {
                        conn.send(MSG_END, "").await?;
                        return Ok(false);
                    }
                    answer => {
                        conn.send(MSG_ANSWER, answer).await?;
                        question_num += 1;
                    }
                }
            }
            MSG_RESULT => match frame.data.as_str() {
                RESP_CORRECT => {
                    println!("Correct!");
                    conn.send(MSG_OK, "").await?;
                    conn.send(MSG_QUIZ_START, "").await?;
                }
                RESP_WRONG => {
                    println!("Wrong.");
                    conn.send(MSG_OK, "").await?;
                    conn.send(MSG_QUIZ_START, "").await?;
                }
                RESP_QUIZ_COMPLETE => {
                    println!("All questions answered, quiz complete!");
                    println!("Returning to the topic menu...");
                    return Ok(true);
                }
                other => println!("Unknown result: {}", other),
            },
            MSG_SCORELIST => {
                print!("{}", scoreboard_text(&frame.data));
                conn.send(MSG_OK, "").await?;
            }
            MSG_END_SCORE => {
                // Standings done; ask for the pending question again.
                conn.send(MSG_QUIZ_START, "").await?;
            }
            MSG_ERROR => {
                println!("Server error: {}", frame.data);
                return Ok(true);
            }
            MSG_END => {
                println!("The server ended the session.");
                return Ok(false);
            }
            other => warn!("Unexpected {} during quiz", other),
        }
    }
}

/// Receives `SCORELIST` frames, acknowledging each, until the end-of-listing
/// marker arrives.
async fn show_scoreboards(conn: &mut Connection) -> Result<(), ProtocolError> {
    loop {
        let frame = conn.recv().await?;
        match frame.msg_type.as_str() {
            MSG_SCORELIST => {
                print!("{}", scoreboard_text(&frame.data));
                conn.send(MSG_OK, "").await?;
            }
            MSG_END_SCORE => return Ok(()),
            other => warn!("Unexpected {} during leaderboard listing", other),
        }
    }
}

/// Renders one SCORELIST payload: the first character is the topic index,
/// the rest is the `\n`-escaped ranking (empty for a topic nobody played).
fn scoreboard_text(data: &str) -> String {
    let mut chars = data.chars();
    let Some(topic) = chars.next() else {
        return String::new();
    };
    let body: String = chars.collect();

    let mut out = format!("=== Standings for topic {} ===\n", topic);
    if body.is_empty() {
        out.push_str("No scores recorded for this topic yet.\n");
    } else {
        out.push_str(&expand_escapes(&body));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoreboard_text_with_entries() {
        let text = scoreboard_text("01. bob: 5 points (completed)\\n2. alice: 2 points\\n");
        assert!(text.starts_with("=== Standings for topic 0 ===\n"));
        assert!(text.contains("1. bob: 5 points (completed)\n"));
        assert!(text.contains("2. alice: 2 points\n"));
    }

    #[test]
    fn test_scoreboard_text_empty_marker() {
        let text = scoreboard_text("3");
        assert!(text.contains("topic 3"));
        assert!(text.contains("No scores recorded"));
    }

    #[test]
    fn test_scoreboard_text_blank_payload() {
        assert_eq!(scoreboard_text(""), "");
    }
}
