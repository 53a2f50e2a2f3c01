// Console rendering of a finished run

use std::fmt::Write;

use crate::agents::AgentOutcome;
use crate::models::{AnswerRecord, RevisedAnswerRecord};

const WIDTH: usize = 70;

fn rule(ch: char) -> String {
    std::iter::repeat(ch).take(WIDTH).collect()
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out, "{}", rule('-'));
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", rule('-'));
}

pub fn render_header(question: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "REFLECTION AGENT");
    let _ = writeln!(out, "{}", rule('='));
    let _ = writeln!(out, "\nQuestion: {}\n", question);
    out
}

/// Initial answer with its self-critique and the queries it proposed
pub fn render_initial(answer: &AnswerRecord) -> String {
    let mut out = String::new();
    section(&mut out, "INITIAL ANSWER");
    let _ = writeln!(out, "{}", answer.answer);

    let _ = writeln!(out, "\nSelf-Critique:");
    let _ = writeln!(out, "   Missing: {}", answer.reflection.missing);
    let _ = writeln!(out, "   Superfluous: {}", answer.reflection.superfluous);

    if !answer.search_queries.is_empty() {
        let _ = writeln!(out, "\nGenerated Queries:");
        for (i, query) in answer.search_queries.iter().enumerate() {
            let _ = writeln!(out, "   {}. {}", i + 1, query);
        }
    }
    out
}

pub fn render_final(answer: &RevisedAnswerRecord) -> String {
    let mut out = String::new();
    out.push('\n');
    section(&mut out, "FINAL REVISED ANSWER");
    let _ = writeln!(out, "{}", answer.answer);

    if !answer.references.is_empty() {
        let _ = writeln!(out, "\nReferences:");
        for (i, reference) in answer.references.iter().enumerate() {
            let _ = writeln!(out, "   [{}] {}", i + 1, reference);
        }
    }
    out
}

pub fn render_outcome(outcome: &AgentOutcome) -> String {
    let mut out = render_header(&outcome.question);
    out.push_str(&render_initial(&outcome.initial_answer));
    out.push_str(&render_final(&outcome.final_answer));

    let _ = writeln!(out, "\n{}", rule('='));
    let _ = writeln!(
        out,
        "Done after {} revision{} ({} messages)",
        outcome.revision_count,
        if outcome.revision_count == 1 { "" } else { "s" },
        outcome.message_count
    );
    let _ = writeln!(out, "{}", rule('='));
    out
}
