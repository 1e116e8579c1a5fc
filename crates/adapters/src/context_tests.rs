// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn command_on_line(content: &str, line: usize) -> Command {
    Command::parse_line(content.lines().nth(line).unwrap(), line).unwrap()
}

#[test]
fn collects_enclosing_heading_chain() {
    let doc = "\
# Guide
intro text
## Setup
step one
### Linux
apt install
!echo what now?
";
    let command = command_on_line(doc, 6);
    let context = HeaderContext::default().context_for(doc, &command);
    assert!(context.contains("# Guide"));
    assert!(context.contains("## Setup"));
    assert!(context.contains("### Linux"));
    assert!(context.contains("apt install"));
    // Sibling sections' bodies are not included.
    assert!(!context.contains("intro text"));
    assert!(!context.contains("step one"));
}

#[test]
fn skips_other_command_lines_in_section() {
    let doc = "# T\nline a\n-!echo done\n!echo next\n";
    let command = command_on_line(doc, 3);
    let context = HeaderContext::default().context_for(doc, &command);
    assert!(context.contains("line a"));
    assert!(!context.contains("-!echo done"));
}

#[test]
fn no_headings_gives_leading_lines() {
    let doc = "plain one\nplain two\n!echo hi\n";
    let command = command_on_line(doc, 2);
    let context = HeaderContext::default().context_for(doc, &command);
    assert_eq!(context, "plain one\nplain two");
}

#[test]
fn respects_byte_budget_keeping_tail() {
    let mut doc = String::from("# H\n");
    for i in 0..200 {
        doc.push_str(&format!("filler line number {}\n", i));
    }
    doc.push_str("!echo q\n");
    let line = doc.lines().count() - 1;
    let command = command_on_line(&doc, line);
    let context = HeaderContext::new(256).context_for(&doc, &command);
    assert!(context.len() <= 256);
    // The closest lines survive the clip.
    assert!(context.contains("filler line number 199"));
    assert!(!context.contains("filler line number 0\n"));
}

#[test]
fn hash_without_space_is_not_a_heading() {
    let doc = "#nospace\n!echo hi\n";
    let command = command_on_line(doc, 1);
    let context = HeaderContext::default().context_for(doc, &command);
    assert_eq!(context, "#nospace");
}

#[test]
fn fake_records_calls() {
    let fake = FakeContextSource::new("ctx");
    let command = Command::parse_line("!echo hi", 7).unwrap();
    assert_eq!(fake.context_for("", &command), "ctx");
    assert_eq!(fake.calls(), vec![7]);
}
