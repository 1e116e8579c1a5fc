// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use skylark_core::Command;

fn response_at(content: &str, line: usize, text: &str) -> Response {
    let command = Command::parse_line(content.lines().nth(line).unwrap(), line).unwrap();
    Response::new(command, text)
}

#[test]
fn rewrites_single_command() {
    let content = "# T\n!echo hi\n";
    let response = response_at(content, 1, "hi");
    let out = apply(content, &[response]);
    assert_eq!(out, "# T\n-!echo hi\n\nhi\n\n");
}

#[test]
fn preserves_non_command_lines_verbatim() {
    let content = "alpha\n!echo q\nomega\n";
    let out = apply(content, &[response_at(content, 1, "answer")]);
    assert_eq!(out, "alpha\n-!echo q\n\nanswer\n\nomega\n");
}

#[test]
fn multiple_commands_in_one_pass() {
    let content = "!echo one\nmiddle\n!echo two\n";
    let out = apply(
        content,
        &[
            response_at(content, 0, "1"),
            response_at(content, 2, "2"),
        ],
    );
    assert_eq!(out, "-!echo one\n\n1\n\nmiddle\n-!echo two\n\n2\n\n");
}

#[test]
fn no_responses_is_identity_modulo_trailing_newline() {
    let content = "# Doc\n-!echo old\n\nanswer\n";
    assert_eq!(apply(content, &[]), content);
}

#[test]
fn adds_trailing_newline_when_missing() {
    let content = "just text";
    assert_eq!(apply(content, &[]), "just text\n");
}

#[test]
fn indented_command_keeps_indentation_after_dash() {
    let content = "  !echo hi\n";
    let out = apply(content, &[response_at(content, 0, "yo")]);
    assert_eq!(out, "-  !echo hi\n\nyo\n\n");
}

#[test]
fn multiline_response_trimmed_at_end() {
    let content = "!echo hi\n";
    let out = apply(content, &[response_at(content, 0, "line1\nline2\n\n")]);
    assert_eq!(out, "-!echo hi\n\nline1\nline2\n\n");
}
