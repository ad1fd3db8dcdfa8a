// SPDX-License-Identifier: MIT OR Apache-2.0
//! Tokenizer and per-line statement parser for the animation scripting DSL
//! (spec §4.6). Each statement is parsed independently; resolving `select`
//! targets and property paths against a concrete project happens later, in
//! [`crate::compile`].

use mf_core::Interpolation;

/// One parsed line of a script, still unresolved against any project.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    /// `select "<id-or-name>"`
    Select(String),
    /// `duration <seconds>`
    Duration(f64),
    /// `fps <int>` — informational only, never reaches the compiled plan.
    Fps(u32),
    /// `label "<text>"`
    Label(String),
    /// `take "<name>" from <start> to <end>`
    Take { name: String, start: f64, end: f64 },
    /// `key <group> <axis> at <time> = <value> [deg] [ease <tag>]`
    Key { group: String, axis: String, time: f64, value: f64, degrees: bool, ease: Option<Interpolation> },
    /// `delete key <group> <axis> at <time>`
    DeleteKey { group: String, axis: String, time: f64 },
    /// `bounce amplitude <a> at <t0>..<t1>`
    Bounce { amplitude: f64, t0: f64, t1: f64 },
    /// `recoil distance <d> at <t0>..<t1>`
    Recoil { distance: f64, t0: f64, t1: f64 },
    /// `loop on|off` — informational only, never reaches the compiled plan.
    Loop(bool),
}

/// A statement's source position and the issue found while parsing it.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ScriptIssue {
    /// `"line:N"` for a parse error on line `N` (1-indexed), or a coarser
    /// tag (e.g. `"script"`) for errors that span no single line.
    pub path: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl ScriptIssue {
    /// An issue anchored to 1-indexed source line `line_no`.
    #[must_use]
    pub fn on_line(line_no: usize, message: impl Into<String>) -> Self {
        Self { path: format!("line:{line_no}"), message: message.into() }
    }

    /// An issue that doesn't belong to any single line.
    #[must_use]
    pub fn whole_script(message: impl Into<String>) -> Self {
        Self { path: "script".to_string(), message: message.into() }
    }
}

/// Split a line into whitespace-separated tokens, treating `"..."` runs as
/// a single token with the quotes stripped.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        if c == '"' {
            chars.next();
            let mut s = String::new();
            for ch in chars.by_ref() {
                if ch == '"' {
                    break;
                }
                s.push(ch);
            }
            tokens.push(s);
        } else {
            let mut s = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() {
                    break;
                }
                s.push(ch);
                chars.next();
            }
            tokens.push(s);
        }
    }
    tokens
}

fn parse_f64(tok: &str, line_no: usize, field: &str) -> Result<f64, ScriptIssue> {
    tok.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ScriptIssue::on_line(line_no, format!("'{field}' must be a finite number, got '{tok}'")))
}

fn parse_u32(tok: &str, line_no: usize, field: &str) -> Result<u32, ScriptIssue> {
    tok.parse::<u32>().map_err(|_| ScriptIssue::on_line(line_no, format!("'{field}' must be a non-negative integer, got '{tok}'")))
}

fn parse_ease(tok: &str, line_no: usize) -> Result<Interpolation, ScriptIssue> {
    match tok {
        "linear" => Ok(Interpolation::Linear),
        "step" => Ok(Interpolation::Step),
        "easeIn" => Ok(Interpolation::EaseIn),
        "easeOut" => Ok(Interpolation::EaseOut),
        "easeInOut" => Ok(Interpolation::EaseInOut),
        other => Err(ScriptIssue::on_line(line_no, format!("unknown ease tag '{other}'"))),
    }
}

fn check_group(group: &str, line_no: usize) -> Result<(), ScriptIssue> {
    if matches!(group, "position" | "rotation" | "scale") {
        Ok(())
    } else {
        Err(ScriptIssue::on_line(line_no, format!("unknown property group '{group}' (expected position, rotation, or scale)")))
    }
}

fn check_axis(axis: &str, line_no: usize) -> Result<(), ScriptIssue> {
    if matches!(axis, "x" | "y" | "z") {
        Ok(())
    } else {
        Err(ScriptIssue::on_line(line_no, format!("unknown axis '{axis}' (expected x, y, or z)")))
    }
}

fn split_range(tok: &str, line_no: usize) -> Result<(f64, f64), ScriptIssue> {
    let (a, b) = tok
        .split_once("..")
        .ok_or_else(|| ScriptIssue::on_line(line_no, format!("expected a '<start>..<end>' range, got '{tok}'")))?;
    let t0 = parse_f64(a, line_no, "t0")?;
    let t1 = parse_f64(b, line_no, "t1")?;
    if !(t0 < t1) {
        return Err(ScriptIssue::on_line(line_no, format!("range start must be before end, got {t0}..{t1}")));
    }
    Ok((t0, t1))
}

/// Parse a single non-empty, non-comment line into a [`Stmt`].
pub fn parse_line(line_no: usize, line: &str) -> Result<Stmt, ScriptIssue> {
    let tokens = tokenize(line);
    let verb = tokens.first().map(String::as_str).unwrap_or_default();
    match verb {
        "select" => match tokens.as_slice() {
            [_, target] => Ok(Stmt::Select(target.clone())),
            _ => Err(ScriptIssue::on_line(line_no, "expected: select \"<id-or-name>\"")),
        },
        "duration" => match tokens.as_slice() {
            [_, seconds] => {
                let seconds = parse_f64(seconds, line_no, "duration")?;
                if seconds <= 0.0 {
                    return Err(ScriptIssue::on_line(line_no, "duration must be > 0"));
                }
                Ok(Stmt::Duration(seconds))
            }
            _ => Err(ScriptIssue::on_line(line_no, "expected: duration <seconds>")),
        },
        "fps" => match tokens.as_slice() {
            [_, fps] => Ok(Stmt::Fps(parse_u32(fps, line_no, "fps")?)),
            _ => Err(ScriptIssue::on_line(line_no, "expected: fps <int>")),
        },
        "label" => match tokens.as_slice() {
            [_, text] => Ok(Stmt::Label(text.clone())),
            _ => Err(ScriptIssue::on_line(line_no, "expected: label \"<text>\"")),
        },
        "take" => match tokens.as_slice() {
            [_, name, from, start, to, end] if from == "from" && to == "to" => {
                let start = parse_f64(start, line_no, "start")?;
                let end = parse_f64(end, line_no, "end")?;
                if !(start < end) {
                    return Err(ScriptIssue::on_line(line_no, "take start must be before end"));
                }
                Ok(Stmt::Take { name: name.clone(), start, end })
            }
            _ => Err(ScriptIssue::on_line(line_no, "expected: take \"<name>\" from <start> to <end>")),
        },
        "delete" => match tokens.as_slice() {
            [_, key, group, axis, at, time] if key == "key" && at == "at" => {
                check_group(group, line_no)?;
                check_axis(axis, line_no)?;
                let time = parse_f64(time, line_no, "time")?;
                Ok(Stmt::DeleteKey { group: group.clone(), axis: axis.clone(), time })
            }
            _ => Err(ScriptIssue::on_line(line_no, "expected: delete key <group> <axis> at <time>")),
        },
        "key" => {
            if tokens.len() < 7 {
                return Err(ScriptIssue::on_line(
                    line_no,
                    "expected: key <group> <axis> at <time> = <value> [deg] [ease <tag>]",
                ));
            }
            let group = tokens[1].clone();
            let axis = tokens[2].clone();
            if tokens[3] != "at" {
                return Err(ScriptIssue::on_line(line_no, "expected 'at' after the axis"));
            }
            check_group(&group, line_no)?;
            check_axis(&axis, line_no)?;
            let time = parse_f64(&tokens[4], line_no, "time")?;
            if tokens[5] != "=" {
                return Err(ScriptIssue::on_line(line_no, "expected '=' before the value"));
            }
            let value = parse_f64(&tokens[6], line_no, "value")?;

            let mut degrees = false;
            let mut ease = None;
            let mut i = 7;
            while i < tokens.len() {
                match tokens[i].as_str() {
                    "deg" => {
                        degrees = true;
                        i += 1;
                    }
                    "ease" => {
                        let tag = tokens
                            .get(i + 1)
                            .ok_or_else(|| ScriptIssue::on_line(line_no, "expected an ease tag after 'ease'"))?;
                        ease = Some(parse_ease(tag, line_no)?);
                        i += 2;
                    }
                    other => return Err(ScriptIssue::on_line(line_no, format!("unexpected trailing token '{other}'"))),
                }
            }
            Ok(Stmt::Key { group, axis, time, value, degrees, ease })
        }
        "bounce" => match tokens.as_slice() {
            [_, amp_kw, amplitude, at, range] if amp_kw == "amplitude" && at == "at" => {
                let amplitude = parse_f64(amplitude, line_no, "amplitude")?;
                let (t0, t1) = split_range(range, line_no)?;
                Ok(Stmt::Bounce { amplitude, t0, t1 })
            }
            _ => Err(ScriptIssue::on_line(line_no, "expected: bounce amplitude <a> at <t0>..<t1>")),
        },
        "recoil" => match tokens.as_slice() {
            [_, dist_kw, distance, at, range] if dist_kw == "distance" && at == "at" => {
                let distance = parse_f64(distance, line_no, "distance")?;
                let (t0, t1) = split_range(range, line_no)?;
                Ok(Stmt::Recoil { distance, t0, t1 })
            }
            _ => Err(ScriptIssue::on_line(line_no, "expected: recoil distance <d> at <t0>..<t1>")),
        },
        "loop" => match tokens.as_slice() {
            [_, flag] if flag == "on" => Ok(Stmt::Loop(true)),
            [_, flag] if flag == "off" => Ok(Stmt::Loop(false)),
            _ => Err(ScriptIssue::on_line(line_no, "expected: loop on|off")),
        },
        other => Err(ScriptIssue::on_line(line_no, format!("unrecognized statement '{other}'"))),
    }
}

/// Split `script` into non-empty, non-comment (`#`-prefixed) source lines
/// paired with their 1-indexed line numbers, then parse each one.
/// Collects every parse error rather than stopping at the first.
#[must_use]
pub fn parse_script(script: &str) -> (Vec<(usize, Stmt)>, Vec<ScriptIssue>) {
    let mut stmts = Vec::new();
    let mut errors = Vec::new();
    for (idx, raw) in script.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        match parse_line(line_no, trimmed) {
            Ok(stmt) => stmts.push((line_no, stmt)),
            Err(issue) => errors.push(issue),
        }
    }
    (stmts, errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_select_with_quoted_name() {
        assert_eq!(parse_line(1, r#"select "Cube One""#).unwrap(), Stmt::Select("Cube One".to_string()));
    }

    #[test]
    fn parses_key_with_deg_and_ease() {
        let stmt = parse_line(1, "key rotation y at 1.5 = 90 deg ease easeIn").unwrap();
        assert_eq!(
            stmt,
            Stmt::Key {
                group: "rotation".to_string(),
                axis: "y".to_string(),
                time: 1.5,
                value: 90.0,
                degrees: true,
                ease: Some(Interpolation::EaseIn),
            }
        );
    }

    #[test]
    fn parses_key_without_optional_suffixes() {
        let stmt = parse_line(1, "key position x at 0 = 1").unwrap();
        assert_eq!(
            stmt,
            Stmt::Key { group: "position".to_string(), axis: "x".to_string(), time: 0.0, value: 1.0, degrees: false, ease: None }
        );
    }

    #[test]
    fn parses_delete_key() {
        assert_eq!(
            parse_line(1, "delete key position x at 1").unwrap(),
            Stmt::DeleteKey { group: "position".to_string(), axis: "x".to_string(), time: 1.0 }
        );
    }

    #[test]
    fn parses_bounce_macro() {
        assert_eq!(parse_line(1, "bounce amplitude 0.4 at 0..1.2").unwrap(), Stmt::Bounce { amplitude: 0.4, t0: 0.0, t1: 1.2 });
    }

    #[test]
    fn parses_take() {
        assert_eq!(
            parse_line(1, r#"take "Idle" from 0 to 2"#).unwrap(),
            Stmt::Take { name: "Idle".to_string(), start: 0.0, end: 2.0 }
        );
    }

    #[test]
    fn rejects_unknown_group() {
        let err = parse_line(3, "key size x at 0 = 1").unwrap_err();
        assert_eq!(err.path, "line:3");
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(parse_line(1, "frobnicate everything").is_err());
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let script = "# a comment\n\nselect \"obj_1\"\nduration 2\n";
        let (stmts, errors) = parse_script(script);
        assert!(errors.is_empty());
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0].0, 3);
    }

    #[test]
    fn collects_every_error_not_just_the_first() {
        let script = "bogus\nduration -1\n";
        let (_stmts, errors) = parse_script(script);
        assert_eq!(errors.len(), 2);
    }
}
