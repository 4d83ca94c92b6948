//! Line editor for padctl REPL

use rustyline::{
    history::DefaultHistory,
    validate::{ValidationResult, Validator},
    Completer, Helper, Highlighter, Hinter, Result,
};

/// Custom rustyline::Editor
pub(crate) type Editor = rustyline::Editor<ReplEditor, DefaultHistory>;

/// Create a line editor
pub fn editor() -> Result<Editor> {
    let editor = ReplEditor {};
    let mut rl = rustyline::Editor::new()?;
    rl.set_helper(Some(editor));
    Ok(rl)
}

/// Editor for padctl repl
#[derive(Completer, Helper, Highlighter, Hinter)]
pub struct ReplEditor {}

impl Validator for ReplEditor {
    fn validate(
        &self,
        ctx: &mut rustyline::validate::ValidationContext,
    ) -> Result<rustyline::validate::ValidationResult> {
        let input = ctx.input();
        if input.trim_start().starts_with(':') {
            return Ok(ValidationResult::Valid(None));
        }
        Ok(match balance(input) {
            Balance::Closed => ValidationResult::Valid(None),
            Balance::Open => ValidationResult::Incomplete,
            Balance::Unpaired(msg) => ValidationResult::Invalid(Some(msg)),
        })
    }

    fn validate_while_typing(&self) -> bool {
        false
    }
}

/// Bracket state of a partial snippet
#[derive(Debug, PartialEq)]
enum Balance {
    Closed,
    Open,
    Unpaired(String),
}

fn balance(input: &str) -> Balance {
    let mut stack = vec![];
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in input.chars() {
        if let Some(q) = quote {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                _ if c == q => quote = None,
                _ => {}
            }
            continue;
        }
        match c {
            '\'' | '"' | '`' => quote = Some(c),
            '(' | '[' | '{' => stack.push(c),
            ')' | ']' | '}' => {
                let opening = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some(o) if o == opening => {}
                    Some(wanted) => return Balance::Unpaired(format!("{wanted} is not closed")),
                    None => return Balance::Unpaired(format!("{c} is not paired")),
                }
            }
            _ => {}
        }
    }
    if stack.is_empty() && quote != Some('`') {
        Balance::Closed
    } else {
        Balance::Open
    }
}
