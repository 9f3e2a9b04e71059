//! Terminal form: asks for every field section by section.

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use medreport::form::FieldKind;
use medreport::{FormField, FormInput, FormSection, Locale, ServiceRecord};

/// Walks through the form and returns a validated record.
///
/// A field rejected on submit is asked again until the form validates.
pub fn collect(locale: Locale, today: NaiveDate) -> Result<ServiceRecord> {
    let mut editor = DefaultEditor::new()?;
    let mut form = FormInput::new(today);

    for section in FormSection::ALL {
        println!("\n{}", section.heading(locale));
        for field in section.fields() {
            ask(&mut editor, &mut form, field, locale)?;
        }
    }

    loop {
        match form.submit() {
            Ok(record) => return Ok(record),
            Err(err) => {
                eprintln!("  ! {err}");
                let field = FormField::from_key(err.field())
                    .ok_or_else(|| anyhow!("unexpected validation error: {err}"))?;
                ask(&mut editor, &mut form, field, locale)?;
            }
        }
    }
}

fn ask(editor: &mut DefaultEditor, form: &mut FormInput, field: FormField, locale: Locale) -> Result<()> {
    let label = field.label(locale);
    let current = form.get(field).to_string();

    let value = match field.kind() {
        FieldKind::Choice(labels) => {
            for (index, option) in labels.iter().enumerate() {
                println!("    {}) {option}", index + 1);
            }
            let input = read(editor, &format!("  {label}: "), &current)?;
            resolve_choice(&input, labels)
        }
        FieldKind::LongText => {
            if current.is_empty() {
                println!("  {label} (finish with an empty line)");
            } else {
                println!("  {label} (an empty first line keeps the current text)");
                for line in current.lines() {
                    println!("    | {line}");
                }
            }
            finish_lines(read_lines(editor)?, &current)
        }
        kind => {
            let prompt = match hint(kind) {
                Some(hint) => format!("  {label} [{hint}]: "),
                None => format!("  {label}: "),
            };
            read(editor, &prompt, &current)?
        }
    };

    form.set(field, value);
    Ok(())
}

fn hint(kind: FieldKind) -> Option<String> {
    match kind {
        FieldKind::Date => Some("YYYY-MM-DD".to_string()),
        FieldKind::Time => Some("HH:MM".to_string()),
        FieldKind::Decimal => Some("km".to_string()),
        FieldKind::Integer { min, max } => Some(format!("{min}-{max}")),
        FieldKind::Choice(_) | FieldKind::Text | FieldKind::LongText => None,
    }
}

fn read(editor: &mut DefaultEditor, prompt: &str, initial: &str) -> Result<String> {
    match editor.readline_with_initial(prompt, (initial, "")) {
        Ok(line) => Ok(line),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => bail!("form cancelled"),
        Err(err) => Err(err.into()),
    }
}

fn read_lines(editor: &mut DefaultEditor) -> Result<Vec<String>> {
    let mut lines = Vec::new();
    loop {
        let line = read(editor, "  > ", "")?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines)
}

/// Joins the typed lines; no lines at all keeps `current`.
fn finish_lines(lines: Vec<String>, current: &str) -> String {
    if lines.is_empty() {
        current.to_string()
    } else {
        lines.join("\n")
    }
}

/// Turns `2` into the second label; anything else is kept as typed.
fn resolve_choice(input: &str, labels: &[&str]) -> String {
    let input = input.trim();
    input
        .parse::<usize>()
        .ok()
        .and_then(|number| number.checked_sub(1))
        .and_then(|index| labels.get(index))
        .map_or_else(|| input.to_string(), |label| label.to_string())
}
