//! Terminal output helpers.
//!
//! Messages go to stdout, warnings and errors to stderr. Colors are used when
//! both streams are terminals, `NO_COLOR` is unset and `--no-ansi` was not
//! given.

pub mod table;

use libretto_core::Diagnosable;
use owo_colors::OwoColorize;
use std::io::{IsTerminal, stderr, stdout};
use std::sync::atomic::{AtomicBool, Ordering};

static COLOR_ENABLED: AtomicBool = AtomicBool::new(true);
static QUIET: AtomicBool = AtomicBool::new(false);

/// Initialize output settings from flags and the environment.
pub fn init(no_ansi: bool, quiet: bool) {
    let colors = !no_ansi
        && std::env::var_os("NO_COLOR").is_none()
        && stdout().is_terminal()
        && stderr().is_terminal();
    COLOR_ENABLED.store(colors, Ordering::Relaxed);
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Whether colors are enabled.
pub fn colors_enabled() -> bool {
    COLOR_ENABLED.load(Ordering::Relaxed)
}

fn quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// Print a plain line.
pub fn line(text: &str) {
    if !quiet() {
        println!("{text}");
    }
}

/// Print a success message.
pub fn success(text: &str) {
    if quiet() {
        return;
    }
    if colors_enabled() {
        println!("{}", text.green());
    } else {
        println!("{text}");
    }
}

/// Print an informational message.
pub fn info(text: &str) {
    if quiet() {
        return;
    }
    if colors_enabled() {
        println!("{}", text.cyan());
    } else {
        println!("{text}");
    }
}

/// Print a warning.
pub fn warning(text: &str) {
    if quiet() {
        return;
    }
    if colors_enabled() {
        eprintln!("{}", text.yellow());
    } else {
        eprintln!("{text}");
    }
}

/// Print an error; shown even with `--quiet`.
pub fn error(text: &str) {
    if colors_enabled() {
        eprintln!("{}", text.red());
    } else {
        eprintln!("{text}");
    }
}

/// Print an added, removed or changed manifest entry.
pub fn change(sign: char, name: &str, constraint: &str) {
    if quiet() {
        return;
    }
    if !colors_enabled() {
        println!("  {sign} {name}:{constraint}");
        return;
    }
    match sign {
        '+' => println!("  {} {}:{}", sign.green(), name.green(), constraint.green()),
        '-' => println!("  {} {}:{}", sign.red(), name.red(), constraint.red()),
        _ => println!("  {} {}:{}", sign.yellow(), name, constraint.yellow()),
    }
}

/// Print an error with its suggestions and documentation link.
pub fn diagnostic(err: &dyn Diagnosable) {
    let rendered = err.display_with_suggestions();
    let mut lines = rendered.lines();
    if let Some(first) = lines.next() {
        error(first);
    }
    for rest in lines {
        eprintln!("{rest}");
    }
}
