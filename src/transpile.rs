use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    // Anything still looking like a markup command (or a stray brace) after
    // all rewrite passes means the input used a construct we do not know.
    static ref LEFTOVER_RE: Regex = Regex::new(r"\\[a-zA-Z]+|[{}]").unwrap();
}

/// Failure to normalize a markup expression into a linear one.
///
/// A transpile failure belongs to the entity owning the markup: its cached
/// `expression` stays unset and every evaluation against it degrades to the
/// `'?'` marker downstream. It is never allowed to produce a corrupted
/// expression string silently.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TranspileError {
    #[error("unbalanced delimiters after `{0}`")]
    Unbalanced(&'static str),
    #[error("missing argument after `{0}`")]
    MissingArgument(&'static str),
    #[error("unsupported markup remains after rewriting: `{0}`")]
    Unsupported(String),
}

/// Converts a brace-delimited markup expression (the formula-editor syntax)
/// into a linear expression string the evaluator understands.
///
/// The rewrite passes run in a fixed order; the structured constructs are
/// rewritten before the single-token replacements because they rely on the
/// normalized delimiters:
///
/// 1. `\left(`/`\right)` (and the bracket forms) become plain delimiters
/// 2. `\frac{A}{B}` becomes `((A)/(B))`
/// 3. `^{E}` becomes `^(E)`
/// 4. `\sqrt{E}` becomes `sqrt(E)`
/// 5. `\log_{B}(X)` becomes `log(X,B)`
/// 6. `\cdot`, `\pi`, trig and log names become their linear spellings
/// 7. spaces are stripped
///
/// Each structured pass repeatedly rewrites the **rightmost** occurrence of
/// its construct, matching the closing delimiter by depth counting, until no
/// occurrence remains.
///
/// # Examples
/// ```
/// use mathpad::transpile::transpile;
///
/// let linear = transpile("\\frac{4}{\\pi}\\sin\\left(x\\cdot\\pi\\right)").unwrap();
/// assert_eq!(linear, "((4)/(pi))sin(x*pi)");
/// ```
pub fn transpile(markup: &str) -> Result<String, TranspileError> {
    let mut s = markup.to_string();

    // Pass 1: delimiter normalization.
    s = s
        .replace("\\left(", "(")
        .replace("\\right)", ")")
        .replace("\\left[", "[")
        .replace("\\right]", "]");

    s = rewrite_fractions(s)?;
    s = rewrite_exponents(s)?;
    s = rewrite_roots(s)?;
    s = rewrite_logs(s)?;

    // Pass 6: single-token replacements. `\log_{}` is already gone, so the
    // bare `\log` and `\ln` both map onto the backend's `log`.
    s = s
        .replace("\\cdot", "*")
        .replace("\\pi", "pi")
        .replace("\\sin", "sin")
        .replace("\\cos", "cos")
        .replace("\\tan", "tan")
        .replace("\\ln", "log")
        .replace("\\log", "log");

    // Pass 7: literal space removal (including escaped spaces).
    s = s.replace("\\ ", "").replace(' ', "");

    if let Some(m) = LEFTOVER_RE.find(&s) {
        return Err(TranspileError::Unsupported(m.as_str().to_string()));
    }

    Ok(s)
}

/// Index of the delimiter closing the one at `open`, by depth counting.
fn matching_delim(s: &str, open: usize, open_ch: char, close_ch: char) -> Option<usize> {
    let mut depth: i32 = 0;
    for (i, c) in s[open..].char_indices() {
        if c == open_ch {
            depth += 1;
        } else if c == close_ch {
            depth -= 1;
            if depth == 0 {
                return Some(open + i);
            }
        }
    }
    None
}

/// The `{...}` group starting at `at`, as (open, close) indices.
fn brace_group(s: &str, at: usize, construct: &'static str) -> Result<(usize, usize), TranspileError> {
    if s[at..].chars().next() != Some('{') {
        return Err(TranspileError::MissingArgument(construct));
    }
    let close = matching_delim(s, at, '{', '}').ok_or(TranspileError::Unbalanced(construct))?;
    Ok((at, close))
}

fn rewrite_fractions(mut s: String) -> Result<String, TranspileError> {
    while let Some(start) = s.rfind("\\frac") {
        let (num_open, num_close) = brace_group(&s, start + "\\frac".len(), "\\frac")?;
        let (den_open, den_close) = brace_group(&s, num_close + 1, "\\frac")?;
        let rewritten = format!(
            "(({})/({}))",
            &s[num_open + 1..num_close],
            &s[den_open + 1..den_close]
        );
        s.replace_range(start..=den_close, &rewritten);
    }
    Ok(s)
}

fn rewrite_exponents(mut s: String) -> Result<String, TranspileError> {
    while let Some(start) = s.rfind("^{") {
        let (open, close) = brace_group(&s, start + 1, "^")?;
        let rewritten = format!("^({})", &s[open + 1..close]);
        s.replace_range(start..=close, &rewritten);
    }
    Ok(s)
}

fn rewrite_roots(mut s: String) -> Result<String, TranspileError> {
    while let Some(start) = s.rfind("\\sqrt") {
        let (open, close) = brace_group(&s, start + "\\sqrt".len(), "\\sqrt")?;
        let rewritten = format!("sqrt({})", &s[open + 1..close]);
        s.replace_range(start..=close, &rewritten);
    }
    Ok(s)
}

/// `\log_{B}(X)` carries its base as a subscript and its argument in the
/// (already normalized) parentheses that follow.
fn rewrite_logs(mut s: String) -> Result<String, TranspileError> {
    while let Some(start) = s.rfind("\\log_{") {
        let (base_open, base_close) = brace_group(&s, start + "\\log_".len(), "\\log_")?;
        let arg_open = base_close + 1;
        if s[arg_open..].chars().next() != Some('(') {
            return Err(TranspileError::MissingArgument("\\log_"));
        }
        let arg_close =
            matching_delim(&s, arg_open, '(', ')').ok_or(TranspileError::Unbalanced("\\log_"))?;
        let rewritten = format!(
            "log({},{})",
            &s[arg_open + 1..arg_close],
            &s[base_open + 1..base_close]
        );
        s.replace_range(start..=arg_close, &rewritten);
    }
    Ok(s)
}
