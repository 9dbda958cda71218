//! String helpers shared across the workspace.

/// Whether `s` looks like a number: optional sign, digits with at most one
/// decimal point, optional exponent.
///
/// The component factory uses this to decide whether a string parameter is a
/// literal value or a key into the root dictionary, so the check must reject
/// anything a name could plausibly be.
pub fn string_is_numeric(s: &str) -> bool {
    let mut chars = s.chars().peekable();
    if matches!(chars.peek(), Some('+') | Some('-')) {
        chars.next();
    }
    let mut digits = 0usize;
    let mut seen_dot = false;
    while let Some(&c) = chars.peek() {
        match c {
            '0'..='9' => {
                digits += 1;
                chars.next();
            }
            '.' if !seen_dot => {
                seen_dot = true;
                chars.next();
            }
            _ => break,
        }
    }
    if digits == 0 {
        return false;
    }
    // optional exponent
    if matches!(chars.peek(), Some('e') | Some('E')) {
        chars.next();
        if matches!(chars.peek(), Some('+') | Some('-')) {
            chars.next();
        }
        let mut exp_digits = 0usize;
        while matches!(chars.peek(), Some('0'..='9')) {
            exp_digits += 1;
            chars.next();
        }
        if exp_digits == 0 {
            return false;
        }
    }
    chars.next().is_none()
}

/// The `count` candidate names closest to `target` by edit distance.
///
/// Used to build "could you have meant one of these?" listings on failed
/// type and instance lookups. Ties keep candidate order.
pub fn similar_names<'a, I>(candidates: I, target: &str, count: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut ranked: Vec<(usize, &str)> = candidates
        .into_iter()
        .map(|name| (strsim::levenshtein(name, target), name))
        .collect();
    ranked.sort_by_key(|(distance, _)| *distance);
    ranked
        .into_iter()
        .take(count)
        .map(|(_, name)| name.to_owned())
        .collect()
}
