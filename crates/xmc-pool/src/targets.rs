/// Expands the `NAME*K` shorthand into `K` copies of `NAME`.
///
/// Only alphanumeric names with a decimal repeat count are expanded, and the
/// whole entry must have that shape: a trailing suffix such as `node7*2x`
/// is not truncated to `node7*2` but kept verbatim as one target, the same
/// as `host.example.org` or `node*`.
pub fn expand_targets<S: AsRef<str>>(targets: &[S]) -> Vec<String> {
    let mut out = Vec::new();
    for target in targets {
        let target = target.as_ref();
        match parse_repeat(target) {
            Some((name, count)) => out.extend(std::iter::repeat(name.to_string()).take(count)),
            None => out.push(target.to_string()),
        }
    }
    out
}

/// Splits a whitespace separated target list, as given on the command line.
pub fn split_target_list(list: &str) -> Vec<String> {
    list.split_whitespace().map(str::to_string).collect()
}

fn parse_repeat(target: &str) -> Option<(&str, usize)> {
    let (name, count) = target.split_once('*')?;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    if count.is_empty() || !count.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    count.parse().ok().map(|count| (name, count))
}
