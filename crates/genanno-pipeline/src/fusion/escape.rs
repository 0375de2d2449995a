//! GFF3 column 9 value escaping

/// Percent-escape the characters that delimit GFF3 attributes
pub fn escape_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ',' => out.push_str("%2C"),
            ';' => out.push_str("%3B"),
            '=' => out.push_str("%3D"),
            '&' => out.push_str("%26"),
            '\t' => out.push_str("%09"),
            '\n' => out.push_str("%0A"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape each value and join with `,`
pub fn join_escaped<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|v| escape_value(v.as_ref()))
        .collect::<Vec<_>>()
        .join(",")
}
