// Display formatting shared by the list, upload and analysis screens.

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Base-1024 size with up to two decimals, e.g. `2 MB`, `1.5 KB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".into();
    }

    let mut unit = 0;
    let mut value = bytes as f64;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut num = format!("{value:.2}");
    if num.contains('.') {
        while num.ends_with('0') {
            num.pop();
        }
        if num.ends_with('.') {
            num.pop();
        }
    }
    format!("{num} {}", SIZE_UNITS[unit])
}

/// `payment_terms` -> `Payment Terms`.
pub fn humanize_key(key: &str) -> String {
    key.split('_')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Percentage of `count` in `total`, treating an empty total as 1.
pub fn share_percent(count: u64, total: u64) -> f64 {
    (count as f64 / total.max(1) as f64) * 100.0
}
