//! Small utility helpers used across modules.

use rust_decimal::Decimal;

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// German number rendering with a fixed number of decimals: `1234.5` -> `1234,50`.
pub fn format_de(value: f64, decimals: usize) -> String {
  format!("{:.*}", decimals, value).replace('.', ",")
}

/// Money as shown in the calculation sheets: `1000,00€`.
pub fn format_money(value: Decimal) -> String {
  format!("{:.2}€", value).replace('.', ",")
}

/// Percentages keep only the decimals they need: `10%`, `2,5%`.
pub fn format_percent(rate: Decimal) -> String {
  format!("{}%", rate.normalize()).replace('.', ",")
}

/// ASCII slug used for file names (umlauts are transliterated).
pub fn slugify(s: &str) -> String {
  let mut out = String::new();
  for ch in s.trim().to_lowercase().chars() {
    match ch {
      'ä' => out.push_str("ae"),
      'ö' => out.push_str("oe"),
      'ü' => out.push_str("ue"),
      'ß' => out.push_str("ss"),
      c if c.is_ascii_alphanumeric() => out.push(c),
      _ => {
        if !out.is_empty() && !out.ends_with('-') {
          out.push('-');
        }
      }
    }
  }
  out.trim_end_matches('-').to_string()
}

/// Log-safe truncation for large strings.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
