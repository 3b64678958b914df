//! Shared helpers for Excel coordinates

/// Convert a 1-based column index to its Excel letter form
///
/// Columns past Z continue as AA, AB, ... the way Excel labels them.
///
/// # Examples
///
/// ```
/// use geochem_dataset::utils::column_letter;
///
/// assert_eq!(column_letter(1), "A");
/// assert_eq!(column_letter(26), "Z");
/// assert_eq!(column_letter(27), "AA");
/// assert_eq!(column_letter(703), "AAA");
/// ```
pub fn column_letter(column: u32) -> String {
    let mut n = column;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Build an A1-style reference from 1-based row and column
///
/// # Examples
///
/// ```
/// use geochem_dataset::utils::cell_ref;
///
/// assert_eq!(cell_ref(1, 1), "A1");
/// assert_eq!(cell_ref(9, 4), "D9");
/// ```
pub fn cell_ref(row: u32, column: u32) -> String {
    format!("{}{}", column_letter(column), row)
}

/// Render a float the way a user typed it: `1990` rather than `1990.0`
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}
