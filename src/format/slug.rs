/// URL slug: lowercase ASCII alphanumerics, every other run collapsed to one `-`.
pub fn slugify(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_titles() {
        assert_eq!(slugify("Kajian Rutin Ahad Pagi"), "kajian-rutin-ahad-pagi");
        assert_eq!(slugify("  Zakat & Infaq 2025!  "), "zakat-infaq-2025");
        assert_eq!(slugify("a--b__c"), "a-b-c");
    }

    #[test]
    fn non_ascii_is_dropped() {
        assert_eq!(slugify("Ta'lim — Ba'da Maghrib"), "ta-lim-ba-da-maghrib");
        assert_eq!(slugify("!!!"), "");
    }
}
