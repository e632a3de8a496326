//! URL slug generation.

/// Build a URL slug from a display name.
///
/// Lowercases, folds common Latin accents to ASCII, collapses every run of
/// non-alphanumeric characters into a single `-`, and trims hyphens from both
/// ends.
///
/// ```
/// use tireshop_core::slug::slugify;
///
/// assert_eq!(slugify("Summer Tire (Pro)!"), "summer-tire-pro");
/// assert_eq!(slugify("Neumáticos de Invierno"), "neumaticos-de-invierno");
/// ```
#[must_use]
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars().flat_map(char::to_lowercase) {
        let c = fold_accent(c);
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c);
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

const fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_punctuation_runs() {
        assert_eq!(slugify("Summer Tire (Pro)!"), "summer-tire-pro");
        assert_eq!(slugify("205/55 R16 91V"), "205-55-r16-91v");
        assert_eq!(slugify("All -- Season"), "all-season");
    }

    #[test]
    fn test_trims_leading_and_trailing_separators() {
        assert_eq!(slugify("  --Run Flat--  "), "run-flat");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_folds_accents() {
        assert_eq!(slugify("Alineación y Equilibrado"), "alineacion-y-equilibrado");
        assert_eq!(slugify("Montaje ÑANDÚ"), "montaje-nandu");
    }

    #[test]
    fn test_drops_non_latin_characters() {
        assert_eq!(slugify("Tire 轮胎 Pro"), "tire-pro");
    }
}
