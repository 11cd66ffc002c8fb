//! Ordering of provider version strings

use std::cmp::Ordering;

/// Split off the numeric release and report whether a pre-release suffix
/// (`rc1`, `b2`, `.dev0`, `-alpha`) follows it
fn parse(version: &str) -> (Vec<u64>, Option<String>) {
    let version = version.trim();
    let version = version
        .strip_prefix('v')
        .or_else(|| version.strip_prefix('V'))
        .unwrap_or(version);

    let mut release = Vec::new();
    let mut rest = version;
    loop {
        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        if digits == 0 {
            break;
        }
        release.push(rest[..digits].parse().unwrap_or(u64::MAX));
        rest = &rest[digits..];
        match rest.strip_prefix('.') {
            Some(next) if next.starts_with(|c: char| c.is_ascii_digit()) => rest = next,
            _ => break,
        }
    }

    // Local build labels (`+local`) do not affect ordering
    let rest = rest.split('+').next().unwrap_or_default();
    let suffix = rest.trim_start_matches(['.', '-']);
    let pre = (!suffix.is_empty()).then(|| suffix.to_ascii_lowercase());
    (release, pre)
}

/// Compare two version strings.
///
/// Numeric components compare numerically, missing components count as 0,
/// and a pre-release sorts before the matching release.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (ra, pa) = parse(a);
    let (rb, pb) = parse(b);

    let len = ra.len().max(rb.len());
    for i in 0..len {
        let x = ra.get(i).copied().unwrap_or(0);
        let y = rb.get(i).copied().unwrap_or(0);
        match x.cmp(&y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    match (pa, pb) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => compare_pre_release(&x, &y),
    }
}

/// `dev` < `a`/`alpha` < `b`/`beta` < `rc`, then by trailing number
fn compare_pre_release(a: &str, b: &str) -> Ordering {
    fn rank(tag: &str) -> (u8, u64, &str) {
        let split = tag.find(|c: char| c.is_ascii_digit()).unwrap_or(tag.len());
        let (label, number) = tag.split_at(split);
        let label = label.trim_end_matches(['.', '-']);
        let weight = match label {
            "dev" => 0,
            "a" | "alpha" => 1,
            "b" | "beta" => 2,
            "rc" | "c" => 3,
            _ => 4,
        };
        (weight, number.parse().unwrap_or(0), label)
    }
    rank(a).cmp(&rank(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1.0.0", "1.0.0", Ordering::Equal ; "identical")]
    #[test_case("1.0", "1.0.0", Ordering::Equal ; "missing components are zero")]
    #[test_case("1.10.0", "1.9.3", Ordering::Greater ; "numeric not lexical")]
    #[test_case("2.0.0", "10.0.0", Ordering::Less ; "major")]
    #[test_case("v3.1.0", "3.1.0", Ordering::Equal ; "leading v")]
    #[test_case("9.0.0rc1", "9.0.0", Ordering::Less ; "rc before release")]
    #[test_case("9.0.0b2", "9.0.0rc1", Ordering::Less ; "beta before rc")]
    #[test_case("9.0.0.dev0", "9.0.0b1", Ordering::Less ; "dev first")]
    #[test_case("9.0.0rc2", "9.0.0rc10", Ordering::Less ; "pre-release number")]
    #[test_case("9.0.1rc1", "9.0.0", Ordering::Greater ; "release component wins")]
    #[test_case("2.1.0+local", "2.1.0", Ordering::Equal ; "local label ignored")]
    fn test_compare(a: &str, b: &str, expected: Ordering) {
        assert_eq!(compare_versions(a, b), expected);
        assert_eq!(compare_versions(b, a), expected.reverse());
    }

    #[test]
    fn test_sorts_provider_versions() {
        let mut versions = vec!["1.2.0", "1.10.0", "1.2.0rc1", "0.9", "1.2"];
        versions.sort_by(|a, b| compare_versions(a, b));
        assert_eq!(versions, vec!["0.9", "1.2.0rc1", "1.2.0", "1.2", "1.10.0"]);
    }
}
