//! Release naming and `--set` argument helpers.

use crate::kinds::{MultiSpec, Version, WhiteLabelSpec};

/// Maximum length of an RFC 1035 label.
const LABEL_MAX_LEN: usize = 63;

/// Turns `name` into a valid RFC 1035 label.
///
/// Lowercases, replaces anything outside `[a-z0-9-]` with `-`, truncates to
/// 63 characters and strips trailing `-`.
#[must_use]
pub fn label_rfc1035(name: &str) -> String {
    let label: String = name
        .chars()
        .map(|c| c.to_ascii_lowercase())
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' { c } else { '-' })
        .take(LABEL_MAX_LEN)
        .collect();
    label.trim_end_matches('-').to_string()
}

/// Release of a version slot: the project name for the single version,
/// `{project}-{app_version}` for the others.
#[must_use]
pub fn release_name(project: &str, version: &Version) -> String {
    match version {
        Version::One(_) => project.to_string(),
        Version::Multi(v) => format!("{project}-{}", v.app_version),
    }
}

/// Repository search keyword of a version: `{chart}-{build}+{version}+{app_version}`.
#[must_use]
pub fn chart_keyword(chart: &str, version: &Version) -> String {
    format!(
        "{chart}-{}+{}+{}",
        version.build().unwrap_or_default(),
        version.version().unwrap_or_default(),
        version.app_version()
    )
}

/// Canary weight of a single instance.
#[must_use]
pub fn canary_weight_args(weight: Option<u32>) -> Vec<String> {
    weight
        .map(|w| vec!["--set".to_string(), format!("noops.canary.weight={w}")])
        .unwrap_or_default()
}

/// Canary instances served by the aggregate release.
#[must_use]
pub fn canary_instances_args(versions: &[MultiSpec]) -> Vec<String> {
    versions
        .iter()
        .filter_map(|v| v.weight.map(|w| (v, w)))
        .enumerate()
        .flat_map(|(i, (v, weight))| {
            [
                "--set".to_string(),
                format!("noops.canary.instances[{i}].app_version={}", v.app_version),
                "--set".to_string(),
                format!("noops.canary.instances[{i}].weight={weight}"),
            ]
        })
        .collect()
}

/// White-label values.
#[must_use]
pub fn white_label_args(white_label: Option<&WhiteLabelSpec>) -> Vec<String> {
    white_label
        .map(|wl| {
            vec![
                "--set".to_string(),
                "noops.white-label.enabled=true".to_string(),
                "--set".to_string(),
                format!("noops.white-label.rebrand={}", wl.rebrand),
                "--set".to_string(),
                format!("noops.white-label.marketer={}", wl.marketer),
            ]
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::OneSpec;

    #[test]
    fn test_label_rfc1035() {
        assert_eq!(label_rfc1035("My_Release!"), "my-release");
        assert_eq!(label_rfc1035("demo-"), "demo");
        assert_eq!(label_rfc1035("demo-1.0.0"), "demo-1-0-0");

        let long = label_rfc1035(&"a".repeat(100));
        assert_eq!(long.len(), 63);

        let cut_on_dash = label_rfc1035(&format!("{}_x", "b".repeat(62)));
        assert_eq!(cut_on_dash, "b".repeat(62));
    }

    #[test]
    fn test_release_names() {
        let one = Version::One(OneSpec::new("1.0.0"));
        let multi = Version::Multi(MultiSpec::new("2.0.0"));
        assert_eq!(release_name("demo", &one), "demo");
        assert_eq!(release_name("demo", &multi), "demo-2.0.0");
    }

    #[test]
    fn test_chart_keyword() {
        let bare = Version::One(OneSpec::new("1.0.0"));
        assert_eq!(chart_keyword("a_chart", &bare), "a_chart-++1.0.0");

        let full = Version::One(OneSpec {
            version: Some("0.1.0".to_string()),
            build: Some("127".to_string()),
            ..OneSpec::new("1.0.0")
        });
        assert_eq!(chart_keyword("a_chart", &full), "a_chart-127+0.1.0+1.0.0");
    }

    #[test]
    fn test_canary_args() {
        assert!(canary_weight_args(None).is_empty());
        assert_eq!(canary_weight_args(Some(40)), vec!["--set", "noops.canary.weight=40"]);

        let versions = vec![
            MultiSpec::new("2.0.0").with_weight(10),
            MultiSpec::new("2.5.0"),
            MultiSpec::new("3.0.0").with_weight(90),
        ];
        assert_eq!(
            canary_instances_args(&versions),
            vec![
                "--set",
                "noops.canary.instances[0].app_version=2.0.0",
                "--set",
                "noops.canary.instances[0].weight=10",
                "--set",
                "noops.canary.instances[1].app_version=3.0.0",
                "--set",
                "noops.canary.instances[1].weight=90",
            ]
        );
    }

    #[test]
    fn test_white_label_args() {
        assert!(white_label_args(None).is_empty());
        let wl = WhiteLabelSpec {
            rebrand: "acme".to_string(),
            marketer: "sales".to_string(),
        };
        assert_eq!(
            white_label_args(Some(&wl)),
            vec![
                "--set",
                "noops.white-label.enabled=true",
                "--set",
                "noops.white-label.rebrand=acme",
                "--set",
                "noops.white-label.marketer=sales",
            ]
        );
    }
}
