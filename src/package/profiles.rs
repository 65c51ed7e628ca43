//! Profile compatibility gate.

use std::path::Path;
use tracing::debug;

use crate::error::{NoopsError, ProfileError, Result};
use crate::kinds::{Profile, ProfileClasses};

use super::values::values_file;

/// Checks requested profiles against the classes a chart supports.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProfileGate;

impl ProfileGate {
    /// Returns true if the chart supports `profile`.
    #[must_use]
    pub const fn is_compatible(profile: Profile, supported: &ProfileClasses) -> bool {
        match profile {
            Profile::Default => true,
            Profile::Canary | Profile::CanaryEndpointsOnly | Profile::CanaryDedicatedEndpoints => {
                supported.canary
            }
            Profile::DedicatedEndpoints => supported.dedicated_endpoints,
            Profile::ServicesOnly => supported.services_only,
        }
    }

    /// Value-file arguments for `profiles`, in the requested order.
    ///
    /// `default` must come first and `services-only` last when present.
    /// Between them at most one variant profile is allowed, except the
    /// `canary` + `dedicated-endpoints` pair.
    ///
    /// # Errors
    ///
    /// Returns an error on a conflicting combination, an unsupported profile
    /// or a missing `profile-<name>.yaml`.
    pub fn helm_profiles_args(
        supported: &ProfileClasses,
        profiles: &[Profile],
        chart_dir: &Path,
    ) -> Result<Vec<String>> {
        if profiles.is_empty() {
            return Ok(Vec::new());
        }

        Self::check_combination(profiles)?;

        let mut args = Vec::with_capacity(profiles.len() * 2);
        for profile in profiles {
            if !Self::is_compatible(*profile, supported) {
                return Err(ProfileError::ProfileNotSupported {
                    profile: profile.to_string(),
                }
                .into());
            }

            let file = values_file(chart_dir, &format!("profile-{profile}.yaml"));
            if !file.exists() {
                return Err(NoopsError::file_not_found(file));
            }

            debug!("Using profile {profile}: {}", file.display());
            args.push("-f".to_string());
            args.push(file.display().to_string());
        }

        Ok(args)
    }

    fn check_combination(profiles: &[Profile]) -> Result<()> {
        let conflict = |message: String| -> Result<()> {
            Err(ProfileError::ProfileConflict { message }.into())
        };

        for (i, profile) in profiles.iter().enumerate() {
            if profiles[..i].contains(profile) {
                return conflict(format!("{profile} profile requested twice"));
            }
        }

        if let Some(pos) = profiles.iter().position(|p| *p == Profile::Default)
            && pos != 0
        {
            return conflict("default profile must come first".to_string());
        }
        if let Some(pos) = profiles.iter().position(|p| *p == Profile::ServicesOnly)
            && pos != profiles.len() - 1
        {
            return conflict("services-only profile must come last".to_string());
        }

        let mut variants: Vec<Profile> = profiles
            .iter()
            .copied()
            .filter(|p| !matches!(p, Profile::Default | Profile::ServicesOnly))
            .collect();

        match variants.len() {
            0 | 1 => Ok(()),
            2 => {
                variants.sort_by_key(|p| p.as_str());
                if variants == [Profile::Canary, Profile::DedicatedEndpoints] {
                    Ok(())
                } else {
                    conflict(format!("{} and {} can not be combined", variants[0], variants[1]))
                }
            }
            n => conflict(format!("{n} variant profiles requested, at most 2 are allowed")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::values::VALUES_DIR;
    use tempfile::TempDir;

    fn chart_with_profiles(profiles: &[Profile]) -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir(dir.path().join(VALUES_DIR)).expect("Failed to create values dir");
        for profile in profiles {
            std::fs::write(
                values_file(dir.path(), &format!("profile-{profile}.yaml")),
                "{}",
            )
            .expect("Failed to write profile");
        }
        dir
    }

    fn canary() -> ProfileClasses {
        ProfileClasses {
            canary: true,
            ..ProfileClasses::default()
        }
    }

    #[test]
    fn test_default_then_canary_order() {
        let chart = chart_with_profiles(&[Profile::Default, Profile::Canary]);
        let args = ProfileGate::helm_profiles_args(
            &canary(),
            &[Profile::Default, Profile::Canary],
            chart.path(),
        )
        .expect("supported profiles");

        let noops = chart.path().join(VALUES_DIR);
        assert_eq!(
            args,
            vec![
                "-f".to_string(),
                noops.join("profile-default.yaml").display().to_string(),
                "-f".to_string(),
                noops.join("profile-canary.yaml").display().to_string(),
            ]
        );
    }

    #[test]
    fn test_empty_profiles() {
        let args = ProfileGate::helm_profiles_args(&canary(), &[], Path::new("/nowhere"))
            .expect("no profile");
        assert!(args.is_empty());
    }

    #[test]
    fn test_missing_profile_file() {
        let chart = chart_with_profiles(&[Profile::Default]);
        let err = ProfileGate::helm_profiles_args(
            &canary(),
            &[Profile::Default, Profile::Canary],
            chart.path(),
        )
        .expect_err("profile-canary.yaml is missing");
        assert!(err.to_string().contains("profile-canary.yaml"));
    }

    #[test]
    fn test_unsupported_profile() {
        let chart = chart_with_profiles(&[Profile::Default, Profile::ServicesOnly]);
        let err = ProfileGate::helm_profiles_args(
            &canary(),
            &[Profile::Default, Profile::ServicesOnly],
            chart.path(),
        )
        .expect_err("services-only is not supported");
        assert!(matches!(
            err,
            NoopsError::Profile(ProfileError::ProfileNotSupported { .. })
        ));
    }

    #[test]
    fn test_combinations() {
        let ok = [
            vec![Profile::Default],
            vec![Profile::Default, Profile::CanaryEndpointsOnly],
            vec![Profile::Default, Profile::Canary, Profile::ServicesOnly],
            vec![Profile::Canary, Profile::DedicatedEndpoints],
            vec![Profile::Default, Profile::DedicatedEndpoints, Profile::Canary],
        ];
        for profiles in ok {
            assert!(ProfileGate::check_combination(&profiles).is_ok(), "{profiles:?}");
        }

        let rejected = [
            vec![Profile::Canary, Profile::Default],
            vec![Profile::ServicesOnly, Profile::Canary],
            vec![Profile::Canary, Profile::CanaryDedicatedEndpoints],
            vec![Profile::Default, Profile::Default],
            vec![
                Profile::Canary,
                Profile::DedicatedEndpoints,
                Profile::CanaryEndpointsOnly,
            ],
        ];
        for profiles in rejected {
            assert!(ProfileGate::check_combination(&profiles).is_err(), "{profiles:?}");
        }
    }

    #[test]
    fn test_compatibility() {
        let none = ProfileClasses::default();
        assert!(ProfileGate::is_compatible(Profile::Default, &none));
        assert!(!ProfileGate::is_compatible(Profile::CanaryEndpointsOnly, &none));
        assert!(ProfileGate::is_compatible(Profile::CanaryDedicatedEndpoints, &canary()));
        assert!(!ProfileGate::is_compatible(Profile::DedicatedEndpoints, &canary()));
    }
}
