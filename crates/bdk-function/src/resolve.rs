//! Defaults and validation of function props

use crate::props::{Architecture, EnvironmentValue, FunctionLogging, FunctionProps};
use crate::schedule::to_cron_expression;
use bdk_platform::{BackendError, DefinitionSite, Result};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

/// Default timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u32 = 3;
/// Default memory in MB
pub const DEFAULT_MEMORY_MB: u32 = 512;
/// Default ephemeral storage in MB
pub const DEFAULT_EPHEMERAL_STORAGE_SIZE_MB: u32 = 512;
/// Default runtime major version
pub const DEFAULT_RUNTIME: u32 = 20;
/// Supported runtime major versions
pub const SUPPORTED_RUNTIMES: [u32; 4] = [16, 18, 20, 22];

const DEFAULT_ENTRY: &str = "handler.ts";

static ENVIRONMENT_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z]([a-zA-Z0-9_])+$").expect("environment key regex is valid"));

/// Function props with defaults applied and every value validated
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFunctionProps {
    /// Function name
    pub name: String,
    /// Handler path
    pub entry: String,
    /// Timeout in seconds
    pub timeout_seconds: u32,
    /// Memory in MB
    pub memory_mb: u32,
    /// Ephemeral storage in MB
    pub ephemeral_storage_size_mb: u32,
    /// Environment variables
    pub environment: IndexMap<String, EnvironmentValue>,
    /// Runtime major version
    pub runtime: u32,
    /// Architecture
    pub architecture: Architecture,
    /// Schedules as `cron(...)` expressions
    pub schedule_expressions: Vec<String>,
    /// Logging
    pub logging: FunctionLogging,
}

/// Apply defaults and validate
///
/// # Errors
///
/// [`BackendError::Configuration`] with the `Invalid*Error` code of the first
/// invalid value.
pub fn resolve_function_props(props: &FunctionProps, site: &DefinitionSite) -> Result<ResolvedFunctionProps> {
    let (name, entry) = resolve_name_and_entry(props, site);
    let timeout_seconds = whole_in_range(
        props.timeout_seconds,
        DEFAULT_TIMEOUT_SECONDS,
        1..=900,
        "InvalidTimeoutError",
        "timeout",
        "timeoutSeconds",
    )?;
    let memory_mb = whole_in_range(
        props.memory_mb,
        DEFAULT_MEMORY_MB,
        128..=10240,
        "InvalidMemoryMBError",
        "memoryMB",
        "memoryMB",
    )?;
    let ephemeral_storage_size_mb = whole_in_range(
        props.ephemeral_storage_size_mb,
        DEFAULT_EPHEMERAL_STORAGE_SIZE_MB,
        512..=10240,
        "InvalidEphemeralStorageSizeMBError",
        "ephemeralStorageSizeMB",
        "ephemeralStorageSizeMB",
    )?;

    let invalid_keys: Vec<&str> = props
        .environment
        .keys()
        .map(String::as_str)
        .filter(|key| !ENVIRONMENT_KEY.is_match(key))
        .collect();
    if !invalid_keys.is_empty() {
        return Err(BackendError::configuration(
            "InvalidEnvironmentKeyError",
            format!("Invalid function environment key(s): {}", invalid_keys.join(", ")),
            "Environment keys must match [a-zA-Z]([a-zA-Z0-9_])+ and be at least 2 characters",
        ));
    }

    let runtime = props.runtime.unwrap_or(DEFAULT_RUNTIME);
    if !SUPPORTED_RUNTIMES.contains(&runtime) {
        return Err(BackendError::configuration(
            "InvalidRuntimeError",
            format!("Invalid function runtime of {runtime}"),
            format!(
                "runtime must be one of the following: {}",
                SUPPORTED_RUNTIMES.map(|r| r.to_string()).join(", ")
            ),
        ));
    }

    let architecture = match props.architecture.as_deref() {
        None | Some("x86_64") => Architecture::X86_64,
        Some("arm64") => Architecture::Arm64,
        Some(other) => {
            return Err(BackendError::configuration(
                "InvalidArchitectureError",
                format!("Invalid function architecture of {other}"),
                "architecture must be one of the following: arm64, x86_64",
            ))
        }
    };

    let schedule_expressions = props
        .schedule
        .iter()
        .map(|schedule| {
            to_cron_expression(schedule).ok_or_else(|| {
                BackendError::configuration(
                    "InvalidScheduleError",
                    format!("Invalid function schedule of {schedule}"),
                    "schedule must be a rate such as `every 5m`, `every 1h` or `every day`, or a cron expression with 5 or 6 fields",
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ResolvedFunctionProps {
        name,
        entry,
        timeout_seconds,
        memory_mb,
        ephemeral_storage_size_mb,
        environment: props.environment.clone(),
        runtime,
        architecture,
        schedule_expressions,
        logging: props.logging,
    })
}

fn resolve_name_and_entry(props: &FunctionProps, site: &DefinitionSite) -> (String, String) {
    let directory = site.directory().unwrap_or_default();
    let join = |relative: &str| {
        let relative = relative.trim_start_matches("./");
        if directory.is_empty() {
            relative.to_string()
        } else {
            format!("{directory}/{relative}")
        }
    };
    let entry = join(props.entry.as_deref().unwrap_or(DEFAULT_ENTRY));

    let name = match (&props.name, &props.entry) {
        (Some(name), _) => name.clone(),
        (None, Some(entry)) => Path::new(entry)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        (None, None) => site.directory_name().unwrap_or_default(),
    };
    (name, entry)
}

fn whole_in_range(
    value: Option<f64>,
    default: u32,
    range: std::ops::RangeInclusive<u32>,
    code: &'static str,
    label: &str,
    property: &str,
) -> Result<u32> {
    let Some(value) = value else {
        return Ok(default);
    };
    let (min, max) = (*range.start(), *range.end());
    if value.fract() == 0.0 && value >= f64::from(min) && value <= f64::from(max) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        return Ok(value as u32);
    }
    Err(BackendError::configuration(
        code,
        format!("Invalid function {label} of {value}"),
        format!("{property} must be a whole number between {min} and {max} inclusive"),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn site() -> DefinitionSite {
        DefinitionSite::new("amplify/functions/default-lambda/resource.rs", 1, 1)
    }

    fn message(err: &BackendError) -> String {
        err.to_string()
    }

    #[test]
    fn defaults() {
        let resolved = resolve_function_props(&FunctionProps::new(), &site()).unwrap();
        assert_eq!(resolved.name, "default-lambda");
        assert_eq!(resolved.entry, "amplify/functions/default-lambda/handler.ts");
        assert_eq!(resolved.timeout_seconds, 3);
        assert_eq!(resolved.memory_mb, 512);
        assert_eq!(resolved.ephemeral_storage_size_mb, 512);
        assert_eq!(resolved.runtime, 20);
        assert_eq!(resolved.architecture, Architecture::X86_64);
        assert!(resolved.schedule_expressions.is_empty());
    }

    #[test]
    fn name_from_entry_stem() {
        let props = FunctionProps::new().with_entry("./test-assets/default-lambda/handler.ts");
        let resolved = resolve_function_props(&props, &site()).unwrap();
        assert_eq!(resolved.name, "handler");
        assert_eq!(
            resolved.entry,
            "amplify/functions/default-lambda/test-assets/default-lambda/handler.ts"
        );
    }

    #[test]
    fn explicit_name_wins() {
        let props = FunctionProps::new()
            .with_entry("./handler.ts")
            .with_name("myCoolLambda");
        assert_eq!(resolve_function_props(&props, &site()).unwrap().name, "myCoolLambda");
    }

    #[test]
    fn timeout_errors() {
        for (timeout, shown) in [(0.0, "0"), (901.0, "901"), (10.5, "10.5")] {
            let props = FunctionProps::new().with_timeout_seconds(timeout);
            let err = resolve_function_props(&props, &site()).unwrap_err();
            assert_eq!(err.code(), "InvalidTimeoutError");
            assert_eq!(message(&err), format!("Invalid function timeout of {shown}"));
            assert_eq!(
                err.resolution(),
                Some("timeoutSeconds must be a whole number between 1 and 900 inclusive")
            );
        }
    }

    #[test]
    fn ephemeral_storage_errors() {
        let props = FunctionProps::new().with_ephemeral_storage_size_mb(512.5);
        let err = resolve_function_props(&props, &site()).unwrap_err();
        assert_eq!(err.code(), "InvalidEphemeralStorageSizeMBError");
        assert_eq!(message(&err), "Invalid function ephemeralStorageSizeMB of 512.5");
    }

    #[test]
    fn environment_keys_are_reported_together() {
        let props = FunctionProps::new()
            .with_environment("A", "short")
            .with_environment("GOOD_KEY", "fine")
            .with_environment("this.is.wrong", "dots");
        let err = resolve_function_props(&props, &site()).unwrap_err();
        assert_eq!(err.code(), "InvalidEnvironmentKeyError");
        assert_eq!(message(&err), "Invalid function environment key(s): A, this.is.wrong");
    }

    #[test]
    fn runtime_and_architecture() {
        let err = resolve_function_props(&FunctionProps::new().with_runtime(14), &site()).unwrap_err();
        assert_eq!(message(&err), "Invalid function runtime of 14");
        assert_eq!(err.resolution(), Some("runtime must be one of the following: 16, 18, 20, 22"));

        let err = resolve_function_props(&FunctionProps::new().with_architecture("invalid"), &site()).unwrap_err();
        assert_eq!(err.code(), "InvalidArchitectureError");
        assert_eq!(message(&err), "Invalid function architecture of invalid");

        let arm = resolve_function_props(&FunctionProps::new().with_architecture("arm64"), &site()).unwrap();
        assert_eq!(arm.architecture, Architecture::Arm64);
    }

    #[test]
    fn schedules() {
        let props = FunctionProps::new()
            .with_schedule("0 1 * * ?")
            .with_schedule("every 5m");
        let resolved = resolve_function_props(&props, &site()).unwrap();
        assert_eq!(
            resolved.schedule_expressions,
            vec!["cron(0 1 * * ? *)".to_string(), "cron(*/5 * * * ? *)".to_string()]
        );

        let err = resolve_function_props(&FunctionProps::new().with_schedule("sometimes"), &site()).unwrap_err();
        assert_eq!(err.code(), "InvalidScheduleError");
    }

    proptest! {
        #[test]
        fn memory_accepts_only_whole_values_in_range(memory in 0u32..12_000) {
            let props = FunctionProps::new().with_memory_mb(f64::from(memory));
            let result = resolve_function_props(&props, &site());
            prop_assert_eq!(result.is_ok(), (128..=10240).contains(&memory));
        }

        #[test]
        fn fractional_memory_is_rejected(memory in 128u32..10240, fraction in 0.01f64..0.99) {
            let props = FunctionProps::new().with_memory_mb(f64::from(memory) + fraction);
            let err = resolve_function_props(&props, &site()).unwrap_err();
            prop_assert_eq!(err.code(), "InvalidMemoryMBError");
        }
    }

    #[test]
    fn memory_boundaries() {
        for rejected in [127.0, 10241.0, 256.2] {
            let props = FunctionProps::new().with_memory_mb(rejected);
            let err = resolve_function_props(&props, &site()).unwrap_err();
            assert_eq!(message(&err), format!("Invalid function memoryMB of {rejected}"));
            assert_eq!(
                err.resolution(),
                Some("memoryMB must be a whole number between 128 and 10240 inclusive")
            );
        }
        for accepted in [128.0, 10240.0] {
            let props = FunctionProps::new().with_memory_mb(accepted);
            assert!(resolve_function_props(&props, &site()).is_ok());
        }
    }
}
